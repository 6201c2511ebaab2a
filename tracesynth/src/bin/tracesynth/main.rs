//! Memory-trace characterization and synthesis (`tracesynth`)

// Modules
mod args;
mod config;

// Imports
use {
	self::args::Args,
	anyhow::Context,
	clap::Parser,
	gzp::{
		deflate::Gzip,
		par::compress::{ParCompress, ParCompressBuilder},
		ZWriter,
	},
	std::{fs, io, io::Write, path::Path, time::Duration},
	tracesynth::{
		store,
		BinTraceReader,
		OutputFormat,
		Profiler,
		Synthesizer,
		TextTraceReader,
		WeightedProfileSet,
	},
	tracesynth_util::logger,
};

fn main() -> Result<(), anyhow::Error> {
	// Get arguments
	let args = Args::parse();
	logger::pre_init::debug(format!("Args: {args:?}"));

	// Initialize logging
	logger::init(args.log_file.as_deref(), args.log_file_append);

	// Then check the sub-command
	match args.sub_cmd {
		args::SubCmd::Profile(cmd) => self::run_profile(&cmd.config_file),
		args::SubCmd::Generate(cmd) => self::run_generate(&cmd.config_file),
	}
}

/// Characterizes a trace into an application profile
fn run_profile(config_file: &Path) -> Result<(), anyhow::Error> {
	// Read the config file
	let config = {
		let config_file = fs::File::open(config_file).context("Unable to open config file")?;
		serde_json::from_reader::<_, self::config::ProfilerConfig>(config_file).context("Unable to parse config file")?
	};
	tracing::debug!(?config, "Profiler config");

	// Characterize the trace
	let profiler = Profiler::new(Duration::from_secs_f64(config.debug_output_period_secs));
	let trace_file = fs::File::open(&config.trace_file).context("Unable to open trace file")?;
	let profile = match config.binary_trace {
		true => {
			let mut reader = BinTraceReader::from_reader(trace_file).context("Unable to parse binary trace")?;
			profiler.run(&mut reader, config.block_size, config.bin_count)
		},
		false => {
			let mut reader = TextTraceReader::new(io::BufReader::new(trace_file));
			profiler.run(&mut reader, config.block_size, config.bin_count)
		},
	}
	.context("Unable to characterize trace")?;

	tracing::info!(
		total_accesses = profile.total_accesses,
		"Characterized {:?}",
		config.trace_file
	);

	// And save the profile
	store::save(&profile, &config.output_file).context("Unable to save profile")?;

	Ok(())
}

/// Synthesizes a trace from one or more application profiles
fn run_generate(config_file: &Path) -> Result<(), anyhow::Error> {
	// Read the config file
	let config = {
		let config_file = fs::File::open(config_file).context("Unable to open config file")?;
		serde_json::from_reader::<_, self::config::GeneratorConfig>(config_file).context("Unable to parse config file")?
	};
	tracing::debug!(?config, "Generator config");

	// Load all profiles and combine them
	let profiles = config
		.profile_files
		.iter()
		.map(|path| store::load(path))
		.collect::<Result<Vec<_>, _>>()
		.context("Unable to load profiles")?;
	let profile = WeightedProfileSet::new(profiles, config.weights)
		.context("Unable to combine profiles")?
		.combine();

	// Then synthesize the trace into the output file
	let synth = Synthesizer::new(&profile, config.trace_length, config.seed).context("Unable to create synthesizer")?;
	let output_file = fs::File::create(&config.output_file).context("Unable to create output file")?;
	match config.gzip {
		true => {
			let mut writer: ParCompress<Gzip> = ParCompressBuilder::new().from_writer(output_file);
			self::write_trace(&mut writer, synth, config.format)?;
			writer.finish().context("Unable to finish compressed output")?;
		},
		false => {
			let mut writer = io::BufWriter::new(output_file);
			self::write_trace(&mut writer, synth, config.format)?;
			writer.flush().context("Unable to flush output file")?;
		},
	}

	tracing::info!(
		trace_length = config.trace_length,
		"Synthesized trace into {:?}",
		config.output_file
	);

	Ok(())
}

/// Writes all accesses of `synth` to `writer` in `format`
fn write_trace(writer: &mut impl io::Write, synth: Synthesizer, format: OutputFormat) -> Result<(), anyhow::Error> {
	for record in synth {
		format
			.write_access(writer, &record)
			.context("Unable to write access")?;
	}

	Ok(())
}
