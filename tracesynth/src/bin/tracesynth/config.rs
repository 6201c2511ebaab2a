//! Configuration

// Imports
use {std::path::PathBuf, tracesynth::OutputFormat};

/// Profiler configuration
#[derive(Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct ProfilerConfig {
	/// Trace file to characterize
	pub trace_file: PathBuf,

	/// File to save the application profile to.
	///
	/// A `.json` extension selects json encoding, anything else bincode.
	pub output_file: PathBuf,

	/// Whether the trace file is in the binary format
	#[serde(default)]
	pub binary_trace: bool,

	/// Size of the largest cache block to model (in bytes)
	#[serde(default = "default_block_size")]
	pub block_size: u64,

	/// Number of reuse bins
	#[serde(default = "default_bin_count")]
	pub bin_count: usize,

	/// Debug output period (in seconds)
	#[serde(default = "default_debug_output_period_secs")]
	pub debug_output_period_secs: f64,
}

/// Generator configuration
#[derive(Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct GeneratorConfig {
	/// Application profiles to model.
	///
	/// More than one profile is mixed into a weighted combination.
	pub profile_files: Vec<PathBuf>,

	/// Mixing weights, one per profile.
	///
	/// Defaults to evenly weighted profiles.
	#[serde(default)]
	pub weights: Option<Vec<f64>>,

	/// File to write the synthetic trace to
	pub output_file: PathBuf,

	/// Desired trace length (in memory references)
	pub trace_length: u64,

	/// Random seed.
	///
	/// The same seed, profiles and length reproduce the same trace.
	pub seed: u64,

	/// Output format
	pub format: OutputFormat,

	/// Whether to gzip-compress the output
	#[serde(default)]
	pub gzip: bool,
}

fn default_block_size() -> u64 {
	512
}

fn default_bin_count() -> usize {
	tracesynth::ReuseBinClassifier::DEFAULT_BIN_COUNT
}

fn default_debug_output_period_secs() -> f64 {
	1.0
}
