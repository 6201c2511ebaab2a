//! Arguments

// Imports
use std::path::PathBuf;

/// Arguments
#[derive(Debug)]
#[derive(clap::Parser)]
pub struct Args {
	/// Log file
	///
	/// Specifies a file to perform verbose logging to.
	/// You can use `RUST_LOG_FILE` to set filtering options
	#[clap(long = "log-file")]
	pub log_file: Option<PathBuf>,

	/// Whether to append to the log file
	#[clap(long = "log-file-append")]
	pub log_file_append: bool,

	/// Sub-command
	#[command(subcommand)]
	pub sub_cmd: SubCmd,
}

/// Sub-command
#[derive(Debug, clap::Subcommand)]
pub enum SubCmd {
	/// Characterizes an address trace into an application profile
	#[clap(name = "profile")]
	Profile(Profile),

	/// Synthesizes an address trace from one or more application profiles
	#[clap(name = "generate")]
	Generate(Generate),
}

/// Characterizes an address trace into an application profile
#[derive(Debug, clap::Args)]
pub struct Profile {
	/// Config file
	#[clap(long = "config")]
	pub config_file: PathBuf,
}

/// Synthesizes an address trace from one or more application profiles
#[derive(Debug, clap::Args)]
pub struct Generate {
	/// Config file
	#[clap(long = "config")]
	pub config_file: PathBuf,
}
