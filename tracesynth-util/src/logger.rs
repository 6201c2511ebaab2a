//! Logger

// Imports
use {
	std::{fs, io, path::Path, sync::Mutex},
	tracing_subscriber::{filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer},
};

/// Logging before the logger is initialized.
///
/// Messages are buffered and emitted once [`init`] runs.
pub mod pre_init {
	// Imports
	use super::Mutex;

	/// Buffered messages
	static MESSAGES: Mutex<Vec<String>> = Mutex::new(Vec::new());

	/// Buffers a debug message until the logger is initialized
	pub fn debug(message: String) {
		let mut messages = MESSAGES.lock().expect("Poisoned pre-init message buffer");
		messages.push(message);
	}

	/// Takes all buffered messages
	pub(super) fn take() -> Vec<String> {
		let mut messages = MESSAGES.lock().expect("Poisoned pre-init message buffer");
		std::mem::take(&mut *messages)
	}
}

/// Initializes the logger.
///
/// Logs to stderr, filtered by `RUST_LOG` (`info` by default).
/// If `log_file` is given, additionally performs verbose logging to it,
/// filtered by `RUST_LOG_FILE` (`debug` by default).
pub fn init(log_file: Option<&Path>, log_file_append: bool) {
	let console_layer = fmt::layer().with_writer(io::stderr).with_filter(
		EnvFilter::builder()
			.with_default_directive(LevelFilter::INFO.into())
			.from_env_lossy(),
	);

	let file_layer = log_file.and_then(|path| {
		let file = fs::OpenOptions::new()
			.create(true)
			.write(true)
			.append(log_file_append)
			.truncate(!log_file_append)
			.open(path);
		let file = match file {
			Ok(file) => file,
			Err(err) => {
				eprintln!("Unable to open log file {path:?}: {err}");
				return None;
			},
		};

		let layer = fmt::layer().with_ansi(false).with_writer(Mutex::new(file)).with_filter(
			EnvFilter::builder()
				.with_env_var("RUST_LOG_FILE")
				.with_default_directive(LevelFilter::DEBUG.into())
				.from_env_lossy(),
		);
		Some(layer)
	});

	tracing_subscriber::registry().with(console_layer).with(file_layer).init();

	// Flush anything logged before we were initialized
	for message in pre_init::take() {
		tracing::debug!("{message}");
	}
}
