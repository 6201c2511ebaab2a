//! Alpha value estimation

// Imports
use {
	crate::{
		bins::ReuseBinClassifier,
		profile::{ActivityModel, AlphaValues, Profile},
		stack::StackDistanceTracker,
		trace::{TraceRecord, TraceSource},
	},
	anyhow::Context,
	average::{Estimate, Variance},
	itertools::Itertools,
	std::{
		fmt,
		time::{Duration, Instant},
	},
	tracesynth_util::DisplayWrapper,
};

/// Alpha value estimator.
///
/// Accumulates per-bin locality statistics across a whole trace and fits
/// them into a [`Profile`] once the trace is exhausted.
#[derive(Debug)]
pub struct AlphaValueEstimator {
	/// Block size, in bytes
	block_size: u64,

	/// Accesses per bin
	bin_counts: Vec<u64>,

	/// Intra-block offset histogram per bin
	offset_hists: Vec<Vec<u64>>,

	/// Access kind counts per bin
	kind_counts: Vec<[u64; 3]>,

	/// Cycle activity transition counts
	activity_counts: [[u64; 2]; 2],

	/// Cycle of the last access
	last_cycle: Option<u64>,

	/// Total accesses
	total: u64,
}

impl AlphaValueEstimator {
	/// Creates an estimator for `block_size` and `bin_count`.
	///
	/// # Errors
	/// Returns an error if `block_size` isn't a power of two or `bin_count`
	/// is zero, before any access is processed.
	pub fn new(block_size: u64, bin_count: usize) -> Result<Self, anyhow::Error> {
		anyhow::ensure!(
			block_size.is_power_of_two(),
			"Block size must be a power of two, found {block_size}"
		);
		anyhow::ensure!(bin_count > 0, "Bin count must be positive, found {bin_count}");

		Ok(Self {
			block_size,
			bin_counts: vec![0; bin_count],
			offset_hists: vec![vec![0; block_size as usize]; bin_count],
			kind_counts: vec![[0; 3]; bin_count],
			activity_counts: [[0; 2]; 2],
			last_cycle: None,
			total: 0,
		})
	}

	/// Records one access classified into `bin`.
	///
	/// Accesses must arrive in trace order.
	pub fn record(&mut self, record: &TraceRecord, bin: usize) {
		self.bin_counts[bin] += 1;
		self.offset_hists[bin][(record.addr & (self.block_size - 1)) as usize] += 1;
		self.kind_counts[bin][record.kind.index()] += 1;
		self.total += 1;

		// Count the activity transitions covered by the inactive gap.
		// Note: We assume cycles are monotonically increasing; a trace
		//       that goes backwards in time contributes no gap.
		let first_unseen = self.last_cycle.map_or(0, |cycle| cycle + 1);
		let gap = record.cycle.saturating_sub(first_unseen);
		let prev_state = usize::from(self.last_cycle.is_some());
		match gap {
			0 => self.activity_counts[prev_state][1] += 1,
			_ => {
				// Entering the inactive run, staying in it, then leaving it
				self.activity_counts[prev_state][0] += 1;
				self.activity_counts[0][0] += gap - 1;
				self.activity_counts[0][1] += 1;
			},
		}
		self.last_cycle = Some(record.cycle);
	}

	/// Finishes estimation, fitting the accumulated statistics into a profile
	pub fn finish(self) -> Profile {
		let bins = self
			.bin_counts
			.iter()
			.zip(&self.offset_hists)
			.zip(&self.kind_counts)
			.map(|((&count, offset_hist), kind_count)| {
				let mut alpha = AlphaValues::zeroed(self.block_size);
				if count == 0 {
					return alpha;
				}

				alpha.frequency = count as f64 / self.total as f64;
				for (prob, &hits) in alpha.offsets.iter_mut().zip(offset_hist) {
					*prob = hits as f64 / count as f64;
				}
				for (prob, &hits) in alpha.kinds.iter_mut().zip(kind_count) {
					*prob = hits as f64 / count as f64;
				}
				alpha
			})
			.collect();

		// Normalize the activity rows, defaulting unobserved states to
		// "always active" so generation can't stall on them
		let mut activity = ActivityModel::always_active();
		for (row, counts) in activity.rows.iter_mut().zip(&self.activity_counts) {
			let row_total = counts.iter().sum::<u64>();
			if row_total > 0 {
				*row = [
					counts[0] as f64 / row_total as f64,
					counts[1] as f64 / row_total as f64,
				];
			}
		}

		Profile {
			block_size: self.block_size,
			bin_count: self.bin_counts.len(),
			total_accesses: self.total,
			bins,
			activity,
		}
	}

	/// Formats debug output to `f`
	pub fn fmt_debug(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
		write!(
			f,
			"{} accesses, bins [{}]",
			self.total,
			self.bin_counts.iter().format(", ")
		)
	}
}

/// Profiler.
///
/// Drives a trace source through the stack distance tracker, bin classifier
/// and alpha value estimator to characterize a whole trace.
#[derive(Debug)]
pub struct Profiler {
	/// Debug output period
	///
	/// Interval in which to output progress for the estimator
	debug_output_period: Duration,
}

impl Profiler {
	/// Creates a new profiler
	pub fn new(debug_output_period: Duration) -> Self {
		Self { debug_output_period }
	}

	/// Characterizes all records from `source` into a profile
	pub fn run<S: TraceSource>(&self, source: &mut S, block_size: u64, bin_count: usize) -> Result<Profile, anyhow::Error> {
		let classifier = ReuseBinClassifier::new(bin_count)?;
		let mut estimator = AlphaValueEstimator::new(block_size, bin_count)?;
		let mut tracker = StackDistanceTracker::new();
		let mut distance_stats = Variance::new();

		// Note: We start in the past so that we output right away at the start
		let mut last_debug_time = Instant::now().checked_sub(self.debug_output_period);

		let total_records = source.records_remaining();
		let mut records_processed = 0_u64;
		while let Some(record) = source.read_next().context("Unable to read next record")? {
			// Reduce the address to its block and look up the reuse distance
			let block = record.addr & !(block_size - 1);
			let distance = tracker.observe(block);
			if let Some(distance) = distance {
				distance_stats.add(distance as f64);
			}

			let bin = classifier.classify(distance);
			estimator.record(&record, bin);
			records_processed += 1;

			// Then show debug output, if it's been long enough
			let cur_time = Instant::now();
			let debug_elapsed =
				last_debug_time.map_or(true, |last| cur_time.duration_since(last) >= self.debug_output_period);
			if debug_elapsed {
				match total_records {
					Some(total_records) => {
						let progress = 100.0 * (records_processed as f64 / total_records as f64);
						tracing::info!(
							"[{progress:.2}%] {}, mean reuse distance {:.2} ± {:.2}",
							DisplayWrapper::new(|f| estimator.fmt_debug(f)),
							distance_stats.mean(),
							distance_stats.error()
						);
					},
					None => tracing::info!(
						"{}, mean reuse distance {:.2} ± {:.2}",
						DisplayWrapper::new(|f| estimator.fmt_debug(f)),
						distance_stats.mean(),
						distance_stats.error()
					),
				}
				last_debug_time = Some(cur_time);
			}
		}

		if records_processed == 0 {
			tracing::warn!("Trace source yielded no accesses, profile will be empty");
		}

		Ok(estimator.finish())
	}
}

#[cfg(test)]
mod tests {
	// Imports
	use {
		super::*,
		crate::trace::TextTraceReader,
		std::io,
	};

	/// Runs the profiler over a text trace
	fn profile_text(trace: &str, block_size: u64, bin_count: usize) -> Profile {
		let mut reader = TextTraceReader::new(io::Cursor::new(trace.to_owned()));
		Profiler::new(Duration::from_secs(3600))
			.run(&mut reader, block_size, bin_count)
			.expect("Unable to profile trace")
	}

	#[test]
	fn alternating_blocks() {
		// A,B,A,B,...: every access after the first two has reuse distance 1
		let trace = "r,0x0\nr,0x40\n".repeat(5);
		let profile = profile_text(&trace, 64, 3);

		profile.validate().expect("Profile should be valid");
		assert_eq!(profile.total_accesses, 10);
		assert_eq!(profile.bins[0].frequency, 0.0);
		assert!((profile.bins[1].frequency - 0.8).abs() < 1e-9);
		assert!((profile.bins[2].frequency - 0.2).abs() < 1e-9);
	}

	#[test]
	fn never_repeating_blocks() {
		let trace = (0..20)
			.map(|idx| format!("r,0x{:x}\n", idx * 0x40))
			.collect::<String>();
		let profile = profile_text(&trace, 64, 3);

		profile.validate().expect("Profile should be valid");
		assert_eq!(profile.bins[0].frequency, 0.0);
		assert_eq!(profile.bins[1].frequency, 0.0);
		assert_eq!(profile.bins[2].frequency, 1.0);
	}

	#[test]
	fn empty_trace_is_valid() {
		let profile = profile_text("", 64, 3);

		profile.validate().expect("Empty profile should be valid");
		assert_eq!(profile.total_accesses, 0);
		assert!(profile.bins.iter().all(|bin| bin.frequency == 0.0));
	}

	#[test]
	fn trace_shorter_than_bin_count() {
		let profile = profile_text("r,0x0\n", 64, 3);

		profile.validate().expect("Profile should be valid");
		assert_eq!(profile.total_accesses, 1);
		assert_eq!(profile.bins[2].frequency, 1.0);
	}

	#[test]
	fn offset_distribution() {
		// One cold access at offset 0, then re-references at offset 4
		let trace = "r,0x0\nr,0x4\nr,0x4\nr,0x4\n";
		let profile = profile_text(trace, 64, 3);

		// First access is cold, rest hit bin 0
		assert!((profile.bins[2].offsets[0] - 1.0).abs() < 1e-9);
		assert!((profile.bins[0].offsets[4] - 1.0).abs() < 1e-9);
	}

	#[test]
	fn kind_mix() {
		let trace = "r,0x0\nw,0x0\nw,0x0\ni,0x0\n";
		let profile = profile_text(trace, 64, 3);

		// Accesses after the cold one: w,w,i in bin 0
		let kinds = profile.bins[0].kinds;
		assert!((kinds[0] - 0.0).abs() < 1e-9);
		assert!((kinds[1] - 2.0 / 3.0).abs() < 1e-9);
		assert!((kinds[2] - 1.0 / 3.0).abs() < 1e-9);
	}

	#[test]
	fn activity_model() {
		// Access, idle, access, idle, access: strict alternation
		let trace = "r,0x0\n-\nr,0x0\n-\nr,0x0\n";
		let profile = profile_text(trace, 64, 3);

		assert_eq!(profile.activity.rows[0], [0.0, 1.0]);
		assert_eq!(profile.activity.rows[1], [1.0, 0.0]);
	}

	#[test]
	fn block_size_one_is_valid() {
		let profile = profile_text("r,0x0\nr,0x0\n", 1, 3);

		profile.validate().expect("Profile should be valid");
		assert_eq!(profile.bins[0].offsets, vec![1.0]);
	}

	#[test]
	fn invalid_config_rejected() {
		assert!(AlphaValueEstimator::new(0, 3).is_err());
		assert!(AlphaValueEstimator::new(7, 3).is_err());
		assert!(AlphaValueEstimator::new(64, 0).is_err());
	}
}
