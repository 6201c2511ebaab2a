//! Application profile

/// Tolerance when checking that a distribution is normalized
pub const NORM_TOLERANCE: f64 = 1e-6;

/// Application profile.
///
/// The statistical summary of one application's memory-access locality at a
/// given block size. Produced once by the estimator, immutable afterwards;
/// mixing and synthesis only ever read it.
#[derive(Clone, Debug, PartialEq)]
#[derive(serde::Serialize, serde::Deserialize)]
#[derive(bincode::Encode, bincode::Decode)]
pub struct Profile {
	/// Block size used for reuse tracking, in bytes
	pub block_size: u64,

	/// Number of reuse bins
	pub bin_count: usize,

	/// Total accesses observed
	pub total_accesses: u64,

	/// Per-bin alpha values
	pub bins: Vec<AlphaValues>,

	/// Cycle activity model
	pub activity: ActivityModel,
}

impl Profile {
	/// Validates this profile's invariants.
	///
	/// # Errors
	/// Returns an error naming the offending bin if any distribution
	/// fails to normalize or any dimension is inconsistent.
	pub fn validate(&self) -> Result<(), anyhow::Error> {
		anyhow::ensure!(
			self.block_size.is_power_of_two(),
			"Block size must be a power of two, found {}",
			self.block_size
		);
		anyhow::ensure!(self.bin_count > 0, "Bin count must be positive");
		anyhow::ensure!(
			self.bins.len() == self.bin_count,
			"Expected {} bins, found {}",
			self.bin_count,
			self.bins.len()
		);

		let freq_total = self.bins.iter().map(|bin| bin.frequency).sum::<f64>();
		match self.total_accesses {
			0 => anyhow::ensure!(
				freq_total.abs() <= NORM_TOLERANCE,
				"Empty profile has non-zero bin frequencies (sum {freq_total})"
			),
			_ => anyhow::ensure!(
				(freq_total - 1.0).abs() <= NORM_TOLERANCE,
				"Bin frequencies sum to {freq_total}, expected 1"
			),
		}

		for (bin_idx, bin) in self.bins.iter().enumerate() {
			anyhow::ensure!(
				bin.offsets.len() == self.block_size as usize,
				"Bin {bin_idx}: expected {} offset entries, found {}",
				self.block_size,
				bin.offsets.len()
			);
			anyhow::ensure!(bin.frequency >= 0.0, "Bin {bin_idx}: negative frequency");

			// Distributions of unobserved bins stay all-zero
			if bin.frequency > 0.0 {
				let offset_total = bin.offsets.iter().sum::<f64>();
				anyhow::ensure!(
					(offset_total - 1.0).abs() <= NORM_TOLERANCE,
					"Bin {bin_idx}: offset distribution sums to {offset_total}, expected 1"
				);

				let kind_total = bin.kinds.iter().sum::<f64>();
				anyhow::ensure!(
					(kind_total - 1.0).abs() <= NORM_TOLERANCE,
					"Bin {bin_idx}: access kind distribution sums to {kind_total}, expected 1"
				);
			}
		}

		for (state, row) in self.activity.rows.iter().enumerate() {
			let row_total = row.iter().sum::<f64>();
			anyhow::ensure!(
				(row_total - 1.0).abs() <= NORM_TOLERANCE && row.iter().all(|&p| p >= 0.0),
				"Activity row {state} is not a probability distribution (sum {row_total})"
			);
		}

		Ok(())
	}
}

/// Per-bin alpha values.
///
/// The fitted locality parameters for one reuse bin: how often the bin is
/// hit, where within the block its accesses land, and their read/write/fetch
/// mix. Kept as empirical distributions so the parameterization can be
/// swapped without touching the rest of the pipeline.
#[derive(Clone, Debug, PartialEq)]
#[derive(serde::Serialize, serde::Deserialize)]
#[derive(bincode::Encode, bincode::Decode)]
pub struct AlphaValues {
	/// Relative frequency of this bin against all bins
	pub frequency: f64,

	/// Intra-block offset distribution over `[0, block_size)`
	pub offsets: Vec<f64>,

	/// Access kind distribution, indexed by [`AccessKind::index`](crate::trace::AccessKind::index)
	pub kinds: [f64; 3],
}

impl AlphaValues {
	/// Creates all-zero alpha values for `block_size`
	pub fn zeroed(block_size: u64) -> Self {
		Self {
			frequency: 0.0,
			offsets:   vec![0.0; block_size as usize],
			kinds:     [0.0; 3],
		}
	}
}

/// Cycle activity model.
///
/// A two-state markov chain over per-cycle activity: `rows[s][a]` is the
/// probability of the next cycle being active (`a = 1`) or inactive
/// (`a = 0`) given the previous cycle's state `s`.
#[derive(Clone, Copy, Debug, PartialEq)]
#[derive(serde::Serialize, serde::Deserialize)]
#[derive(bincode::Encode, bincode::Decode)]
pub struct ActivityModel {
	/// Row-normalized transition matrix
	pub rows: [[f64; 2]; 2],
}

impl ActivityModel {
	/// The model of a trace that is active on every cycle
	pub fn always_active() -> Self {
		Self {
			rows: [[0.0, 1.0], [0.0, 1.0]],
		}
	}
}
