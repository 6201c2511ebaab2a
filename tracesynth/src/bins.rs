//! Reuse distance binning

/// Reuse bin classifier.
///
/// Maps stack distances onto a fixed set of ordered bins: bin `i` holds
/// distance `i` for `i < bin_count - 1`, and the last bin holds all larger
/// distances as well as cold references.
#[derive(Clone, Copy, Debug)]
pub struct ReuseBinClassifier {
	/// Number of bins
	bin_count: usize,
}

impl ReuseBinClassifier {
	/// Default bin count, modeling distances 0, 1 and ≥2 separately
	pub const DEFAULT_BIN_COUNT: usize = 3;

	/// Creates a classifier with `bin_count` bins
	pub fn new(bin_count: usize) -> Result<Self, anyhow::Error> {
		anyhow::ensure!(bin_count > 0, "Bin count must be positive, found {bin_count}");
		Ok(Self { bin_count })
	}

	/// Classifies a stack distance into a bin index.
	///
	/// Cold references (`None`) map onto the last bin.
	pub fn classify(self, distance: Option<u64>) -> usize {
		match distance {
			Some(distance) => usize::try_from(distance)
				.unwrap_or(usize::MAX)
				.min(self.bin_count - 1),
			None => self.bin_count - 1,
		}
	}

	/// Returns the number of bins
	pub fn bin_count(self) -> usize {
		self.bin_count
	}
}
