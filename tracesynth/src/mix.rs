//! Profile mixing

// Imports
use {
	crate::profile::{ActivityModel, AlphaValues, Profile},
	itertools::izip,
};

/// A set of profiles with normalized mixing weights.
///
/// Transient: constructed right before synthesis and discarded after
/// [`combine`](Self::combine).
#[derive(Debug)]
pub struct WeightedProfileSet {
	/// Profiles with their normalized weights
	profiles: Vec<(Profile, f64)>,
}

impl WeightedProfileSet {
	/// Creates a weighted profile set.
	///
	/// Omitted weights default to uniform. Weights are normalized to sum
	/// to 1.
	///
	/// # Errors
	/// Returns an error if no profiles are given, weights don't match the
	/// profiles, weights are negative or sum to zero, or the profiles
	/// disagree on block size or bin count.
	pub fn new(profiles: Vec<Profile>, weights: Option<Vec<f64>>) -> Result<Self, anyhow::Error> {
		anyhow::ensure!(!profiles.is_empty(), "At least one profile is required");

		let weights = match weights {
			Some(weights) => {
				anyhow::ensure!(
					weights.len() == profiles.len(),
					"Expected {} weights, found {}",
					profiles.len(),
					weights.len()
				);
				anyhow::ensure!(weights.iter().all(|&weight| weight >= 0.0), "Weights must be non-negative");
				weights
			},
			None => vec![1.0; profiles.len()],
		};

		let weight_total = weights.iter().sum::<f64>();
		anyhow::ensure!(weight_total > 0.0, "Weights must sum to a positive total");

		let block_size = profiles[0].block_size;
		let bin_count = profiles[0].bin_count;
		for (profile_idx, profile) in profiles.iter().enumerate() {
			anyhow::ensure!(
				profile.block_size == block_size,
				"Profile {profile_idx} has block size {}, expected {block_size}",
				profile.block_size
			);
			anyhow::ensure!(
				profile.bin_count == bin_count,
				"Profile {profile_idx} has {} bins, expected {bin_count}",
				profile.bin_count
			);
		}

		let profiles = izip!(profiles, weights)
			.map(|(profile, weight)| (profile, weight / weight_total))
			.collect();
		Ok(Self { profiles })
	}

	/// Combines the set into one effective profile.
	///
	/// Per bin, the combined frequency is the weighted sum of the input
	/// frequencies, and the combined offset and kind distributions are the
	/// weighted mixtures of the input distributions. Mixing distributions,
	/// rather than averaging fitted parameters, preserves multi-modality
	/// across applications.
	pub fn combine(&self) -> Profile {
		let (first, _) = &self.profiles[0];

		let mut bins = vec![AlphaValues::zeroed(first.block_size); first.bin_count];
		let mut activity = ActivityModel { rows: [[0.0; 2]; 2] };
		let mut total_accesses = 0.0;

		for (profile, weight) in &self.profiles {
			total_accesses += weight * profile.total_accesses as f64;

			for (dst, src) in izip!(&mut bins, &profile.bins) {
				dst.frequency += weight * src.frequency;
				for (dst_prob, src_prob) in izip!(&mut dst.offsets, &src.offsets) {
					*dst_prob += weight * src_prob;
				}
				for (dst_prob, src_prob) in izip!(&mut dst.kinds, &src.kinds) {
					*dst_prob += weight * src_prob;
				}
			}

			for (dst_row, src_row) in izip!(&mut activity.rows, &profile.activity.rows) {
				for (dst_prob, src_prob) in izip!(dst_row, src_row) {
					*dst_prob += weight * src_prob;
				}
			}
		}

		Profile {
			block_size: first.block_size,
			bin_count: first.bin_count,
			total_accesses: total_accesses.round() as u64,
			bins,
			activity,
		}
	}
}

#[cfg(test)]
mod tests {
	// Imports
	use super::*;

	fn point_mass(block_size: u64, offset: usize) -> Vec<f64> {
		let mut offsets = vec![0.0; block_size as usize];
		offsets[offset] = 1.0;
		offsets
	}

	fn profile_with(frequencies: [f64; 3], offset: usize) -> Profile {
		let bins = frequencies
			.iter()
			.map(|&frequency| AlphaValues {
				frequency,
				offsets: match frequency > 0.0 {
					true => point_mass(64, offset),
					false => vec![0.0; 64],
				},
				kinds: match frequency > 0.0 {
					true => [1.0, 0.0, 0.0],
					false => [0.0; 3],
				},
			})
			.collect();

		Profile {
			block_size: 64,
			bin_count: 3,
			total_accesses: 100,
			bins,
			activity: ActivityModel::always_active(),
		}
	}

	fn assert_profiles_close(lhs: &Profile, rhs: &Profile) {
		assert_eq!(lhs.block_size, rhs.block_size);
		assert_eq!(lhs.bin_count, rhs.bin_count);
		assert_eq!(lhs.total_accesses, rhs.total_accesses);
		for (lhs_bin, rhs_bin) in izip!(&lhs.bins, &rhs.bins) {
			assert!((lhs_bin.frequency - rhs_bin.frequency).abs() < 1e-12);
			for (lhs_prob, rhs_prob) in izip!(&lhs_bin.offsets, &rhs_bin.offsets) {
				assert!((lhs_prob - rhs_prob).abs() < 1e-12);
			}
		}
	}

	#[test]
	fn single_profile_identity() {
		let profile = profile_with([0.0, 0.8, 0.2], 4);
		let set = WeightedProfileSet::new(vec![profile.clone()], Some(vec![1.0])).expect("Unable to create set");

		assert_profiles_close(&set.combine(), &profile);
	}

	#[test]
	fn identical_profiles_identity() {
		let profile = profile_with([0.0, 0.8, 0.2], 4);
		let set = WeightedProfileSet::new(vec![profile.clone(), profile.clone()], Some(vec![0.5, 0.5]))
			.expect("Unable to create set");

		assert_profiles_close(&set.combine(), &profile);
	}

	#[test]
	fn default_weights_are_uniform() {
		let profile = profile_with([0.0, 0.8, 0.2], 4);
		let set = WeightedProfileSet::new(vec![profile.clone(), profile.clone()], None).expect("Unable to create set");

		assert_profiles_close(&set.combine(), &profile);
	}

	#[test]
	fn mixture_preserves_multi_modality() {
		let lhs = profile_with([1.0, 0.0, 0.0], 0);
		let rhs = profile_with([1.0, 0.0, 0.0], 32);
		let set = WeightedProfileSet::new(vec![lhs, rhs], Some(vec![0.75, 0.25])).expect("Unable to create set");

		let mixed = set.combine();
		assert!((mixed.bins[0].offsets[0] - 0.75).abs() < 1e-12);
		assert!((mixed.bins[0].offsets[32] - 0.25).abs() < 1e-12);
		mixed.validate().expect("Mixed profile should be valid");
	}

	#[test]
	fn mismatched_block_size_rejected() {
		let lhs = profile_with([1.0, 0.0, 0.0], 0);
		let mut rhs = profile_with([1.0, 0.0, 0.0], 0);
		rhs.block_size = 128;
		rhs.bins.iter_mut().for_each(|bin| bin.offsets.resize(128, 0.0));

		assert!(WeightedProfileSet::new(vec![lhs, rhs], None).is_err());
	}

	#[test]
	fn mismatched_bin_count_rejected() {
		let lhs = profile_with([1.0, 0.0, 0.0], 0);
		let mut rhs = profile_with([1.0, 0.0, 0.0], 0);
		rhs.bin_count = 4;
		rhs.bins.push(AlphaValues::zeroed(64));

		assert!(WeightedProfileSet::new(vec![lhs, rhs], None).is_err());
	}

	#[test]
	fn bad_weights_rejected() {
		let profile = profile_with([1.0, 0.0, 0.0], 0);

		// Wrong count
		assert!(WeightedProfileSet::new(vec![profile.clone(), profile.clone()], Some(vec![1.0])).is_err());
		// Zero total
		assert!(WeightedProfileSet::new(vec![profile.clone()], Some(vec![0.0])).is_err());
		// Negative
		assert!(WeightedProfileSet::new(vec![profile.clone(), profile.clone()], Some(vec![2.0, -1.0])).is_err());
		// No profiles at all
		assert!(WeightedProfileSet::new(vec![], None).is_err());
	}
}
