//! Trace synthesis

// Imports
use {
	crate::{
		profile::Profile,
		stack::StackDistanceTracker,
		trace::{AccessKind, TraceRecord},
	},
	anyhow::Context,
	rand::{
		distributions::{Distribution, WeightedIndex},
		rngs::StdRng,
		Rng,
		SeedableRng,
	},
};

/// Trace synthesizer.
///
/// Drives a synthetic LRU stack forward for a requested number of accesses,
/// emitting one access per step as a lazy, pull-based iterator. Each run
/// owns its stack and random generator, so independent runs may execute in
/// parallel; a run is not resumable once dropped.
///
/// Identical seed, profile and length yield an identical output sequence.
#[derive(Debug)]
pub struct Synthesizer {
	/// Block size, in bytes
	block_size: u64,

	/// Number of reuse bins
	bin_count: usize,

	/// Bin sampling distribution
	bin_dist: WeightedIndex<f64>,

	/// Per-bin offset sampling distributions.
	///
	/// `None` for bins with zero frequency, which can never be sampled.
	offset_dists: Vec<Option<WeightedIndex<f64>>>,

	/// Per-bin access kind sampling distributions
	kind_dists: Vec<Option<WeightedIndex<f64>>>,

	/// Probability of an active cycle, by previous cycle state
	activate: [f64; 2],

	/// Synthetic LRU stack
	stack: StackDistanceTracker,

	/// Random generator
	rng: StdRng,

	/// Next brand-new block index
	next_block: u64,

	/// Current cycle
	cycle: u64,

	/// Whether the previous cycle was active
	active: bool,

	/// Accesses left to emit
	remaining: u64,
}

impl Synthesizer {
	/// Creates a synthesizer for `length` accesses from `profile`, seeded
	/// with `seed`.
	///
	/// # Errors
	/// Returns an error if the profile's bin frequencies, or the offset or
	/// kind distribution of any sampleable bin, fail to normalize. Such a
	/// profile is treated as corrupted rather than silently renormalized.
	pub fn new(profile: &Profile, length: u64, seed: u64) -> Result<Self, anyhow::Error> {
		profile.validate().context("Invalid profile")?;

		let bin_dist = WeightedIndex::new(profile.bins.iter().map(|bin| bin.frequency))
			.context("Bin frequencies do not form a sampleable distribution")?;

		let offset_dists = profile
			.bins
			.iter()
			.enumerate()
			.map(|(bin_idx, bin)| match bin.frequency > 0.0 {
				true => WeightedIndex::new(bin.offsets.iter().copied())
					.map(Some)
					.with_context(|| format!("Offset distribution of bin {bin_idx} is not sampleable")),
				false => Ok(None),
			})
			.collect::<Result<Vec<_>, _>>()?;

		let kind_dists = profile
			.bins
			.iter()
			.enumerate()
			.map(|(bin_idx, bin)| match bin.frequency > 0.0 {
				true => WeightedIndex::new(bin.kinds.iter().copied())
					.map(Some)
					.with_context(|| format!("Access kind distribution of bin {bin_idx} is not sampleable")),
				false => Ok(None),
			})
			.collect::<Result<Vec<_>, _>>()?;

		let activate = [
			profile.activity.rows[0][1].clamp(0.0, 1.0),
			profile.activity.rows[1][1].clamp(0.0, 1.0),
		];
		anyhow::ensure!(
			activate[0] > 0.0,
			"Activity model never leaves the inactive state"
		);

		Ok(Self {
			block_size: profile.block_size,
			bin_count: profile.bin_count,
			bin_dist,
			offset_dists,
			kind_dists,
			activate,
			stack: StackDistanceTracker::new(),
			rng: StdRng::seed_from_u64(seed),
			next_block: 0,
			cycle: 0,
			active: false,
			remaining: length,
		})
	}

	/// Synthesizes a brand-new block address, never seen by this stack
	fn fresh_block(&mut self) -> u64 {
		let block = self.next_block * self.block_size;
		self.next_block += 1;
		block
	}
}

impl Iterator for Synthesizer {
	type Item = TraceRecord;

	fn next(&mut self) -> Option<Self::Item> {
		if self.remaining == 0 {
			return None;
		}

		// Step through inactive cycles until the activity chain activates
		while !self.rng.gen_bool(self.activate[usize::from(self.active)]) {
			self.active = false;
			self.cycle += 1;
		}

		// Sample a reuse bin, then realize it against the synthetic stack.
		// A non-cold bin reuses the block at that exact stack position when
		// the stack is deep enough; otherwise (and for the cold bin) a
		// brand-new block is referenced. During warm-up this emits more cold
		// blocks than the steady-state frequencies target.
		let bin = self.bin_dist.sample(&mut self.rng);
		let block = match bin + 1 < self.bin_count && self.stack.depth() > bin {
			true => self.stack.get(bin).expect("Stack position was within depth"),
			false => self.fresh_block(),
		};
		self.stack.observe(block);

		let offset = self.offset_dists[bin]
			.as_ref()
			.expect("Sampled bin had no offset distribution")
			.sample(&mut self.rng) as u64;
		let kind = self.kind_dists[bin]
			.as_ref()
			.expect("Sampled bin had no kind distribution")
			.sample(&mut self.rng);
		let kind = AccessKind::from_index(kind).expect("Sampled kind index was invalid");

		let record = TraceRecord {
			cycle: self.cycle,
			addr: block | offset,
			kind,
		};

		self.cycle += 1;
		self.active = true;
		self.remaining -= 1;

		Some(record)
	}
}
