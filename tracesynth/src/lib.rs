//! Memory-trace characterization and synthesis (`tracesynth`)
//!
//! Characterizes the memory-access locality of an application from a recorded
//! address trace into a compact [`Profile`], and synthesizes new traces of
//! arbitrary length that statistically reproduce the profiled behavior.

// Modules
pub mod bins;
pub mod estimator;
pub mod formats;
pub mod mix;
pub mod profile;
pub mod stack;
pub mod store;
pub mod synth;
pub mod trace;

// Exports
pub use self::{
	bins::ReuseBinClassifier,
	estimator::{AlphaValueEstimator, Profiler},
	formats::OutputFormat,
	mix::WeightedProfileSet,
	profile::{ActivityModel, AlphaValues, Profile},
	stack::StackDistanceTracker,
	synth::Synthesizer,
	trace::{AccessKind, BinTraceReader, BinTraceWriter, TextTraceReader, TraceRecord, TraceSource},
};
