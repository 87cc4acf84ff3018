//! # Fathom Core
//!
//! Branching execution engine for small probabilistic programs.
//!
//! A [`Program`] draws values at `sample` points and weights its execution path
//! at `factor`/`observe` points. Running it under an [`InferenceStrategy`]
//! yields a summary of the program's results:
//!
//! - [`Enumerate`]: exact posterior by depth-first search
//! - [`WeightedQueue`]: exact posterior, most probable paths first
//! - [`SampleOnce`]: one forward sample with its likelihood
//! - [`ParticleFilter`]: sampled results with resampling at evidence

#![forbid(unsafe_code)]

pub mod config;
pub mod distribution;
pub mod engine;
pub mod probability;
pub mod random;

// Re-export commonly used types
pub use config::EngineConfig;
pub use distribution::{uniform_int, Bernoulli, Categorical, Distribution, Gaussian, Uniform};
pub use engine::context::{
    run, run_in_place, run_with_stats, Context, Continuation, PathState, RunStats, SampleSite,
};
pub use engine::enumerate::Enumerate;
pub use engine::errors::ExecError;
pub use engine::particle_filter::{
    DrawByDefault, EnumerateSupportOf, ParticleFilter, SamplePlan, SamplingOverride,
};
pub use engine::program::{done, factor, observe, sample, Program, Step};
pub use engine::sample_once::{SampleOnce, SampleOnceOutcome};
pub use engine::strategy::InferenceStrategy;
pub use engine::weighted_queue::WeightedQueue;
pub use probability::{normalize, normalize_counts, Posterior};
