//! The shared random generator.
//!
//! Every random draw made by the engine (sampling strategies, resampling)
//! goes through [`with_rng`]. The generator is thread-local: the engine is
//! single-threaded and never hands the generator across threads. It is seeded
//! lazily from [`EngineConfig::from_env`], so a fixed `FATHOM_SEED` plus a
//! fixed strategy reproduces a run exactly.

use std::cell::RefCell;

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use crate::config::EngineConfig;

thread_local! {
    static RNG: RefCell<StdRng> = RefCell::new(seeded(EngineConfig::from_env().seed));
}

fn seeded(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Runs `f` with exclusive access to this thread's generator.
///
/// `f` must not call back into `with_rng`.
pub fn with_rng<R>(f: impl FnOnce(&mut dyn RngCore) -> R) -> R {
    RNG.with(|rng| f(&mut *rng.borrow_mut()))
}

/// Replaces this thread's generator; `None` re-seeds from OS entropy.
pub fn reseed(seed: Option<u64>) {
    RNG.with(|rng| *rng.borrow_mut() = seeded(seed));
}

/// Re-seeds this thread's generator from a configuration.
pub fn configure(config: &EngineConfig) {
    reseed(config.seed);
}
