//! Biased coin.

use rand::{Rng, RngCore};

use super::Distribution;
use crate::engine::errors::ExecError;

/// Boolean distribution that yields `true` with probability `p`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bernoulli {
    p: f64,
    log_p: f64,
    log_q: f64,
}

impl Bernoulli {
    /// Creates a coin with success probability `p`, which must lie in `[0, 1]`.
    pub fn new(p: f64) -> Result<Self, ExecError> {
        if !(0.0..=1.0).contains(&p) {
            return Err(ExecError::ValidationError(format!(
                "Bernoulli: probability p must be in [0, 1], got {}",
                p
            )));
        }
        Ok(Self {
            p,
            log_p: p.ln(),
            log_q: (1.0 - p).ln(),
        })
    }

    /// Success probability.
    pub fn p(&self) -> f64 {
        self.p
    }
}

impl Distribution for Bernoulli {
    type Value = bool;

    fn sample(&self, rng: &mut dyn RngCore) -> bool {
        rng.gen_bool(self.p)
    }

    fn log_likelihood(&self, value: &bool) -> f64 {
        if *value {
            self.log_p
        } else {
            self.log_q
        }
    }

    fn support(&self) -> Option<Vec<bool>> {
        Some(vec![true, false])
    }

    fn name(&self) -> &'static str {
        "Bernoulli"
    }
}
