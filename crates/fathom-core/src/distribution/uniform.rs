//! Continuous uniform distribution over a closed interval.

use rand::{Rng, RngCore};

use super::Distribution;
use crate::engine::errors::ExecError;

/// Uniform density on `[low, high]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Uniform {
    low: f64,
    high: f64,
    log_density: f64,
}

impl Uniform {
    /// Creates a uniform distribution; bounds must be finite with `low < high`.
    pub fn new(low: f64, high: f64) -> Result<Self, ExecError> {
        if !low.is_finite() || !high.is_finite() || !(low < high) {
            return Err(ExecError::ValidationError(format!(
                "Uniform: expected finite bounds with low < high, got [{}, {}]",
                low, high
            )));
        }
        Ok(Self {
            low,
            high,
            log_density: -(high - low).ln(),
        })
    }

    pub fn low(&self) -> f64 {
        self.low
    }

    pub fn high(&self) -> f64 {
        self.high
    }
}

impl Distribution for Uniform {
    type Value = f64;

    fn sample(&self, rng: &mut dyn RngCore) -> f64 {
        self.low + rng.gen::<f64>() * (self.high - self.low)
    }

    fn log_likelihood(&self, value: &f64) -> f64 {
        if (self.low..=self.high).contains(value) {
            self.log_density
        } else {
            f64::NEG_INFINITY
        }
    }

    fn name(&self) -> &'static str {
        "Uniform"
    }
}
