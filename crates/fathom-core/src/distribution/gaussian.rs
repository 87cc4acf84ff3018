//! Normal distribution parameterized by mean and variance.

use std::f64::consts::PI;

use rand::RngCore;
use rand_distr::{Distribution as _, Normal};

use super::Distribution;
use crate::engine::errors::ExecError;

/// Gaussian `N(mean, variance)`. Continuous: it has no enumerable support.
#[derive(Debug, Clone, Copy)]
pub struct Gaussian {
    mean: f64,
    variance: f64,
    normal: Normal<f64>,
    /// `-0.5 * (ln(2π) + ln(variance))`
    log_norm: f64,
}

impl Gaussian {
    /// Creates `N(mean, variance)`. The variance must be finite and non-negative.
    pub fn new(mean: f64, variance: f64) -> Result<Self, ExecError> {
        if !mean.is_finite() {
            return Err(ExecError::ValidationError(format!(
                "Gaussian: mean must be finite, got {}",
                mean
            )));
        }
        if !(variance >= 0.0) || !variance.is_finite() {
            return Err(ExecError::ValidationError(format!(
                "Gaussian: variance must be finite and non-negative, got {}",
                variance
            )));
        }
        let normal = Normal::new(mean, variance.sqrt())
            .map_err(|e| ExecError::ValidationError(format!("Gaussian: {}", e)))?;
        Ok(Self {
            mean,
            variance,
            normal,
            log_norm: -0.5 * ((2.0 * PI).ln() + variance.ln()),
        })
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn variance(&self) -> f64 {
        self.variance
    }
}

impl Distribution for Gaussian {
    type Value = f64;

    fn sample(&self, rng: &mut dyn RngCore) -> f64 {
        self.normal.sample(rng)
    }

    fn log_likelihood(&self, value: &f64) -> f64 {
        let d = value - self.mean;
        self.log_norm - 0.5 * d * d / self.variance
    }

    fn name(&self) -> &'static str {
        "Gaussian"
    }
}
