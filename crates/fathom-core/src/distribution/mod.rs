//! Probability distributions usable at `sample` points.
//!
//! This module provides:
//! - **Distribution**: the capability trait every sampleable value implements
//! - **Bernoulli**, **Categorical**: finite distributions (enumerable support)
//! - **Gaussian**, **Uniform**: continuous distributions (sampling only)
//!
//! All constructors validate their parameters eagerly and return
//! [`ExecError::ValidationError`](crate::ExecError::ValidationError) instead of
//! clamping.

pub mod bernoulli;
pub mod categorical;
pub mod gaussian;
pub mod uniform;

use rand::RngCore;

pub use bernoulli::Bernoulli;
pub use categorical::{uniform_int, Categorical};
pub use gaussian::Gaussian;
pub use uniform::Uniform;

/// A distribution a program can draw from.
///
/// Finite distributions additionally report their support, which is required by
/// the exhaustive strategies (`Enumerate`, `WeightedQueue`). Sampling-based
/// strategies only use [`sample`](Distribution::sample).
pub trait Distribution {
    /// Type of the values produced by this distribution.
    ///
    /// Values are cloned whenever a continuation bound to them is resumed, so
    /// they should be cheap to clone.
    type Value: Clone + 'static;

    /// Draws one value using the supplied generator.
    fn sample(&self, rng: &mut dyn RngCore) -> Self::Value;

    /// Natural log of the probability (mass or density) of `value`.
    fn log_likelihood(&self, value: &Self::Value) -> f64;

    /// All values with their natural order, or `None` for non-finite distributions.
    fn support(&self) -> Option<Vec<Self::Value>> {
        None
    }

    /// Human-readable name used in errors and logs.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
