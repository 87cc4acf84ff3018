//! Finite categorical distribution over arbitrary values.
//!
//! Weights are normalized at construction. Values keep the order in which they
//! were supplied; that order is the support order used by the exhaustive
//! strategies. Supplying the same value twice merges the two weights.
//! Construction and lookups go through a hash index of the values.

use std::hash::Hash;
use std::ops::RangeInclusive;
use std::rc::Rc;

use rand::distributions::{Distribution as _, WeightedIndex};
use rand::RngCore;
use rustc_hash::FxHashMap;

use super::Distribution;
use crate::engine::errors::ExecError;

#[derive(Debug)]
struct CategoricalTable<T> {
    values: Vec<T>,
    positions: FxHashMap<T, usize>,
    probabilities: Vec<f64>,
    log_probabilities: Vec<f64>,
    index: WeightedIndex<f64>,
}

/// Categorical distribution with explicit, normalized value probabilities.
///
/// Cloning is cheap: the table is shared behind an `Rc`.
#[derive(Debug, Clone)]
pub struct Categorical<T> {
    table: Rc<CategoricalTable<T>>,
}

impl<T: Clone + Eq + Hash + 'static> Categorical<T> {
    /// Builds a categorical distribution from `(value, weight)` pairs.
    ///
    /// Fails when no value is given, when a weight is negative or not finite,
    /// or when all weights are zero.
    pub fn new(weighted: impl IntoIterator<Item = (T, f64)>) -> Result<Self, ExecError> {
        let mut values: Vec<T> = Vec::new();
        let mut weights: Vec<f64> = Vec::new();
        let mut positions: FxHashMap<T, usize> = FxHashMap::default();
        for (value, weight) in weighted {
            if !weight.is_finite() || weight < 0.0 {
                return Err(ExecError::ValidationError(format!(
                    "Categorical: weights must be finite and non-negative, got {}",
                    weight
                )));
            }
            match positions.get(&value) {
                Some(&i) => weights[i] += weight,
                None => {
                    positions.insert(value.clone(), values.len());
                    values.push(value);
                    weights.push(weight);
                }
            }
        }
        if values.is_empty() {
            return Err(ExecError::ValidationError(
                "Categorical: at least one value is required".into(),
            ));
        }
        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            return Err(ExecError::ValidationError(
                "Categorical: at least one weight must be positive".into(),
            ));
        }

        let probabilities: Vec<f64> = weights.iter().map(|w| w / total).collect();
        let log_probabilities = probabilities.iter().map(|p| p.ln()).collect();
        let index = WeightedIndex::new(&probabilities)
            .map_err(|e| ExecError::ValidationError(format!("Categorical: {}", e)))?;

        Ok(Self {
            table: Rc::new(CategoricalTable {
                values,
                positions,
                probabilities,
                log_probabilities,
                index,
            }),
        })
    }

    /// Builds a categorical distribution weighting each value with `weight(value)`.
    pub fn from_fn(
        values: impl IntoIterator<Item = T>,
        weight: impl Fn(&T) -> f64,
    ) -> Result<Self, ExecError> {
        Self::new(values.into_iter().map(|v| {
            let w = weight(&v);
            (v, w)
        }))
    }

    /// Equal probability for every value.
    pub fn uniform(values: impl IntoIterator<Item = T>) -> Result<Self, ExecError> {
        Self::from_fn(values, |_| 1.0)
    }

    /// Values in support order.
    pub fn values(&self) -> &[T] {
        &self.table.values
    }

    /// Normalized probabilities, aligned with [`values`](Self::values).
    pub fn probabilities(&self) -> &[f64] {
        &self.table.probabilities
    }

    /// Probability of `value`; zero for values outside the support.
    pub fn probability(&self, value: &T) -> f64 {
        self.position(value)
            .map(|i| self.table.probabilities[i])
            .unwrap_or(0.0)
    }

    fn position(&self, value: &T) -> Option<usize> {
        self.table.positions.get(value).copied()
    }
}

impl<T: Clone + Eq + Hash + 'static> Distribution for Categorical<T> {
    type Value = T;

    fn sample(&self, rng: &mut dyn RngCore) -> T {
        let i = self.table.index.sample(rng);
        self.table.values[i].clone()
    }

    fn log_likelihood(&self, value: &T) -> f64 {
        self.position(value)
            .map(|i| self.table.log_probabilities[i])
            .unwrap_or(f64::NEG_INFINITY)
    }

    fn support(&self) -> Option<Vec<T>> {
        Some(self.table.values.clone())
    }

    fn name(&self) -> &'static str {
        "Categorical"
    }
}

/// Uniform distribution over the integers of `range` (a fair die for `1..=6`).
pub fn uniform_int(range: RangeInclusive<i64>) -> Result<Categorical<i64>, ExecError> {
    if range.is_empty() {
        return Err(ExecError::ValidationError(format!(
            "uniform_int: range {}..={} is empty",
            range.start(),
            range.end()
        )));
    }
    Categorical::uniform(range)
}
