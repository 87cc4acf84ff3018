//! Exhaustive depth-first enumeration.
//!
//! Every sample point must draw from a finite distribution. Each support value
//! is explored in support order by resuming the continuation recursively, so
//! the search is depth-first and exact: the result is the normalized posterior
//! over program results.
//!
//! An optional cap on explored paths stops trying new alternatives once that
//! many paths have completed. The truncation is deterministic but depends on
//! support order; it is not a representative subsample.

use std::hash::Hash;

use rustc_hash::FxHashMap;

use crate::engine::context::{Context, Continuation, PathState, SampleSite};
use crate::engine::errors::ExecError;
use crate::engine::program::Program;
use crate::engine::strategy::InferenceStrategy;
use crate::probability::{normalize, Posterior};

/// Exact posterior by exhaustive depth-first search.
#[derive(Debug, Clone)]
pub struct Enumerate<T> {
    limit_explored_paths: Option<usize>,
    explored_paths: usize,
    outcome_weights: FxHashMap<T, f64>,
}

impl<T: Eq + Hash> Default for Enumerate<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Eq + Hash> Enumerate<T> {
    /// Enumerates every path.
    pub fn new() -> Self {
        Self {
            limit_explored_paths: None,
            explored_paths: 0,
            outcome_weights: FxHashMap::default(),
        }
    }

    /// Stops trying alternatives once `limit` paths have completed.
    pub fn with_limit(limit: usize) -> Result<Self, ExecError> {
        if limit == 0 {
            return Err(ExecError::ValidationError(
                "Enumerate: limit_explored_paths must be positive".into(),
            ));
        }
        Ok(Self {
            limit_explored_paths: Some(limit),
            ..Self::new()
        })
    }

    /// Number of completed paths so far.
    pub fn explored_paths(&self) -> usize {
        self.explored_paths
    }

    pub fn limit_explored_paths(&self) -> Option<usize> {
        self.limit_explored_paths
    }

    /// Whether the path cap has been reached.
    pub fn limit_reached(&self) -> bool {
        self.limit_explored_paths
            .is_some_and(|limit| self.explored_paths >= limit)
    }

    /// Unnormalized accumulated weight per result.
    pub fn outcome_weights(&self) -> &FxHashMap<T, f64> {
        &self.outcome_weights
    }

    pub(crate) fn record(&mut self, value: T, path: PathState) {
        self.explored_paths += 1;
        *self.outcome_weights.entry(value).or_insert(0.0) += path.probability();
    }

    /// Whether a factor of `weight` at `path` leaves the path possible.
    pub(crate) fn admits(path: PathState, weight: f64) -> bool {
        !path.weighted(weight).is_impossible()
    }
}

impl<T: Eq + Hash> InferenceStrategy<T> for Enumerate<T> {
    type Output = Posterior<T>;

    fn on_complete(&mut self, value: T, path: PathState) -> Result<(), ExecError> {
        self.record(value, path);
        Ok(())
    }

    fn on_factor(
        &mut self,
        cx: &mut Context,
        k: Continuation<T>,
        weight: f64,
    ) -> Result<(), ExecError> {
        if !Self::admits(k.path(), weight) {
            cx.abandon(k.path(), "evidence rejected path");
            return Ok(());
        }
        cx.resume(self, k.weighted(weight))
    }

    fn on_sample(&mut self, cx: &mut Context, site: SampleSite<T>) -> Result<(), ExecError> {
        for choice in site.choices("Enumerate")? {
            if self.limit_reached() {
                cx.abandon(site.path(), "explored path limit reached");
                break;
            }
            cx.resume(self, choice.weighted_from(site.path()))?;
        }
        Ok(())
    }

    fn into_result(self) -> Posterior<T> {
        normalize(self.outcome_weights)
    }
}

impl<T: Eq + Hash + 'static> Program<T> {
    /// Exact posterior over this program's results, exploring every path.
    pub fn enumerate(&self) -> Result<Posterior<T>, ExecError> {
        self.infer(Enumerate::new())
    }
}
