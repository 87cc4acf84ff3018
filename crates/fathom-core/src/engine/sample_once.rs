//! Single-path ancestral sampling.
//!
//! Each run follows exactly one path: at every sample point one value is drawn
//! from the distribution's own sampler (finite or not), and the path is
//! abandoned as soon as evidence makes it impossible. Repeated independent
//! trials are obtained by running the program repeatedly.
//!
//! Callbacks never resume directly: they park the next continuation and the
//! loop in `on_start` resumes it, so the stack stays flat however many sample
//! points the path goes through.

use crate::engine::context::{Context, Continuation, PathState, SampleSite};
use crate::engine::errors::ExecError;
use crate::engine::strategy::InferenceStrategy;

/// Outcome of one [`SampleOnce`] run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SampleOnceOutcome<T> {
    /// The path completed with `value`; `likelihood` is `exp` of its path log-probability.
    Sampled { value: T, likelihood: f64 },
    /// The path was rejected by evidence.
    Impossible,
}

impl<T> SampleOnceOutcome<T> {
    pub fn is_impossible(&self) -> bool {
        matches!(self, SampleOnceOutcome::Impossible)
    }

    /// The sampled value, if any.
    pub fn value(self) -> Option<T> {
        match self {
            SampleOnceOutcome::Sampled { value, .. } => Some(value),
            SampleOnceOutcome::Impossible => None,
        }
    }
}

/// Forward sampling of a single path.
#[derive(Debug, Clone)]
pub struct SampleOnce<T> {
    outcome: SampleOnceOutcome<T>,
    pending: Option<Continuation<T>>,
}

impl<T> Default for SampleOnce<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SampleOnce<T> {
    pub fn new() -> Self {
        Self {
            outcome: SampleOnceOutcome::Impossible,
            pending: None,
        }
    }
}

impl<T> InferenceStrategy<T> for SampleOnce<T> {
    type Output = SampleOnceOutcome<T>;

    fn on_start(&mut self, cx: &mut Context, root: Continuation<T>) -> Result<(), ExecError> {
        self.pending = Some(root);
        while let Some(k) = self.pending.take() {
            cx.resume(self, k)?;
        }
        Ok(())
    }

    fn on_complete(&mut self, value: T, path: PathState) -> Result<(), ExecError> {
        self.outcome = SampleOnceOutcome::Sampled {
            value,
            likelihood: path.probability(),
        };
        Ok(())
    }

    fn on_factor(
        &mut self,
        cx: &mut Context,
        k: Continuation<T>,
        weight: f64,
    ) -> Result<(), ExecError> {
        let next = k.path().weighted(weight);
        if next.is_impossible() {
            cx.abandon(next, "evidence rejected path");
            return Ok(());
        }
        self.pending = Some(k.weighted(weight));
        Ok(())
    }

    fn on_sample(&mut self, cx: &mut Context, site: SampleSite<T>) -> Result<(), ExecError> {
        if site.path().is_impossible() {
            cx.abandon(site.path(), "sampling on an impossible path");
            return Ok(());
        }
        let choice = site.draw();
        self.pending = Some(choice.weighted_from(site.path()));
        Ok(())
    }

    fn into_result(self) -> SampleOnceOutcome<T> {
        self.outcome
    }
}
