//! Best-first enumeration through a global priority queue.
//!
//! Same completion, pruning, path-cap and result semantics as
//! [`Enumerate`], but instead of recursing into alternatives as soon as they
//! are produced, every alternative is pushed onto one priority queue shared by
//! the whole run, keyed by its posterior so far (path state at the sample point
//! plus the alternative's log-likelihood). The queue is then drained highest
//! posterior first. Since a path's posterior can only decrease as it proceeds,
//! complete paths are reached in non-increasing order of probability,
//! regardless of program structure.
//!
//! Nested sample points reached while draining only enqueue; a single drain
//! loop per run pops the global maximum each time.
//!
//! The queue is global across all nesting depths, so in large search spaces
//! deep branches with modest posteriors can wait behind many shallow ones.
//! There is no beam limit; only the path cap bounds the work.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::hash::Hash;

use crate::engine::context::{Context, Continuation, PathState, SampleSite};
use crate::engine::enumerate::Enumerate;
use crate::engine::errors::ExecError;
use crate::engine::program::Thunk;
use crate::engine::strategy::InferenceStrategy;
use crate::probability::Posterior;

/// An alternative waiting in the queue.
struct QueuedBranch<T> {
    /// Path state at the sample point that produced this alternative.
    snapshot: PathState,
    entry_log_likelihood: f64,
    resume: Thunk<T>,
    /// Insertion order; earlier entries win ties.
    sequence: u64,
}

impl<T> QueuedBranch<T> {
    fn posterior(&self) -> f64 {
        self.snapshot.log_probability() + self.entry_log_likelihood
    }
}

impl<T> PartialEq for QueuedBranch<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T> Eq for QueuedBranch<T> {}

impl<T> PartialOrd for QueuedBranch<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for QueuedBranch<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.posterior()
            .total_cmp(&other.posterior())
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

/// Exact posterior, exploring complete paths in best-first order.
pub struct WeightedQueue<T> {
    inner: Enumerate<T>,
    queue: BinaryHeap<QueuedBranch<T>>,
    next_sequence: u64,
    draining: bool,
}

impl<T: Eq + Hash> Default for WeightedQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Eq + Hash> WeightedQueue<T> {
    pub fn new() -> Self {
        Self::from_enumerate(Enumerate::new())
    }

    /// Stops resuming alternatives once `limit` paths have completed.
    pub fn with_limit(limit: usize) -> Result<Self, ExecError> {
        Enumerate::with_limit(limit).map(Self::from_enumerate)
    }

    fn from_enumerate(inner: Enumerate<T>) -> Self {
        Self {
            inner,
            queue: BinaryHeap::new(),
            next_sequence: 0,
            draining: false,
        }
    }

    pub fn explored_paths(&self) -> usize {
        self.inner.explored_paths()
    }

    fn enqueue(&mut self, snapshot: PathState, entry_log_likelihood: f64, resume: Thunk<T>) {
        self.queue.push(QueuedBranch {
            snapshot,
            entry_log_likelihood,
            resume,
            sequence: self.next_sequence,
        });
        self.next_sequence += 1;
    }

    fn drain(&mut self, cx: &mut Context) -> Result<(), ExecError> {
        if self.draining {
            return Ok(());
        }
        self.draining = true;
        let outcome = self.drain_queue(cx);
        self.draining = false;
        outcome
    }

    fn drain_queue(&mut self, cx: &mut Context) -> Result<(), ExecError> {
        #[cfg(feature = "tracing")]
        tracing::debug!(queued = self.queue.len(), "draining weighted queue");

        while let Some(branch) = self.queue.pop() {
            if self.inner.limit_reached() {
                cx.abandon(branch.snapshot, "explored path limit reached");
                continue;
            }
            let k = Continuation::new(branch.snapshot, branch.resume)
                .weighted(branch.entry_log_likelihood);
            cx.resume(self, k)?;
        }
        Ok(())
    }
}

impl<T: Eq + Hash> InferenceStrategy<T> for WeightedQueue<T> {
    type Output = Posterior<T>;

    fn on_complete(&mut self, value: T, path: PathState) -> Result<(), ExecError> {
        self.inner.record(value, path);
        Ok(())
    }

    fn on_factor(
        &mut self,
        cx: &mut Context,
        k: Continuation<T>,
        weight: f64,
    ) -> Result<(), ExecError> {
        if !Enumerate::<T>::admits(k.path(), weight) {
            cx.abandon(k.path(), "evidence rejected path");
            return Ok(());
        }
        cx.resume(self, k.weighted(weight))
    }

    fn on_sample(&mut self, cx: &mut Context, site: SampleSite<T>) -> Result<(), ExecError> {
        let snapshot = site.path();
        for choice in site.choices("WeightedQueue")? {
            self.enqueue(snapshot, choice.log_likelihood, choice.resume);
        }
        self.drain(cx)
    }

    fn into_result(self) -> Posterior<T> {
        self.inner.into_result()
    }
}
