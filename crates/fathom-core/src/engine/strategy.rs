//! The pluggable inference strategy interface.

use crate::engine::context::{Context, Continuation, PathState, SampleSite};
use crate::engine::errors::ExecError;

/// An inference algorithm driving a program's execution.
///
/// The engine calls back into the strategy at every suspension and at every
/// completion. A strategy decides which continuations to resume, how many
/// times, and when: immediately (depth-first), later from its own queue, or
/// never (abandoning the branch). Callbacks may resume continuations through
/// the [`Context`], which re-enters the strategy for the next event.
///
/// After the run the strategy is consumed by [`into_result`](Self::into_result).
pub trait InferenceStrategy<T>: Sized {
    /// Summary produced by this strategy.
    type Output;

    /// Called once with the program's root continuation. Resumes it by default.
    fn on_start(&mut self, cx: &mut Context, root: Continuation<T>) -> Result<(), ExecError> {
        cx.resume(self, root)
    }

    /// The program returned `value` along a path with state `path`.
    fn on_complete(&mut self, value: T, path: PathState) -> Result<(), ExecError>;

    /// The program reached a `factor`/`observe` with log-weight `weight`.
    ///
    /// `k.path()` is the path state *before* the weight. The default applies the
    /// weight and resumes once.
    fn on_factor(
        &mut self,
        cx: &mut Context,
        k: Continuation<T>,
        weight: f64,
    ) -> Result<(), ExecError> {
        cx.resume(self, k.weighted(weight))
    }

    /// The program reached a `sample`.
    fn on_sample(&mut self, cx: &mut Context, site: SampleSite<T>) -> Result<(), ExecError>;

    /// Consumes the strategy, returning its accumulated result.
    fn into_result(self) -> Self::Output;
}
