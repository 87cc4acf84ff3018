//! Execution context and the suspension protocol.
//!
//! ## Path state
//!
//! Every [`Continuation`] carries the log-probability accumulated along its own
//! path ([`PathState`]). Resuming a continuation therefore never depends on
//! shared mutable state: siblings explored from one suspension cannot see each
//! other's weights, whether they are resumed depth-first, out of order, or
//! from a queue.
//!
//! The [`Context`] still tracks the *active* path, i.e. the path of the
//! innermost resumption currently running. [`Context::resume`] saves the active
//! path, runs the continuation, and restores the saved path when it returns, so
//! nested resumptions behave like a push/pop save-stack whose depth is
//! recorded in [`RunStats::max_depth`].

use std::fmt;
use std::rc::Rc;

use crate::engine::errors::ExecError;
use crate::engine::program::{Choice, Program, Step, Suspension, Thunk};
use crate::engine::strategy::InferenceStrategy;
use crate::random::with_rng;

/// Log-probability accumulated along one execution path.
///
/// `-inf` encodes an impossible (rejected) path.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PathState {
    log_probability: f64,
}

impl PathState {
    /// The state at program start (probability one).
    pub const CERTAIN: PathState = PathState {
        log_probability: 0.0,
    };

    /// A rejected path.
    pub const IMPOSSIBLE: PathState = PathState {
        log_probability: f64::NEG_INFINITY,
    };

    pub fn new(log_probability: f64) -> Self {
        Self { log_probability }
    }

    pub fn log_probability(self) -> f64 {
        self.log_probability
    }

    /// `exp(log_probability)`.
    pub fn probability(self) -> f64 {
        self.log_probability.exp()
    }

    pub fn is_impossible(self) -> bool {
        self.log_probability == f64::NEG_INFINITY
    }

    /// The state after adding a log-weight.
    pub fn weighted(self, log_weight: f64) -> Self {
        Self {
            log_probability: self.log_probability + log_weight,
        }
    }
}

impl Default for PathState {
    fn default() -> Self {
        Self::CERTAIN
    }
}

/// A resumable "rest of the program" together with the path state it resumes with.
///
/// Continuations are cheap to clone and may be resumed any number of times;
/// each resumption runs independently.
pub struct Continuation<T> {
    path: PathState,
    resume: Thunk<T>,
}

impl<T> Clone for Continuation<T> {
    fn clone(&self) -> Self {
        Self {
            path: self.path,
            resume: Rc::clone(&self.resume),
        }
    }
}

impl<T> fmt::Debug for Continuation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Continuation")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl<T> Continuation<T> {
    pub(crate) fn new(path: PathState, resume: Thunk<T>) -> Self {
        Self { path, resume }
    }

    /// Path state the continuation resumes with.
    pub fn path(&self) -> PathState {
        self.path
    }

    /// Same continuation, resuming with `log_weight` added to its path.
    pub fn weighted(self, log_weight: f64) -> Self {
        Self {
            path: self.path.weighted(log_weight),
            resume: self.resume,
        }
    }

    /// Same continuation, resuming with a different path state.
    pub fn with_path(self, path: PathState) -> Self {
        Self {
            path,
            resume: self.resume,
        }
    }
}

impl<T> Choice<T> {
    /// Continuation resuming with this value, with its log-likelihood added to `from`.
    pub fn weighted_from(&self, from: PathState) -> Continuation<T> {
        Continuation::new(from.weighted(self.log_likelihood), Rc::clone(&self.resume))
    }

    /// Continuation resuming with this value at `path`, ignoring its likelihood.
    pub fn at(&self, path: PathState) -> Continuation<T> {
        Continuation::new(path, Rc::clone(&self.resume))
    }
}

/// A program suspended at `sample`, as handed to [`InferenceStrategy::on_sample`].
pub struct SampleSite<T> {
    path: PathState,
    suspension: Box<dyn Suspension<T>>,
}

impl<T> SampleSite<T> {
    /// Path state at the sample point (before any value is chosen).
    pub fn path(&self) -> PathState {
        self.path
    }

    /// One choice per support value, in support order.
    ///
    /// Fails with [`ExecError::Usage`] when the distribution is not finite;
    /// `strategy` names the caller in the message.
    pub fn choices(&self, strategy: &str) -> Result<Vec<Choice<T>>, ExecError> {
        self.suspension.choices().ok_or_else(|| {
            ExecError::Usage(format!(
                "{} requires a finite distribution at every sample point, got {}",
                strategy,
                self.suspension.distribution_name()
            ))
        })
    }

    /// Support choices if the distribution is finite.
    pub fn try_choices(&self) -> Option<Vec<Choice<T>>> {
        self.suspension.choices()
    }

    /// One random choice from the shared generator.
    pub fn draw(&self) -> Choice<T> {
        with_rng(|rng| self.suspension.draw(rng))
    }

    /// Binds a caller-supplied value.
    ///
    /// Fails with [`ExecError::Usage`] when `value` is not of the sampled
    /// distribution's value type.
    pub fn bind(
        &self,
        value: &dyn std::any::Any,
        strategy: &str,
    ) -> Result<Choice<T>, ExecError> {
        self.suspension.bind_value(value).ok_or_else(|| {
            ExecError::Usage(format!(
                "{} supplied a value of the wrong type for {}",
                strategy,
                self.suspension.distribution_name()
            ))
        })
    }

    /// The sampled distribution, for downcasting.
    pub fn distribution(&self) -> &dyn std::any::Any {
        self.suspension.distribution()
    }

    pub fn distribution_name(&self) -> &'static str {
        self.suspension.distribution_name()
    }
}

/// Counters collected during one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RunStats {
    /// Continuations resumed (including the root).
    pub resumptions: usize,
    /// Suspensions at `sample`.
    pub sample_points: usize,
    /// Suspensions at `factor`/`observe`.
    pub factor_points: usize,
    /// Paths that reached the end of the program.
    pub completions: usize,
    /// Branches a strategy declined to resume.
    pub abandoned: usize,
    /// Deepest nesting of resumptions.
    pub max_depth: usize,
}

/// Execution context of one run.
#[derive(Debug, Default)]
pub struct Context {
    active: PathState,
    depth: usize,
    stats: RunStats,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Path state of the innermost running resumption.
    pub fn active_path(&self) -> PathState {
        self.active
    }

    /// Current resumption nesting depth.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn stats(&self) -> RunStats {
        self.stats
    }

    /// Runs `continuation` until the program suspends again or completes,
    /// dispatching the resulting event to `strategy`.
    ///
    /// The strategy callbacks may call `resume` again (re-entrantly); the
    /// active path is restored when this call returns.
    pub fn resume<T, S>(
        &mut self,
        strategy: &mut S,
        continuation: Continuation<T>,
    ) -> Result<(), ExecError>
    where
        S: InferenceStrategy<T>,
    {
        let saved = std::mem::replace(&mut self.active, continuation.path);
        self.depth += 1;
        self.stats.resumptions += 1;
        self.stats.max_depth = self.stats.max_depth.max(self.depth);

        let outcome = self.dispatch(strategy, continuation);

        self.depth -= 1;
        self.active = saved;
        outcome
    }

    fn dispatch<T, S>(
        &mut self,
        strategy: &mut S,
        continuation: Continuation<T>,
    ) -> Result<(), ExecError>
    where
        S: InferenceStrategy<T>,
    {
        let path = continuation.path;
        match (continuation.resume)() {
            Step::Done(value) => {
                self.stats.completions += 1;
                strategy.on_complete(value, path)
            }
            Step::Factor(point) => {
                self.stats.factor_points += 1;
                let weight = (point.weight)();
                strategy.on_factor(self, Continuation::new(path, point.resume), weight)
            }
            Step::Sample(suspension) => {
                self.stats.sample_points += 1;
                strategy.on_sample(self, SampleSite { path, suspension })
            }
        }
    }

    /// Records that a strategy permanently dropped a branch at `path`.
    pub fn abandon(&mut self, path: PathState, reason: &'static str) {
        self.stats.abandoned += 1;
        #[cfg(feature = "tracing")]
        tracing::trace!(
            log_probability = path.log_probability(),
            reason,
            "branch abandoned"
        );
        #[cfg(not(feature = "tracing"))]
        let _ = (path, reason);
    }
}

/// Runs `program` under `strategy` and returns the strategy's result.
pub fn run<T, S>(program: &Program<T>, strategy: S) -> Result<S::Output, ExecError>
where
    T: 'static,
    S: InferenceStrategy<T>,
{
    run_with_stats(program, strategy).map(|(output, _)| output)
}

/// Like [`run`], also returning the run's counters.
pub fn run_with_stats<T, S>(
    program: &Program<T>,
    mut strategy: S,
) -> Result<(S::Output, RunStats), ExecError>
where
    T: 'static,
    S: InferenceStrategy<T>,
{
    let stats = run_in_place(program, &mut strategy)?;
    Ok((strategy.into_result(), stats))
}

/// Runs `program` under a borrowed `strategy`, leaving it available for
/// inspection before [`InferenceStrategy::into_result`] is called.
pub fn run_in_place<T, S>(program: &Program<T>, strategy: &mut S) -> Result<RunStats, ExecError>
where
    T: 'static,
    S: InferenceStrategy<T>,
{
    let mut cx = Context::new();
    let root = Continuation::new(PathState::CERTAIN, program.entry());

    #[cfg(feature = "tracing")]
    tracing::debug!(strategy = std::any::type_name::<S>(), "run started");

    strategy.on_start(&mut cx, root)?;

    let stats = cx.stats();
    #[cfg(feature = "tracing")]
    tracing::debug!(
        resumptions = stats.resumptions,
        sample_points = stats.sample_points,
        factor_points = stats.factor_points,
        completions = stats.completions,
        abandoned = stats.abandoned,
        max_depth = stats.max_depth,
        "run finished"
    );

    Ok(stats)
}

impl<T: 'static> Program<T> {
    /// Runs this program under `strategy`.
    pub fn infer<S: InferenceStrategy<T>>(&self, strategy: S) -> Result<S::Output, ExecError> {
        run(self, strategy)
    }
}
