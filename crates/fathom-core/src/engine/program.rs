//! Program representation and authoring primitives.
//!
//! A program is a re-runnable closure producing a [`Step`]: either the final
//! value, or a suspension at a random choice or an evidence check. Suspensions
//! hold plain `Fn` closures for "the rest of the program", so a strategy can
//! resume them any number of times, in any order, or never.
//!
//! Programs are written in continuation-passing style with [`sample`],
//! [`factor`], [`observe`] and [`done`]:
//!
//! ```rust,ignore
//! let coin = Bernoulli::new(0.5)?;
//! let program = Program::new(move || {
//!     sample(coin, move |d1| {
//!         sample(coin, move |d2| observe(move || d1 || d2, move || done(d1)))
//!     })
//! });
//! ```
//!
//! A reusable sub-program is an ordinary function taking the continuation of
//! its caller, e.g. `fn roll_sum(die, n, acc) -> Step<i64>`.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use rand::RngCore;

use crate::distribution::Distribution;

/// The rest of a program, ready to run up to its next step.
pub type Thunk<T> = Rc<dyn Fn() -> Step<T>>;

/// One step of program execution.
pub enum Step<T> {
    /// The program returned a value.
    Done(T),
    /// The program wants a value from a distribution.
    Sample(Box<dyn Suspension<T>>),
    /// The program weights the current path.
    Factor(FactorPoint<T>),
}

impl<T> fmt::Debug for Step<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Done(_) => f.write_str("Done(..)"),
            Step::Sample(s) => write!(f, "Sample({})", s.distribution_name()),
            Step::Factor(_) => f.write_str("Factor(..)"),
        }
    }
}

/// A suspended `factor`/`observe` call.
pub struct FactorPoint<T> {
    pub(crate) weight: Rc<dyn Fn() -> f64>,
    pub(crate) resume: Thunk<T>,
}

/// A candidate value at a sample point, already bound into its resume thunk.
pub struct Choice<T> {
    /// Log-likelihood of the bound value under the sampled distribution.
    pub log_likelihood: f64,
    pub(crate) resume: Thunk<T>,
}

impl<T> Clone for Choice<T> {
    fn clone(&self) -> Self {
        Self {
            log_likelihood: self.log_likelihood,
            resume: Rc::clone(&self.resume),
        }
    }
}

/// A suspended `sample` call with the value type erased.
///
/// Strategies never see the drawn value's type; they pick among [`Choice`]s.
pub trait Suspension<T> {
    /// One choice per support value in support order, or `None` when the
    /// distribution is not finite.
    fn choices(&self) -> Option<Vec<Choice<T>>>;

    /// One random choice drawn with `rng`.
    fn draw(&self, rng: &mut dyn RngCore) -> Choice<T>;

    /// Binds a caller-supplied value, or `None` when `value` is not of the
    /// distribution's value type.
    fn bind_value(&self, value: &dyn Any) -> Option<Choice<T>>;

    /// The distribution being sampled, for type-based sampling overrides.
    fn distribution(&self) -> &dyn Any;

    fn distribution_name(&self) -> &'static str;
}

struct SampleNode<D: Distribution, T> {
    distribution: D,
    resume: Rc<dyn Fn(D::Value) -> Step<T>>,
}

impl<D: Distribution, T: 'static> SampleNode<D, T> {
    fn bind(&self, value: D::Value) -> Choice<T> {
        let log_likelihood = self.distribution.log_likelihood(&value);
        let resume = Rc::clone(&self.resume);
        Choice {
            log_likelihood,
            resume: Rc::new(move || resume(value.clone())),
        }
    }
}

impl<D, T> Suspension<T> for SampleNode<D, T>
where
    D: Distribution + 'static,
    T: 'static,
{
    fn choices(&self) -> Option<Vec<Choice<T>>> {
        let support = self.distribution.support()?;
        Some(support.into_iter().map(|v| self.bind(v)).collect())
    }

    fn draw(&self, rng: &mut dyn RngCore) -> Choice<T> {
        let value = self.distribution.sample(rng);
        self.bind(value)
    }

    fn bind_value(&self, value: &dyn Any) -> Option<Choice<T>> {
        value.downcast_ref::<D::Value>().map(|v| self.bind(v.clone()))
    }

    fn distribution(&self) -> &dyn Any {
        &self.distribution
    }

    fn distribution_name(&self) -> &'static str {
        self.distribution.name()
    }
}

/// Suspends at a random choice; `resume` receives the chosen value.
pub fn sample<D, T, F>(distribution: D, resume: F) -> Step<T>
where
    D: Distribution + 'static,
    T: 'static,
    F: Fn(D::Value) -> Step<T> + 'static,
{
    Step::Sample(Box::new(SampleNode {
        distribution,
        resume: Rc::new(resume),
    }))
}

/// Suspends to add `weight()` (a log-probability) to the current path.
pub fn factor<T, W, F>(weight: W, resume: F) -> Step<T>
where
    W: Fn() -> f64 + 'static,
    F: Fn() -> Step<T> + 'static,
{
    Step::Factor(FactorPoint {
        weight: Rc::new(weight),
        resume: Rc::new(resume),
    })
}

/// Hard evidence: the path is impossible unless `predicate()` holds.
pub fn observe<T, P, F>(predicate: P, resume: F) -> Step<T>
where
    P: Fn() -> bool + 'static,
    F: Fn() -> Step<T> + 'static,
{
    factor(
        move || {
            if predicate() {
                0.0
            } else {
                f64::NEG_INFINITY
            }
        },
        resume,
    )
}

/// Ends the program with `value`.
pub fn done<T>(value: T) -> Step<T> {
    Step::Done(value)
}

/// An immutable, re-runnable probabilistic program returning `T`.
pub struct Program<T> {
    entry: Thunk<T>,
}

impl<T> Clone for Program<T> {
    fn clone(&self) -> Self {
        Self {
            entry: Rc::clone(&self.entry),
        }
    }
}

impl<T: 'static> Program<T> {
    /// Wraps the program's entry point. It is invoked once per run.
    pub fn new(entry: impl Fn() -> Step<T> + 'static) -> Self {
        Self {
            entry: Rc::new(entry),
        }
    }

    pub(crate) fn entry(&self) -> Thunk<T> {
        Rc::clone(&self.entry)
    }
}
