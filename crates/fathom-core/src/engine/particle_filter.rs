//! Sequential importance resampling over a population of particles.
//!
//! ## Architecture
//!
//! - **Particles**: partial executions, each with its own continuation and path
//!   state. Sampled values are proposals from the prior, so their
//!   log-likelihood is not added to the particle's weight.
//! - **Forking**: at a sample point the current particle is replaced by
//!   `particles_per_sample` children, one per drawn value (or one per support
//!   value when a [`SamplingOverride`] asks for the support).
//! - **Synchronization**: at a factor point a particle stops and records its
//!   pending weight. Once every live particle is waiting, a resampling round
//!   draws a new population, of the current live size, proportionally to
//!   `exp(pending weight)`; survivors restart at log-probability zero.
//! - **Work queue**: particles are processed from a FIFO queue by one guarded
//!   drain loop. When the queue runs dry and every live particle is waiting,
//!   the loop resamples and keeps going, so no call frame is nested per
//!   particle.
//!
//! The population is not held at a fixed size: forks between two resampling
//! rounds grow it, and each round resamples whatever is live at that moment.

use std::any::Any;
use std::collections::{BTreeMap, VecDeque};
use std::marker::PhantomData;
use std::rc::Rc;

use rand::distributions::{Distribution as _, WeightedIndex};

use crate::distribution::Distribution;
use crate::engine::context::{Context, Continuation, PathState, SampleSite};
use crate::engine::errors::ExecError;
use crate::engine::strategy::InferenceStrategy;
use crate::random::with_rng;

/// How a sample point should produce particle values.
#[derive(Debug, Clone)]
pub enum SamplePlan {
    /// Draw this many values from the distribution's sampler.
    Draws(usize),
    /// One child per support value (finite distributions only).
    Support,
    /// One child per listed value. Each value must have the distribution's
    /// value type; values outside the support are still forked.
    Values(Vec<Rc<dyn Any>>),
}

impl SamplePlan {
    /// A [`SamplePlan::Values`] plan over `values`.
    pub fn values<V: 'static>(values: impl IntoIterator<Item = V>) -> Self {
        SamplePlan::Values(values.into_iter().map(|v| Rc::new(v) as Rc<dyn Any>).collect())
    }
}

/// Per-distribution override of the particle fan-out at sample points.
pub trait SamplingOverride {
    /// Plan for sampling `distribution`, or `None` to draw `particles_per_sample` values.
    fn plan(&self, distribution: &dyn Any) -> Option<SamplePlan>;
}

impl<F> SamplingOverride for F
where
    F: Fn(&dyn Any) -> Option<SamplePlan>,
{
    fn plan(&self, distribution: &dyn Any) -> Option<SamplePlan> {
        self(distribution)
    }
}

/// Never overrides: every sample point draws `particles_per_sample` values.
#[derive(Debug, Clone, Copy, Default)]
pub struct DrawByDefault;

impl SamplingOverride for DrawByDefault {
    fn plan(&self, _distribution: &dyn Any) -> Option<SamplePlan> {
        None
    }
}

/// Enumerates the support of every distribution of type `D`.
pub struct EnumerateSupportOf<D>(PhantomData<fn() -> D>);

impl<D> Default for EnumerateSupportOf<D> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<D: Distribution + 'static> SamplingOverride for EnumerateSupportOf<D> {
    fn plan(&self, distribution: &dyn Any) -> Option<SamplePlan> {
        distribution.is::<D>().then_some(SamplePlan::Support)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct ParticleId(u64);

enum Particle<T> {
    /// Queued or running; resumes with its pending value.
    Ready(Continuation<T>),
    /// Stopped at a factor point.
    Waiting { weight: f64, resume: Continuation<T> },
}

/// Particle filter returning the values of all completed particles.
pub struct ParticleFilter<T> {
    particles_per_sample: usize,
    sampling: Box<dyn SamplingOverride>,
    live: BTreeMap<ParticleId, Particle<T>>,
    queue: VecDeque<ParticleId>,
    current: Option<ParticleId>,
    next_id: u64,
    completed: Vec<T>,
    draining: bool,
    resampling_rounds: usize,
}

impl<T> ParticleFilter<T> {
    /// Forks `particles_per_sample` particles at every sample point.
    pub fn new(particles_per_sample: usize) -> Result<Self, ExecError> {
        Self::with_sampling_override(particles_per_sample, DrawByDefault)
    }

    /// Like [`new`](Self::new), letting `sampling` change the fan-out per distribution.
    pub fn with_sampling_override(
        particles_per_sample: usize,
        sampling: impl SamplingOverride + 'static,
    ) -> Result<Self, ExecError> {
        if particles_per_sample == 0 {
            return Err(ExecError::ValidationError(
                "ParticleFilter: particles_per_sample must be positive".into(),
            ));
        }
        Ok(Self {
            particles_per_sample,
            sampling: Box::new(sampling),
            live: BTreeMap::new(),
            queue: VecDeque::new(),
            current: None,
            next_id: 0,
            completed: Vec::new(),
            draining: false,
            resampling_rounds: 0,
        })
    }

    pub fn particles_per_sample(&self) -> usize {
        self.particles_per_sample
    }

    /// Number of resampling rounds performed so far.
    pub fn resampling_rounds(&self) -> usize {
        self.resampling_rounds
    }

    /// Number of particles currently alive.
    pub fn live_particles(&self) -> usize {
        self.live.len()
    }

    fn register(&mut self, particle: Particle<T>) {
        let id = ParticleId(self.next_id);
        self.next_id += 1;
        self.live.insert(id, particle);
        self.queue.push_back(id);
    }

    fn current(&self, event: &str) -> Result<ParticleId, ExecError> {
        self.current.ok_or_else(|| {
            ExecError::Internal(format!(
                "ParticleFilter: {} reached outside of a particle step",
                event
            ))
        })
    }

    fn all_waiting(&self) -> bool {
        !self.live.is_empty()
            && self
                .live
                .values()
                .all(|p| matches!(p, Particle::Waiting { .. }))
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
        loop {
            while let Some(id) = self.queue.pop_front() {
                let k = match self.live.get(&id) {
                    Some(Particle::Ready(k)) => k.clone(),
                    _ => continue,
                };
                self.current = Some(id);
                cx.resume(self, k)?;
            }
            self.current = None;
            // Every remaining particle stopped at a factor point.
            if !self.all_waiting() {
                return Ok(());
            }
            self.resample(cx)?;
        }
    }

    /// Replaces the waiting population by a resampled one of the same size.
    fn resample(&mut self, cx: &mut Context) -> Result<(), ExecError> {
        let population = std::mem::take(&mut self.live);
        let mut weights = Vec::with_capacity(population.len());
        let mut continuations = Vec::with_capacity(population.len());
        for particle in population.into_values() {
            match particle {
                Particle::Waiting { weight, resume } => {
                    weights.push(weight);
                    continuations.push(resume);
                }
                Particle::Ready(_) => {
                    return Err(ExecError::Internal(
                        "ParticleFilter: resampling with a particle not at a factor point".into(),
                    ))
                }
            }
        }
        let size = continuations.len();

        if weights.iter().any(|w| w.is_nan()) {
            return Err(ExecError::Numerical(
                "ParticleFilter: NaN particle weight at resampling".into(),
            ));
        }
        let max = weights.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if max == f64::NEG_INFINITY {
            #[cfg(feature = "tracing")]
            tracing::debug!(population = size, "every particle rejected, population dies");
            for k in &continuations {
                cx.abandon(k.path(), "every particle rejected by evidence");
            }
            return Ok(());
        }

        // Shifting by the maximum keeps the proportions and avoids underflow.
        let ancestors = WeightedIndex::new(weights.iter().map(|w| (w - max).exp()))
            .map_err(|e| ExecError::Numerical(format!("ParticleFilter: {}", e)))?;

        for _ in 0..size {
            let i = with_rng(|rng| ancestors.sample(rng));
            let survivor = continuations[i].clone().with_path(PathState::CERTAIN);
            self.register(Particle::Ready(survivor));
        }
        self.resampling_rounds += 1;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            round = self.resampling_rounds,
            population = size,
            "particles resampled"
        );
        Ok(())
    }
}

impl<T> InferenceStrategy<T> for ParticleFilter<T> {
    type Output = Vec<T>;

    fn on_start(&mut self, cx: &mut Context, root: Continuation<T>) -> Result<(), ExecError> {
        self.register(Particle::Ready(root));
        self.drain(cx)
    }

    fn on_complete(&mut self, value: T, _path: PathState) -> Result<(), ExecError> {
        let id = self.current("completion")?;
        self.live.remove(&id);
        self.completed.push(value);
        Ok(())
    }

    fn on_factor(
        &mut self,
        cx: &mut Context,
        k: Continuation<T>,
        weight: f64,
    ) -> Result<(), ExecError> {
        let id = self.current("factor")?;
        let pending = k.path().log_probability() + weight;
        match self.live.get_mut(&id) {
            Some(slot) if matches!(slot, Particle::Ready(_)) => {
                *slot = Particle::Waiting {
                    weight: pending,
                    resume: k,
                };
            }
            _ => {
                return Err(ExecError::Internal(format!(
                    "ParticleFilter: particle {:?} is not ready at a factor point",
                    id
                )))
            }
        }
        self.drain(cx)
    }

    fn on_sample(&mut self, cx: &mut Context, site: SampleSite<T>) -> Result<(), ExecError> {
        let id = self.current("sample")?;
        self.live.remove(&id);

        let plan = self
            .sampling
            .plan(site.distribution())
            .unwrap_or(SamplePlan::Draws(self.particles_per_sample));
        let choices = match plan {
            SamplePlan::Draws(n) => (0..n).map(|_| site.draw()).collect(),
            SamplePlan::Support => site.choices("ParticleFilter support override")?,
            SamplePlan::Values(values) => values
                .iter()
                .map(|v| site.bind(v.as_ref(), "ParticleFilter value override"))
                .collect::<Result<Vec<_>, _>>()?,
        };
        for choice in choices {
            self.register(Particle::Ready(choice.at(site.path())));
        }
        self.drain(cx)
    }

    fn into_result(self) -> Vec<T> {
        self.completed
    }
}
