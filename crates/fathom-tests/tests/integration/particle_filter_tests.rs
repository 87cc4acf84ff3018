use std::any::Any;

use fathom_core::{
    done, factor, normalize_counts, observe, random, run_in_place, run_with_stats, sample,
    uniform_int, Bernoulli, Categorical, Distribution, EnumerateSupportOf, Gaussian,
    InferenceStrategy, ParticleFilter, Program, SamplePlan, Step,
};
use fathom_tests::{assert_close, mean, variance};

#[test]
fn unforked_run_returns_prior_population() {
    random::reseed(Some(7));
    let die = uniform_int(1..=6).unwrap();
    let program = Program::new(move || sample(die.clone(), done));
    let n = 30_000;
    let (result, stats) = run_with_stats(&program, ParticleFilter::new(n).unwrap()).unwrap();
    assert_eq!(result.len(), n);
    assert_eq!(stats.factor_points, 0);

    let empirical = normalize_counts(result);
    assert_eq!(empirical.len(), 6);
    for face in 1..=6 {
        assert_close(empirical[&face], 1.0 / 6.0, 0.015, &format!("P({})", face));
    }
}

#[test]
fn observation_filters_support() {
    random::reseed(Some(8));
    let weights = Categorical::from_fn((1..=10).collect::<Vec<i64>>(), |v| *v as f64).unwrap();
    let program = Program::new(move || {
        sample(weights.clone(), |b| observe(move || b >= 5, move || done(b)))
    });
    let n = 20_000;
    let result = program.infer(ParticleFilter::new(n).unwrap()).unwrap();
    assert_eq!(result.len(), n);

    let mut support: Vec<i64> = normalize_counts(result).keys().copied().collect();
    support.sort();
    assert_eq!(support, (5..=10).collect::<Vec<_>>());
}

#[test]
fn exclusive_hypotheses_leave_one_survivor_tag() {
    random::reseed(Some(9));
    let prior = Categorical::uniform(["left", "right"]).unwrap();
    let program = Program::new(move || {
        sample(prior.clone(), |h| observe(move || h == "right", move || done(h)))
    });
    let result = program.infer(ParticleFilter::new(500).unwrap()).unwrap();
    assert_eq!(result.len(), 500);
    assert!(result.iter().all(|h| *h == "right"));
}

#[test]
fn forks_before_evidence_grow_the_population() {
    random::reseed(Some(10));
    let coin = Bernoulli::new(0.5).unwrap();
    let program = Program::new(move || {
        sample(coin, move |a| {
            sample(coin, move |b| factor(|| -0.5, move || done((a, b))))
        })
    });
    let (result, stats) = run_with_stats(&program, ParticleFilter::new(2).unwrap()).unwrap();
    assert_eq!(result.len(), 4);
    assert_eq!(stats.sample_points, 3);
    assert_eq!(stats.factor_points, 4);
}

#[test]
fn two_gaussians_from_one() {
    random::reseed(Some(31));
    let original = Gaussian::new(0.0, 20.0).unwrap();
    let (m1, v1) = (3.0, 1.0);
    let (m2, v2) = (-3.0, 2.0);
    let target1 = Gaussian::new(m1, v1).unwrap();
    let target2 = Gaussian::new(m2, v2).unwrap();
    let flip = Bernoulli::new(0.5).unwrap();

    let program = Program::new(move || {
        sample(original, move |s| {
            sample(flip, move |f| {
                factor(move || if f { target1.log_likelihood(&s) } else { 0.0 }, move || {
                    factor(move || if f { 0.0 } else { target2.log_likelihood(&s) }, move || {
                        done((f, s))
                    })
                })
            })
        })
    });

    let n = 10_000;
    let flips = EnumerateSupportOf::<Bernoulli>::default();
    let strategy = ParticleFilter::with_sampling_override(n, flips).unwrap();
    let result = program.infer(strategy).unwrap();
    assert_eq!(result.len(), 2 * n);

    let (t1, t2): (Vec<(bool, f64)>, Vec<(bool, f64)>) = result.into_iter().partition(|(f, _)| *f);
    let t1: Vec<f64> = t1.into_iter().map(|(_, s)| s).collect();
    let t2: Vec<f64> = t2.into_iter().map(|(_, s)| s).collect();
    assert!(!t1.is_empty() && !t2.is_empty());
    assert_close(mean(&t1), m1, 0.5, "t1 mean");
    assert_close(mean(&t2), m2, 0.5, "t2 mean");
    assert_close(variance(&t1), v1, 0.5, "t1 variance");
    assert_close(variance(&t2), v2, 0.5, "t2 variance");
}

#[test]
fn seeded_runs_are_reproducible() {
    let g = Gaussian::new(0.0, 1.0).unwrap();
    let program = Program::new(move || {
        sample(g, move |x| factor(move || -x * x, move || done(x)))
    });

    random::reseed(Some(77));
    let first = program.infer(ParticleFilter::new(200).unwrap()).unwrap();
    random::reseed(Some(77));
    let second = program.infer(ParticleFilter::new(200).unwrap()).unwrap();
    assert_eq!(first, second);
}

/// Heads completes at once, tails waits at a factor point.
fn heads_or_weighted_tails(coin: Bernoulli) -> Program<i32> {
    Program::new(move || {
        sample(coin, |a| -> Step<i32> {
            if a {
                done(1)
            } else {
                factor(|| -1.0, || done(0))
            }
        })
    })
}

#[test]
fn completed_particles_leave_the_resampled_population() {
    let coin = Bernoulli::new(0.5).unwrap();
    let program = heads_or_weighted_tails(coin);
    let flips = [true, false, true, false, false, true, false, true, true, false];
    let mut strategy = ParticleFilter::with_sampling_override(10, move |d: &dyn Any| {
        d.is::<Bernoulli>().then(|| SamplePlan::values(flips))
    })
    .unwrap();
    let stats = run_in_place(&program, &mut strategy).unwrap();
    assert_eq!(strategy.resampling_rounds(), 1);
    assert_eq!(strategy.live_particles(), 0);
    assert_eq!(stats.factor_points, 5);

    let result = strategy.into_result();
    assert_eq!(result.len(), 10);
    assert_eq!(stats.completions, 10);
    // five heads finished before the round, five resampled tails after it
    assert_eq!(result.iter().filter(|v| **v == 1).count(), 5);
}

#[test]
fn drawn_siblings_complete_or_resample_once() {
    random::reseed(Some(12));
    let coin = Bernoulli::new(0.5).unwrap();
    let program = heads_or_weighted_tails(coin);
    let mut strategy = ParticleFilter::new(10).unwrap();
    let stats = run_in_place(&program, &mut strategy).unwrap();
    let expected_rounds = usize::from(stats.factor_points > 0);
    assert_eq!(strategy.resampling_rounds(), expected_rounds);
    assert_eq!(stats.completions, 10);
    assert_eq!(strategy.into_result().len(), 10);
}
