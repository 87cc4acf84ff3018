use fathom_core::{
    done, normalize_counts, observe, random, sample, uniform_int, Bernoulli, Gaussian, Program,
    SampleOnce, SampleOnceOutcome,
};
use fathom_tests::{assert_close, mean, variance};

fn draw_values<T: 'static>(program: &Program<T>, trials: usize) -> Vec<T> {
    (0..trials)
        .filter_map(|_| program.infer(SampleOnce::new()).unwrap().value())
        .collect()
}

#[test]
fn always_false_evidence_is_always_impossible() {
    let die = uniform_int(1..=6).unwrap();
    let program = Program::new(move || sample(die.clone(), |v| observe(|| false, move || done(v))));
    for _ in 0..100 {
        assert_eq!(
            program.infer(SampleOnce::new()).unwrap(),
            SampleOnceOutcome::Impossible
        );
    }
}

#[test]
fn sum_of_gaussians_matches_moments() {
    random::reseed(Some(2024));
    let x = Gaussian::new(0.0, 1.0).unwrap();
    let y = Gaussian::new(1.0, 2.0).unwrap();
    let program = Program::new(move || sample(x, move |a| sample(y, move |b| done(a + b))));
    let values = draw_values(&program, 20_000);
    assert_eq!(values.len(), 20_000);
    assert_close(mean(&values), 1.0, 0.1, "mean");
    assert_close(variance(&values), 3.0, 0.3, "variance");
}

#[test]
fn rejection_by_evidence_matches_prior_mass() {
    random::reseed(Some(11));
    let die = uniform_int(1..=6).unwrap();
    let program = Program::new(move || {
        sample(die.clone(), |v| observe(move || v <= 2, move || done(v)))
    });
    let trials = 6_000;
    let accepted = draw_values(&program, trials);
    let rate = accepted.len() as f64 / trials as f64;
    assert_close(rate, 1.0 / 3.0, 0.03, "acceptance rate");
    assert!(accepted.iter().all(|v| *v <= 2));

    let empirical = normalize_counts(accepted);
    assert_close(empirical[&1], 0.5, 0.05, "P(1 | accepted)");
}

#[test]
fn seeded_runs_are_reproducible() {
    let coin = Bernoulli::new(0.5).unwrap();
    let g = Gaussian::new(0.0, 10.0).unwrap();
    let program = Program::new(move || sample(coin, move |b| sample(g, move |x| done((b, x)))));

    random::reseed(Some(5));
    let first = draw_values(&program, 50);
    random::reseed(Some(5));
    let second = draw_values(&program, 50);
    assert_eq!(first, second);
}
