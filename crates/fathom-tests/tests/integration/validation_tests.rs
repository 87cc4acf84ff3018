use fathom_core::{
    uniform_int, Bernoulli, Categorical, EngineConfig, Enumerate, ExecError, Gaussian,
    ParticleFilter, Uniform, WeightedQueue,
};

fn is_validation<T>(result: Result<T, ExecError>) -> bool {
    matches!(result, Err(ExecError::ValidationError(_)))
}

#[test]
fn distribution_parameters_are_checked_eagerly() {
    assert!(is_validation(Bernoulli::new(-0.1)));
    assert!(is_validation(Bernoulli::new(1.5)));
    assert!(is_validation(Bernoulli::new(f64::NAN)));
    assert!(Bernoulli::new(0.0).is_ok());
    assert!(Bernoulli::new(1.0).is_ok());

    assert!(is_validation(Gaussian::new(0.0, -1.0)));
    assert!(is_validation(Gaussian::new(f64::INFINITY, 1.0)));

    assert!(is_validation(Uniform::new(2.0, 1.0)));
    assert!(is_validation(Uniform::new(1.0, 1.0)));

    assert!(is_validation(Categorical::<i32>::new(Vec::new())));
    assert!(is_validation(Categorical::new(vec![("a", 1.0), ("b", -1.0)])));
    assert!(is_validation(Categorical::new(vec![("a", 0.0), ("b", 0.0)])));
    assert!(is_validation(uniform_int(3..=2)));
}

#[test]
fn strategy_parameters_are_checked_at_construction() {
    assert!(is_validation(Enumerate::<i64>::with_limit(0)));
    assert!(is_validation(WeightedQueue::<i64>::with_limit(0)));
    assert!(is_validation(ParticleFilter::<i64>::new(0)));
    assert!(Enumerate::<i64>::with_limit(1).is_ok());
}

#[test]
fn errors_render_their_category() {
    let err = Bernoulli::new(2.0).unwrap_err();
    assert!(err.to_string().starts_with("validation error:"), "got {}", err);
}

#[test]
fn seed_is_read_from_lookup() {
    let config =
        EngineConfig::from_lookup(|key| (key == "FATHOM_SEED").then(|| " 42 ".to_string()));
    assert_eq!(config.seed, Some(42));

    let config = EngineConfig::from_lookup(|_| Some("not-a-seed".to_string()));
    assert_eq!(config.seed, None);
}
