use std::cell::RefCell;
use std::rc::Rc;

use fathom_core::{
    done, factor, observe, run_with_stats, sample, uniform_int, Bernoulli, Categorical, Enumerate,
    ExecError, Gaussian, Posterior, Program, WeightedQueue,
};
use fathom_tests::assert_close;

fn assert_same_posterior<T: std::hash::Hash + Eq + std::fmt::Debug>(
    exact: &Posterior<T>,
    best_first: &Posterior<T>,
) {
    assert_eq!(exact.len(), best_first.len());
    for (value, p) in exact {
        let q = best_first
            .get(value)
            .unwrap_or_else(|| panic!("{:?} missing from best-first posterior", value));
        assert_close(*q, *p, 1e-12, &format!("P({:?})", value));
    }
}

#[test]
fn agrees_with_enumerate_under_evidence() {
    let coin = Bernoulli::new(0.35).unwrap();
    let die = uniform_int(1..=4).unwrap();
    let program = Program::new(move || {
        let die = die.clone();
        sample(coin, move |heads| {
            let die = die.clone();
            sample(die.clone(), move |a| {
                sample(die.clone(), move |b| {
                    let total = if heads { a * b } else { a + b };
                    observe(move || total % 2 == 0, move || {
                        factor(move || -(total as f64) / 4.0, move || done(total))
                    })
                })
            })
        })
    });
    let exact = program.infer(Enumerate::new()).unwrap();
    let best_first = program.infer(WeightedQueue::new()).unwrap();
    assert_same_posterior(&exact, &best_first);
}

#[test]
fn completions_arrive_in_global_posterior_order() {
    let first = Categorical::new(vec![(1, 0.5), (2, 0.3), (3, 0.2)]).unwrap();
    let second = Categorical::new(vec![('a', 0.9), ('b', 0.1)]).unwrap();
    let visits = Rc::new(RefCell::new(Vec::new()));

    let (p1, p2, log) = (first.clone(), second.clone(), Rc::clone(&visits));
    let program = Program::new(move || {
        let (p1, p2, second, log) = (p1.clone(), p2.clone(), second.clone(), Rc::clone(&log));
        sample(first.clone(), move |d1| {
            let (p1, p2, log) = (p1.clone(), p2.clone(), Rc::clone(&log));
            sample(second.clone(), move |d2| {
                log.borrow_mut()
                    .push(((d1, d2), p1.probability(&d1) * p2.probability(&d2)));
                done((d1, d2))
            })
        })
    });

    let posterior = program.infer(WeightedQueue::new()).unwrap();
    let visits = visits.borrow();
    let order: Vec<(i32, char)> = visits.iter().map(|(v, _)| *v).collect();
    // siblings of different parents interleave
    assert_eq!(
        order,
        vec![(1, 'a'), (2, 'a'), (3, 'a'), (1, 'b'), (2, 'b'), (3, 'b')]
    );
    for pair in visits.windows(2) {
        assert!(pair[0].1 >= pair[1].1, "visitation not monotone: {:?}", pair);
    }
    assert_close(posterior[&(1, 'a')], 0.45, 1e-12, "P(1, a)");
}

#[test]
fn capped_search_keeps_most_probable_paths() {
    let weather = Categorical::new(vec![("rain", 0.1), ("sun", 0.7), ("fog", 0.2)]).unwrap();
    let program = Program::new(move || sample(weather.clone(), done));
    let strategy = WeightedQueue::with_limit(2).unwrap();
    let (posterior, stats) = run_with_stats(&program, strategy).unwrap();
    assert_eq!(stats.completions, 2);
    assert_eq!(stats.abandoned, 1);
    assert!(posterior.contains_key("sun"));
    assert!(posterior.contains_key("fog"));
    assert!(!posterior.contains_key("rain"));
    assert_close(posterior[&"sun"], 0.7 / 0.9, 1e-12, "P(sun)");
}

#[test]
fn rejected_paths_are_never_completed() {
    let die = uniform_int(1..=6).unwrap();
    let program = Program::new(move || {
        sample(die.clone(), |v| observe(move || v > 4, move || done(v)))
    });
    let (posterior, stats) = run_with_stats(&program, WeightedQueue::new()).unwrap();
    assert_eq!(stats.completions, 2);
    assert_eq!(stats.abandoned, 4);
    assert_close(posterior[&5], 0.5, 1e-12, "P(5)");
}

#[test]
fn continuous_distributions_are_rejected() {
    let g = Gaussian::new(1.0, 4.0).unwrap();
    let program = Program::new(move || sample(g, |x: f64| done(x > 1.0)));
    let err = program.infer(WeightedQueue::new()).unwrap_err();
    assert!(matches!(err, ExecError::Usage(_)));
}
