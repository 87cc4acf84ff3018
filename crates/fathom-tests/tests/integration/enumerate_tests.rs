use std::rc::Rc;

use fathom_core::{
    done, factor, observe, run_with_stats, sample, uniform_int, Bernoulli, Categorical, Enumerate,
    ExecError, Gaussian, Program, Step, Uniform,
};
use fathom_tests::assert_close;

type Finish = Rc<dyn Fn(i64) -> Step<i64>>;

fn roll_sum(die: Categorical<i64>, remaining: u32, acc: i64, finish: Finish) -> Step<i64> {
    if remaining == 0 {
        return finish(acc);
    }
    let next = die.clone();
    sample(die, move |v| {
        roll_sum(next.clone(), remaining - 1, acc + v, Rc::clone(&finish))
    })
}

#[test]
fn two_coins_with_at_least_one_heads() {
    let coin = Bernoulli::new(0.5).unwrap();
    let program = Program::new(move || {
        sample(coin, move |d1| {
            sample(coin, move |d2| observe(move || d1 || d2, move || done(d1)))
        })
    });
    let posterior = program.enumerate().unwrap();
    assert_eq!(posterior.len(), 2);
    assert_close(posterior[&true], 2.0 / 3.0, 1e-12, "P(d1)");
    assert_close(posterior[&false], 1.0 / 3.0, 1e-12, "P(!d1)");
}

#[test]
fn three_dice_sum_is_symmetric() {
    let die = uniform_int(1..=6).unwrap();
    let program = Program::new(move || roll_sum(die.clone(), 3, 0, Rc::new(done::<i64>)));
    let (posterior, stats) = run_with_stats(&program, Enumerate::new()).unwrap();

    let mut support: Vec<i64> = posterior.keys().copied().collect();
    support.sort();
    assert_eq!(support, (3..=18).collect::<Vec<_>>());
    for k in 0..7 {
        assert_close(posterior[&(3 + k)], posterior[&(18 - k)], 1e-12, "symmetry");
    }
    assert_close(posterior[&3], 1.0 / 216.0, 1e-12, "P(3)");
    assert_close(posterior.values().sum::<f64>(), 1.0, 1e-12, "total");
    assert_eq!(stats.completions, 216);
    assert_eq!(stats.abandoned, 0);
}

#[test]
fn constrained_dice_posterior() {
    let die = uniform_int(1..=6).unwrap();
    let program = Program::new(move || {
        let second = die.clone();
        sample(die.clone(), move |a| {
            let second = second.clone();
            observe(move || a <= 2, move || {
                sample(second.clone(), move |b| observe(move || a + b >= 7, move || done(b)))
            })
        })
    });
    let posterior = program.enumerate().unwrap();
    assert_eq!(posterior.len(), 2);
    assert_close(posterior[&6], 2.0 / 3.0, 1e-12, "P(b=6)");
    assert_close(posterior[&5], 1.0 / 3.0, 1e-12, "P(b=5)");
}

#[test]
fn soft_evidence_reweights_paths() {
    let coin = Bernoulli::new(0.5).unwrap();
    let program = Program::new(move || {
        sample(coin, move |b| factor(move || if b { 0.0 } else { 3.0f64.ln() }, move || done(b)))
    });
    let posterior = program.enumerate().unwrap();
    assert_close(posterior[&false], 0.75, 1e-12, "P(false)");
    assert_close(posterior[&true], 0.25, 1e-12, "P(true)");
}

#[test]
fn path_cap_stops_in_support_order() {
    let die = uniform_int(1..=6).unwrap();
    let program = Program::new(move || roll_sum(die.clone(), 2, 0, Rc::new(done::<i64>)));
    let strategy = Enumerate::with_limit(6).unwrap();
    let (posterior, stats) = run_with_stats(&program, strategy).unwrap();
    // first die fixed at 1: sums 2..=7
    let mut support: Vec<i64> = posterior.keys().copied().collect();
    support.sort();
    assert_eq!(support, (2..=7).collect::<Vec<_>>());
    assert_eq!(stats.completions, 6);
    for p in posterior.values() {
        assert_close(*p, 1.0 / 6.0, 1e-12, "truncated posterior");
    }
}

#[test]
fn continuous_distributions_are_rejected() {
    let g = Gaussian::new(0.0, 1.0).unwrap();
    let program = Program::new(move || sample(g, |x: f64| done(x.is_sign_positive())));
    let err = program.enumerate().unwrap_err();
    assert!(matches!(err, ExecError::Usage(_)));

    let u = Uniform::new(0.0, 1.0).unwrap();
    let program = Program::new(move || sample(u, |x: f64| done(x < 0.5)));
    let err = program.enumerate().unwrap_err();
    assert!(err.to_string().contains("Uniform"), "got {}", err);
}

#[test]
fn nested_programs_reuse_continuations() {
    // The same continuation is resumed once per support value of the outer draw.
    let coin = Bernoulli::new(0.3).unwrap();
    let die = uniform_int(1..=3).unwrap();
    let program = Program::new(move || {
        let die = die.clone();
        sample(coin, move |heads| {
            let bonus = if heads { 10 } else { 0 };
            sample(die.clone(), move |v| done(v + bonus))
        })
    });
    let posterior = program.enumerate().unwrap();
    assert_eq!(posterior.len(), 6);
    assert_close(posterior[&11], 0.1, 1e-12, "P(11)");
    assert_close(posterior[&1], 0.7 / 3.0, 1e-12, "P(1)");
}
