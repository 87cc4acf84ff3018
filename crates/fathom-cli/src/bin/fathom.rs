//! Fathom CLI - Run bundled probabilistic programs under any inference strategy
//!
//! Usage:
//!   fathom <MODEL>                                  # Exact posterior by enumeration
//!   fathom <MODEL> --strategy particle-filter -p 5000
//!   fathom <MODEL> --strategy sample-once --trials 100 -o json

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::process;
use std::rc::Rc;

use clap::{Parser, ValueEnum};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fathom_core::{
    done, factor, normalize_counts, observe, random, run_with_stats, sample, uniform_int,
    Bernoulli, Categorical, EngineConfig, Enumerate, ExecError, Gaussian, ParticleFilter,
    Posterior, Program, RunStats, SampleOnce, SampleOnceOutcome, Step, WeightedQueue,
};

#[derive(Parser)]
#[command(name = "fathom")]
#[command(version)]
#[command(about = "Fathom - run probabilistic programs under pluggable inference strategies")]
struct Cli {
    /// Bundled model to run
    #[arg(value_enum, value_name = "MODEL")]
    model: Model,

    /// Inference strategy
    #[arg(short, long, value_enum, default_value = "enumerate")]
    strategy: Strategy,

    /// Particles forked at every sample point (particle-filter)
    #[arg(short, long, default_value_t = 1000, value_name = "N")]
    particles: usize,

    /// Independent runs (sample-once)
    #[arg(short, long, default_value_t = 1000, value_name = "N")]
    trials: usize,

    /// Cap on completed paths (enumerate, weighted-queue)
    #[arg(short, long, value_name = "N")]
    limit: Option<usize>,

    /// Seed for the random generator (overrides FATHOM_SEED)
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "summary", value_name = "FORMAT")]
    output: OutputFormat,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Model {
    /// Two fair coins, at least one heads; returns the first coin
    TwoCoins,
    /// Sum of three fair dice
    DiceSum,
    /// First die in 1..=2, sum at least 7; returns the second die
    ConstrainedDice,
    /// Sum of two Gaussians (continuous; sampling strategies only)
    GaussianSum,
    /// Fair or biased coin after four observed heads
    Hypotheses,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Strategy {
    Enumerate,
    WeightedQueue,
    SampleOnce,
    ParticleFilter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Summary,
    Json,
}

/// A result value the CLI knows how to report.
trait ModelValue: Eq + Hash + Clone + fmt::Display + 'static {
    fn as_number(&self) -> Option<f64> {
        None
    }
}

impl ModelValue for bool {}

impl ModelValue for &'static str {}

impl ModelValue for i64 {
    fn as_number(&self) -> Option<f64> {
        Some(*self as f64)
    }
}

/// A real-valued result, compared and hashed by its bit pattern.
#[derive(Debug, Clone, Copy)]
struct Real(f64);

impl PartialEq for Real {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for Real {}

impl Hash for Real {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl fmt::Display for Real {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}", self.0)
    }
}

impl ModelValue for Real {
    fn as_number(&self) -> Option<f64> {
        Some(self.0)
    }
}

#[derive(Serialize)]
struct Entry {
    value: String,
    probability: f64,
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum ReportBody {
    Posterior {
        entries: Vec<Entry>,
    },
    Samples {
        trials: usize,
        impossible: usize,
        mean_likelihood: Option<f64>,
        mean: Option<f64>,
        entries: Vec<Entry>,
    },
    Particles {
        completed: usize,
        mean: Option<f64>,
        entries: Vec<Entry>,
    },
}

#[derive(Serialize)]
struct Report {
    model: String,
    strategy: String,
    seed: Option<u64>,
    stats: RunStats,
    #[serde(flatten)]
    body: ReportBody,
}

/// Entries shown by the summary output before eliding the rest.
const SUMMARY_ROWS: usize = 20;

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fathom_core=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = EngineConfig::from_env();
    let config = match cli.seed {
        Some(seed) => config.with_seed(Some(seed)),
        None => config,
    };
    random::configure(&config);
    tracing::debug!(seed = ?config.seed, "random generator configured");

    let report = match run_model(&cli, config.seed) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Error running {:?} with {:?}: {}", cli.model, cli.strategy, e);
            process::exit(1);
        }
    };

    match cli.output {
        OutputFormat::Json => match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing to JSON: {}", e);
                process::exit(1);
            }
        },
        OutputFormat::Summary => print_summary(&report),
    }
}

fn run_model(cli: &Cli, seed: Option<u64>) -> Result<Report, ExecError> {
    let (stats, body) = match cli.model {
        Model::TwoCoins => run_strategy(&two_coins()?, cli)?,
        Model::DiceSum => run_strategy(&dice_sum(3)?, cli)?,
        Model::ConstrainedDice => run_strategy(&constrained_dice()?, cli)?,
        Model::GaussianSum => run_strategy(&gaussian_sum()?, cli)?,
        Model::Hypotheses => run_strategy(&hypotheses()?, cli)?,
    };
    Ok(Report {
        model: value_name(cli.model),
        strategy: value_name(cli.strategy),
        seed,
        stats,
        body,
    })
}

fn value_name(value: impl ValueEnum) -> String {
    value
        .to_possible_value()
        .map(|v| v.get_name().to_string())
        .unwrap_or_default()
}

fn run_strategy<T: ModelValue>(
    program: &Program<T>,
    cli: &Cli,
) -> Result<(RunStats, ReportBody), ExecError> {
    match cli.strategy {
        Strategy::Enumerate => {
            let strategy = match cli.limit {
                Some(limit) => Enumerate::with_limit(limit)?,
                None => Enumerate::new(),
            };
            let (posterior, stats) = run_with_stats(program, strategy)?;
            Ok((stats, ReportBody::Posterior { entries: entries(posterior) }))
        }
        Strategy::WeightedQueue => {
            let strategy = match cli.limit {
                Some(limit) => WeightedQueue::with_limit(limit)?,
                None => WeightedQueue::new(),
            };
            let (posterior, stats) = run_with_stats(program, strategy)?;
            Ok((stats, ReportBody::Posterior { entries: entries(posterior) }))
        }
        Strategy::SampleOnce => {
            let mut total = RunStats::default();
            let mut values = Vec::with_capacity(cli.trials);
            let mut likelihoods = Vec::with_capacity(cli.trials);
            let mut impossible = 0;
            for _ in 0..cli.trials {
                let (outcome, stats) = run_with_stats(program, SampleOnce::new())?;
                accumulate(&mut total, stats);
                match outcome {
                    SampleOnceOutcome::Sampled { value, likelihood } => {
                        values.push(value);
                        likelihoods.push(likelihood);
                    }
                    SampleOnceOutcome::Impossible => impossible += 1,
                }
            }
            Ok((
                total,
                ReportBody::Samples {
                    trials: cli.trials,
                    impossible,
                    mean_likelihood: mean(likelihoods.iter().copied()),
                    mean: numeric_mean(&values),
                    entries: entries(normalize_counts(values)),
                },
            ))
        }
        Strategy::ParticleFilter => {
            let (values, stats) = run_with_stats(program, ParticleFilter::new(cli.particles)?)?;
            Ok((
                stats,
                ReportBody::Particles {
                    completed: values.len(),
                    mean: numeric_mean(&values),
                    entries: entries(normalize_counts(values)),
                },
            ))
        }
    }
}

fn accumulate(total: &mut RunStats, run: RunStats) {
    total.resumptions += run.resumptions;
    total.sample_points += run.sample_points;
    total.factor_points += run.factor_points;
    total.completions += run.completions;
    total.abandoned += run.abandoned;
    total.max_depth = total.max_depth.max(run.max_depth);
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (count > 0).then(|| sum / count as f64)
}

fn numeric_mean<T: ModelValue>(values: &[T]) -> Option<f64> {
    values
        .iter()
        .map(ModelValue::as_number)
        .collect::<Option<Vec<f64>>>()
        .and_then(|numbers| mean(numbers.into_iter()))
}

/// Entries sorted by decreasing probability, ties by value text.
fn entries<T: ModelValue>(posterior: Posterior<T>) -> Vec<Entry> {
    let mut entries: Vec<Entry> = posterior
        .into_iter()
        .map(|(value, probability)| Entry {
            value: value.to_string(),
            probability,
        })
        .collect();
    entries.sort_by(|a, b| match b.probability.total_cmp(&a.probability) {
        Ordering::Equal => a.value.cmp(&b.value),
        other => other,
    });
    entries
}

fn print_summary(report: &Report) {
    println!("✓ {} under {}", report.model, report.strategy);
    if let Some(seed) = report.seed {
        println!("  seed = {}", seed);
    }
    println!(
        "  {} resumptions, {} completions, {} abandoned, max depth {}\n",
        report.stats.resumptions,
        report.stats.completions,
        report.stats.abandoned,
        report.stats.max_depth
    );

    let entries = match &report.body {
        ReportBody::Posterior { entries } => {
            println!("Posterior ({} values):", entries.len());
            entries
        }
        ReportBody::Samples {
            trials,
            impossible,
            mean_likelihood,
            mean,
            entries,
        } => {
            println!("Samples: {} trials, {} impossible", trials, impossible);
            if let Some(l) = mean_likelihood {
                println!("  mean likelihood = {:.6}", l);
            }
            if let Some(m) = mean {
                println!("  mean = {:.6}", m);
            }
            println!("\nEmpirical distribution ({} values):", entries.len());
            entries
        }
        ReportBody::Particles {
            completed,
            mean,
            entries,
        } => {
            println!("Particles: {} completed", completed);
            if let Some(m) = mean {
                println!("  mean = {:.6}", m);
            }
            println!("\nEmpirical distribution ({} values):", entries.len());
            entries
        }
    };

    for entry in entries.iter().take(SUMMARY_ROWS) {
        println!("  {:>10}  {:.6}", entry.value, entry.probability);
    }
    if entries.len() > SUMMARY_ROWS {
        println!("  ... {} more", entries.len() - SUMMARY_ROWS);
    }
}

fn two_coins() -> Result<Program<bool>, ExecError> {
    let coin = Bernoulli::new(0.5)?;
    Ok(Program::new(move || {
        sample(coin, move |d1| {
            sample(coin, move |d2| observe(move || d1 || d2, move || done(d1)))
        })
    }))
}

type Finish = Rc<dyn Fn(i64) -> Step<i64>>;

/// Rolls `remaining` more dice, then hands the total to `finish`.
fn roll_sum(die: Categorical<i64>, remaining: u32, acc: i64, finish: Finish) -> Step<i64> {
    if remaining == 0 {
        return finish(acc);
    }
    let next = die.clone();
    sample(die, move |v| {
        roll_sum(next.clone(), remaining - 1, acc + v, Rc::clone(&finish))
    })
}

fn dice_sum(dice: u32) -> Result<Program<i64>, ExecError> {
    let die = uniform_int(1..=6)?;
    Ok(Program::new(move || {
        roll_sum(die.clone(), dice, 0, Rc::new(done::<i64>))
    }))
}

fn constrained_dice() -> Result<Program<i64>, ExecError> {
    let die = uniform_int(1..=6)?;
    Ok(Program::new(move || {
        let second = die.clone();
        sample(die.clone(), move |a| {
            let second = second.clone();
            observe(move || a <= 2, move || {
                sample(second.clone(), move |b| observe(move || a + b >= 7, move || done(b)))
            })
        })
    }))
}

fn gaussian_sum() -> Result<Program<Real>, ExecError> {
    let x = Gaussian::new(0.0, 1.0)?;
    let y = Gaussian::new(1.0, 2.0)?;
    Ok(Program::new(move || {
        sample(x, move |a| sample(y, move |b| done(Real(a + b))))
    }))
}

fn hypotheses() -> Result<Program<&'static str>, ExecError> {
    let prior = Categorical::uniform(["fair", "biased"])?;
    let fair = Bernoulli::new(0.5)?;
    let biased = Bernoulli::new(0.8)?;
    Ok(Program::new(move || {
        sample(prior.clone(), move |h| {
            let coin = if h == "fair" { fair } else { biased };
            // four heads in a row
            let weight = 4.0 * coin.p().ln();
            factor(move || weight, move || done(h))
        })
    }))
}
