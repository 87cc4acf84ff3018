//! Helpers for turning accumulated weights into probabilities.

use std::hash::Hash;

use rustc_hash::FxHashMap;

/// Normalized posterior over program results, as produced by the exhaustive strategies.
pub type Posterior<T> = FxHashMap<T, f64>;

/// Divides every weight by the total weight.
///
/// If the total is exactly zero the map is returned unchanged, so an
/// all-impossible posterior stays all-zero instead of turning into NaNs.
pub fn normalize<K: Eq + Hash>(weights: FxHashMap<K, f64>) -> FxHashMap<K, f64> {
    let total: f64 = weights.values().sum();
    if total == 0.0 {
        return weights;
    }
    weights.into_iter().map(|(k, w)| (k, w / total)).collect()
}

/// Empirical distribution of a list of outcomes (e.g. particle filter results).
pub fn normalize_counts<K, I>(outcomes: I) -> FxHashMap<K, f64>
where
    K: Eq + Hash,
    I: IntoIterator<Item = K>,
{
    let mut counts: FxHashMap<K, f64> = FxHashMap::default();
    for outcome in outcomes {
        *counts.entry(outcome).or_insert(0.0) += 1.0;
    }
    normalize(counts)
}
