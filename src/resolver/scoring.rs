//! Fuzzy title similarity and the statistics used to pick among candidates.

use rapidfuzz::fuzz;

/// Similarity of two strings on a 0 to 100 scale.
///
/// Based on the normalized Indel distance and rounded to a whole number, so
/// scores compare exactly. Symmetric; identical strings always score 100.
pub(crate) fn similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 100.0;
    }
    (fuzz::ratio(a.chars(), b.chars()) * 100.0).round()
}

/// An item with its similarity score.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Scored<T> {
    pub item: T,
    pub score: f64,
}

impl<T> Scored<T> {
    pub fn new(item: T, score: f64) -> Self {
        Self { item, score }
    }
}

/// Arithmetic mean and population standard deviation (divides by N).
///
/// Returns `None` for an empty slice.
pub(crate) fn mean_and_population_std_dev(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }

    let count = values.len() as f64;
    let mean = values.iter().sum::<f64>() / count;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count;

    Some((mean, variance.sqrt()))
}

/// Keeps the items scoring at least one standard deviation above the mean.
pub(crate) fn above_one_std_dev<T>(items: Vec<Scored<T>>) -> Vec<Scored<T>> {
    let scores: Vec<f64> = items.iter().map(|s| s.score).collect();
    let Some((mean, std_dev)) = mean_and_population_std_dev(&scores) else {
        return items;
    };

    let threshold = mean + std_dev;
    items.into_iter().filter(|s| s.score >= threshold).collect()
}

/// Keeps every item sharing the maximum score, in their original order.
pub(crate) fn keep_top_scored<T>(items: Vec<Scored<T>>) -> Vec<Scored<T>> {
    let Some(max) = items.iter().map(|s| s.score).reduce(f64::max) else {
        return items;
    };
    items.into_iter().filter(|s| s.score == max).collect()
}

/// The first item with the greatest key.
///
/// Unlike [`Iterator::max_by`], equal keys resolve to the earliest item.
pub(crate) fn first_max_by<T, F>(items: impl IntoIterator<Item = T>, key: F) -> Option<T>
where
    F: Fn(&T) -> f64,
{
    let mut best: Option<(T, f64)> = None;
    for item in items {
        let value = key(&item);
        if best.as_ref().is_none_or(|(_, best_value)| value > *best_value) {
            best = Some((item, value));
        }
    }
    best.map(|(item, _)| item)
}

/// The first item whose runtime is closest to `target_seconds`.
///
/// Items without a runtime are infinitely far away; they are only chosen
/// when no item has one.
pub(crate) fn closest_runtime<T, F>(
    items: impl IntoIterator<Item = T>,
    target_seconds: f64,
    runtime: F,
) -> Option<T>
where
    F: Fn(&T) -> Option<u64>,
{
    first_max_by(items, |item| match runtime(item) {
        Some(seconds) => -(seconds as f64 - target_seconds).abs(),
        None => f64::NEG_INFINITY,
    })
}
