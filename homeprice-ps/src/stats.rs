//! Small statistics helpers shared by the pipeline stages

use std::collections::BTreeMap;

use rand::rngs::SmallRng;
use rand::Rng;

/// Median of the finite values in `values`; `None` when no value is
/// finite. Even-length inputs take the mean of the middle pair.
pub fn median(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let mut finite: Vec<f64> = values.into_iter().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return None;
    }
    finite.sort_by(|a, b| a.total_cmp(b));
    let mid = finite.len() / 2;
    if finite.len() % 2 == 1 {
        Some(finite[mid])
    } else {
        Some((finite[mid - 1] + finite[mid]) / 2.0)
    }
}

/// Occurrence counts sorted by descending count, ties by ascending key
pub fn value_counts<'a>(values: impl IntoIterator<Item = &'a str>) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for value in values {
        *counts.entry(value).or_insert(0) += 1;
    }
    let mut sorted: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(k, n)| (k.to_string(), n))
        .collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    sorted
}

/// Most frequent value; count ties resolve to the smallest key
pub fn modal<'a>(values: impl IntoIterator<Item = &'a str>) -> Option<String> {
    value_counts(values).into_iter().next().map(|(v, _)| v)
}

/// Smallest head size whose values cover at least `percent` of the
/// total, starting at `start_n` and growing by `step`
pub fn coverage_size(counts: &[(String, usize)], percent: f64, start_n: usize, step: usize) -> usize {
    let total: usize = counts.iter().map(|(_, n)| n).sum();
    if total == 0 {
        return start_n;
    }

    let mut size = start_n;
    loop {
        let covered: usize = counts.iter().take(size).map(|(_, n)| n).sum();
        if covered as f64 / total as f64 * 100.0 >= percent || size >= counts.len() {
            return size;
        }
        size += step;
    }
}

/// Expand the top `size` values into a sampling list where each value
/// repeats `round(share_percent * mul)` times
pub fn weighted_subset(counts: &[(String, usize)], size: usize, mul: f64) -> Vec<String> {
    let total: usize = counts.iter().map(|(_, n)| n).sum();
    if total == 0 {
        return Vec::new();
    }

    let mut list = Vec::new();
    for (value, count) in counts.iter().take(size) {
        let weight = (*count as f64 / total as f64 * 100.0 * mul).round() as usize;
        for _ in 0..weight {
            list.push(value.clone());
        }
    }
    list
}

/// Uniform draw from a weighted sampling list
pub fn weighted_random_item<'a>(list: &'a [String], rng: &mut SmallRng) -> Option<&'a str> {
    if list.is_empty() {
        None
    } else {
        Some(list[rng.gen_range(0..list.len())].as_str())
    }
}
