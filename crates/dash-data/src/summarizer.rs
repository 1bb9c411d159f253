//! Categorical breakdowns: value counts, top-k folding and normalisation.

use std::collections::HashMap;

use dash_core::models::{CategoricalDistribution, RecordSet};

/// Label of the folded remainder entry produced by [`top_k_plus_other`].
pub const OTHER_LABEL: &str = "Other";

/// Count occurrences of each distinct non-null value of `field`.
///
/// Entries are ordered by descending count; ties keep the order in which
/// the value first appeared. An absent column yields an empty distribution.
pub fn distribution(records: &RecordSet, field: &str) -> CategoricalDistribution {
    let Some(column) = records.column(field) else {
        return CategoricalDistribution::default();
    };

    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, f64> = HashMap::new();
    for key in column.filter_map(|v| v.key()) {
        match counts.get_mut(&key) {
            Some(n) => *n += 1.0,
            None => {
                counts.insert(key.clone(), 1.0);
                order.push(key);
            }
        }
    }

    let mut entries: Vec<(String, f64)> = order
        .into_iter()
        .map(|k| {
            let n = counts.get(&k).copied().unwrap_or(0.0);
            (k, n)
        })
        .collect();
    // Stable sort keeps first-seen order among equal counts.
    entries.sort_by(|a, b| b.1.total_cmp(&a.1));
    CategoricalDistribution::new(entries)
}

/// Keep the `k` highest-count entries and fold the rest into `"Other"`.
///
/// Kept entries come out in descending count order; equal counts keep their
/// input order. The remainder is appended as a trailing `"Other"` entry, or
/// added to a kept category that is itself named `"Other"` so the label
/// stays unique. A distribution with at most `k` entries is returned
/// unchanged.
pub fn top_k_plus_other(dist: &CategoricalDistribution, k: usize) -> CategoricalDistribution {
    if dist.len() <= k {
        return dist.clone();
    }
    let mut ranked: Vec<&(String, f64)> = dist.entries.iter().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    let (kept, rest) = ranked.split_at(k);

    let remainder: f64 = rest.iter().map(|e| e.1).sum();
    let mut entries: Vec<(String, f64)> = kept.iter().map(|e| (*e).clone()).collect();
    match entries.iter_mut().find(|e| e.0 == OTHER_LABEL) {
        Some(other) => other.1 += remainder,
        None => entries.push((OTHER_LABEL.to_string(), remainder)),
    }
    CategoricalDistribution::new(entries)
}

/// First `n` entries.
pub fn head(dist: &CategoricalDistribution, n: usize) -> CategoricalDistribution {
    CategoricalDistribution::new(dist.entries.iter().take(n).cloned().collect())
}

/// Convert counts to percentages of the total, rounded to 2 decimals.
pub fn normalize(dist: &CategoricalDistribution) -> CategoricalDistribution {
    let total = dist.total();
    if total == 0.0 {
        return dist.clone();
    }
    CategoricalDistribution::new(
        dist.entries
            .iter()
            .map(|(k, v)| (k.clone(), (v / total * 10_000.0).round() / 100.0))
            .collect(),
    )
}
