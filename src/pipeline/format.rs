//! Explanation Formatter
//!
//! Ranks per-feature contributions and truncates to the top K for
//! display. Encoder namespace prefixes (`num__`, `cat__`) are stripped so
//! the response shows the training column names.

use crate::models::ExplanationEntry;

/// Strip the encoder-added namespace prefix from an output column name
fn display_name(name: &str) -> String {
    name.strip_prefix("num__")
        .or_else(|| name.strip_prefix("cat__"))
        .unwrap_or(name)
        .to_string()
}

/// Pair names with contributions, sort by descending |value| and keep the
/// first `k`. The sort is stable, so equal-magnitude ties keep their
/// original column order.
pub fn top_k(names: &[String], contributions: &[f64], k: usize) -> Vec<ExplanationEntry> {
    debug_assert_eq!(names.len(), contributions.len());

    let mut entries: Vec<ExplanationEntry> = names
        .iter()
        .zip(contributions)
        .map(|(name, &value)| ExplanationEntry {
            feature: display_name(name),
            value,
        })
        .collect();

    entries.sort_by(|a, b| b.value.abs().total_cmp(&a.value.abs()));
    entries.truncate(k);
    entries
}
