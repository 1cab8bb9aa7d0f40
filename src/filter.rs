// Row selection driven by user input: slider ranges and subject pickers.
use crate::aggregate::dol_unique_counts;
use crate::types::{NumericColumn, SampleRow};
use std::collections::BTreeSet;
use tracing::debug;

/// Observed (min, max) of a numeric column, ignoring missing cells.
pub fn column_bounds(data: &[SampleRow], column: NumericColumn) -> Option<(f64, f64)> {
    data.iter()
        .filter_map(|r| column.value(r))
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((f64::min(lo, v), f64::max(hi, v))),
        })
}

/// Keep rows with `low <= value <= high`. Bounds outside the observed range
/// are clamped to it; rows with the column missing never match.
pub fn filter_by_range(
    data: &[SampleRow],
    column: NumericColumn,
    low: f64,
    high: f64,
) -> Vec<SampleRow> {
    let Some((min, max)) = column_bounds(data, column) else {
        return Vec::new();
    };
    let (low, high) = clamp_range(low, high, min, max);
    debug!(column = column.header(), low, high, "range filter");
    data.iter()
        .filter(|r| {
            column
                .value(r)
                .is_some_and(|v| v >= low && v <= high)
        })
        .cloned()
        .collect()
}

/// Clamp a requested range into `[min, max]`. NaN bounds fall back to the
/// observed edge.
pub fn clamp_range(low: f64, high: f64, min: f64, max: f64) -> (f64, f64) {
    let low = if low.is_nan() { min } else { low.clamp(min, max) };
    let high = if high.is_nan() { max } else { high.clamp(min, max) };
    (low, high)
}

/// Keep rows whose subject is in `subject_ids`, preserving row order.
pub fn filter_by_subject_list(data: &[SampleRow], subject_ids: &BTreeSet<String>) -> Vec<SampleRow> {
    data.iter()
        .filter(|r| subject_ids.contains(&r.subject_id))
        .cloned()
        .collect()
}

/// Subjects with strictly more than `min_distinct_dol` distinct DOL values.
pub fn subjects_with_min_samples(data: &[SampleRow], min_distinct_dol: usize) -> BTreeSet<String> {
    dol_unique_counts(data)
        .into_iter()
        .filter(|(_, n)| *n > min_distinct_dol)
        .map(|(subject, _)| subject)
        .collect()
}
