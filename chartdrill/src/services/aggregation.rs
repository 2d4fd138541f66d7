//! Monthly bucketing, chronological sorting and rank statistics.

use std::collections::BTreeMap;

use crate::api::{AggregatedSeries, MonthBucket, SeriesPoint, SummaryStats, YearMonth};
use crate::services::date_classifier::classify;

/// Group dated points into calendar-month buckets.
///
/// Values falling in the same month are summed, with missing values counted as
/// zero so sparse months still produce a bucket. Buckets come out in calendar
/// order regardless of input order. Points whose label is not a date are
/// skipped.
pub fn aggregate_monthly(points: &[SeriesPoint]) -> AggregatedSeries {
    let mut totals: BTreeMap<YearMonth, f64> = BTreeMap::new();
    for point in points {
        if let Some(month) = classify(&point.label).month() {
            *totals.entry(month).or_insert(0.0) += point.value_or_zero();
        }
    }

    AggregatedSeries {
        buckets: totals
            .into_iter()
            .map(|(month, total)| MonthBucket { month, total })
            .collect(),
    }
}

/// Stable sort by parsed date, ascending.
///
/// Points with unparseable labels keep their relative order after every dated
/// point.
pub fn sort_daily_chronologically(points: &[SeriesPoint]) -> Vec<SeriesPoint> {
    let mut keyed: Vec<_> = points
        .iter()
        .map(|p| (classify(&p.label).sort_date(), p.clone()))
        .collect();
    keyed.sort_by_key(|(date, _)| (date.is_none(), *date));
    keyed.into_iter().map(|(_, p)| p).collect()
}

/// Rank percentile with linear interpolation between order statistics.
///
/// `p` is in `0..=100` (clamped). Returns `None` for an empty input; a single
/// value is returned as-is for every `p`.
pub fn rank_percentile(values: &[f64], p: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let p = p.clamp(0.0, 100.0);
    let index = p / 100.0 * (sorted.len() - 1) as f64;
    let lower = index.floor() as usize;
    let fraction = index - lower as f64;

    if lower + 1 < sorted.len() {
        Some(sorted[lower] + fraction * (sorted[lower + 1] - sorted[lower]))
    } else {
        Some(sorted[lower])
    }
}

/// Interquartile range (p75 - p25).
pub fn interquartile_range(values: &[f64]) -> Option<f64> {
    Some(rank_percentile(values, 75.0)? - rank_percentile(values, 25.0)?)
}

/// Five-number summary; all fields are zero for an empty input.
///
/// Whiskers are the raw minimum and maximum, without outlier trimming.
pub fn summarize(values: &[f64]) -> SummaryStats {
    if values.is_empty() {
        return SummaryStats::default();
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    SummaryStats {
        median: rank_percentile(values, 50.0).unwrap_or(0.0),
        q1: rank_percentile(values, 25.0).unwrap_or(0.0),
        q3: rank_percentile(values, 75.0).unwrap_or(0.0),
        min,
        max,
    }
}

#[cfg(test)]
#[path = "aggregation_tests.rs"]
mod tests;
