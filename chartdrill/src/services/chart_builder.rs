//! Turns an analysis result into a renderer-agnostic chart record.
//!
//! The builder is pure: the same result and context always produce the same
//! record. Date handling only kicks in when a reference column is set and
//! every label is a recognized date; anything else passes through unchanged.

use crate::api::{
    AnalysisRequest, AnalysisResult, ChartDataRecord, ChartType, DrillTarget, Granularity,
    SeriesPoint,
};
use crate::services::aggregation::{aggregate_monthly, sort_daily_chronologically, summarize};
use crate::services::date_classifier::is_date_sequence;

/// Series label used when neither the payload nor the request names one.
pub const DEFAULT_SERIES_LABEL: &str = "Data";

/// Everything besides the result that shapes a chart record.
#[derive(Debug, Clone, Copy)]
pub struct BuildContext<'a> {
    pub chart_type: ChartType,
    pub granularity: Granularity,
    pub drill_target: Option<DrillTarget>,
    pub reference_column: Option<&'a str>,
    pub data_label: Option<&'a str>,
}

impl<'a> BuildContext<'a> {
    /// Context for rendering the result of `request` at `granularity`.
    pub fn for_request(request: &'a AnalysisRequest, granularity: Granularity) -> Self {
        Self {
            chart_type: request.chart_type,
            granularity,
            drill_target: request.drill_down,
            reference_column: request.reference_column.as_deref(),
            data_label: request.data_label.as_deref(),
        }
    }
}

/// Build the chart record for `result`.
pub fn build(result: &AnalysisResult, ctx: &BuildContext<'_>) -> ChartDataRecord {
    let series_label = series_label(result, ctx);

    if ctx.chart_type.is_distribution_summary() {
        let stats = summarize(&result.chart_data.numeric_values());
        let mut record =
            ChartDataRecord::new(vec![series_label.clone()], vec![stats.iqr()], series_label);
        record.summary_stats = Some(stats);
        return record;
    }

    let points = arrange_points(result.chart_data.points(), ctx);
    let (labels, values): (Vec<String>, Vec<f64>) = points
        .into_iter()
        .map(|p| {
            let value = p.value_or_zero();
            (p.label, value)
        })
        .unzip();

    let percentages = ctx
        .chart_type
        .is_proportional()
        .then(|| percentages(&values));
    let mut record = ChartDataRecord::new(labels, values, series_label);
    record.percentages = percentages;
    record
}

/// Share of the total for each value, in percent rounded to one decimal.
///
/// Rounded shares are not adjusted to sum to exactly 100. A zero total gives
/// all zeros.
pub fn percentages(values: &[f64]) -> Vec<f64> {
    let total: f64 = values.iter().sum();
    if total == 0.0 {
        return vec![0.0; values.len()];
    }
    values
        .iter()
        .map(|v| (v / total * 1000.0).round() / 10.0)
        .collect()
}

fn series_label(result: &AnalysisResult, ctx: &BuildContext<'_>) -> String {
    let base = result
        .chart_data
        .label
        .as_deref()
        .or(ctx.data_label)
        .unwrap_or(DEFAULT_SERIES_LABEL);
    match (ctx.granularity, ctx.drill_target) {
        (Granularity::Daily, Some(target)) => format!("{} ({})", base, target),
        _ => base.to_string(),
    }
}

fn arrange_points(points: Vec<SeriesPoint>, ctx: &BuildContext<'_>) -> Vec<SeriesPoint> {
    if ctx.reference_column.is_none() {
        return points;
    }
    let labels: Vec<&str> = points.iter().map(|p| p.label.as_str()).collect();
    if !is_date_sequence(&labels) {
        return points;
    }
    match ctx.granularity {
        Granularity::Monthly => {
            let series = aggregate_monthly(&points);
            series
                .labels()
                .into_iter()
                .zip(series.totals())
                .map(|(label, total)| SeriesPoint::new(label, total))
                .collect()
        }
        Granularity::Daily => sort_daily_chronologically(&points),
    }
}

#[cfg(test)]
#[path = "chart_builder_tests.rs"]
mod tests;
