//! Renderer-agnostic chart records and aggregation outputs.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::request::YearMonth;

/// Level of time aggregation currently displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    #[default]
    Monthly,
    Daily,
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Granularity::Monthly => f.write_str("monthly"),
            Granularity::Daily => f.write_str("daily"),
        }
    }
}

/// One calendar-month grouping produced by aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthBucket {
    pub month: YearMonth,
    pub total: f64,
}

impl MonthBucket {
    /// Bucket label in "MMM yyyy" form.
    pub fn label(&self) -> String {
        self.month.to_string()
    }
}

/// Monthly buckets in ascending calendar order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AggregatedSeries {
    pub buckets: Vec<MonthBucket>,
}

impl AggregatedSeries {
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn labels(&self) -> Vec<String> {
        self.buckets.iter().map(MonthBucket::label).collect()
    }

    pub fn totals(&self) -> Vec<f64> {
        self.buckets.iter().map(|b| b.total).collect()
    }
}

/// Five-number summary for box views.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SummaryStats {
    pub median: f64,
    pub q1: f64,
    pub q3: f64,
    pub min: f64,
    pub max: f64,
}

impl SummaryStats {
    /// Interquartile range (q3 - q1).
    pub fn iqr(&self) -> f64 {
        self.q3 - self.q1
    }
}

/// Chart data handed to the external renderer.
///
/// `labels[i]` pairs with `values[i]`; both always have the same length.
/// Deserialization enforces the same pairing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RecordFields")]
pub struct ChartDataRecord {
    labels: Vec<String>,
    values: Vec<f64>,
    pub series_label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentages: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_stats: Option<SummaryStats>,
}

impl ChartDataRecord {
    /// Build a record from paired labels and values.
    ///
    /// Extra entries on the longer side are dropped so the pairing holds.
    pub fn new(
        mut labels: Vec<String>,
        mut values: Vec<f64>,
        series_label: impl Into<String>,
    ) -> Self {
        let len = labels.len().min(values.len());
        labels.truncate(len);
        values.truncate(len);
        Self {
            labels,
            values,
            series_label: series_label.into(),
            percentages: None,
            summary_stats: None,
        }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Percentages formatted with one decimal, e.g. "25.0".
    pub fn formatted_percentages(&self) -> Option<Vec<String>> {
        self.percentages
            .as_ref()
            .map(|p| p.iter().map(|v| format!("{:.1}", v)).collect())
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordFields {
    labels: Vec<String>,
    values: Vec<f64>,
    series_label: String,
    #[serde(default)]
    percentages: Option<Vec<f64>>,
    #[serde(default)]
    summary_stats: Option<SummaryStats>,
}

impl TryFrom<RecordFields> for ChartDataRecord {
    type Error = String;

    fn try_from(fields: RecordFields) -> Result<Self, Self::Error> {
        if fields.labels.len() != fields.values.len() {
            return Err(format!(
                "chart record has {} labels but {} values",
                fields.labels.len(),
                fields.values.len()
            ));
        }
        if let Some(ref percentages) = fields.percentages {
            if percentages.len() != fields.values.len() {
                return Err(format!(
                    "chart record has {} percentages for {} values",
                    percentages.len(),
                    fields.values.len()
                ));
            }
        }
        Ok(Self {
            labels: fields.labels,
            values: fields.values,
            series_label: fields.series_label,
            percentages: fields.percentages,
            summary_stats: fields.summary_stats,
        })
    }
}
