//! Analysis results and the wire DTOs of the analysis service.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::AnalysisError;

/// A labelled value of a series; `value` is `None` when the service sent a
/// missing or non-numeric entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub label: String,
    pub value: Option<f64>,
}

impl SeriesPoint {
    pub fn new(label: impl Into<String>, value: f64) -> Self {
        Self {
            label: label.into(),
            value: Some(value),
        }
    }

    pub fn missing(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: None,
        }
    }

    /// The value with missing entries counted as zero.
    pub fn value_or_zero(&self) -> f64 {
        self.value.unwrap_or(0.0)
    }
}

/// The statistic computed by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Statistic {
    Regression {
        slope: f64,
        intercept: f64,
        r_squared: f64,
    },
    Descriptive {
        mean: f64,
        median: f64,
        std_dev: f64,
        variance: f64,
        min: f64,
        max: f64,
        quartiles: [f64; 4],
    },
    Scalar {
        #[serde(deserialize_with = "lenient_number")]
        value: Option<f64>,
    },
}

/// Chart series returned alongside the statistic.
///
/// Summary-only payloads carry a single `label` and no `labels`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChartData {
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default, deserialize_with = "lenient_numbers")]
    pub values: Vec<Option<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl ChartData {
    /// Pair labels with values, synthesizing index labels when the payload
    /// has values only.
    pub fn points(&self) -> Vec<SeriesPoint> {
        if self.labels.is_empty() {
            return self
                .values
                .iter()
                .enumerate()
                .map(|(idx, value)| SeriesPoint {
                    label: idx.to_string(),
                    value: *value,
                })
                .collect();
        }
        self.labels
            .iter()
            .zip(self.values.iter())
            .map(|(label, value)| SeriesPoint {
                label: label.clone(),
                value: *value,
            })
            .collect()
    }

    /// Rebuild chart data from an ordered point sequence, keeping the label.
    pub fn from_points(points: Vec<SeriesPoint>, label: Option<String>) -> Self {
        let (labels, values) = points.into_iter().map(|p| (p.label, p.value)).unzip();
        Self {
            labels,
            values,
            label,
        }
    }

    /// Numeric values only, in payload order.
    pub fn numeric_values(&self) -> Vec<f64> {
        self.values.iter().flatten().copied().collect()
    }
}

/// A successfully computed analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(rename = "result")]
    pub statistic: Statistic,
    pub chart_data: ChartData,
    /// Informational message, e.g. "No day-wise data for Feb 2023"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl AnalysisResult {
    /// Decode the `result` payload of a `SUCCESS` poll response.
    ///
    /// The statistic is read from a nested `result` object when present,
    /// otherwise from the payload itself. A payload that reports
    /// `state: FAILURE` is turned into a job failure, and one carrying an
    /// `error` message into a server-reported error.
    pub fn from_payload(payload: serde_json::Value) -> Result<Self, AnalysisError> {
        let object = payload
            .as_object()
            .ok_or_else(|| AnalysisError::malformed("result payload is not an object"))?;

        if object.get("state").and_then(|s| s.as_str()) == Some("FAILURE") {
            let status = object
                .get("status")
                .and_then(|s| s.as_str())
                .unwrap_or("unknown error");
            return Err(AnalysisError::job_failure(status.to_string()));
        }
        if let Some(error) = object.get("error").and_then(|e| e.as_str()) {
            return Err(AnalysisError::server_reported(error));
        }

        let chart_data = object
            .get("chart_data")
            .cloned()
            .ok_or_else(|| AnalysisError::malformed("result payload has no chart_data"))?;
        let chart_data: ChartData = serde_json::from_value(chart_data)
            .map_err(|e| AnalysisError::malformed(format!("invalid chart_data: {}", e)))?;
        if !chart_data.labels.is_empty() && chart_data.labels.len() != chart_data.values.len() {
            return Err(AnalysisError::malformed(format!(
                "chart_data has {} labels but {} values",
                chart_data.labels.len(),
                chart_data.values.len()
            )));
        }

        let statistic_source = match object.get("result") {
            Some(nested) if nested.is_object() => nested.clone(),
            _ => payload.clone(),
        };
        let statistic: Statistic = serde_json::from_value(statistic_source)
            .map_err(|_| AnalysisError::malformed("result payload has no recognizable statistic"))?;

        let status = object
            .get("status")
            .and_then(|s| s.as_str())
            .map(str::to_string);

        Ok(Self {
            statistic,
            chart_data,
            status,
        })
    }

    /// Copy of this result with its chart series replaced.
    pub fn with_chart_data(&self, chart_data: ChartData) -> Self {
        Self {
            chart_data,
            ..self.clone()
        }
    }
}

/// Reply to a submission: a task id, or an error message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SubmitResponse {
    Accepted { task_id: String },
    Rejected { error: String },
}

/// Task states reported by the analysis service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    Pending,
    Started,
    Retry,
    Success,
    Failure,
    Revoked,
    #[serde(other)]
    Unknown,
}

/// Reply to a status poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollResponse {
    pub state: TaskState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl PollResponse {
    pub fn pending() -> Self {
        Self {
            state: TaskState::Pending,
            result: None,
            status: Some("Processing...".to_string()),
        }
    }

    pub fn success(result: serde_json::Value) -> Self {
        Self {
            state: TaskState::Success,
            result: Some(result),
            status: None,
        }
    }

    pub fn failure(status: impl Into<String>) -> Self {
        Self {
            state: TaskState::Failure,
            result: None,
            status: Some(status.into()),
        }
    }
}

fn to_number(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(to_number(&raw))
}

fn lenient_numbers<'de, D>(deserializer: D) -> Result<Vec<Option<f64>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.iter().map(to_number).collect())
}
