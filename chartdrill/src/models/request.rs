//! Analysis request types.
//!
//! An [`AnalysisRequest`] is an immutable value: drill-down and reset actions
//! derive new requests from the base request instead of mutating it.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// Three-letter month abbreviations, January first.
pub const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Resolve a 3–4 letter month abbreviation (case-insensitive) to its number.
///
/// Besides the twelve three-letter forms, the common four-letter spellings
/// "Sept", "June" and "July" are accepted.
pub fn month_from_abbreviation(abbr: &str) -> Option<u32> {
    let lower = abbr.to_ascii_lowercase();
    let four_letter = match lower.as_str() {
        "sept" => Some(9),
        "june" => Some(6),
        "july" => Some(7),
        _ => None,
    };
    if four_letter.is_some() {
        return four_letter;
    }
    MONTH_ABBREVIATIONS
        .iter()
        .position(|m| m.eq_ignore_ascii_case(&lower))
        .map(|idx| idx as u32 + 1)
}

/// A calendar month of a specific year.
///
/// Used both as the monthly bucket key and as the drill-down target. Ordering
/// is chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "YearMonthWire", try_from = "YearMonthWire")]
pub struct YearMonth(NaiveDate);

/// Drill-down target: the month whose daily values should be shown.
pub type DrillTarget = YearMonth;

impl YearMonth {
    /// Create a year/month pair, validating that the month exists.
    pub fn new(year: i32, month: u32) -> Result<Self, AnalysisError> {
        NaiveDate::from_ymd_opt(year, month, 1)
            .map(Self)
            .ok_or_else(|| {
                AnalysisError::invalid_date(format!("{}-{:02} is not a valid month", year, month))
            })
    }

    /// The month containing `date`.
    pub fn of(date: NaiveDate) -> Self {
        Self(date.with_day(1).unwrap_or(date))
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    /// First day of the month.
    pub fn first_day(&self) -> NaiveDate {
        self.0
    }

    /// Three-letter month abbreviation, e.g. "Feb".
    pub fn month_abbreviation(&self) -> &'static str {
        MONTH_ABBREVIATIONS[self.0.month0() as usize]
    }
}

impl fmt::Display for YearMonth {
    /// Formats as "MMM yyyy", e.g. "Feb 2023".
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:04}", self.month_abbreviation(), self.year())
    }
}

impl FromStr for YearMonth {
    type Err = AnalysisError;

    /// Parse a "MMM yyyy" label such as "Feb 2023" or "Sept 2023".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            AnalysisError::invalid_date(format!(
                "'{}' is not a month label; expected \"MMM yyyy\" (e.g. \"Jan 2023\")",
                s
            ))
        };
        let (month_part, year_part) = s.split_once(' ').ok_or_else(invalid)?;
        if !(3..=4).contains(&month_part.len())
            || !month_part.chars().all(|c| c.is_ascii_alphabetic())
            || year_part.len() != 4
            || !year_part.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid());
        }
        let month = month_from_abbreviation(month_part).ok_or_else(invalid)?;
        let year: i32 = year_part.parse().map_err(|_| invalid())?;
        Self::new(year, month)
    }
}

/// Wire shape of a drill-down target: `{"month": "Feb", "year": "2023"}`.
///
/// The year is accepted as either a string or a number.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct YearMonthWire {
    month: String,
    year: serde_json::Value,
}

impl From<YearMonth> for YearMonthWire {
    fn from(ym: YearMonth) -> Self {
        Self {
            month: ym.month_abbreviation().to_string(),
            year: serde_json::Value::String(format!("{:04}", ym.year())),
        }
    }
}

impl TryFrom<YearMonthWire> for YearMonth {
    type Error = AnalysisError;

    fn try_from(wire: YearMonthWire) -> Result<Self, Self::Error> {
        let month = month_from_abbreviation(&wire.month).ok_or_else(|| {
            AnalysisError::invalid_date(format!("unknown month abbreviation '{}'", wire.month))
        })?;
        let year = match &wire.year {
            serde_json::Value::Number(n) => n.as_i64().and_then(|y| i32::try_from(y).ok()),
            serde_json::Value::String(s) => s.trim().parse::<i32>().ok(),
            _ => None,
        }
        .ok_or_else(|| AnalysisError::invalid_date(format!("invalid year {}", wire.year)))?;
        Self::new(year, month)
    }
}

/// Where the values to analyze come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataSource {
    /// Values typed in directly.
    Inline { values: Vec<f64> },
    /// A numeric column of a previously uploaded file.
    Column { column: String },
}

/// The statistic the backend should compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisType {
    Mean,
    Median,
    Mode,
    Sum,
    StdDev,
    Variance,
    Regression,
    Descriptive,
}

impl AnalysisType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisType::Mean => "mean",
            AnalysisType::Median => "median",
            AnalysisType::Mode => "mode",
            AnalysisType::Sum => "sum",
            AnalysisType::StdDev => "std_dev",
            AnalysisType::Variance => "variance",
            AnalysisType::Regression => "regression",
            AnalysisType::Descriptive => "descriptive",
        }
    }
}

impl FromStr for AnalysisType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mean" | "average" => Ok(Self::Mean),
            "median" => Ok(Self::Median),
            "mode" => Ok(Self::Mode),
            "sum" | "total" => Ok(Self::Sum),
            "std_dev" | "stddev" | "std" => Ok(Self::StdDev),
            "variance" | "var" => Ok(Self::Variance),
            "regression" | "linear_regression" => Ok(Self::Regression),
            "descriptive" | "summary" => Ok(Self::Descriptive),
            _ => Err(format!("Unknown analysis type: {}", s)),
        }
    }
}

/// Chart kind requested by the user; decides how the record is shaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChartType {
    #[serde(rename = "bar")]
    Bar,
    #[serde(rename = "line")]
    Line,
    #[serde(rename = "scatter")]
    Scatter,
    #[serde(rename = "pie")]
    Pie,
    #[serde(rename = "doughnut")]
    Doughnut,
    #[serde(rename = "polarArea")]
    PolarArea,
    #[serde(rename = "box")]
    Box,
}

impl ChartType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartType::Bar => "bar",
            ChartType::Line => "line",
            ChartType::Scatter => "scatter",
            ChartType::Pie => "pie",
            ChartType::Doughnut => "doughnut",
            ChartType::PolarArea => "polarArea",
            ChartType::Box => "box",
        }
    }

    /// Chart types that show each value as a portion of the whole.
    pub fn is_proportional(&self) -> bool {
        matches!(self, ChartType::Pie | ChartType::Doughnut | ChartType::PolarArea)
    }

    /// Chart types that summarize the distribution instead of plotting pairs.
    pub fn is_distribution_summary(&self) -> bool {
        matches!(self, ChartType::Box)
    }
}

impl fmt::Display for ChartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bar" => Ok(Self::Bar),
            "line" => Ok(Self::Line),
            "scatter" => Ok(Self::Scatter),
            "pie" => Ok(Self::Pie),
            "doughnut" => Ok(Self::Doughnut),
            "polararea" | "polar_area" => Ok(Self::PolarArea),
            "box" | "boxplot" => Ok(Self::Box),
            _ => Err(format!("Unknown chart type: {}", s)),
        }
    }
}

/// One analysis submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub source: DataSource,
    pub analysis_type: AnalysisType,
    pub chart_type: ChartType,
    /// Column the values are grouped by (dates enable drill-down)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_column: Option<String>,
    /// User-supplied series label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drill_down: Option<DrillTarget>,
}

impl AnalysisRequest {
    pub fn new(source: DataSource, analysis_type: AnalysisType, chart_type: ChartType) -> Self {
        Self {
            source,
            analysis_type,
            chart_type,
            reference_column: None,
            data_label: None,
            drill_down: None,
        }
    }

    pub fn with_reference_column(mut self, column: impl Into<String>) -> Self {
        self.reference_column = Some(column.into());
        self
    }

    pub fn with_data_label(mut self, label: impl Into<String>) -> Self {
        self.data_label = Some(label.into());
        self
    }

    /// Derive the drill-down request for `target`.
    pub fn with_drill_target(&self, target: DrillTarget) -> Self {
        Self {
            drill_down: Some(target),
            ..self.clone()
        }
    }

    /// Derive the plain (monthly) request.
    pub fn without_drill_target(&self) -> Self {
        Self {
            drill_down: None,
            ..self.clone()
        }
    }

    pub fn is_drill_down(&self) -> bool {
        self.drill_down.is_some()
    }

    /// Form fields understood by the analysis service's submit endpoint.
    pub fn to_form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = Vec::with_capacity(7);
        match &self.source {
            DataSource::Inline { values } => {
                let joined = values
                    .iter()
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join(",");
                fields.push(("data", joined));
            }
            DataSource::Column { column } => fields.push(("column_select", column.clone())),
        }
        fields.push(("analysis_type", self.analysis_type.as_str().to_string()));
        fields.push(("chart_type", self.chart_type.as_str().to_string()));
        if let Some(ref column) = self.reference_column {
            fields.push(("reference_column_select", column.clone()));
        }
        if let Some(ref label) = self.data_label {
            fields.push(("data_label", label.clone()));
        }
        if let Some(target) = self.drill_down {
            let wire = serde_json::json!({
                "month": target.month_abbreviation(),
                "year": format!("{:04}", target.year()),
            });
            fields.push(("drill_down", wire.to_string()));
        }
        fields
    }
}
