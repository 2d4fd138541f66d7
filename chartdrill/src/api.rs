//! Public API surface of the analysis core.
//!
//! This file consolidates the value types exchanged with collaborators (the UI,
//! the renderer and the analysis service). All of them derive
//! Serialize/Deserialize.

pub use crate::error::{AnalysisError, ErrorContext, ErrorKind};
pub use crate::models::chart::AggregatedSeries;
pub use crate::models::chart::ChartDataRecord;
pub use crate::models::chart::Granularity;
pub use crate::models::chart::MonthBucket;
pub use crate::models::chart::SummaryStats;
pub use crate::models::request::AnalysisRequest;
pub use crate::models::request::AnalysisType;
pub use crate::models::request::ChartType;
pub use crate::models::request::DataSource;
pub use crate::models::request::DrillTarget;
pub use crate::models::request::YearMonth;
pub use crate::models::result::AnalysisResult;
pub use crate::models::result::ChartData;
pub use crate::models::result::PollResponse;
pub use crate::models::result::SeriesPoint;
pub use crate::models::result::Statistic;
pub use crate::models::result::SubmitResponse;
pub use crate::models::result::TaskState;

use std::fmt;

use serde::{Deserialize, Serialize};

/// Backend task identifier for a submitted analysis.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub String);

impl JobId {
    pub fn new(value: impl Into<String>) -> Self {
        JobId(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for JobId {
    fn from(value: String) -> Self {
        JobId(value)
    }
}
