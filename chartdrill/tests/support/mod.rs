#![allow(dead_code)]

use std::sync::Mutex;

use chartdrill::api::{AnalysisRequest, AnalysisType, ChartType, DataSource};
use chartdrill::config::ENV_OVERRIDES;
use serde_json::json;

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Runs `f` with exactly `vars` set among the `CHARTDRILL_*` overrides.
///
/// Every other override is cleared for the duration of `f`, and all of them
/// are put back afterwards, even on panic.
pub fn with_client_env<R>(vars: &[(&str, &str)], f: impl FnOnce() -> R) -> R {
    let _lock = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let _saved = SavedOverrides::capture();
    for key in ENV_OVERRIDES {
        std::env::remove_var(key);
    }
    for (key, value) in vars {
        assert!(
            ENV_OVERRIDES.contains(key),
            "{} is not a chartdrill override",
            key
        );
        std::env::set_var(key, value);
    }
    f()
}

struct SavedOverrides(Vec<(&'static str, Option<String>)>);

impl SavedOverrides {
    fn capture() -> Self {
        Self(
            ENV_OVERRIDES
                .iter()
                .map(|key| (*key, std::env::var(key).ok()))
                .collect(),
        )
    }
}

impl Drop for SavedOverrides {
    fn drop(&mut self) {
        for (key, value) in &self.0 {
            match value {
                Some(value) => std::env::set_var(key, value),
                None => std::env::remove_var(key),
            }
        }
    }
}

/// Column analysis grouped by a date column.
pub fn sales_by_date(chart_type: ChartType) -> AnalysisRequest {
    AnalysisRequest::new(
        DataSource::Column {
            column: "Sales".to_string(),
        },
        AnalysisType::Sum,
        chart_type,
    )
    .with_reference_column("Date")
    .with_data_label("Sales")
}

/// Daily values spanning two months, out of order.
pub fn monthly_payload() -> serde_json::Value {
    json!({
        "result": {"value": 10.0},
        "chart_data": {
            "labels": ["2023-02-01", "2023-01-15", "2023-01-02", "2023-02-20"],
            "values": [5, 3, 2, null]
        }
    })
}

/// Daily values of February 2023, out of order.
pub fn february_payload() -> serde_json::Value {
    json!({
        "result": {"value": 5.0},
        "chart_data": {
            "labels": ["2023-02-20", "2023-02-01"],
            "values": [0, 5]
        },
        "status": "Daily values for Feb 2023"
    })
}
