//! Monthly ⇄ daily drill-down state machine.
//!
//! The controller owns the granularity currently shown, the base request the
//! user submitted and the last monthly result. Drill-down and reset requests
//! are guarded: while one is in flight, another is rejected rather than
//! queued. Failures never move the controller out of its last stable state.
//!
//! Invariant: `Daily` always has an active target, `Monthly` never has one.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use log::{debug, info, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::api::{
    AnalysisRequest, AnalysisResult, ChartData, ChartDataRecord, DrillTarget, Granularity,
};
use crate::error::{AnalysisError, CoreResult};
use crate::services::aggregation::sort_daily_chronologically;
use crate::services::chart_builder::{build, BuildContext};
use crate::services::date_classifier::{classify, is_date_sequence, DateClass};
use crate::services::job_lifecycle::{JobLifecycle, JobOutcome};

/// How `reset_to_monthly` obtains the monthly data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResetPolicy {
    /// Re-issue the base request.
    #[default]
    Refetch,
    /// Re-render the cached monthly result; refetch only when nothing is cached.
    RestoreCached,
}

impl FromStr for ResetPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "refetch" => Ok(Self::Refetch),
            "restore-cached" | "cached" => Ok(Self::RestoreCached),
            _ => Err(format!("Unknown reset policy: {}", s)),
        }
    }
}

impl fmt::Display for ResetPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResetPolicy::Refetch => f.write_str("refetch"),
            ResetPolicy::RestoreCached => f.write_str("restore-cached"),
        }
    }
}

/// Observable controller phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DrillPhase {
    Monthly,
    /// A drill-down or reset is in flight.
    DrillingDown,
    Daily,
}

/// Granularity and drill context of the displayed chart.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DrillState {
    pub granularity: Granularity,
    pub reference_column: Option<String>,
    pub last_monthly_result: Option<AnalysisResult>,
    pub active_drill_target: Option<DrillTarget>,
}

/// A result together with the request and granularity it is shown at.
#[derive(Debug, Clone, PartialEq)]
pub struct DrillView {
    pub request: AnalysisRequest,
    pub result: AnalysisResult,
    pub granularity: Granularity,
}

impl DrillView {
    /// Chart record for this view.
    pub fn record(&self) -> ChartDataRecord {
        build(
            &self.result,
            &BuildContext::for_request(&self.request, self.granularity),
        )
    }
}

#[derive(Debug, Default)]
struct ControllerState {
    drill: DrillState,
    base_request: Option<AnalysisRequest>,
    in_flight: bool,
}

/// Clears the in-flight flag when dropped, on every exit path.
struct InFlightGuard<'a> {
    state: &'a Mutex<ControllerState>,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.state.lock().in_flight = false;
    }
}

/// Drill-down controller over a shared [`JobLifecycle`].
pub struct DrillDownController {
    lifecycle: Arc<JobLifecycle>,
    reset_policy: ResetPolicy,
    state: Mutex<ControllerState>,
}

impl DrillDownController {
    pub fn new(lifecycle: Arc<JobLifecycle>, reset_policy: ResetPolicy) -> Self {
        Self {
            lifecycle,
            reset_policy,
            state: Mutex::new(ControllerState::default()),
        }
    }

    pub fn reset_policy(&self) -> ResetPolicy {
        self.reset_policy
    }

    pub fn drill_state(&self) -> DrillState {
        self.state.lock().drill.clone()
    }

    pub fn granularity(&self) -> Granularity {
        self.state.lock().drill.granularity
    }

    /// The last request submitted through [`load`](Self::load).
    pub fn base_request(&self) -> Option<AnalysisRequest> {
        self.state.lock().base_request.clone()
    }

    pub fn phase(&self) -> DrillPhase {
        let state = self.state.lock();
        if state.in_flight {
            return DrillPhase::DrillingDown;
        }
        match state.drill.granularity {
            Granularity::Monthly => DrillPhase::Monthly,
            Granularity::Daily => DrillPhase::Daily,
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.state.lock().in_flight
    }

    /// Submit a fresh analysis and show it monthly.
    ///
    /// Supersedes any job still running, including a pending drill-down.
    /// Returns `Ok(None)` when this submission was itself superseded.
    pub async fn load(&self, request: AnalysisRequest) -> CoreResult<Option<DrillView>> {
        let request = request.without_drill_target();
        let result = match self.lifecycle.run(&request).await? {
            JobOutcome::Completed(result) => result,
            JobOutcome::Superseded => return Ok(None),
        };

        let mut state = self.state.lock();
        state.drill = DrillState {
            granularity: Granularity::Monthly,
            reference_column: request.reference_column.clone(),
            last_monthly_result: Some(result.clone()),
            active_drill_target: None,
        };
        state.base_request = Some(request.clone());
        info!("Loaded analysis, showing monthly view");

        Ok(Some(DrillView {
            request,
            result,
            granularity: Granularity::Monthly,
        }))
    }

    /// Fetch the daily values of `target` and switch to the daily view.
    ///
    /// # Errors
    /// * `ConcurrencyRejected` - Another drill-down or reset is in flight, or
    ///   nothing has been loaded yet
    /// * Any lifecycle error; the current view is kept
    pub async fn request_drill_down(&self, target: DrillTarget) -> CoreResult<Option<DrillView>> {
        let _guard = self.acquire("drill_down")?;
        let base = self.loaded_base("drill_down")?;
        let drill_request = base.with_drill_target(target);
        debug!("Drilling down into {}", target);

        let result = match self.lifecycle.run(&drill_request).await? {
            JobOutcome::Completed(result) => result,
            JobOutcome::Superseded => return Ok(None),
        };
        let result = sort_daily_result(result);

        let mut state = self.state.lock();
        state.drill.granularity = Granularity::Daily;
        state.drill.active_drill_target = Some(target);
        info!("Showing daily view for {}", target);

        Ok(Some(DrillView {
            request: drill_request,
            result,
            granularity: Granularity::Daily,
        }))
    }

    /// Return to the monthly view.
    ///
    /// From the monthly view this is a no-op returning `Ok(None)`.
    pub async fn reset_to_monthly(&self) -> CoreResult<Option<DrillView>> {
        let _guard = self.acquire("reset")?;

        let (granularity, cached) = {
            let state = self.state.lock();
            (
                state.drill.granularity,
                state.drill.last_monthly_result.clone(),
            )
        };
        if granularity == Granularity::Monthly {
            self.state.lock().drill.active_drill_target = None;
            return Ok(None);
        }
        let base = self.loaded_base("reset")?;

        let result = match (self.reset_policy, cached) {
            (ResetPolicy::RestoreCached, Some(cached)) => {
                debug!("Restoring cached monthly result");
                cached
            }
            _ => match self.lifecycle.run(&base).await? {
                JobOutcome::Completed(result) => result,
                JobOutcome::Superseded => return Ok(None),
            },
        };

        let mut state = self.state.lock();
        state.drill.granularity = Granularity::Monthly;
        state.drill.active_drill_target = None;
        state.drill.last_monthly_result = Some(result.clone());
        info!("Reset to monthly view");

        Ok(Some(DrillView {
            request: base,
            result,
            granularity: Granularity::Monthly,
        }))
    }

    /// Map a clicked chart label to a drill-down target.
    ///
    /// Only month labels of a chart with a reference column qualify.
    pub fn drill_target_for_click(&self, label: &str) -> Option<DrillTarget> {
        if self.state.lock().drill.reference_column.is_none() {
            return None;
        }
        match classify(label) {
            DateClass::MonthlyDate(month) => Some(month),
            _ => None,
        }
    }

    /// Show a previously exported result as the monthly view, without network.
    pub fn restore(
        &self,
        request: AnalysisRequest,
        result: AnalysisResult,
    ) -> CoreResult<DrillView> {
        let _guard = self.acquire("restore")?;
        let request = request.without_drill_target();

        let mut state = self.state.lock();
        state.drill = DrillState {
            granularity: Granularity::Monthly,
            reference_column: request.reference_column.clone(),
            last_monthly_result: Some(result.clone()),
            active_drill_target: None,
        };
        state.base_request = Some(request.clone());

        Ok(DrillView {
            request,
            result,
            granularity: Granularity::Monthly,
        })
    }

    fn acquire(&self, operation: &str) -> CoreResult<InFlightGuard<'_>> {
        let mut state = self.state.lock();
        if state.in_flight {
            warn!("Rejecting {}: another drill-down or reset is in flight", operation);
            return Err(AnalysisError::rejected(
                "Another drill-down or reset is already in progress",
            )
            .with_operation(operation));
        }
        state.in_flight = true;
        Ok(InFlightGuard { state: &self.state })
    }

    fn loaded_base(&self, operation: &str) -> CoreResult<AnalysisRequest> {
        self.state.lock().base_request.clone().ok_or_else(|| {
            AnalysisError::rejected("No analysis has been loaded yet").with_operation(operation)
        })
    }
}

/// Daily results are stored in chronological order.
fn sort_daily_result(result: AnalysisResult) -> AnalysisResult {
    if result.chart_data.labels.is_empty() || !is_date_sequence(&result.chart_data.labels) {
        return result;
    }
    let sorted = sort_daily_chronologically(&result.chart_data.points());
    let chart_data = ChartData::from_points(sorted, result.chart_data.label.clone());
    result.with_chart_data(chart_data)
}

#[cfg(test)]
#[path = "drill_down_tests.rs"]
mod tests;
