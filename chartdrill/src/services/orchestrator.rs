//! Single entry point for UI collaborators.
//!
//! The orchestrator composes the job lifecycle, the drill-down controller and
//! the chart builder. Every user action returns the new chart record (or
//! `None` when superseded / nothing to do) and notifies the registered
//! [`ChartEvents`] sink.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use crate::api::{
    AnalysisRequest, ChartDataRecord, ChartType, DrillTarget, ErrorKind, Granularity,
};
use crate::client::AnalysisBackend;
use crate::config::ClientConfig;
use crate::error::{AnalysisError, CoreResult};
use crate::export::{ExportError, SessionSnapshot};
use crate::services::drill_down::{DrillDownController, DrillState, DrillView, ResetPolicy};
use crate::services::job_lifecycle::{Job, JobLifecycle, LifecyclePhase, PollSettings};

/// Notifications delivered to the UI layer.
pub trait ChartEvents: Send + Sync {
    /// A new chart record is ready to render.
    fn on_chart_data_ready(
        &self,
        record: &ChartDataRecord,
        chart_type: ChartType,
        granularity: Granularity,
    );

    /// A user-facing failure; concurrency rejections are not reported.
    fn on_error(&self, kind: ErrorKind, message: &str);

    /// The displayed granularity changed or was re-confirmed.
    fn on_drill_state_changed(&self, granularity: Granularity);
}

/// Sink that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEvents;

impl ChartEvents for NoopEvents {
    fn on_chart_data_ready(&self, _: &ChartDataRecord, _: ChartType, _: Granularity) {}
    fn on_error(&self, _: ErrorKind, _: &str) {}
    fn on_drill_state_changed(&self, _: Granularity) {}
}

/// One emitted event, as recorded by [`EventLog`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ChartEvent {
    ChartDataReady {
        record: ChartDataRecord,
        chart_type: ChartType,
        granularity: Granularity,
    },
    Error {
        kind: ErrorKind,
        message: String,
    },
    DrillStateChanged {
        granularity: Granularity,
    },
}

/// Sink that keeps every event in order.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<ChartEvent>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ChartEvent> {
        self.events.lock().clone()
    }

    /// Drain recorded events.
    pub fn take(&self) -> Vec<ChartEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn errors(&self) -> Vec<(ErrorKind, String)> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                ChartEvent::Error { kind, message } => Some((*kind, message.clone())),
                _ => None,
            })
            .collect()
    }
}

impl ChartEvents for EventLog {
    fn on_chart_data_ready(
        &self,
        record: &ChartDataRecord,
        chart_type: ChartType,
        granularity: Granularity,
    ) {
        self.events.lock().push(ChartEvent::ChartDataReady {
            record: record.clone(),
            chart_type,
            granularity,
        });
    }

    fn on_error(&self, kind: ErrorKind, message: &str) {
        self.events.lock().push(ChartEvent::Error {
            kind,
            message: message.to_string(),
        });
    }

    fn on_drill_state_changed(&self, granularity: Granularity) {
        self.events
            .lock()
            .push(ChartEvent::DrillStateChanged { granularity });
    }
}

/// Session facade over the analysis core.
pub struct AnalysisOrchestrator {
    lifecycle: Arc<JobLifecycle>,
    controller: DrillDownController,
    events: Arc<dyn ChartEvents>,
}

impl AnalysisOrchestrator {
    pub fn new(
        backend: Arc<dyn AnalysisBackend>,
        settings: PollSettings,
        reset_policy: ResetPolicy,
        events: Arc<dyn ChartEvents>,
    ) -> Self {
        let lifecycle = Arc::new(JobLifecycle::new(backend, settings));
        let controller = DrillDownController::new(Arc::clone(&lifecycle), reset_policy);
        Self {
            lifecycle,
            controller,
            events,
        }
    }

    pub fn from_config(
        config: &ClientConfig,
        backend: Arc<dyn AnalysisBackend>,
        events: Arc<dyn ChartEvents>,
    ) -> Self {
        Self::new(
            backend,
            config.poll_settings(),
            config.drill_down.reset_policy,
            events,
        )
    }

    /// Submit a fresh analysis; supersedes anything in progress.
    pub async fn submit(&self, request: AnalysisRequest) -> CoreResult<Option<ChartDataRecord>> {
        let outcome = self.controller.load(request).await;
        self.present(outcome)
    }

    /// Show the daily values of `target`.
    pub async fn drill_down(&self, target: DrillTarget) -> CoreResult<Option<ChartDataRecord>> {
        let outcome = self.controller.request_drill_down(target).await;
        self.present(outcome)
    }

    /// Handle a click on a chart label; only month labels drill down.
    pub async fn chart_clicked(&self, label: &str) -> CoreResult<Option<ChartDataRecord>> {
        match self.controller.drill_target_for_click(label) {
            Some(target) => self.drill_down(target).await,
            None => Ok(None),
        }
    }

    /// Return to the monthly view; a no-op when already monthly.
    pub async fn reset_to_monthly(&self) -> CoreResult<Option<ChartDataRecord>> {
        let outcome = self.controller.reset_to_monthly().await;
        self.present(outcome)
    }

    /// Export the base request and its monthly result, if anything is loaded.
    pub fn snapshot(&self) -> Result<Option<SessionSnapshot>, ExportError> {
        let state = self.controller.drill_state();
        match (self.controller.base_request(), state.last_monthly_result) {
            (Some(request), Some(result)) => SessionSnapshot::new(request, result).map(Some),
            _ => Ok(None),
        }
    }

    /// Re-render an exported session as the monthly view.
    ///
    /// The snapshot is verified first; a corrupt snapshot is reported as a
    /// malformed response.
    pub fn restore(&self, snapshot: &SessionSnapshot) -> CoreResult<ChartDataRecord> {
        let outcome = snapshot
            .verify()
            .map_err(|e| AnalysisError::malformed(e.to_string()).with_operation("restore"))
            .and_then(|_| {
                self.controller
                    .restore(snapshot.request.clone(), snapshot.result.clone())
            })
            .map(Some);
        self.present(outcome)?
            .ok_or_else(|| AnalysisError::malformed("snapshot produced no chart"))
    }

    pub fn drill_state(&self) -> DrillState {
        self.controller.drill_state()
    }

    pub fn granularity(&self) -> Granularity {
        self.controller.granularity()
    }

    pub fn lifecycle_phase(&self) -> LifecyclePhase {
        self.lifecycle.phase()
    }

    pub fn current_job(&self) -> Option<Job> {
        self.lifecycle.current_job()
    }

    fn present(
        &self,
        outcome: CoreResult<Option<DrillView>>,
    ) -> CoreResult<Option<ChartDataRecord>> {
        match outcome {
            Ok(Some(view)) => {
                let record = view.record();
                if let Some(ref status) = view.result.status {
                    log::info!("Analysis status: {}", status);
                }
                self.events
                    .on_chart_data_ready(&record, view.request.chart_type, view.granularity);
                self.events.on_drill_state_changed(view.granularity);
                Ok(Some(record))
            }
            Ok(None) => Ok(None),
            Err(err) => {
                if err.kind().is_user_facing() {
                    self.events.on_error(err.kind(), err.message());
                } else {
                    log::debug!("Dropping rejected request: {}", err);
                }
                Err(err)
            }
        }
    }
}
