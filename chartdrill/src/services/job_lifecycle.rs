//! Submit → poll → resolve for one analysis request at a time.
//!
//! Each call to [`JobLifecycle::run`] starts a new generation. Older runs
//! notice at their next await point that they have been superseded and return
//! [`JobOutcome::Superseded`] without touching the lifecycle state, so a slow
//! response can never overwrite a newer one.
//!
//! A run that does not reach a terminal state within the polling budget fails
//! with a timeout; the poll loop is dropped with it, so no further polls are
//! issued even if the service never answers.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use parking_lot::Mutex;
use serde::Serialize;

use crate::api::{AnalysisRequest, AnalysisResult, JobId, SubmitResponse, TaskState};
use crate::client::AnalysisBackend;
use crate::error::{AnalysisError, CoreResult};

/// Default wait between two status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
/// Default budget for a job to reach a terminal state.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(30);

/// Polling cadence and budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_POLL_TIMEOUT,
        }
    }
}

/// Where the lifecycle currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecyclePhase {
    Idle,
    Submitting,
    Polling,
    Succeeded,
    Failed,
}

/// State of the live job; a result exists only on success and a message only
/// on failure.
#[derive(Debug, Clone, PartialEq)]
pub enum JobState {
    Pending,
    Succeeded(AnalysisResult),
    Failed(String),
}

/// The job created for an accepted submission.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub id: JobId,
    pub state: JobState,
    pub submitted_at: DateTime<Utc>,
}

impl Job {
    pub fn result(&self) -> Option<&AnalysisResult> {
        match &self.state {
            JobState::Succeeded(result) => Some(result),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.state {
            JobState::Failed(message) => Some(message),
            _ => None,
        }
    }
}

/// How a run ended when it did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Completed(AnalysisResult),
    /// A newer run started before this one resolved.
    Superseded,
}

#[derive(Debug)]
struct LifecycleState {
    generation: u64,
    phase: LifecyclePhase,
    job: Option<Job>,
}

/// Owner of the single live analysis job.
pub struct JobLifecycle {
    backend: Arc<dyn AnalysisBackend>,
    settings: PollSettings,
    state: Mutex<LifecycleState>,
}

impl JobLifecycle {
    pub fn new(backend: Arc<dyn AnalysisBackend>, settings: PollSettings) -> Self {
        Self {
            backend,
            settings,
            state: Mutex::new(LifecycleState {
                generation: 0,
                phase: LifecyclePhase::Idle,
                job: None,
            }),
        }
    }

    pub fn settings(&self) -> PollSettings {
        self.settings
    }

    pub fn phase(&self) -> LifecyclePhase {
        self.state.lock().phase
    }

    /// Snapshot of the live job, if a submission was accepted.
    pub fn current_job(&self) -> Option<Job> {
        self.state.lock().job.clone()
    }

    /// Number of runs started so far.
    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }

    /// Submit `request` and poll until it resolves, fails or times out.
    ///
    /// Supersedes any run still in progress.
    pub async fn run(&self, request: &AnalysisRequest) -> CoreResult<JobOutcome> {
        let generation = self.begin();
        let budget = self.settings.timeout;

        match tokio::time::timeout(budget, self.drive(generation, request)).await {
            Ok(Ok(Some(result))) => self.finish(generation, Ok(result)),
            Ok(Ok(None)) => {
                warn!("Analysis run {} superseded before completion", generation);
                Ok(JobOutcome::Superseded)
            }
            Ok(Err(e)) => self.finish(generation, Err(e)),
            Err(_) => {
                let mut err = AnalysisError::timeout(format!(
                    "Analysis did not complete within {} seconds",
                    budget.as_secs_f64()
                ))
                .with_operation("poll");
                if let Some(id) = self.job_id_for(generation) {
                    err = err.with_job_id(id);
                }
                self.finish(generation, Err(err))
            }
        }
    }

    fn begin(&self) -> u64 {
        let mut state = self.state.lock();
        state.generation += 1;
        state.phase = LifecyclePhase::Submitting;
        state.job = None;
        debug!("Starting analysis run {}", state.generation);
        state.generation
    }

    fn is_current(&self, generation: u64) -> bool {
        self.state.lock().generation == generation
    }

    fn job_id_for(&self, generation: u64) -> Option<JobId> {
        let state = self.state.lock();
        if state.generation != generation {
            return None;
        }
        state.job.as_ref().map(|job| job.id.clone())
    }

    /// Record the accepted task; returns false when superseded.
    fn enter_polling(&self, generation: u64, id: JobId) -> bool {
        let mut state = self.state.lock();
        if state.generation != generation {
            return false;
        }
        info!("Analysis task {} accepted, polling for result", id);
        state.phase = LifecyclePhase::Polling;
        state.job = Some(Job {
            id,
            state: JobState::Pending,
            submitted_at: Utc::now(),
        });
        true
    }

    /// Resolves to `Ok(None)` once superseded.
    async fn drive(
        &self,
        generation: u64,
        request: &AnalysisRequest,
    ) -> CoreResult<Option<AnalysisResult>> {
        let reply = self
            .backend
            .submit_analysis(request)
            .await
            .map_err(|e| e.with_operation("submit"))?;
        if !self.is_current(generation) {
            return Ok(None);
        }

        let task_id = match reply {
            SubmitResponse::Accepted { task_id } => task_id,
            SubmitResponse::Rejected { error } => {
                return Err(AnalysisError::server_reported(error).with_operation("submit"));
            }
        };
        if !self.enter_polling(generation, JobId::new(task_id.clone())) {
            return Ok(None);
        }

        loop {
            let poll = self
                .backend
                .poll_status(&task_id)
                .await
                .map_err(|e| e.with_operation("poll").with_job_id(&task_id))?;
            if !self.is_current(generation) {
                return Ok(None);
            }

            match poll.state {
                TaskState::Pending | TaskState::Started | TaskState::Retry => {
                    debug!("Task {} still {:?}", task_id, poll.state);
                    tokio::time::sleep(self.settings.interval).await;
                    if !self.is_current(generation) {
                        return Ok(None);
                    }
                }
                TaskState::Success => {
                    let payload = poll.result.ok_or_else(|| {
                        AnalysisError::malformed("SUCCESS response carries no result")
                            .with_operation("poll")
                            .with_job_id(&task_id)
                    })?;
                    return AnalysisResult::from_payload(payload)
                        .map(Some)
                        .map_err(|e| e.with_operation("poll").with_job_id(&task_id));
                }
                TaskState::Failure | TaskState::Revoked => {
                    let message = poll
                        .status
                        .unwrap_or_else(|| "Analysis failed".to_string());
                    return Err(AnalysisError::job_failure(message)
                        .with_operation("poll")
                        .with_job_id(&task_id));
                }
                TaskState::Unknown => {
                    return Err(AnalysisError::malformed("unrecognized task state")
                        .with_operation("poll")
                        .with_job_id(&task_id));
                }
            }
        }
    }

    fn finish(
        &self,
        generation: u64,
        outcome: CoreResult<AnalysisResult>,
    ) -> CoreResult<JobOutcome> {
        let mut state = self.state.lock();
        if state.generation != generation {
            warn!("Discarding outcome of superseded analysis run {}", generation);
            return Ok(JobOutcome::Superseded);
        }

        match outcome {
            Ok(result) => {
                state.phase = LifecyclePhase::Succeeded;
                if let Some(job) = state.job.as_mut() {
                    info!("Analysis task {} succeeded", job.id);
                    job.state = JobState::Succeeded(result.clone());
                }
                Ok(JobOutcome::Completed(result))
            }
            Err(err) => {
                warn!("Analysis run {} failed: {}", generation, err);
                state.phase = LifecyclePhase::Failed;
                if let Some(job) = state.job.as_mut() {
                    job.state = JobState::Failed(err.message().to_string());
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
#[path = "job_lifecycle_tests.rs"]
mod tests;
