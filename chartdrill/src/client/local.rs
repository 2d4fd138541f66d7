//! In-memory analysis backend.
//!
//! Replies are scripted per submission, which makes the job lifecycle fully
//! deterministic in tests. Every call is recorded so tests can assert on how
//! often the service was hit.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use uuid::Uuid;

use super::AnalysisBackend;
use crate::api::{AnalysisRequest, PollResponse, SubmitResponse};
use crate::error::{AnalysisError, CoreResult, ErrorContext};

/// Scripted reply to one submission.
#[derive(Debug, Clone)]
pub enum ScriptedJob {
    /// Accept the submission; polls replay `polls` in order and the last entry
    /// repeats once the script is exhausted.
    Accept { polls: Vec<PollResponse> },
    /// Answer with an `error` field instead of a task id.
    Reject { error: String },
    /// Fail the submission at the transport level.
    Unreachable { message: String },
}

impl ScriptedJob {
    /// One pending poll, then success with `payload`.
    pub fn succeed(payload: serde_json::Value) -> Self {
        Self::succeed_after(1, payload)
    }

    /// `pending_polls` pending replies, then success with `payload`.
    pub fn succeed_after(pending_polls: usize, payload: serde_json::Value) -> Self {
        let mut polls = vec![PollResponse::pending(); pending_polls];
        polls.push(PollResponse::success(payload));
        Self::Accept { polls }
    }

    /// One pending poll, then `FAILURE` with `status`.
    pub fn fail(status: impl Into<String>) -> Self {
        Self::Accept {
            polls: vec![PollResponse::pending(), PollResponse::failure(status)],
        }
    }

    /// Never leaves `PENDING`.
    pub fn pending_forever() -> Self {
        Self::Accept {
            polls: vec![PollResponse::pending()],
        }
    }

    pub fn reject(error: impl Into<String>) -> Self {
        Self::Reject {
            error: error.into(),
        }
    }

    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::Unreachable {
            message: message.into(),
        }
    }
}

type Responder = dyn Fn(&AnalysisRequest) -> ScriptedJob + Send + Sync;

#[derive(Default)]
struct LocalState {
    queued: VecDeque<ScriptedJob>,
    tasks: HashMap<String, VecDeque<PollResponse>>,
    submissions: Vec<AnalysisRequest>,
    polls: Vec<String>,
}

/// Scripted in-memory [`AnalysisBackend`].
///
/// Queued scripts are consumed first, one per submission; after that the
/// responder (if any) decides. Without either, submissions are rejected.
#[derive(Clone, Default)]
pub struct LocalBackend {
    state: Arc<Mutex<LocalState>>,
    responder: Option<Arc<Responder>>,
    submit_delay: Option<Duration>,
}

impl LocalBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend that decides every reply with `responder`.
    pub fn with_responder<F>(responder: F) -> Self
    where
        F: Fn(&AnalysisRequest) -> ScriptedJob + Send + Sync + 'static,
    {
        Self {
            responder: Some(Arc::new(responder)),
            ..Self::default()
        }
    }

    /// Delay every submission, so callers can observe in-flight requests.
    pub fn with_submit_delay(mut self, delay: Duration) -> Self {
        self.submit_delay = Some(delay);
        self
    }

    /// Queue the reply for the next unscripted submission.
    pub fn enqueue(&self, job: ScriptedJob) -> &Self {
        self.state.lock().queued.push_back(job);
        self
    }

    /// Requests received so far, in order.
    pub fn submissions(&self) -> Vec<AnalysisRequest> {
        self.state.lock().submissions.clone()
    }

    pub fn submit_count(&self) -> usize {
        self.state.lock().submissions.len()
    }

    /// Total status polls across all tasks.
    pub fn poll_count(&self) -> usize {
        self.state.lock().polls.len()
    }

    /// Status polls issued for one task.
    pub fn polls_for(&self, task_id: &str) -> usize {
        self.state
            .lock()
            .polls
            .iter()
            .filter(|id| id.as_str() == task_id)
            .count()
    }

    fn next_script(&self, request: &AnalysisRequest) -> Option<ScriptedJob> {
        let queued = self.state.lock().queued.pop_front();
        queued.or_else(|| self.responder.as_ref().map(|respond| respond(request)))
    }
}

#[async_trait]
impl AnalysisBackend for LocalBackend {
    async fn submit_analysis(&self, request: &AnalysisRequest) -> CoreResult<SubmitResponse> {
        if let Some(delay) = self.submit_delay {
            tokio::time::sleep(delay).await;
        }
        self.state.lock().submissions.push(request.clone());

        match self.next_script(request) {
            Some(ScriptedJob::Accept { polls }) => {
                let task_id = Uuid::new_v4().to_string();
                log::debug!("Local backend accepted task {}", task_id);
                self.state
                    .lock()
                    .tasks
                    .insert(task_id.clone(), polls.into_iter().collect());
                Ok(SubmitResponse::Accepted { task_id })
            }
            Some(ScriptedJob::Reject { error }) => Ok(SubmitResponse::Rejected { error }),
            Some(ScriptedJob::Unreachable { message }) => Err(AnalysisError::Network {
                message,
                context: ErrorContext::new("submit"),
            }),
            None => Ok(SubmitResponse::Rejected {
                error: "No scripted response for this request".to_string(),
            }),
        }
    }

    async fn poll_status(&self, task_id: &str) -> CoreResult<PollResponse> {
        let mut state = self.state.lock();
        state.polls.push(task_id.to_string());

        let script = state.tasks.get_mut(task_id).ok_or_else(|| {
            AnalysisError::malformed(format!("unknown task id '{}'", task_id))
                .with_operation("poll")
        })?;
        let reply = if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        };
        Ok(reply.unwrap_or_else(PollResponse::pending))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{AnalysisType, ChartType, DataSource, TaskState};

    fn request() -> AnalysisRequest {
        AnalysisRequest::new(
            DataSource::Inline {
                values: vec![1.0, 2.0],
            },
            AnalysisType::Mean,
            ChartType::Bar,
        )
    }

    #[tokio::test]
    async fn test_scripted_polls_replay_and_stick() {
        let backend = LocalBackend::new();
        backend.enqueue(ScriptedJob::succeed(serde_json::json!({"value": 1})));

        let task_id = match backend.submit_analysis(&request()).await.unwrap() {
            SubmitResponse::Accepted { task_id } => task_id,
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(backend.poll_status(&task_id).await.unwrap().state, TaskState::Pending);
        assert_eq!(backend.poll_status(&task_id).await.unwrap().state, TaskState::Success);
        assert_eq!(backend.poll_status(&task_id).await.unwrap().state, TaskState::Success);
        assert_eq!(backend.polls_for(&task_id), 3);
    }

    #[tokio::test]
    async fn test_unscripted_submission_is_rejected() {
        let backend = LocalBackend::new();
        let reply = backend.submit_analysis(&request()).await.unwrap();
        assert!(matches!(reply, SubmitResponse::Rejected { .. }));
        assert_eq!(backend.submit_count(), 1);
    }

    #[tokio::test]
    async fn test_responder_and_unreachable() {
        let backend =
            LocalBackend::with_responder(|_| ScriptedJob::unreachable("connection refused"));
        let err = backend.submit_analysis(&request()).await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::NetworkError);
    }

    #[tokio::test]
    async fn test_unknown_task() {
        let backend = LocalBackend::new();
        assert!(backend.poll_status("nope").await.is_err());
    }
}
