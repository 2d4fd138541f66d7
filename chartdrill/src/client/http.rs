//! reqwest-backed client for the analysis service.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::AnalysisBackend;
use crate::api::{AnalysisRequest, PollResponse, SubmitResponse};
use crate::config::BackendSettings;
use crate::error::{AnalysisError, CoreResult};

/// Body of a status poll: a task status, or an error message.
#[derive(Deserialize)]
#[serde(untagged)]
enum StatusReply {
    Status(PollResponse),
    Error { error: String },
}

/// HTTP implementation of [`AnalysisBackend`].
///
/// Submissions are form POSTs to `{base_url}/analyze`; status polls are GETs
/// to `{base_url}/task_status/{task_id}`.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    /// Build a client with a per-request timeout.
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> CoreResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| {
                AnalysisError::network(format!("Failed to build HTTP client: {}", e))
                    .with_operation("connect")
            })?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_settings(settings: &BackendSettings) -> CoreResult<Self> {
        Self::new(
            settings.base_url.clone(),
            Duration::from_secs(settings.request_timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl AnalysisBackend for HttpBackend {
    async fn submit_analysis(&self, request: &AnalysisRequest) -> CoreResult<SubmitResponse> {
        let url = format!("{}/analyze", self.base_url);
        let fields = request.to_form_fields();

        let response = self
            .client
            .post(&url)
            .form(&fields)
            .send()
            .await
            .map_err(|e| {
                AnalysisError::network(format!("Failed to submit analysis: {}", e))
                    .with_operation("submit")
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            AnalysisError::network(format!("Failed to read submit response: {}", e))
                .with_operation("submit")
        })?;

        // The service reports validation errors as `{"error": ...}` with a 4xx status.
        match serde_json::from_str::<SubmitResponse>(&body) {
            Ok(reply) => Ok(reply),
            Err(_) if !status.is_success() => Err(AnalysisError::network(format!(
                "Analysis service returned {}",
                status
            ))
            .with_operation("submit")
            .with_details(body.trim().to_string())),
            Err(e) => Err(AnalysisError::malformed(format!(
                "Failed to parse submit response: {}",
                e
            ))
            .with_operation("submit")
            .with_details(body.trim().to_string())),
        }
    }

    async fn poll_status(&self, task_id: &str) -> CoreResult<PollResponse> {
        let url = format!("{}/task_status/{}", self.base_url, task_id);

        let response = self.client.get(&url).send().await.map_err(|e| {
            AnalysisError::network(format!("Failed to poll task status: {}", e))
                .with_operation("poll")
                .with_job_id(task_id)
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            AnalysisError::network(format!("Failed to read status response: {}", e))
                .with_operation("poll")
                .with_job_id(task_id)
        })?;

        // An unknown or expired task comes back as `{"error": ...}`, usually with a 404.
        match serde_json::from_str::<StatusReply>(&body) {
            Ok(StatusReply::Error { error }) => Err(AnalysisError::server_reported(error)
                .with_operation("poll")
                .with_job_id(task_id)),
            Ok(StatusReply::Status(reply)) if status.is_success() => Ok(reply),
            Err(e) if status.is_success() => Err(AnalysisError::malformed(format!(
                "Failed to parse status response: {}",
                e
            ))
            .with_operation("poll")
            .with_job_id(task_id)),
            _ => Err(
                AnalysisError::network(format!("Analysis service returned {}", status))
                    .with_operation("poll")
                    .with_job_id(task_id)
                    .with_details(body.trim().to_string()),
            ),
        }
    }
}
