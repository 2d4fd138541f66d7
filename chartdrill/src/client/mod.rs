//! Network boundary to the analysis service.
//!
//! This module contains the [`AnalysisBackend`] trait and its implementations:
//! - `http`: reqwest client talking to the analysis service over HTTP
//! - `local`: scripted in-memory backend for tests and local development

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::api::{AnalysisRequest, PollResponse, SubmitResponse};
use crate::error::CoreResult;

#[cfg(feature = "http-client")]
pub mod http;
pub mod local;

#[cfg(feature = "http-client")]
pub use http::HttpBackend;
pub use local::{LocalBackend, ScriptedJob};

/// Submit/poll interface of the analysis service.
///
/// # Thread Safety
/// Implementations must be `Send + Sync`; a single backend is shared by the
/// job lifecycle across tasks.
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    /// Submit a request for asynchronous analysis.
    ///
    /// # Returns
    /// * `Ok(SubmitResponse::Accepted)` - The service queued a task
    /// * `Ok(SubmitResponse::Rejected)` - The service refused the request
    /// * `Err(AnalysisError)` - Transport failure or undecodable reply
    async fn submit_analysis(&self, request: &AnalysisRequest) -> CoreResult<SubmitResponse>;

    /// Fetch the current state of a submitted task.
    async fn poll_status(&self, task_id: &str) -> CoreResult<PollResponse>;
}

/// Backend implementation selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Remote analysis service over HTTP
    #[default]
    Http,
    /// In-memory scripted backend
    Local,
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "http" | "remote" => Ok(Self::Http),
            "local" | "memory" => Ok(Self::Local),
            _ => Err(format!("Unknown backend kind: {}", s)),
        }
    }
}

/// Create a shared backend from configuration.
///
/// Falls back to the local backend when HTTP support is compiled out.
pub fn create_backend(
    kind: BackendKind,
    config: &crate::config::BackendSettings,
) -> CoreResult<Arc<dyn AnalysisBackend>> {
    match kind {
        #[cfg(feature = "http-client")]
        BackendKind::Http => Ok(Arc::new(HttpBackend::from_settings(config)?)),
        #[cfg(not(feature = "http-client"))]
        BackendKind::Http => {
            log::warn!(
                "http-client feature disabled; using local backend instead of {}",
                config.base_url
            );
            Ok(Arc::new(LocalBackend::new()))
        }
        BackendKind::Local => Ok(Arc::new(LocalBackend::new())),
    }
}
