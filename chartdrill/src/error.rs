//! Error types for the analysis job lifecycle and drill-down engine.
//!
//! Every failure carries a human-readable message for display plus a
//! programmatic [`ErrorKind`] so collaborators can branch on the category
//! without parsing strings.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Result type for analysis operations
pub type CoreResult<T> = Result<T, AnalysisError>;

/// Programmatic category of an [`AnalysisError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NetworkError,
    ServerReportedError,
    JobFailure,
    Timeout,
    MalformedResponse,
    InvalidDateFormat,
    ConcurrencyRejected,
}

impl ErrorKind {
    /// Whether errors of this kind are shown to the user.
    ///
    /// Rejected concurrent drill-down/reset requests are dropped silently.
    pub fn is_user_facing(self) -> bool {
        !matches!(self, ErrorKind::ConcurrencyRejected)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::NetworkError => "network_error",
            ErrorKind::ServerReportedError => "server_reported_error",
            ErrorKind::JobFailure => "job_failure",
            ErrorKind::Timeout => "timeout",
            ErrorKind::MalformedResponse => "malformed_response",
            ErrorKind::InvalidDateFormat => "invalid_date_format",
            ErrorKind::ConcurrencyRejected => "concurrency_rejected",
        };
        f.write_str(name)
    }
}

/// Structured context for analysis errors.
///
/// Records where the failure happened so log lines can be correlated with a
/// specific job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    /// The operation being performed (e.g., "submit", "poll", "drill_down")
    pub operation: Option<String>,
    /// The backend task identifier, once one has been assigned
    pub job_id: Option<String>,
    /// Additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with an operation name.
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: Some(operation.into()),
            ..Default::default()
        }
    }

    /// Set the job identifier.
    pub fn with_job_id(mut self, id: impl ToString) -> Self {
        self.job_id = Some(id.to_string());
        self
    }

    /// Set additional details.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    fn is_empty(&self) -> bool {
        self.operation.is_none() && self.job_id.is_none() && self.details.is_none()
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return Ok(());
        }
        let mut parts = Vec::new();
        if let Some(ref op) = self.operation {
            parts.push(format!("operation={}", op));
        }
        if let Some(ref id) = self.job_id {
            parts.push(format!("job={}", id));
        }
        if let Some(ref details) = self.details {
            parts.push(format!("details={}", details));
        }
        write!(f, "[{}]", parts.join(", "))
    }
}

/// Error type for the analysis core.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AnalysisError {
    /// Transport failure while submitting or polling.
    #[error("Network error: {message} {context}")]
    Network {
        message: String,
        context: ErrorContext,
    },

    /// The backend answered with an `error` field instead of a task id.
    #[error("Server error: {message} {context}")]
    ServerReported {
        message: String,
        context: ErrorContext,
    },

    /// The job reached the terminal `FAILURE` state.
    #[error("Analysis failed: {message} {context}")]
    JobFailure {
        message: String,
        context: ErrorContext,
    },

    /// No terminal state was reached within the polling budget.
    #[error("Timeout: {message} {context}")]
    Timeout {
        message: String,
        context: ErrorContext,
    },

    /// A response was missing expected fields or could not be decoded.
    #[error("Malformed response: {message} {context}")]
    MalformedResponse {
        message: String,
        context: ErrorContext,
    },

    /// A drill-down target or label did not parse as a supported date.
    #[error("Invalid date format: {message} {context}")]
    InvalidDateFormat {
        message: String,
        context: ErrorContext,
    },

    /// A drill-down or reset was attempted while another one was in flight.
    #[error("Request rejected: {message} {context}")]
    ConcurrencyRejected {
        message: String,
        context: ErrorContext,
    },
}

impl AnalysisError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    pub fn server_reported(message: impl Into<String>) -> Self {
        Self::ServerReported {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    pub fn job_failure(message: impl Into<String>) -> Self {
        Self::JobFailure {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    pub fn invalid_date(message: impl Into<String>) -> Self {
        Self::InvalidDateFormat {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::ConcurrencyRejected {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// The programmatic category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network { .. } => ErrorKind::NetworkError,
            Self::ServerReported { .. } => ErrorKind::ServerReportedError,
            Self::JobFailure { .. } => ErrorKind::JobFailure,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::MalformedResponse { .. } => ErrorKind::MalformedResponse,
            Self::InvalidDateFormat { .. } => ErrorKind::InvalidDateFormat,
            Self::ConcurrencyRejected { .. } => ErrorKind::ConcurrencyRejected,
        }
    }

    /// The human-readable message, without the debugging context.
    pub fn message(&self) -> &str {
        match self {
            Self::Network { message, .. }
            | Self::ServerReported { message, .. }
            | Self::JobFailure { message, .. }
            | Self::Timeout { message, .. }
            | Self::MalformedResponse { message, .. }
            | Self::InvalidDateFormat { message, .. }
            | Self::ConcurrencyRejected { message, .. } => message,
        }
    }

    /// Get the error context.
    pub fn context(&self) -> &ErrorContext {
        match self {
            Self::Network { context, .. }
            | Self::ServerReported { context, .. }
            | Self::JobFailure { context, .. }
            | Self::Timeout { context, .. }
            | Self::MalformedResponse { context, .. }
            | Self::InvalidDateFormat { context, .. }
            | Self::ConcurrencyRejected { context, .. } => context,
        }
    }

    fn context_mut(&mut self) -> &mut ErrorContext {
        match self {
            Self::Network { context, .. }
            | Self::ServerReported { context, .. }
            | Self::JobFailure { context, .. }
            | Self::Timeout { context, .. }
            | Self::MalformedResponse { context, .. }
            | Self::InvalidDateFormat { context, .. }
            | Self::ConcurrencyRejected { context, .. } => context,
        }
    }

    /// Add or update the operation in the error context.
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.context_mut().operation = Some(operation.into());
        self
    }

    /// Attach the job identifier unless one is already recorded.
    pub fn with_job_id(mut self, id: impl ToString) -> Self {
        let context = self.context_mut();
        if context.job_id.is_none() {
            context.job_id = Some(id.to_string());
        }
        self
    }

    /// Set additional details.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.context_mut().details = Some(details.into());
        self
    }
}
