//! Session export and import.
//!
//! A snapshot stores the base request and its last monthly result together
//! with a SHA-256 checksum, so a tampered or truncated export is detected on
//! import instead of being rendered.
//!
//! A [`SavedRequest`] keeps only the request settings, so an analysis can be
//! re-run later without having been completed first.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::api::{AnalysisRequest, AnalysisResult};

/// Format version written into every snapshot.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Errors raised while exporting or importing a session.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Failed to access {path}: {message}")]
    Io { path: String, message: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Checksum mismatch: expected {expected}, computed {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("Unsupported snapshot version {0}")]
    UnsupportedVersion(u32),
}

/// Exported analysis session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub version: u32,
    pub request: AnalysisRequest,
    pub result: AnalysisResult,
    pub exported_at: DateTime<Utc>,
    /// Hex SHA-256 of the JSON encoding of `(request, result)`
    pub checksum: String,
}

impl SessionSnapshot {
    pub fn new(request: AnalysisRequest, result: AnalysisResult) -> Result<Self, ExportError> {
        let checksum = compute_checksum(&request, &result)?;
        Ok(Self {
            version: SNAPSHOT_VERSION,
            request,
            result,
            exported_at: Utc::now(),
            checksum,
        })
    }

    /// Check the version and that the checksum matches the content.
    pub fn verify(&self) -> Result<(), ExportError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(ExportError::UnsupportedVersion(self.version));
        }
        let actual = compute_checksum(&self.request, &self.result)?;
        if actual != self.checksum {
            return Err(ExportError::ChecksumMismatch {
                expected: self.checksum.clone(),
                actual,
            });
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, ExportError> {
        serde_json::to_string_pretty(self).map_err(|e| ExportError::Serialization(e.to_string()))
    }

    /// Parse and verify a snapshot.
    pub fn from_json(content: &str) -> Result<Self, ExportError> {
        let snapshot: SessionSnapshot =
            serde_json::from_str(content).map_err(|e| ExportError::Serialization(e.to_string()))?;
        snapshot.verify()?;
        Ok(snapshot)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ExportError> {
        let path = path.as_ref();
        fs::write(path, self.to_json()?).map_err(|e| ExportError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        log::info!("Exported session to {}", path.display());
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ExportError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ExportError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json(&content)
    }
}

/// Request settings saved without a result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedRequest {
    pub version: u32,
    pub request: AnalysisRequest,
    pub saved_at: DateTime<Utc>,
}

impl SavedRequest {
    /// Any drill target is dropped; a saved request always starts monthly.
    pub fn new(request: AnalysisRequest) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            request: request.without_drill_target(),
            saved_at: Utc::now(),
        }
    }

    pub fn to_json(&self) -> Result<String, ExportError> {
        serde_json::to_string_pretty(self).map_err(|e| ExportError::Serialization(e.to_string()))
    }

    pub fn from_json(content: &str) -> Result<Self, ExportError> {
        let saved: SavedRequest =
            serde_json::from_str(content).map_err(|e| ExportError::Serialization(e.to_string()))?;
        if saved.version != SNAPSHOT_VERSION {
            return Err(ExportError::UnsupportedVersion(saved.version));
        }
        Ok(saved)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ExportError> {
        let path = path.as_ref();
        fs::write(path, self.to_json()?).map_err(|e| ExportError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        log::info!("Saved request settings to {}", path.display());
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ExportError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ExportError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json(&content)
    }
}

/// Hex SHA-256 of the JSON encoding of `(request, result)`.
pub fn compute_checksum(
    request: &AnalysisRequest,
    result: &AnalysisResult,
) -> Result<String, ExportError> {
    let content = serde_json::to_string(&(request, result))
        .map_err(|e| ExportError::Serialization(e.to_string()))?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}
