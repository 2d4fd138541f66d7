//! # chartdrill
//!
//! Asynchronous analysis jobs with monthly/daily chart drill-down.
//!
//! This crate submits tabular data to a remote analysis service, tracks the
//! asynchronously computed result, and turns it into renderer-agnostic chart
//! records that can be drilled from a monthly aggregate down to daily detail
//! and back.
//!
//! ## Features
//!
//! - **Job lifecycle**: submit → poll → resolve with a bounded polling budget
//! - **Aggregation**: calendar-month buckets, chronological sorting, rank percentiles
//! - **Drill-down**: guarded monthly ⇄ daily transitions that never leave a
//!   half-updated view behind
//! - **Export**: checksummed session snapshots
//!
//! ## Architecture
//!
//! - [`api`]: Value types exchanged with collaborators and the analysis service
//! - [`client`]: The analysis service boundary (HTTP and in-memory backends)
//! - [`services`]: Aggregation, chart building and the two state machines
//! - [`config`]: TOML and environment configuration
//! - [`export`]: Session export and import
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use chartdrill::prelude::*;
//!
//! let config = ClientConfig::load()?;
//! let backend = chartdrill::client::create_backend(config.backend.kind, &config.backend)?;
//! let orchestrator = AnalysisOrchestrator::from_config(&config, backend, Arc::new(NoopEvents));
//! let record = orchestrator.submit(request).await?;
//! ```

// AnalysisError carries an ErrorContext for log correlation
#![allow(clippy::result_large_err)]

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod export;
pub mod models;
pub mod services;

/// Commonly used types.
pub mod prelude {
    pub use crate::api::*;
    pub use crate::client::{AnalysisBackend, LocalBackend, ScriptedJob};
    pub use crate::config::ClientConfig;
    pub use crate::export::{SavedRequest, SessionSnapshot};
    pub use crate::services::{
        AnalysisOrchestrator, ChartEvent, ChartEvents, EventLog, NoopEvents, ResetPolicy,
    };
}
