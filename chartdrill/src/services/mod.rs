//! Service layer of the analysis core.
//!
//! Pure transforms (date classification, aggregation, chart building) sit at
//! the bottom; the job lifecycle and drill-down state machines drive them, and
//! the orchestrator is the entry point collaborators call into.

pub mod aggregation;
pub mod chart_builder;
pub mod date_classifier;

pub mod drill_down;
pub mod job_lifecycle;

pub mod orchestrator;

pub use aggregation::{aggregate_monthly, rank_percentile, sort_daily_chronologically};
pub use chart_builder::{build, BuildContext};
pub use date_classifier::{classify, classify_labels, DateClass, LabelKind};
pub use drill_down::{DrillDownController, DrillPhase, DrillState, ResetPolicy};
pub use job_lifecycle::{Job, JobLifecycle, JobOutcome, JobState, LifecyclePhase, PollSettings};
pub use orchestrator::{AnalysisOrchestrator, ChartEvent, ChartEvents, EventLog, NoopEvents};
