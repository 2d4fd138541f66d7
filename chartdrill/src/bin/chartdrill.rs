//! chartdrill command-line driver
//!
//! Submits one analysis to the configured analysis service and prints every
//! emitted chart event as a JSON line. Optionally drills into a month and
//! exports the session.
//!
//! # Usage
//!
//! ```bash
//! # Monthly sums of the Sales column, grouped by the Date column
//! chartdrill --column Sales --reference-column Date --analysis sum --chart bar
//!
//! # Then show the daily values of February 2023
//! chartdrill --column Sales --reference-column Date --drill "Feb 2023"
//!
//! # Analyze inline values as a pie chart
//! chartdrill --values 1,1,2 --analysis sum --chart pie
//!
//! # Keep the settings, then re-run them later
//! chartdrill --column Sales --reference-column Date --save-request analysis.json
//! chartdrill --request analysis.json
//! ```
//!
//! # Environment Variables
//!
//! - `CHARTDRILL_BASE_URL`, `CHARTDRILL_POLL_INTERVAL_MS`,
//!   `CHARTDRILL_TIMEOUT_SECS`, `CHARTDRILL_RESET_POLICY`: configuration overrides
//! - `RUST_LOG`: Log level (default: info)

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use chartdrill::api::{
    AnalysisRequest, AnalysisType, ChartDataRecord, ChartType, DataSource, ErrorKind, Granularity,
    YearMonth,
};
use chartdrill::client::create_backend;
use chartdrill::config::ClientConfig;
use chartdrill::export::{SavedRequest, SessionSnapshot};
use chartdrill::services::{AnalysisOrchestrator, ChartEvent, ChartEvents};

#[derive(Parser)]
#[command(name = "chartdrill")]
#[command(about = "Run an analysis and print its chart data")]
struct Args {
    /// Path to a chartdrill.toml (defaults to the standard locations)
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Analysis service URL, overriding the configuration
    #[arg(long, env = "CHARTDRILL_BASE_URL")]
    base_url: Option<String>,

    /// Uploaded column to analyze
    #[arg(long, conflicts_with_all = ["values", "request"])]
    column: Option<String>,

    /// Comma-separated values to analyze
    #[arg(long, value_delimiter = ',', conflicts_with = "request")]
    values: Vec<f64>,

    /// Statistic to compute (mean, median, mode, sum, std_dev, variance, regression, descriptive)
    #[arg(short = 'a', long, default_value = "mean")]
    analysis: AnalysisType,

    /// Chart type (bar, line, scatter, pie, doughnut, polarArea, box)
    #[arg(short = 't', long, default_value = "bar")]
    chart: ChartType,

    /// Column whose dates group the values
    #[arg(short = 'r', long)]
    reference_column: Option<String>,

    /// Series label
    #[arg(short = 'l', long)]
    label: Option<String>,

    /// Month to drill into after loading, e.g. "Feb 2023"
    #[arg(short = 'd', long)]
    drill: Option<YearMonth>,

    /// Read the request settings from a file written by --save-request
    #[arg(long)]
    request: Option<PathBuf>,

    /// Write the request settings (without the result) to this file
    #[arg(long)]
    save_request: Option<PathBuf>,

    /// Write a session snapshot to this file
    #[arg(long)]
    export: Option<PathBuf>,

    /// Render a previously exported session instead of submitting
    #[arg(long, conflicts_with_all = ["column", "values", "drill", "request"])]
    import: Option<PathBuf>,
}

/// Prints each event as one JSON line on stdout.
struct StdoutEvents;

impl StdoutEvents {
    fn emit(&self, event: ChartEvent) {
        match serde_json::to_string(&event) {
            Ok(line) => println!("{}", line),
            Err(e) => tracing::error!("Failed to encode event: {}", e),
        }
    }
}

impl ChartEvents for StdoutEvents {
    fn on_chart_data_ready(
        &self,
        record: &ChartDataRecord,
        chart_type: ChartType,
        granularity: Granularity,
    ) {
        self.emit(ChartEvent::ChartDataReady {
            record: record.clone(),
            chart_type,
            granularity,
        });
    }

    fn on_error(&self, kind: ErrorKind, message: &str) {
        self.emit(ChartEvent::Error {
            kind,
            message: message.to_string(),
        });
    }

    fn on_drill_state_changed(&self, granularity: Granularity) {
        self.emit(ChartEvent::DrillStateChanged { granularity });
    }
}

fn load_config(args: &Args) -> anyhow::Result<ClientConfig> {
    let mut config = match args.config {
        Some(ref path) => ClientConfig::from_file(path)?,
        None => match ClientConfig::from_default_location() {
            Ok(config) => config,
            Err(chartdrill::config::ConfigError::NotFound) => ClientConfig::default(),
            Err(e) => return Err(e.into()),
        },
    };
    config.apply_env_overrides()?;
    if let Some(ref url) = args.base_url {
        config.backend.base_url = url.clone();
    }
    config.validate()?;
    Ok(config)
}

fn build_request(args: &Args) -> anyhow::Result<AnalysisRequest> {
    if let Some(ref path) = args.request {
        let saved = SavedRequest::load(path)
            .with_context(|| format!("Failed to read request settings {}", path.display()))?;
        return Ok(saved.request);
    }

    let source = match (&args.column, args.values.is_empty()) {
        (Some(column), _) => DataSource::Column {
            column: column.clone(),
        },
        (None, false) => DataSource::Inline {
            values: args.values.clone(),
        },
        (None, true) => anyhow::bail!("either --column or --values is required"),
    };

    let mut request = AnalysisRequest::new(source, args.analysis, args.chart);
    if let Some(ref column) = args.reference_column {
        request = request.with_reference_column(column);
    }
    if let Some(ref label) = args.label {
        request = request.with_data_label(label);
    }
    Ok(request)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    FmtSubscriber::builder()
        .with_max_level(
            env::var("RUST_LOG")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(Level::INFO),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;
    info!("Using analysis service at {}", config.backend.base_url);

    let backend = create_backend(config.backend.kind, &config.backend)?;
    let orchestrator = AnalysisOrchestrator::from_config(&config, backend, Arc::new(StdoutEvents));

    if let Some(ref path) = args.import {
        let snapshot = SessionSnapshot::load(path)
            .with_context(|| format!("Failed to import {}", path.display()))?;
        orchestrator.restore(&snapshot)?;
        return Ok(());
    }

    let request = build_request(&args)?;
    if let Some(ref path) = args.save_request {
        SavedRequest::new(request.clone()).save(path)?;
    }
    orchestrator.submit(request).await?;

    if let Some(month) = args.drill {
        orchestrator.drill_down(month).await?;
    }

    if let Some(ref path) = args.export {
        match orchestrator.snapshot()? {
            Some(snapshot) => snapshot.save(path)?,
            None => anyhow::bail!("nothing to export"),
        }
    }

    Ok(())
}
