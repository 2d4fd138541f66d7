//! HttpBackend against a stub analysis service.

#![cfg(feature = "http-client")]

mod support;

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde_json::json;

use chartdrill::client::{AnalysisBackend, HttpBackend};
use chartdrill::prelude::*;
use chartdrill::services::PollSettings;
use support::{february_payload, monthly_payload, sales_by_date};

#[derive(Clone, Default)]
struct StubState {
    polls: Arc<AtomicUsize>,
    forms: Arc<Mutex<Vec<HashMap<String, String>>>>,
}

async fn analyze(
    State(state): State<StubState>,
    Form(fields): Form<HashMap<String, String>>,
) -> impl IntoResponse {
    let missing = fields.get("column_select").map(String::as_str) == Some("Missing");
    let drill = fields.contains_key("drill_down");
    state.forms.lock().unwrap().push(fields);
    if missing {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Column 'Missing' not found"})),
        );
    }
    let task_id = if drill { "daily-task" } else { "monthly-task" };
    (StatusCode::OK, Json(json!({"task_id": task_id})))
}

async fn task_status(
    State(state): State<StubState>,
    Path(task_id): Path<String>,
) -> impl IntoResponse {
    let payload = match task_id.as_str() {
        "monthly-task" => monthly_payload(),
        "daily-task" => february_payload(),
        "failing-task" => json!({"error": "Column 'Sales' not found"}),
        _ => return (StatusCode::NOT_FOUND, Json(json!({"error": "Task not found"}))),
    };
    let poll = state.polls.fetch_add(1, Ordering::SeqCst);
    if poll % 2 == 0 {
        return (
            StatusCode::OK,
            Json(json!({"state": "PENDING", "status": "Processing..."})),
        );
    }
    (
        StatusCode::OK,
        Json(json!({"state": "SUCCESS", "result": payload})),
    )
}

async fn spawn_stub() -> (String, StubState) {
    let state = StubState::default();
    let app = Router::new()
        .route("/analyze", post(analyze))
        .route("/task_status/{task_id}", get(task_status))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), state)
}

fn fast_polling() -> PollSettings {
    PollSettings {
        interval: Duration::from_millis(10),
        timeout: Duration::from_secs(5),
    }
}

#[tokio::test]
async fn test_submit_and_poll_over_http() {
    let (base_url, stub) = spawn_stub().await;
    let backend = HttpBackend::new(&base_url, Duration::from_secs(5)).unwrap();

    let reply = backend
        .submit_analysis(&sales_by_date(ChartType::Bar))
        .await
        .unwrap();
    assert_eq!(
        reply,
        SubmitResponse::Accepted {
            task_id: "monthly-task".to_string()
        }
    );

    let form = stub.forms.lock().unwrap()[0].clone();
    assert_eq!(form.get("column_select").map(String::as_str), Some("Sales"));
    assert_eq!(
        form.get("reference_column_select").map(String::as_str),
        Some("Date")
    );
    assert_eq!(form.get("analysis_type").map(String::as_str), Some("sum"));
    assert!(!form.contains_key("drill_down"));

    let first = backend.poll_status("monthly-task").await.unwrap();
    assert_eq!(first.state, TaskState::Pending);
    let second = backend.poll_status("monthly-task").await.unwrap();
    assert_eq!(second.state, TaskState::Success);
    assert!(second.result.is_some());
}

#[tokio::test]
async fn test_error_reply_is_server_reported() {
    let (base_url, _stub) = spawn_stub().await;
    let backend = Arc::new(HttpBackend::new(&base_url, Duration::from_secs(5)).unwrap());
    let events = Arc::new(EventLog::new());
    let orchestrator =
        AnalysisOrchestrator::new(backend, fast_polling(), ResetPolicy::Refetch, events.clone());

    let request = AnalysisRequest::new(
        DataSource::Column {
            column: "Missing".to_string(),
        },
        AnalysisType::Mean,
        ChartType::Bar,
    );
    let err = orchestrator.submit(request).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ServerReportedError);
    assert_eq!(err.message(), "Column 'Missing' not found");
}

#[tokio::test]
async fn test_drill_down_sends_target() {
    let (base_url, stub) = spawn_stub().await;
    let backend = Arc::new(HttpBackend::new(&base_url, Duration::from_secs(5)).unwrap());
    let orchestrator = AnalysisOrchestrator::new(
        backend,
        fast_polling(),
        ResetPolicy::Refetch,
        Arc::new(NoopEvents),
    );

    orchestrator
        .submit(sales_by_date(ChartType::Line))
        .await
        .unwrap();
    let daily = orchestrator
        .chart_clicked("Feb 2023")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(daily.series_label, "Sales (Feb 2023)");

    let forms = stub.forms.lock().unwrap().clone();
    let drill: serde_json::Value =
        serde_json::from_str(forms[1].get("drill_down").unwrap()).unwrap();
    assert_eq!(drill, json!({"month": "Feb", "year": "2023"}));
}

#[tokio::test]
async fn test_unreachable_service_is_network_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let backend = HttpBackend::new(format!("http://{}", addr), Duration::from_secs(2)).unwrap();
    let err = backend
        .submit_analysis(&sales_by_date(ChartType::Bar))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NetworkError);
}

#[tokio::test]
async fn test_status_error_body_is_server_reported() {
    let (base_url, _stub) = spawn_stub().await;
    let backend = HttpBackend::new(&base_url, Duration::from_secs(5)).unwrap();

    let err = backend.poll_status("expired-task").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ServerReportedError);
    assert_eq!(err.message(), "Task not found");
    assert_eq!(err.context().job_id.as_deref(), Some("expired-task"));

    backend.poll_status("failing-task").await.unwrap();
    let done = backend.poll_status("failing-task").await.unwrap();
    let err = AnalysisResult::from_payload(done.result.unwrap()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ServerReportedError);
    assert_eq!(err.message(), "Column 'Sales' not found");
}
