use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use ims_tracker_client::{
    load_wing_history, ApprovalSource, HttpApprovalSource, HttpSourceSettings, RequestContext,
    RetryPolicy, TimelineTracker, CORRELATION_HEADER,
};
use ims_tracker_core::{
    ApprovalId, Endpoint, FetchError, LoadError, RequestQuery, RequestStatus, WorkflowPhase,
};
use secrecy::SecretString;
use serde_json::{json, Value};

#[derive(Default)]
struct MockBackend {
    hits: Mutex<HashMap<String, usize>>,
    slow_history_calls: AtomicUsize,
    seen: Mutex<Vec<(Option<String>, Option<String>)>>,
}

impl MockBackend {
    fn record(&self, key: String, headers: &HeaderMap) {
        *self.hits.lock().expect("hits lock").entry(key).or_default() += 1;
        let header = |name: &str| {
            headers.get(name).and_then(|value| value.to_str().ok()).map(str::to_string)
        };
        self.seen
            .lock()
            .expect("seen lock")
            .push((header(CORRELATION_HEADER), header("authorization")));
    }

    fn hits(&self, key: &str) -> usize {
        self.hits.lock().expect("hits lock").get(key).copied().unwrap_or(0)
    }
}

type Shared = Arc<MockBackend>;

fn summary_body(request_id: &str) -> Value {
    json!({
        "data": {
            "request_id": request_id,
            "request_type": "stock_issuance",
            "workflow_name": "Wing approval",
            "current_status": "pending",
            "submitted_by_name": "Alice",
            "current_approver_name": "Bob",
            "submitted_date": "2025-03-01 08:00:00"
        }
    })
}

fn history_body() -> Value {
    json!({
        "data": [
            {
                "step_number": 1,
                "action_type": "submitted",
                "action_by": "u-1",
                "action_by_name": "Alice",
                "action_date": "2025-03-01 08:00:00",
                "is_current_step": 0
            },
            {
                "step_number": 2,
                "action_type": "forwarded",
                "action_by": "u-1",
                "action_by_name": "Alice",
                "forwarded_from": "u-1",
                "forwarded_from_name": "Alice",
                "forwarded_to": "u-2",
                "forwarded_to_name": "Bob",
                "comments": "please review",
                "action_date": "2025-03-01 09:00:00",
                "is_current_step": 1
            }
        ]
    })
}

async fn summary(State(backend): State<Shared>, Path(id): Path<String>, headers: HeaderMap) -> Response {
    backend.record(format!("summary:{id}"), &headers);
    match id.as_str() {
        "APR-404" => StatusCode::NOT_FOUND.into_response(),
        "APR-500" => (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": "boom" }))).into_response(),
        "APR-NODATA" => Json(json!({ "message": "ok" })).into_response(),
        _ => Json(summary_body(&format!("REQ-{id}"))).into_response(),
    }
}

async fn history(State(backend): State<Shared>, Path(id): Path<String>, headers: HeaderMap) -> Response {
    backend.record(format!("history:{id}"), &headers);
    match id.as_str() {
        "APR-404" => StatusCode::NOT_FOUND.into_response(),
        "APR-500" => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        "APR-NULLS" => {
            let mut body = history_body();
            if let Some(rows) = body["data"].as_array_mut() {
                rows.push(json!({
                    "step_number": 3,
                    "action_type": "approved",
                    "action_by": null,
                    "action_by_name": null,
                    "comments": null,
                    "action_date": null,
                    "is_current_step": null
                }));
            }
            Json(body).into_response()
        }
        "APR-SLOW" => {
            if backend.slow_history_calls.fetch_add(1, Ordering::SeqCst) == 0 {
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
            Json(history_body()).into_response()
        }
        _ => Json(history_body()).into_response(),
    }
}

async fn wing_history(State(backend): State<Shared>, headers: HeaderMap) -> Response {
    backend.record("wing".to_string(), &headers);
    Json(json!({
        "success": true,
        "wing_name": "Logistics",
        "requests": [
            {
                "id": "11",
                "request_id": "SIR-11",
                "request_type": "stock_issuance",
                "title": "Printer toner",
                "description": "Monthly consumables",
                "requester_name": "Alice",
                "current_status": "in_progress",
                "final_status": "approved",
                "submitted_date": "2025-03-02 10:00:00",
                "priority": "high",
                "total_items": 3,
                "items": [
                    {"item_name": "Toner cartridge", "requested_quantity": 3, "approved_quantity": 2, "unit": "pcs"}
                ]
            },
            {
                "id": "12",
                "request_id": "SIR-12",
                "title": "Office chairs",
                "description": null,
                "requester_name": "Bob",
                "current_status": "pending",
                "final_status": null,
                "submitted_date": "2025-03-03T10:00:00Z"
            }
        ]
    }))
    .into_response()
}

async fn spawn_backend() -> (String, Shared) {
    let backend = Shared::default();
    let app = Router::new()
        .route("/api/approvals/{id}", get(summary))
        .route("/api/approvals/{id}/history", get(history))
        .route("/api/wing-request-history", get(wing_history))
        .with_state(backend.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind mock backend");
    let address = listener.local_addr().expect("mock backend address");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (format!("http://{address}/api"), backend)
}

fn source(base_url: String, timeout: Duration) -> HttpApprovalSource {
    HttpApprovalSource::new(HttpSourceSettings {
        base_url,
        timeout,
        retry: RetryPolicy::new(1, Duration::ZERO),
        auth_token: Some(SecretString::from("test-token".to_string())),
    })
    .expect("http source builds")
}

#[tokio::test]
async fn loads_timeline_over_http_with_headers() {
    let (base_url, backend) = spawn_backend().await;
    let tracker = TimelineTracker::new(Arc::new(source(base_url, Duration::from_secs(5))));
    let context = RequestContext::with_correlation_id("corr-http-1");

    let timeline = tracker.load_timeline("APR-1", &context).await.expect("timeline loads");

    assert_eq!(timeline.summary.request_id, "REQ-APR-1");
    assert_eq!(timeline.phase, WorkflowPhase::InReview);
    assert_eq!(timeline.display.current_step_id, Some(2));
    let order: Vec<u32> = timeline.steps.iter().map(|step| step.step_number).collect();
    assert_eq!(order, vec![2, 1]);
    assert!(timeline.warnings.is_empty(), "unexpected warnings: {:?}", timeline.warnings);

    let seen = backend.seen.lock().expect("seen lock").clone();
    assert_eq!(seen.len(), 2);
    for (correlation_id, authorization) in seen {
        assert_eq!(correlation_id.as_deref(), Some("corr-http-1"));
        assert_eq!(authorization.as_deref(), Some("Bearer test-token"));
    }
}

#[tokio::test]
async fn summary_404_is_not_found() {
    let (base_url, _backend) = spawn_backend().await;
    let tracker = TimelineTracker::new(Arc::new(source(base_url, Duration::from_secs(5))));

    let error = tracker.load_timeline("APR-404", &RequestContext::new()).await.expect_err("missing");

    assert_eq!(error, LoadError::NotFound { approval_id: "APR-404".to_string() });
}

#[tokio::test]
async fn server_errors_are_not_retried() {
    let (base_url, backend) = spawn_backend().await;
    let source = source(base_url, Duration::from_secs(5));

    let error = source
        .fetch_summary(&ApprovalId("APR-500".to_string()), &RequestContext::new())
        .await
        .expect_err("server error");

    assert_eq!(error, FetchError::Status { endpoint: Endpoint::Summary, status: 500 });
    assert_eq!(backend.hits("summary:APR-500"), 1);
}

#[tokio::test]
async fn missing_data_envelope_is_rejected() {
    let (base_url, _backend) = spawn_backend().await;
    let source = source(base_url, Duration::from_secs(5));

    let error = source
        .fetch_summary(&ApprovalId("APR-NODATA".to_string()), &RequestContext::new())
        .await
        .expect_err("no data");

    assert!(matches!(error, FetchError::Envelope { endpoint: Endpoint::Summary, .. }));
}

#[tokio::test]
async fn history_timeout_is_retried_once() {
    let (base_url, backend) = spawn_backend().await;
    let tracker = TimelineTracker::new(Arc::new(source(base_url, Duration::from_millis(500))));

    let timeline =
        tracker.load_timeline("APR-SLOW", &RequestContext::new()).await.expect("retry succeeds");

    assert_eq!(timeline.display.counts.total, 2);
    assert_eq!(backend.hits("history:APR-SLOW"), 2);
    assert_eq!(backend.hits("summary:APR-SLOW"), 1);
}

#[tokio::test]
async fn wing_history_decodes_and_filters() {
    let (base_url, _backend) = spawn_backend().await;
    let source = source(base_url, Duration::from_secs(5));
    let query = RequestQuery { status: Some(RequestStatus::Pending), search: None };

    let board = load_wing_history(&source, &query, &RequestContext::new())
        .await
        .expect("wing history loads");

    assert_eq!(board.wing_name.as_deref(), Some("Logistics"));
    assert_eq!(board.tally.total, 2);
    assert_eq!(board.requests.len(), 1);
    assert_eq!(board.requests[0].request_id, "SIR-12");
}

#[tokio::test]
async fn history_row_with_null_columns_is_excluded_not_fatal() {
    let (base_url, _backend) = spawn_backend().await;
    let tracker = TimelineTracker::new(Arc::new(source(base_url, Duration::from_secs(5))));

    let timeline =
        tracker.load_timeline("APR-NULLS", &RequestContext::new()).await.expect("timeline loads");

    let order: Vec<u32> = timeline.steps.iter().map(|step| step.step_number).collect();
    assert_eq!(order, vec![2, 1]);
    let excluded: Vec<u32> = timeline.excluded.iter().map(|step| step.step_number).collect();
    assert_eq!(excluded, vec![3]);
    assert_eq!(timeline.display.counts.total, 3);
    assert!(timeline.warnings.iter().any(|warning| warning.code() == "unparseable_timestamp"));
}

#[tokio::test]
async fn wing_history_matches_final_status_and_item_names() {
    let (base_url, _backend) = spawn_backend().await;
    let source = source(base_url, Duration::from_secs(5));

    let approved = RequestQuery { status: Some(RequestStatus::Approved), search: None };
    let board = load_wing_history(&source, &approved, &RequestContext::new())
        .await
        .expect("wing history loads");
    assert_eq!(board.requests.len(), 1);
    assert_eq!(board.requests[0].request_id, "SIR-11");

    let by_item = RequestQuery { status: None, search: Some("cartridge".to_string()) };
    let board = load_wing_history(&source, &by_item, &RequestContext::new())
        .await
        .expect("wing history loads");
    assert_eq!(board.requests.len(), 1);
    assert_eq!(board.requests[0].items[0].approved_quantity, Some(2));
}

#[tokio::test]
async fn probe_treats_any_http_status_as_reachable() {
    let (base_url, _backend) = spawn_backend().await;
    let source = source(base_url, Duration::from_secs(5));

    let status = source.probe(&RequestContext::new()).await.expect("backend reachable");

    assert_eq!(status, 404);
}
