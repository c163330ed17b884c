//! Router tests for the start/poll protocol

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use sop_studio::config::{AppConfig, GenerationBackend};
use sop_studio::providers::ScriptedProvider;
use sop_studio::server::{router, state::AppState};
use sop_studio::storage::InMemoryJobStore;
use sop_studio::types::ArtifactKind;

fn app_with(provider: ScriptedProvider, evict_on_fetch: bool) -> Router {
    let mut config = AppConfig::default();
    config.generation.backend = GenerationBackend::Demo;
    config.processing.evict_on_fetch = evict_on_fetch;

    let state = AppState::with_components(
        config,
        Arc::new(InMemoryJobStore::new()),
        Arc::new(provider),
    );
    router(state)
}

fn app() -> Router {
    app_with(ScriptedProvider::new(), false)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn start_body(text: &str) -> Value {
    json!({
        "fileName": "standup.mp3",
        "mimeType": "audio/mpeg",
        "size": text.len(),
        "base64Data": STANDARD.encode(text),
    })
}

async fn start(app: &Router, text: &str) -> String {
    let (status, body) = send(app, post_json("/api/jobs", start_body(text))).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["message"], "Job accepted and queued.");
    body["jobId"].as_str().unwrap().to_string()
}

async fn wait_terminal(app: &Router, id: &str) -> Value {
    for _ in 0..200 {
        let (status, body) = send(app, get(&format!("/api/jobs/{}", id))).await;
        assert_eq!(status, StatusCode::OK);
        let state = body["status"]["status"].as_str().unwrap().to_string();
        if state == "COMPLETED" || state == "FAILED" {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {} never finished", id);
}

#[tokio::test]
async fn test_start_then_poll_until_completed() {
    let app = app();
    let id = start(&app, "expense report walkthrough").await;

    let body = wait_terminal(&app, &id).await;
    assert_eq!(body["status"]["status"], "COMPLETED");
    assert_eq!(body["status"]["message"], "Processing complete.");
    assert_eq!(body["results"]["transcription"], "expense report walkthrough");
    assert_eq!(body["results"]["sop"], "SOP for: expense report walkthrough");
    assert_eq!(
        body["results"]["actionItems"],
        "Action items for: expense report walkthrough"
    );
    assert_eq!(
        body["results"]["keyInfo"]["taskName"],
        "expense report walkthrough"
    );
    assert_eq!(body["stats"]["transcription"]["words"], 3);
}

#[tokio::test]
async fn test_poll_in_progress_has_no_results() {
    let provider =
        ScriptedProvider::new().with_delay(ArtifactKind::Transcript, Duration::from_secs(30));
    let app = app_with(provider, false);
    let id = start(&app, "slow").await;

    let (status, body) = send(&app, get(&format!("/api/jobs/{}", id))).await;
    assert_eq!(status, StatusCode::OK);
    let state = body["status"]["status"].as_str().unwrap();
    assert!(state == "PENDING" || state == "PROCESSING");
    assert!(body.get("results").is_none());
}

#[tokio::test]
async fn test_failed_job_reports_message_without_results() {
    let provider = ScriptedProvider::new().with_failure(ArtifactKind::Sop, "quota exceeded");
    let app = app_with(provider, false);
    let id = start(&app, "t").await;

    let body = wait_terminal(&app, &id).await;
    assert_eq!(body["status"]["status"], "FAILED");
    assert!(body["status"]["message"]
        .as_str()
        .unwrap()
        .contains("quota exceeded"));
    assert!(body.get("results").is_none());
}

#[tokio::test]
async fn test_repeat_poll_is_identical_without_eviction() {
    let app = app();
    let id = start(&app, "repeatable").await;
    wait_terminal(&app, &id).await;

    let first = send(&app, get(&format!("/api/jobs/{}", id))).await;
    let second = send(&app, get(&format!("/api/jobs/{}", id))).await;
    assert_eq!(first.0, StatusCode::OK);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_completed_job_evicted_after_first_fetch() {
    let app = app_with(ScriptedProvider::new(), true);
    let id = start(&app, "one shot").await;

    let body = wait_terminal(&app, &id).await;
    assert_eq!(body["status"]["status"], "COMPLETED");

    let (status, body) = send(&app, get(&format!("/api/jobs/{}", id))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["type"], "not_found");
}

#[tokio::test]
async fn test_missing_mime_type_creates_no_job() {
    let app = app();
    let (status, body) = send(
        &app,
        post_json(
            "/api/jobs",
            json!({ "fileName": "a.mp3", "base64Data": STANDARD.encode("x") }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("mimeType"));

    let (_, jobs) = send(&app, get("/api/jobs")).await;
    assert_eq!(jobs["totalJobs"], 0);
}

#[tokio::test]
async fn test_rejects_non_media_type() {
    let app = app();
    let mut body = start_body("x");
    body["mimeType"] = json!("application/pdf");

    let (status, body) = send(&app, post_json("/api/jobs", body)).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(body["error"]["type"], "unsupported_media_type");

    let (_, jobs) = send(&app, get("/api/jobs")).await;
    assert_eq!(jobs["totalJobs"], 0);
}

#[tokio::test]
async fn test_unknown_and_malformed_ids_are_not_found() {
    let app = app();
    let (status, _) = send(&app, get(&format!("/api/jobs/{}", uuid::Uuid::new_v4()))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, get("/api/jobs/not-a-job")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_multipart_upload() {
    let app = app();
    let boundary = "sopstudioboundary";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"call.wav\"\r\n\
         Content-Type: application/octet-stream\r\n\r\nquarterly planning\r\n--{b}--\r\n",
        b = boundary
    );
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/jobs/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap();

    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let id = body["jobId"].as_str().unwrap().to_string();
    let body = wait_terminal(&app, &id).await;
    assert_eq!(body["results"]["transcription"], "quarterly planning");
}

#[tokio::test]
async fn test_job_overview_counts() {
    let app = app();
    let first = start(&app, "one").await;
    let second = start(&app, "two").await;
    wait_terminal(&app, &first).await;
    wait_terminal(&app, &second).await;

    let (status, body) = send(&app, get("/api/jobs")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalJobs"], 2);
    assert_eq!(body["completed"], 2);
    assert_eq!(body["failed"], 0);
}

#[tokio::test]
async fn test_synchronous_process() {
    let app = app();
    let (status, body) = send(&app, post_json("/api/process", start_body("inline run"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"]["summary"], "Summary for: inline run");
    assert_eq!(body["stats"]["summary"]["readingTimeMinutes"], 1);

    let failing = app_with(
        ScriptedProvider::new().with_failure(ArtifactKind::KeyInfo, "schema mismatch"),
        false,
    );
    let (status, body) = send(&failing, post_json("/api/process", start_body("x"))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(
        body["error"]["message"],
        "Key info generation failed: schema mismatch"
    );
}

#[tokio::test]
async fn test_health_and_ready() {
    let app = app();
    let response = app.clone().oneshot(get("/health")).await;
    let response = tokio_test::assert_ok!(response);
    assert_eq!(response.status(), StatusCode::OK);

    let (status, _) = send(&app, get("/ready")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, info) = send(&app, get("/api/info")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(info["provider"], "scripted");
}

#[tokio::test]
async fn test_not_ready_while_draining() {
    let mut config = AppConfig::default();
    config.generation.backend = GenerationBackend::Demo;
    let state = AppState::with_components(
        config,
        Arc::new(InMemoryJobStore::new()),
        Arc::new(ScriptedProvider::new()),
    );
    let app = router(state.clone());

    state.set_ready(false);
    let (status, _) = send(&app, get("/ready")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    // Liveness is unaffected
    let (status, _) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
}
