//! API routes for the SOP Studio server

pub mod jobs;
pub mod process;

use axum::{
    extract::{DefaultBodyLimit, State},
    routing::{get, post},
    Json, Router,
};

use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        // Start - with larger body limit for media payloads
        .route(
            "/jobs",
            get(jobs::list_jobs)
                .post(jobs::start_job)
                .layer(DefaultBodyLimit::max(max_upload_size)),
        )
        .route(
            "/jobs/upload",
            post(jobs::upload_job).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        // Poll
        .route("/jobs/:id", get(jobs::poll_job))
        // Synchronous pipeline
        .route(
            "/process",
            post(process::process_sync).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        .route("/info", get(info))
}

/// API info endpoint
async fn info(State(state): State<AppState>) -> Json<serde_json::Value> {
    let config = state.config();
    Json(serde_json::json!({
        "name": "sop-studio",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Turns meeting recordings into SOPs, summaries, action items and key info",
        "provider": state.provider().name(),
        "model": state.provider().model(),
        "store": state.store().name(),
        "evictOnFetch": config.processing.evict_on_fetch,
        "endpoints": {
            "POST /api/jobs": "Start a job from JSON { fileName, mimeType, size, base64Data }",
            "POST /api/jobs/upload": "Start a job from a multipart file upload",
            "GET /api/jobs": "List all jobs with per-state counts",
            "GET /api/jobs/:id": "Poll job status; results once completed",
            "POST /api/process": "Run the pipeline synchronously"
        }
    }))
}
