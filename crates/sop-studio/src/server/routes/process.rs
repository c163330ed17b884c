//! Synchronous processing endpoint

use axum::{extract::State, Json};
use std::time::Instant;

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::{ArtifactStats, ProcessResponse, StartRequest};

/// POST /api/process - Run the whole pipeline inline
///
/// Capability failures surface as 502 instead of a FAILED job.
pub async fn process_sync(
    State(state): State<AppState>,
    Json(request): Json<StartRequest>,
) -> Result<Json<ProcessResponse>> {
    let media = request.into_payload()?;
    let start = Instant::now();

    tracing::info!(
        "Synchronous processing of {} ({} bytes)",
        media.file_name,
        media.size()
    );

    let results = state.orchestrator().process(&media).await?;
    tracing::info!("Synchronous processing finished in {:?}", start.elapsed());

    Ok(Json(ProcessResponse {
        stats: ArtifactStats::from(&results),
        results,
    }))
}
