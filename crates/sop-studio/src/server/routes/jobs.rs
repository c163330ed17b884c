//! Job start and status endpoints

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::{
    job::MSG_QUEUED, JobId, JobListResponse, JobState, MediaPayload, PollResponse, StartRequest,
    StartResponse,
};

/// POST /api/jobs - Start a job from a JSON body with base64 data
pub async fn start_job(
    State(state): State<AppState>,
    Json(request): Json<StartRequest>,
) -> Result<(StatusCode, Json<StartResponse>)> {
    let media = request.into_payload()?;
    accept(&state, media).await
}

/// POST /api/jobs/upload - Start a job from a multipart upload
///
/// Takes the first file field. The MIME type comes from a `mimeType` text
/// field if present, then the part's content type, then the file extension.
pub async fn upload_job(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<StartResponse>)> {
    let mut declared_mime: Option<String> = None;
    let mut file: Option<(String, Option<String>, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::InvalidInput(format!("Failed to read multipart field: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();

        if name == "mimeType" {
            let text = field
                .text()
                .await
                .map_err(|e| Error::InvalidInput(format!("Failed to read mimeType: {}", e)))?;
            declared_mime = Some(text);
            continue;
        }

        if file.is_some() || (field.file_name().is_none() && name != "file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field.content_type().map(|s| s.to_string());
        let data = field
            .bytes()
            .await
            .map_err(|e| Error::InvalidInput(format!("Failed to read {}: {}", file_name, e)))?;

        tracing::debug!("Received upload {} ({} bytes)", file_name, data.len());
        file = Some((file_name, content_type, data.to_vec()));
    }

    let (file_name, content_type, data) =
        file.ok_or_else(|| Error::InvalidInput("No file provided".to_string()))?;

    let mime = declared_mime
        .filter(|m| !m.trim().is_empty())
        .or(content_type.filter(|m| m != "application/octet-stream"))
        .or_else(|| {
            mime_guess::from_path(&file_name)
                .first()
                .map(|m| m.essence_str().to_string())
        });

    let media = MediaPayload::new(file_name, mime.as_deref(), data)?;
    accept(&state, media).await
}

async fn accept(state: &AppState, media: MediaPayload) -> Result<(StatusCode, Json<StartResponse>)> {
    let job_id = state.orchestrator().submit(media).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(StartResponse {
            job_id,
            message: MSG_QUEUED.to_string(),
        }),
    ))
}

/// GET /api/jobs/:id - Current status, with results once completed
///
/// Unknown, malformed and evicted ids are all 404, and so is a store that
/// can't be reached.
pub async fn poll_job(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<PollResponse>> {
    let not_found = || Error::JobNotFound(raw_id.clone());

    let id: JobId = raw_id.parse().map_err(|_| not_found())?;

    let record = match state.store().get(id).await {
        Ok(Some(record)) => record,
        Ok(None) => return Err(not_found()),
        Err(e) => {
            tracing::warn!("Poll for job {} could not reach the store: {}", id, e);
            return Err(not_found());
        }
    };

    let response = PollResponse::from(record.as_ref());

    if state.config().processing.evict_on_fetch && record.status.state == JobState::Completed {
        match state.store().remove(id).await {
            Ok(_) => tracing::info!("Job {} evicted after result fetch", id),
            Err(e) => tracing::warn!("Failed to evict job {}: {}", id, e),
        }
    }

    Ok(Json(response))
}

/// GET /api/jobs - All jobs with per-state counts
pub async fn list_jobs(State(state): State<AppState>) -> Result<Json<JobListResponse>> {
    let records = state.store().list().await?;
    Ok(Json(JobListResponse::from_records(
        records.iter().map(|r| r.as_ref()),
    )))
}
