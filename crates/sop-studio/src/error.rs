//! Error types for the job pipeline and its HTTP surface

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::types::{ArtifactKind, JobId, JobState};

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Rejected submission (missing or malformed payload)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Declared MIME type is not audio or video
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// Unknown, evicted or unreachable job
    #[error("Job not found: {0}")]
    JobNotFound(String),

    /// Store already holds this id
    #[error("Job already exists: {0}")]
    JobExists(JobId),

    /// Write that would move a job backward or out of a terminal state
    #[error("Invalid transition for job {id}: {from} -> {to}")]
    InvalidTransition {
        id: JobId,
        from: JobState,
        to: JobState,
    },

    /// Write that would break the record invariants
    #[error("Invalid job record: {0}")]
    InvalidRecord(String),

    /// Job store cannot be reached
    #[error("Job store unavailable: {0}")]
    StoreUnavailable(String),

    /// Raw failure reported by the generation capability
    #[error("{0}")]
    Capability(String),

    /// A capability call exceeded its time limit
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// Transcription stage failed
    #[error("Transcription failed: {0}")]
    Transcription(String),

    /// One of the concurrent generation calls failed
    #[error("{artifact} generation failed: {message}")]
    Generation {
        artifact: ArtifactKind,
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a capability error
    pub fn capability(message: impl Into<String>) -> Self {
        Self::Capability(message.into())
    }

    /// Create a generation-stage error for one artifact
    pub fn generation(artifact: ArtifactKind, message: impl Into<String>) -> Self {
        Self::Generation {
            artifact,
            message: message.into(),
        }
    }

    /// Create a store-unavailable error
    pub fn store_unavailable(message: impl Into<String>) -> Self {
        Self::StoreUnavailable(message.into())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            Error::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            Error::InvalidInput(_) => (StatusCode::BAD_REQUEST, "invalid_input"),
            Error::UnsupportedMediaType(_) => {
                (StatusCode::UNSUPPORTED_MEDIA_TYPE, "unsupported_media_type")
            }
            Error::JobNotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            Error::JobExists(_) => (StatusCode::CONFLICT, "conflict"),
            Error::InvalidTransition { .. } | Error::InvalidRecord(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "invalid_record")
            }
            Error::StoreUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "store_unavailable"),
            Error::Capability(_)
            | Error::Timeout(_)
            | Error::Transcription(_)
            | Error::Generation { .. } => (StatusCode::BAD_GATEWAY, "generation_error"),
            Error::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "io_error"),
            Error::Json(_) => (StatusCode::BAD_REQUEST, "json_error"),
            Error::Http(_) => (StatusCode::BAD_GATEWAY, "http_error"),
            Error::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let body = Json(json!({
            "error": {
                "type": error_type,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}
