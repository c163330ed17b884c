//! Request and response bodies of the start/poll protocol

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::artifacts::{ArtifactStats, Artifacts};
use super::job::{JobId, JobRecord, JobState, JobStatus};
use super::media::MediaPayload;
use crate::error::{Error, Result};

/// Body of a start (or synchronous process) request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    /// Original file name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// Declared MIME type, required
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Declared size in bytes, checked against the decoded data when given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Base64 encoded file content, required
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base64_data: Option<String>,
}

impl StartRequest {
    /// Validate the request and decode its payload
    pub fn into_payload(self) -> Result<MediaPayload> {
        let encoded = self
            .base64_data
            .as_deref()
            .filter(|d| !d.trim().is_empty());

        // A missing MIME type is the first thing reported
        let media = match encoded {
            Some(encoded) => MediaPayload::from_base64(
                self.file_name.unwrap_or_default(),
                self.mime_type.as_deref(),
                encoded,
            )?,
            None => {
                if self.mime_type.as_deref().map_or(true, |m| m.trim().is_empty()) {
                    return Err(Error::InvalidInput("Missing mimeType".to_string()));
                }
                return Err(Error::InvalidInput("Missing base64Data".to_string()));
            }
        };

        if let Some(declared) = self.size {
            if declared != media.size() as u64 {
                return Err(Error::InvalidInput(format!(
                    "Declared size {} does not match payload size {}",
                    declared,
                    media.size()
                )));
            }
        }

        Ok(media)
    }
}

/// Response to an accepted start request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartResponse {
    pub job_id: JobId,
    pub message: String,
}

/// Response to a poll
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollResponse {
    pub status: JobStatus,
    /// Present only when the job is completed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Artifacts>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<ArtifactStats>,
}

impl From<&JobRecord> for PollResponse {
    fn from(record: &JobRecord) -> Self {
        let results = match record.status.state {
            JobState::Completed => record.result.as_deref().cloned(),
            _ => None,
        };
        let stats = results.as_ref().map(ArtifactStats::from);
        Self {
            status: record.status.clone(),
            results,
            stats,
        }
    }
}

/// Response of the synchronous process endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessResponse {
    pub results: Artifacts,
    pub stats: ArtifactStats,
}

/// One job in the overview listing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub job_id: JobId,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&JobRecord> for JobSummary {
    fn from(record: &JobRecord) -> Self {
        Self {
            job_id: record.id,
            status: record.status.clone(),
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Job overview with per-state counts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobListResponse {
    pub jobs: Vec<JobSummary>,
    pub total_jobs: usize,
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
}

impl JobListResponse {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a JobRecord>) -> Self {
        let jobs: Vec<JobSummary> = records.into_iter().map(JobSummary::from).collect();
        let count = |state: JobState| jobs.iter().filter(|j| j.status.state == state).count();

        Self {
            total_jobs: jobs.len(),
            pending: count(JobState::Pending),
            processing: count(JobState::Processing),
            completed: count(JobState::Completed),
            failed: count(JobState::Failed),
            jobs,
        }
    }
}
