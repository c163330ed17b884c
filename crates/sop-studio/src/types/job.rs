//! Job identifiers, status values and the stored job record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use super::artifacts::Artifacts;
use crate::error::{Error, Result};

/// Message attached to a freshly created job
pub const MSG_QUEUED: &str = "Job accepted and queued.";
/// Message while the media is being transcribed
pub const MSG_TRANSCRIBING: &str = "Transcribing audio...";
/// Message while the four documents are generated
pub const MSG_GENERATING: &str = "Generating SOP, summary, action items and key info...";
/// Message attached to a completed job
pub const MSG_COMPLETE: &str = "Processing complete.";

/// Opaque job identifier, unique per process lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    /// Allocate a fresh random identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// Lifecycle state of a job
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobState {
    /// COMPLETED and FAILED accept no further transitions
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }

    /// Whether a record in this state may be moved to `next`.
    ///
    /// Processing -> Processing is a progress message update.
    pub fn can_transition_to(self, next: JobState) -> bool {
        use JobState::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Processing, Processing)
                | (Processing, Completed)
                | (Processing, Failed)
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobState::Pending => "PENDING",
            JobState::Processing => "PROCESSING",
            JobState::Completed => "COMPLETED",
            JobState::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// Current state plus a human-readable progress message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatus {
    /// Lifecycle state
    #[serde(rename = "status")]
    pub state: JobState,
    /// Progress or failure message
    pub message: String,
}

impl JobStatus {
    pub fn pending() -> Self {
        Self {
            state: JobState::Pending,
            message: MSG_QUEUED.to_string(),
        }
    }

    pub fn processing(message: impl Into<String>) -> Self {
        Self {
            state: JobState::Processing,
            message: message.into(),
        }
    }

    pub fn completed() -> Self {
        Self {
            state: JobState::Completed,
            message: MSG_COMPLETE.to_string(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            state: JobState::Failed,
            message: message.into(),
        }
    }
}

/// A job as held by the job store.
///
/// Records are never mutated in place: every write produces a new record
/// through [`JobRecord::apply`] and the store swaps it in whole.
#[derive(Debug, Clone)]
pub struct JobRecord {
    /// Job identifier
    pub id: JobId,
    /// Current status
    pub status: JobStatus,
    /// Generated documents, present only when completed
    pub result: Option<Arc<Artifacts>>,
    /// Submission time
    pub created_at: DateTime<Utc>,
    /// Time of the last write
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    /// New PENDING record with no result
    pub fn new(id: JobId) -> Self {
        let now = Utc::now();
        Self {
            id,
            status: JobStatus::pending(),
            result: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Produce the successor record for a status write.
    ///
    /// Rejects backward or out-of-terminal transitions, a result on a
    /// non-completed status, a completed status without a result, and a
    /// failure without a message.
    pub fn apply(&self, status: JobStatus, result: Option<Artifacts>) -> Result<JobRecord> {
        let from = self.status.state;
        let to = status.state;

        if !from.can_transition_to(to) {
            return Err(Error::InvalidTransition {
                id: self.id,
                from,
                to,
            });
        }

        match (to, result.is_some()) {
            (JobState::Completed, false) => {
                return Err(Error::InvalidRecord(format!(
                    "job {} cannot complete without a result",
                    self.id
                )));
            }
            (JobState::Completed, true) => {}
            (_, true) => {
                return Err(Error::InvalidRecord(format!(
                    "job {} cannot carry a result while {}",
                    self.id, to
                )));
            }
            (_, false) => {}
        }

        if to == JobState::Failed && status.message.trim().is_empty() {
            return Err(Error::InvalidRecord(format!(
                "job {} failed without a message",
                self.id
            )));
        }

        Ok(JobRecord {
            id: self.id,
            status,
            result: result.map(Arc::new),
            created_at: self.created_at,
            updated_at: Utc::now(),
        })
    }

    pub fn is_terminal(&self) -> bool {
        self.status.state.is_terminal()
    }
}
