//! Core types for jobs, generated documents and the status protocol

pub mod artifacts;
pub mod job;
pub mod media;
pub mod protocol;

pub use artifacts::{ArtifactKind, ArtifactStats, Artifacts, DocumentStats, KeyInfo};
pub use job::{JobId, JobRecord, JobState, JobStatus};
pub use media::MediaPayload;
pub use protocol::{
    JobListResponse, JobSummary, PollResponse, ProcessResponse, StartRequest, StartResponse,
};
