//! sop-studio: turns recorded meetings into standard operating procedures
//!
//! A media file is accepted as a background job. The job is transcribed,
//! then an SOP, a summary, action items and key facts are generated from
//! the transcript concurrently. Clients poll the job until it completes or
//! fails.

pub mod client;
pub mod config;
pub mod error;
pub mod processing;
pub mod providers;
pub mod server;
pub mod storage;
pub mod types;

pub use client::{PollOutcome, StatusClient};
pub use config::AppConfig;
pub use error::{Error, Result};
pub use processing::JobOrchestrator;
pub use storage::{InMemoryJobStore, JobStore};
pub use types::{Artifacts, JobId, JobRecord, JobState, JobStatus, KeyInfo, MediaPayload};
