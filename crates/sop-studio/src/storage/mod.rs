//! Job record storage
//!
//! The orchestrator and the HTTP handlers only see the [`JobStore`] trait,
//! so the in-process map used here can be swapped for a networked store.

mod memory;

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Result;
use crate::types::{Artifacts, JobId, JobRecord, JobStatus};

pub use memory::InMemoryJobStore;

/// Trait for job record storage
///
/// Writes for one id come from a single writer in order. Readers always get
/// a whole record: implementations replace records atomically and never
/// expose a half-applied write.
///
/// Implementations:
/// - `InMemoryJobStore`: process-lifetime map
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a new PENDING record; fails if the id exists
    async fn create(&self, id: JobId) -> Result<()>;

    /// Replace the status and result of an existing record
    ///
    /// Fails if the id is absent or the write breaks the record invariants.
    async fn set(&self, id: JobId, status: JobStatus, result: Option<Artifacts>) -> Result<()>;

    /// Snapshot of a record, `None` if unknown or evicted
    async fn get(&self, id: JobId) -> Result<Option<Arc<JobRecord>>>;

    /// Evict a record, returning whether it was present
    async fn remove(&self, id: JobId) -> Result<bool>;

    /// Snapshots of all records, oldest first
    async fn list(&self) -> Result<Vec<Arc<JobRecord>>>;

    /// Check if the store is reachable
    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    /// Get store name for logging
    fn name(&self) -> &str;
}
