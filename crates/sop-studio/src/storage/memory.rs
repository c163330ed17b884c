//! In-process job store backed by a concurrent map

use async_trait::async_trait;
use dashmap::{mapref::entry::Entry, DashMap};
use std::sync::Arc;

use super::JobStore;
use crate::error::{Error, Result};
use crate::types::{Artifacts, JobId, JobRecord, JobStatus};

/// Job store living for the lifetime of the process.
///
/// Each record sits behind an `Arc`; a write builds the successor record and
/// swaps the pointer under the shard lock, so readers clone a complete
/// snapshot or the previous one.
#[derive(Default)]
pub struct InMemoryJobStore {
    records: DashMap<JobId, Arc<JobRecord>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn create(&self, id: JobId) -> Result<()> {
        match self.records.entry(id) {
            Entry::Occupied(_) => Err(Error::JobExists(id)),
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(JobRecord::new(id)));
                Ok(())
            }
        }
    }

    async fn set(&self, id: JobId, status: JobStatus, result: Option<Artifacts>) -> Result<()> {
        let mut entry = self
            .records
            .get_mut(&id)
            .ok_or_else(|| Error::JobNotFound(id.to_string()))?;

        let next = entry.apply(status, result)?;
        *entry = Arc::new(next);
        Ok(())
    }

    async fn get(&self, id: JobId) -> Result<Option<Arc<JobRecord>>> {
        Ok(self.records.get(&id).map(|r| Arc::clone(r.value())))
    }

    async fn remove(&self, id: JobId) -> Result<bool> {
        Ok(self.records.remove(&id).is_some())
    }

    async fn list(&self) -> Result<Vec<Arc<JobRecord>>> {
        let mut records: Vec<Arc<JobRecord>> =
            self.records.iter().map(|r| Arc::clone(r.value())).collect();
        records.sort_by_key(|r| r.created_at);
        Ok(records)
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}
