//! Background pipeline that turns a media payload into artifacts

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::providers::{GenerationProvider, PromptKind};
use crate::storage::JobStore;
use crate::types::{
    job::{MSG_GENERATING, MSG_TRANSCRIBING},
    ArtifactKind, Artifacts, JobId, JobStatus, MediaPayload,
};

/// Why a pipeline stopped early
#[derive(Debug)]
enum StageError {
    /// The job store rejected or lost a write; the record can't be updated
    Store(Error),
    /// A capability call failed; the job is marked FAILED
    Capability(Error),
}

/// Runs jobs in the background and reports progress through the job store
///
/// The orchestrator keeps no handle to the tasks it spawns; pollers learn
/// everything from the store.
#[derive(Clone)]
pub struct JobOrchestrator {
    store: Arc<dyn JobStore>,
    provider: Arc<dyn GenerationProvider>,
    call_timeout: Option<Duration>,
}

impl JobOrchestrator {
    /// Create a new orchestrator
    pub fn new(store: Arc<dyn JobStore>, provider: Arc<dyn GenerationProvider>) -> Self {
        Self {
            store,
            provider,
            call_timeout: None,
        }
    }

    /// Limit every capability call to `timeout`
    pub fn with_call_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    pub fn provider(&self) -> &Arc<dyn GenerationProvider> {
        &self.provider
    }

    /// Accept a job and start its pipeline
    ///
    /// The PENDING record exists before this returns, so an immediate poll
    /// finds it.
    pub async fn submit(&self, media: MediaPayload) -> Result<JobId> {
        let id = JobId::new();
        self.store.create(id).await?;

        tracing::info!(
            "Job {} accepted: {} ({}, {} bytes)",
            id,
            media.file_name,
            media.mime_type,
            media.size()
        );

        let this = self.clone();
        tokio::spawn(async move {
            this.run_job(id, media).await;
        });

        Ok(id)
    }

    /// Run the pipeline inline without touching the store
    pub async fn process(&self, media: &MediaPayload) -> Result<Artifacts> {
        let transcript = self.transcribe(media).await?;
        self.generate_all(transcript).await
    }

    async fn run_job(&self, id: JobId, media: MediaPayload) {
        let started = Instant::now();

        match self.run_stages(id, &media).await {
            Ok(()) => {
                tracing::info!("Job {} completed in {:?}", id, started.elapsed());
            }
            Err(StageError::Capability(e)) => {
                tracing::error!("Job {} failed: {}", id, e);
                if let Err(store_err) = self
                    .store
                    .set(id, JobStatus::failed(e.to_string()), None)
                    .await
                {
                    tracing::error!(
                        "Job {}: could not record failure in {}: {}",
                        id,
                        self.store.name(),
                        store_err
                    );
                }
            }
            Err(StageError::Store(e)) => {
                tracing::error!("Job {}: {} write failed: {}", id, self.store.name(), e);
                self.settle_after_store_failure(id, &e).await;
            }
        }
    }

    /// Leave a job whose progress write failed either FAILED or gone
    ///
    /// One FAILED write is attempted; if the store refuses that too the
    /// record is evicted so pollers get not-found instead of a stale status.
    async fn settle_after_store_failure(&self, id: JobId, cause: &Error) {
        let status = JobStatus::failed(format!("Job store write failed: {}", cause));
        let Err(e) = self.store.set(id, status, None).await else {
            return;
        };

        tracing::warn!("Job {}: could not record failure ({}), evicting", id, e);
        match self.store.remove(id).await {
            Ok(_) => {}
            Err(e) => tracing::error!("Job {} abandoned, eviction failed: {}", id, e),
        }
    }

    async fn run_stages(
        &self,
        id: JobId,
        media: &MediaPayload,
    ) -> std::result::Result<(), StageError> {
        self.write(id, JobStatus::processing(MSG_TRANSCRIBING), None)
            .await?;
        let transcript = self
            .transcribe(media)
            .await
            .map_err(StageError::Capability)?;
        tracing::info!("Job {}: transcript ready ({} chars)", id, transcript.len());

        self.write(id, JobStatus::processing(MSG_GENERATING), None)
            .await?;
        let artifacts = self
            .generate_all(transcript)
            .await
            .map_err(StageError::Capability)?;

        self.write(id, JobStatus::completed(), Some(artifacts)).await
    }

    async fn write(
        &self,
        id: JobId,
        status: JobStatus,
        result: Option<Artifacts>,
    ) -> std::result::Result<(), StageError> {
        self.store
            .set(id, status, result)
            .await
            .map_err(StageError::Store)
    }

    async fn transcribe(&self, media: &MediaPayload) -> Result<String> {
        let transcript = self
            .call(
                ArtifactKind::Transcript,
                self.provider.transcribe(&media.data, &media.mime_type),
            )
            .await?;

        if transcript.trim().is_empty() {
            return Err(Error::Transcription(
                "the media produced an empty transcript".to_string(),
            ));
        }
        Ok(transcript)
    }

    /// Launch the four generation calls at once; the first failure wins
    async fn generate_all(&self, transcript: String) -> Result<Artifacts> {
        let provider = &self.provider;
        let (sop, summary, action_items, key_info) = tokio::try_join!(
            self.call(
                ArtifactKind::Sop,
                provider.generate(PromptKind::Sop, &transcript)
            ),
            self.call(
                ArtifactKind::Summary,
                provider.generate(PromptKind::Summary, &transcript)
            ),
            self.call(
                ArtifactKind::ActionItems,
                provider.generate(PromptKind::ActionItems, &transcript)
            ),
            self.call(ArtifactKind::KeyInfo, provider.extract_key_info(&transcript)),
        )?;

        Ok(Artifacts {
            transcript,
            sop,
            summary,
            action_items,
            key_info: Some(key_info),
        })
    }

    /// Run one capability call, applying the timeout and labelling failures
    async fn call<T>(&self, kind: ArtifactKind, fut: impl Future<Output = Result<T>>) -> Result<T> {
        let started = Instant::now();

        let outcome = match self.call_timeout {
            Some(limit) => match tokio::time::timeout(limit, fut).await {
                Ok(outcome) => outcome,
                Err(_) => Err(Error::Timeout(limit.as_secs())),
            },
            None => fut.await,
        };

        tracing::debug!(
            "{} call finished in {:?} ({})",
            kind,
            started.elapsed(),
            if outcome.is_ok() { "ok" } else { "failed" }
        );

        outcome.map_err(|e| match kind {
            ArtifactKind::Transcript => Error::Transcription(e.to_string()),
            _ => Error::generation(kind, e.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ScriptedProvider;
    use crate::storage::InMemoryJobStore;
    use crate::types::job::MSG_COMPLETE;
    use crate::types::{JobRecord, JobState};
    use async_trait::async_trait;
    use parking_lot::Mutex;

    fn media(text: &str) -> MediaPayload {
        MediaPayload::new("meeting.mp3", Some("audio/mpeg"), text.as_bytes().to_vec()).unwrap()
    }

    async fn wait_terminal(store: &dyn JobStore, id: JobId) -> Arc<JobRecord> {
        loop {
            let record = store.get(id).await.unwrap().unwrap();
            if record.is_terminal() {
                return record;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Store wrapper recording every state written
    #[derive(Default)]
    struct RecordingStore {
        inner: InMemoryJobStore,
        writes: Mutex<Vec<(JobState, String)>>,
    }

    #[async_trait]
    impl JobStore for RecordingStore {
        async fn create(&self, id: JobId) -> Result<()> {
            self.inner.create(id).await
        }
        async fn set(&self, id: JobId, status: JobStatus, result: Option<Artifacts>) -> Result<()> {
            self.writes.lock().push((status.state, status.message.clone()));
            self.inner.set(id, status, result).await
        }
        async fn get(&self, id: JobId) -> Result<Option<Arc<JobRecord>>> {
            self.inner.get(id).await
        }
        async fn remove(&self, id: JobId) -> Result<bool> {
            self.inner.remove(id).await
        }
        async fn list(&self) -> Result<Vec<Arc<JobRecord>>> {
            self.inner.list().await
        }
        fn name(&self) -> &str {
            "recording"
        }
    }

    /// Store that refuses writes after `healthy_writes`, for `failing_writes` writes
    struct FlakyStore {
        inner: InMemoryJobStore,
        healthy_writes: usize,
        failing_writes: usize,
        writes: Mutex<usize>,
    }

    impl FlakyStore {
        fn new(healthy_writes: usize, failing_writes: usize) -> Self {
            Self {
                inner: InMemoryJobStore::new(),
                healthy_writes,
                failing_writes,
                writes: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl JobStore for FlakyStore {
        async fn create(&self, id: JobId) -> Result<()> {
            self.inner.create(id).await
        }
        async fn set(&self, id: JobId, status: JobStatus, result: Option<Artifacts>) -> Result<()> {
            let n = {
                let mut writes = self.writes.lock();
                *writes += 1;
                *writes - 1
            };
            if n >= self.healthy_writes && n - self.healthy_writes < self.failing_writes {
                return Err(Error::store_unavailable("connection reset"));
            }
            self.inner.set(id, status, result).await
        }
        async fn get(&self, id: JobId) -> Result<Option<Arc<JobRecord>>> {
            self.inner.get(id).await
        }
        async fn remove(&self, id: JobId) -> Result<bool> {
            self.inner.remove(id).await
        }
        async fn list(&self) -> Result<Vec<Arc<JobRecord>>> {
            self.inner.list().await
        }
        fn name(&self) -> &str {
            "flaky"
        }
    }

    async fn settle(store: &dyn JobStore, id: JobId) -> Option<Arc<JobRecord>> {
        for _ in 0..200 {
            match store.get(id).await.unwrap() {
                Some(record) if !record.is_terminal() => {}
                other => return other,
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {} stayed in progress", id);
    }

    #[tokio::test(start_paused = true)]
    async fn test_generation_calls_run_concurrently() {
        let provider = Arc::new(
            ScriptedProvider::new()
                .with_delay(ArtifactKind::Sop, Duration::from_millis(500))
                .with_delay(ArtifactKind::Summary, Duration::from_millis(100))
                .with_delay(ArtifactKind::ActionItems, Duration::from_millis(300))
                .with_delay(ArtifactKind::KeyInfo, Duration::from_millis(200)),
        );
        let orchestrator =
            JobOrchestrator::new(Arc::new(InMemoryJobStore::new()), provider.clone());

        let started = tokio::time::Instant::now();
        let artifacts = orchestrator.process(&media("weekly sync")).await.unwrap();
        let elapsed = started.elapsed();

        assert!(elapsed >= Duration::from_millis(500));
        assert!(elapsed < Duration::from_millis(1100), "took {:?}", elapsed);
        assert_eq!(provider.max_in_flight(), 4);
        assert_eq!(artifacts.sop, "SOP for: weekly sync");
        assert_eq!(artifacts.key_info.unwrap().task_name, "weekly sync");
    }

    #[tokio::test]
    async fn test_job_completes_with_ordered_writes() {
        let store = Arc::new(RecordingStore::default());
        let orchestrator = JobOrchestrator::new(store.clone(), Arc::new(ScriptedProvider::new()));

        let id = orchestrator.submit(media("invoice walkthrough")).await.unwrap();
        let record = wait_terminal(store.as_ref(), id).await;

        assert_eq!(record.status.state, JobState::Completed);
        assert_eq!(record.status.message, MSG_COMPLETE);
        let result = record.result.as_ref().unwrap();
        assert_eq!(result.transcript, "invoice walkthrough");
        assert_eq!(result.summary, "Summary for: invoice walkthrough");

        let writes = store.writes.lock().clone();
        assert_eq!(
            writes,
            vec![
                (JobState::Processing, MSG_TRANSCRIBING.to_string()),
                (JobState::Processing, MSG_GENERATING.to_string()),
                (JobState::Completed, MSG_COMPLETE.to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_generation_discards_partial_results() {
        let store = Arc::new(InMemoryJobStore::new());
        let provider = ScriptedProvider::new().with_failure(ArtifactKind::Sop, "quota exceeded");
        let orchestrator = JobOrchestrator::new(store.clone(), Arc::new(provider));

        let id = orchestrator.submit(media("t")).await.unwrap();
        let record = wait_terminal(store.as_ref(), id).await;

        assert_eq!(record.status.state, JobState::Failed);
        assert!(record.status.message.contains("quota exceeded"));
        assert!(record.status.message.starts_with("SOP"));
        assert!(record.result.is_none());
    }

    #[tokio::test]
    async fn test_transcription_failure_skips_generation() {
        let store = Arc::new(InMemoryJobStore::new());
        let provider = Arc::new(
            ScriptedProvider::new().with_failure(ArtifactKind::Transcript, "unsupported codec"),
        );
        let orchestrator = JobOrchestrator::new(store.clone(), provider.clone());

        let id = orchestrator.submit(media("t")).await.unwrap();
        let record = wait_terminal(store.as_ref(), id).await;

        assert_eq!(record.status.state, JobState::Failed);
        assert_eq!(
            record.status.message,
            "Transcription failed: unsupported codec"
        );
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_transcript_fails() {
        let orchestrator = JobOrchestrator::new(
            Arc::new(InMemoryJobStore::new()),
            Arc::new(ScriptedProvider::new().with_transcript("   ")),
        );
        let err = orchestrator.process(&media("t")).await.unwrap_err();
        assert!(matches!(err, Error::Transcription(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_timeout_is_a_failure() {
        let provider = ScriptedProvider::new()
            .with_delay(ArtifactKind::KeyInfo, Duration::from_secs(30));
        let orchestrator = JobOrchestrator::new(Arc::new(InMemoryJobStore::new()), Arc::new(provider))
            .with_call_timeout(Some(Duration::from_secs(5)));

        let err = orchestrator.process(&media("t")).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Key info generation failed: request timed out after 5s"
        );
    }

    #[tokio::test]
    async fn test_store_hiccup_marks_job_failed() {
        // Second write (the generating status) is refused, the next one succeeds
        let store = Arc::new(FlakyStore::new(1, 1));
        let provider = Arc::new(ScriptedProvider::new());
        let orchestrator = JobOrchestrator::new(store.clone(), provider.clone());

        let id = orchestrator.submit(media("t")).await.unwrap();
        let record = settle(store.as_ref(), id).await.unwrap();

        assert_eq!(record.status.state, JobState::Failed);
        assert!(record.status.message.contains("connection reset"));
        assert!(record.result.is_none());
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_store_outage_evicts_job() {
        let store = Arc::new(FlakyStore::new(1, usize::MAX));
        let provider = Arc::new(ScriptedProvider::new());
        let orchestrator = JobOrchestrator::new(store.clone(), provider.clone());

        let id = orchestrator.submit(media("t")).await.unwrap();

        // Never left at the stale PROCESSING status
        assert!(settle(store.as_ref(), id).await.is_none());
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_jobs_keep_their_own_results() {
        let store = Arc::new(InMemoryJobStore::new());
        let orchestrator = JobOrchestrator::new(store.clone(), Arc::new(ScriptedProvider::new()));

        let submits: Vec<_> = (0..16)
            .map(|i| {
                let orchestrator = orchestrator.clone();
                tokio::spawn(async move {
                    let id = orchestrator.submit(media(&format!("meeting {}", i))).await;
                    (i, id.unwrap())
                })
            })
            .collect();

        let mut ids = Vec::new();
        for submit in submits {
            ids.push(submit.await.unwrap());
        }

        let unique: std::collections::HashSet<_> = ids.iter().map(|(_, id)| *id).collect();
        assert_eq!(unique.len(), ids.len());

        for (i, id) in ids {
            let record = wait_terminal(store.as_ref(), id).await;
            let result = record.result.as_ref().unwrap();
            assert_eq!(result.transcript, format!("meeting {}", i));
            assert_eq!(result.sop, format!("SOP for: meeting {}", i));
        }
    }
}
