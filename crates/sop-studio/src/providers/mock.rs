//! Scripted provider with programmable delays and failures
//!
//! Used by the pipeline tests and handy for local experiments. Every call
//! is tagged with the artifact it produces so a script can slow down or
//! break exactly one stage.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::generation::GenerationProvider;
use super::prompt::PromptKind;
use crate::error::{Error, Result};
use crate::types::{ArtifactKind, KeyInfo};

/// Provider whose answers are derived from its input
///
/// - transcription echoes the media bytes as UTF-8 (or a fixed transcript)
/// - documents are `"{kind} for: {transcript}"`
/// - key info carries the transcript as its task name
#[derive(Default)]
pub struct ScriptedProvider {
    transcript: Option<String>,
    delays: HashMap<ArtifactKind, Duration>,
    failures: HashMap<ArtifactKind, String>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return this transcript instead of echoing the media
    pub fn with_transcript(mut self, transcript: impl Into<String>) -> Self {
        self.transcript = Some(transcript.into());
        self
    }

    /// Sleep before answering calls for `kind`
    pub fn with_delay(mut self, kind: ArtifactKind, delay: Duration) -> Self {
        self.delays.insert(kind, delay);
        self
    }

    /// Fail calls for `kind` with `message`
    pub fn with_failure(mut self, kind: ArtifactKind, message: impl Into<String>) -> Self {
        self.failures.insert(kind, message.into());
        self
    }

    /// Highest number of calls observed running at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Total number of calls started
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn run<T>(&self, kind: ArtifactKind, answer: impl FnOnce() -> T) -> Result<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delays.get(&kind) {
            tokio::time::sleep(*delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.failures.get(&kind) {
            Some(message) => Err(Error::capability(message.clone())),
            None => Ok(answer()),
        }
    }
}

#[async_trait]
impl GenerationProvider for ScriptedProvider {
    async fn transcribe(&self, media: &[u8], _mime_type: &str) -> Result<String> {
        self.run(ArtifactKind::Transcript, || match &self.transcript {
            Some(fixed) => fixed.clone(),
            None => String::from_utf8_lossy(media).into_owned(),
        })
        .await
    }

    async fn generate(&self, kind: PromptKind, transcript: &str) -> Result<String> {
        self.run(kind.into(), || format!("{} for: {}", kind, transcript))
            .await
    }

    async fn extract_key_info(&self, transcript: &str) -> Result<KeyInfo> {
        self.run(ArtifactKind::KeyInfo, || KeyInfo {
            task_name: transcript.to_string(),
            ..Default::default()
        })
        .await
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted"
    }
}
