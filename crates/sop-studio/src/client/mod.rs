//! Polling client for the job protocol
//!
//! Starts a job, then polls its status on a fixed interval until the job
//! ends or the server can no longer be reached. A job that failed and a
//! server that went away are reported as different outcomes.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::types::{Artifacts, JobId, JobState, MediaPayload, PollResponse, StartRequest, StartResponse};

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// How a wait for a job ended
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// The job completed with these results
    Completed(Box<Artifacts>),
    /// The job failed with this message
    Failed(String),
    /// The server could not be reached or answered with an error
    ConnectionLost(String),
    /// The configured maximum poll duration elapsed
    TimedOut,
}

/// HTTP client for starting and polling jobs
pub struct StatusClient {
    client: Client,
    base_url: String,
    poll_interval: Duration,
    max_poll: Option<Duration>,
}

impl StatusClient {
    /// Create a new client
    pub fn new(config: &ClientConfig) -> Result<Self> {
        if config.poll_interval_ms == 0 {
            return Err(Error::Config(
                "client.poll_interval_ms must be positive".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.server_url.trim_end_matches('/').to_string(),
            poll_interval: config.poll_interval(),
            max_poll: config.max_poll_secs.map(Duration::from_secs),
        })
    }

    /// Override the poll interval, at least one millisecond
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(MIN_POLL_INTERVAL);
        self
    }

    /// Start a job for a media payload
    pub async fn start(&self, media: &MediaPayload) -> Result<JobId> {
        let request = StartRequest {
            file_name: Some(media.file_name.clone()),
            mime_type: Some(media.mime_type.clone()),
            size: Some(media.size() as u64),
            base64_data: Some(STANDARD.encode(&media.data)),
        };

        let response = self
            .client
            .post(format!("{}/api/jobs", self.base_url))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::InvalidInput(format!(
                "Server rejected the job ({}): {}",
                status,
                body.trim()
            )));
        }

        let started: StartResponse = response.json().await?;
        tracing::info!("Job {} started: {}", started.job_id, started.message);
        Ok(started.job_id)
    }

    /// Fetch the current status once
    pub async fn poll(&self, id: JobId) -> Result<PollResponse> {
        let response = self
            .client
            .get(format!("{}/api/jobs/{}", self.base_url, id))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::JobNotFound(format!(
                "{} (server answered {})",
                id,
                response.status()
            )));
        }

        Ok(response.json().await?)
    }

    /// Poll until the job ends or the server is lost
    ///
    /// The first poll happens one interval after the call, later polls
    /// follow on the same fixed cadence.
    pub async fn wait_for_completion(&self, id: JobId) -> PollOutcome {
        self.wait_with_progress(id, |_| {}).await
    }

    /// Like [`wait_for_completion`](Self::wait_for_completion), reporting
    /// every non-terminal status message to `on_progress`
    pub async fn wait_with_progress(
        &self,
        id: JobId,
        mut on_progress: impl FnMut(&str),
    ) -> PollOutcome {
        let started = Instant::now();
        let mut ticker = interval_at(started + self.poll_interval, self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            if let Some(max) = self.max_poll {
                if started.elapsed() >= max {
                    tracing::warn!("Gave up on job {} after {:?}", id, max);
                    return PollOutcome::TimedOut;
                }
            }

            let response = match self.poll(id).await {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!("Lost connection while polling job {}: {}", id, e);
                    return PollOutcome::ConnectionLost(e.to_string());
                }
            };

            match response.status.state {
                JobState::Completed => {
                    return match response.results {
                        Some(results) => PollOutcome::Completed(Box::new(results)),
                        None => PollOutcome::ConnectionLost(format!(
                            "job {} completed without results",
                            id
                        )),
                    };
                }
                JobState::Failed => return PollOutcome::Failed(response.status.message),
                JobState::Pending | JobState::Processing => {
                    tracing::debug!("Job {}: {}", id, response.status.message);
                    on_progress(&response.status.message);
                }
            }
        }
    }
}
