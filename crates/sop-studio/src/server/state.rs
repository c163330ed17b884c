//! Application state for the SOP Studio server

use parking_lot::RwLock;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::Result;
use crate::processing::JobOrchestrator;
use crate::providers::{self, GenerationProvider};
use crate::storage::{InMemoryJobStore, JobStore};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: AppConfig,
    /// Job records
    store: Arc<dyn JobStore>,
    /// Generation capability
    provider: Arc<dyn GenerationProvider>,
    /// Background pipeline
    orchestrator: JobOrchestrator,
    /// Ready state
    ready: RwLock<bool>,
}

impl AppState {
    /// Create state with an in-memory store and the configured provider
    pub fn new(config: AppConfig) -> Result<Self> {
        tracing::info!(
            "Initializing application state (backend: {:?})...",
            config.generation.backend
        );

        let store: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());
        let provider = providers::from_config(&config.generation)?;

        Ok(Self::with_components(config, store, provider))
    }

    /// Create state from explicit components
    pub fn with_components(
        config: AppConfig,
        store: Arc<dyn JobStore>,
        provider: Arc<dyn GenerationProvider>,
    ) -> Self {
        let orchestrator = JobOrchestrator::new(store.clone(), provider.clone())
            .with_call_timeout(config.processing.generation_timeout());

        tracing::info!(
            "Job store: {}, evict on fetch: {}",
            store.name(),
            config.processing.evict_on_fetch
        );

        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                provider,
                orchestrator,
                ready: RwLock::new(true),
            }),
        }
    }

    /// Get configuration
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    /// Get the job store
    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.inner.store
    }

    /// Get the generation provider
    pub fn provider(&self) -> &Arc<dyn GenerationProvider> {
        &self.inner.provider
    }

    /// Get the orchestrator
    pub fn orchestrator(&self) -> &JobOrchestrator {
        &self.inner.orchestrator
    }

    /// Check if ready
    pub fn is_ready(&self) -> bool {
        *self.inner.ready.read()
    }

    /// Set ready state
    pub fn set_ready(&self, ready: bool) {
        *self.inner.ready.write() = ready;
    }
}
