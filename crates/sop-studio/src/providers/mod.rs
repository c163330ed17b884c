//! Generation capability abstractions
//!
//! The pipeline only talks to [`GenerationProvider`]; the backend is picked
//! from configuration at startup.

pub mod demo;
pub mod gemini;
pub mod generation;
pub mod mock;
pub mod prompt;

use std::sync::Arc;
use std::time::Duration;

use crate::config::{GenerationBackend, GenerationConfig};
use crate::error::Result;

pub use demo::DemoProvider;
pub use gemini::GeminiClient;
pub use generation::GenerationProvider;
pub use mock::ScriptedProvider;
pub use prompt::{PromptBuilder, PromptKind};

/// Build the provider selected by `config.backend`
pub fn from_config(config: &GenerationConfig) -> Result<Arc<dyn GenerationProvider>> {
    let provider: Arc<dyn GenerationProvider> = match config.backend {
        GenerationBackend::Gemini => Arc::new(GeminiClient::new(config)?),
        GenerationBackend::Demo => {
            Arc::new(DemoProvider::new(Duration::from_millis(config.demo_delay_ms)))
        }
    };

    tracing::info!(
        "Generation provider: {} (model: {})",
        provider.name(),
        provider.model()
    );
    Ok(provider)
}
