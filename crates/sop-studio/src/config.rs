//! Configuration for the SOP Studio server and client

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Generation capability configuration
    #[serde(default)]
    pub generation: GenerationConfig,
    /// Pipeline configuration
    #[serde(default)]
    pub processing: ProcessingConfig,
    /// Polling client configuration
    #[serde(default)]
    pub client: ClientConfig,
}

impl AppConfig {
    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid config file: {}", e)))
    }

    /// Load from an optional TOML file, apply environment overrides and validate
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|e| {
                    Error::Config(format!("Failed to read {}: {}", path.display(), e))
                })?;
                Self::from_toml_str(&content)?
            }
            None => Self::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a key lookup (the process environment in `load`)
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(host) = lookup("SOP_STUDIO_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("SOP_STUDIO_PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Some(backend) = lookup("SOP_STUDIO_BACKEND") {
            match backend.to_ascii_lowercase().as_str() {
                "gemini" => self.generation.backend = GenerationBackend::Gemini,
                "demo" => self.generation.backend = GenerationBackend::Demo,
                other => tracing::warn!("Ignoring unknown SOP_STUDIO_BACKEND '{}'", other),
            }
        }
        if let Some(model) = lookup("SOP_STUDIO_MODEL") {
            self.generation.model = model;
        }
        if let Some(key) = lookup("GEMINI_API_KEY").or_else(|| lookup("API_KEY")) {
            if !key.trim().is_empty() {
                self.generation.api_key = Some(key);
            }
        }
        if let Some(evict) = lookup("SOP_STUDIO_EVICT_ON_FETCH") {
            self.processing.evict_on_fetch = matches!(evict.as_str(), "1" | "true" | "yes");
        }
    }

    /// Reject configurations the server cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.generation.backend == GenerationBackend::Gemini
            && self.generation.api_key.as_deref().map_or(true, |k| k.trim().is_empty())
        {
            return Err(Error::Config(
                "Gemini backend selected but no API key is set (GEMINI_API_KEY), \
                 or use backend = \"demo\""
                    .to_string(),
            ));
        }
        if self.client.poll_interval_ms == 0 {
            return Err(Error::Config("client.poll_interval_ms must be positive".to_string()));
        }
        if self.processing.generation_timeout_secs == Some(0) {
            return Err(Error::Config(
                "processing.generation_timeout_secs must be positive when set".to_string(),
            ));
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum request body size in bytes (default: 100MB)
    pub max_upload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            enable_cors: true,
            max_upload_size: 100 * 1024 * 1024,
        }
    }
}

/// Which generation capability backs the pipeline
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GenerationBackend {
    /// Gemini REST API
    #[default]
    Gemini,
    /// Offline canned responses
    Demo,
}

/// Generation capability configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Backend selection
    pub backend: GenerationBackend,
    /// API key, normally supplied through the environment
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Model name
    pub model: String,
    /// API base URL
    pub base_url: String,
    /// Temperature for document generation
    pub temperature: f32,
    /// Top-p for document generation
    pub top_p: f32,
    /// HTTP request timeout in seconds
    pub request_timeout_secs: u64,
    /// Simulated latency of the demo backend per call
    pub demo_delay_ms: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            backend: GenerationBackend::Gemini,
            api_key: None,
            model: "gemini-2.5-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            temperature: 0.2,
            top_p: 0.9,
            request_timeout_secs: 600,
            demo_delay_ms: 1500,
        }
    }
}

impl fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("backend", &self.backend)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("temperature", &self.temperature)
            .field("top_p", &self.top_p)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("demo_delay_ms", &self.demo_delay_ms)
            .finish()
    }
}

/// Pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Drop a completed job after its result is fetched once
    pub evict_on_fetch: bool,
    /// Per-call limit on capability calls, none by default
    pub generation_timeout_secs: Option<u64>,
}

impl ProcessingConfig {
    pub fn generation_timeout(&self) -> Option<Duration> {
        self.generation_timeout_secs.map(Duration::from_secs)
    }
}

/// Polling client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server base URL
    pub server_url: String,
    /// Fixed poll interval in milliseconds (default: 3000)
    pub poll_interval_ms: u64,
    /// Give up after this many seconds of polling, none by default
    pub max_poll_secs: Option<u64>,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8080".to_string(),
            poll_interval_ms: 3000,
            max_poll_secs: None,
            request_timeout_secs: 30,
        }
    }
}

impl ClientConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.client.poll_interval(), Duration::from_secs(3));
        assert!(!config.processing.evict_on_fetch);
        assert!(config.processing.generation_timeout().is_none());
        assert_eq!(config.generation.model, "gemini-2.5-flash");
    }

    #[test]
    fn test_partial_toml() {
        let config = AppConfig::from_toml_str(
            r#"
            [server]
            port = 9000

            [generation]
            backend = "demo"
            demo_delay_ms = 10

            [processing]
            evict_on_fetch = true
            generation_timeout_secs = 120
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.generation.backend, GenerationBackend::Demo);
        assert_eq!(config.generation.demo_delay_ms, 10);
        assert!(config.processing.evict_on_fetch);
        assert_eq!(
            config.processing.generation_timeout(),
            Some(Duration::from_secs(120))
        );
        config.validate().unwrap();
    }

    #[test]
    fn test_bad_toml() {
        assert!(matches!(
            AppConfig::from_toml_str("[server]\nport = \"x\""),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("SOP_STUDIO_PORT", "7070"),
            ("SOP_STUDIO_BACKEND", "DEMO"),
            ("API_KEY", "secret"),
            ("SOP_STUDIO_EVICT_ON_FETCH", "true"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.server.port, 7070);
        assert_eq!(config.generation.backend, GenerationBackend::Demo);
        assert_eq!(config.generation.api_key.as_deref(), Some("secret"));
        assert!(config.processing.evict_on_fetch);
    }

    #[test]
    fn test_gemini_requires_key() {
        let mut config = AppConfig::default();
        assert!(config.validate().is_err());

        config.generation.api_key = Some("key".to_string());
        config.validate().unwrap();
    }

    #[test]
    fn test_debug_redacts_key() {
        let mut config = GenerationConfig::default();
        config.api_key = Some("top-secret".to_string());
        let debug = format!("{:?}", config);
        assert!(!debug.contains("top-secret"));
        assert!(debug.contains("<redacted>"));
    }
}
