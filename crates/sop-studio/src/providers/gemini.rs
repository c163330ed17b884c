//! Gemini client for transcription and document generation
//!
//! Talks to the Generative Language REST API with an API key.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::generation::GenerationProvider;
use super::prompt::{PromptBuilder, PromptKind, TRANSCRIPTION_INSTRUCTION};
use crate::config::GenerationConfig;
use crate::error::{Error, Result};
use crate::types::KeyInfo;

/// Gemini REST client
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    temperature: f32,
    top_p: f32,
}

impl GeminiClient {
    /// Create a new Gemini client; the config must carry an API key
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::Config("Gemini API key is not set".to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .pool_max_idle_per_host(8)
            .build()?;

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            temperature: config.temperature,
            top_p: config.top_p,
        })
    }

    /// Get the API endpoint URL
    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    /// Send a request and return the concatenated response text
    async fn send(&self, request: &GenerateRequest, operation: &str) -> Result<String> {
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| Error::capability(format!("Gemini {} request failed: {}", operation, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::capability(format!(
                "Gemini {} failed ({}): {}",
                operation,
                status,
                api_error_message(&body)
            )));
        }

        let gen_response: GenerateResponse = response.json().await.map_err(|e| {
            Error::capability(format!("Failed to parse Gemini {} response: {}", operation, e))
        })?;

        extract_text(gen_response).ok_or_else(|| {
            Error::capability(format!(
                "Gemini {} returned an empty response",
                operation
            ))
        })
    }

    fn text_request(&self, prompt: String) -> GenerateRequest {
        GenerateRequest {
            contents: vec![Content::user(vec![Part::text(prompt)])],
            generation_config: Some(GenerationParams {
                temperature: Some(self.temperature),
                top_p: Some(self.top_p),
                ..Default::default()
            }),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationParams>,
}

#[derive(Debug, Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

impl Content {
    fn user(parts: Vec<Part>) -> Self {
        Self {
            role: "user".to_string(),
            parts,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

impl Part {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    fn inline(mime_type: &str, data: &[u8]) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: mime_type.to_string(),
                data: STANDARD.encode(data),
            }),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// Join the text parts of the first candidate, `None` if there are none
fn extract_text(response: GenerateResponse) -> Option<String> {
    let text: String = response
        .candidates
        .into_iter()
        .next()?
        .content?
        .parts
        .into_iter()
        .filter_map(|p| p.text)
        .collect();

    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

/// The `error.message` of an API error body, or the raw body
fn api_error_message(body: &str) -> String {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) => parsed.error.message,
        Err(_) => body.trim().to_string(),
    }
}

#[async_trait]
impl GenerationProvider for GeminiClient {
    async fn transcribe(&self, media: &[u8], mime_type: &str) -> Result<String> {
        let request = GenerateRequest {
            contents: vec![Content::user(vec![
                Part::text(TRANSCRIPTION_INSTRUCTION),
                Part::inline(mime_type, media),
            ])],
            generation_config: None,
        };
        self.send(&request, "transcription").await
    }

    async fn generate(&self, kind: PromptKind, transcript: &str) -> Result<String> {
        let request = self.text_request(PromptBuilder::document(kind, transcript));
        let operation = format!("{} generation", kind);
        self.send(&request, &operation).await
    }

    async fn extract_key_info(&self, transcript: &str) -> Result<KeyInfo> {
        let request = GenerateRequest {
            contents: vec![Content::user(vec![Part::text(PromptBuilder::key_info(
                transcript,
            ))])],
            generation_config: Some(GenerationParams {
                response_mime_type: Some("application/json".to_string()),
                response_schema: Some(PromptBuilder::key_info_schema()),
                ..Default::default()
            }),
        };
        let raw = self.send(&request, "key info extraction").await?;
        KeyInfo::parse(&raw)
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/models/{}", self.base_url, self.model);
        match self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
        {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }
}
