//! Generation capability trait

use async_trait::async_trait;

use super::prompt::PromptKind;
use crate::error::Result;
use crate::types::KeyInfo;

/// Trait for the external text-generation capability
///
/// Every call is independent and may fail; callers decide what a failure
/// means for the job.
///
/// Implementations:
/// - `GeminiClient`: Gemini REST API
/// - `DemoProvider`: canned offline responses
/// - `ScriptedProvider`: programmable responses, delays and failures
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Transcribe raw media bytes of the given MIME type
    async fn transcribe(&self, media: &[u8], mime_type: &str) -> Result<String>;

    /// Generate one text document (SOP, summary or action items)
    async fn generate(&self, kind: PromptKind, transcript: &str) -> Result<String>;

    /// Extract the four-field key info record
    async fn extract_key_info(&self, transcript: &str) -> Result<KeyInfo>;

    /// Check if the provider is available
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}
