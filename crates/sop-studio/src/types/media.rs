//! Uploaded media payloads and their validation

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::error::{Error, Result};

/// A validated media file ready for transcription
#[derive(Debug, Clone)]
pub struct MediaPayload {
    /// Original file name, informational only
    pub file_name: String,
    /// Normalized MIME type (`audio/*` or `video/*`, no parameters)
    pub mime_type: String,
    /// Raw file bytes
    pub data: Vec<u8>,
}

impl MediaPayload {
    /// Validate and build a payload.
    ///
    /// Fails when the MIME type is missing or not audio/video, or when the
    /// data is empty. Nothing is created for a rejected payload.
    pub fn new(
        file_name: impl Into<String>,
        mime_type: Option<&str>,
        data: Vec<u8>,
    ) -> Result<Self> {
        let mime_type = normalize_mime(mime_type)?;

        if data.is_empty() {
            return Err(Error::InvalidInput("Media payload is empty".to_string()));
        }

        let file_name = file_name.into();
        let file_name = if file_name.trim().is_empty() {
            "upload".to_string()
        } else {
            file_name
        };

        Ok(Self {
            file_name,
            mime_type,
            data,
        })
    }

    /// Decode a base64 body, accepting an optional `data:<mime>;base64,` prefix
    pub fn from_base64(
        file_name: impl Into<String>,
        mime_type: Option<&str>,
        base64_data: &str,
    ) -> Result<Self> {
        // Check the MIME type first so a missing type is reported as such
        normalize_mime(mime_type)?;

        let encoded = match base64_data.split_once(";base64,") {
            Some((prefix, rest)) if prefix.starts_with("data:") => rest,
            _ => base64_data,
        };
        let data = STANDARD
            .decode(encoded.trim())
            .map_err(|e| Error::InvalidInput(format!("base64Data is not valid base64: {}", e)))?;

        Self::new(file_name, mime_type, data)
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Lowercase a MIME type, strip parameters and require audio or video
fn normalize_mime(mime_type: Option<&str>) -> Result<String> {
    let raw = mime_type.map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        return Err(Error::InvalidInput("Missing mimeType".to_string()));
    }

    let essence = raw
        .split(';')
        .next()
        .unwrap_or(raw)
        .trim()
        .to_ascii_lowercase();

    let (kind, subtype) = essence
        .split_once('/')
        .ok_or_else(|| Error::UnsupportedMediaType(raw.to_string()))?;
    if subtype.is_empty() || !matches!(kind, "audio" | "video") {
        return Err(Error::UnsupportedMediaType(raw.to_string()));
    }

    Ok(essence)
}
