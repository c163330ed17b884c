//! Generated documents and their statistics

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Sentinel used when the task name could not be determined
pub const NOT_AVAILABLE: &str = "N/A";

/// Average reading speed used for reading-time estimates
const WORDS_PER_MINUTE: usize = 200;

/// The documents a job produces, used to label stages and failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Transcript,
    Sop,
    Summary,
    ActionItems,
    KeyInfo,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 5] = [
        ArtifactKind::Transcript,
        ArtifactKind::Sop,
        ArtifactKind::Summary,
        ArtifactKind::ActionItems,
        ArtifactKind::KeyInfo,
    ];

    /// Display name
    pub fn display_name(&self) -> &'static str {
        match self {
            ArtifactKind::Transcript => "Transcript",
            ArtifactKind::Sop => "SOP",
            ArtifactKind::Summary => "Summary",
            ArtifactKind::ActionItems => "Action items",
            ArtifactKind::KeyInfo => "Key info",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Structured facts extracted from a transcript.
///
/// Every field is required on the wire; a response missing any of them is
/// rejected rather than partially filled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyInfo {
    /// Primary task or purpose, `N/A` if not mentioned
    pub task_name: String,
    /// Software, applications and tools mentioned
    pub mentioned_apps: Vec<String>,
    /// People involved or mentioned
    pub key_people: Vec<String>,
    /// Dates, deadlines and timeframes mentioned
    pub dates_or_deadlines: Vec<String>,
}

impl Default for KeyInfo {
    fn default() -> Self {
        Self {
            task_name: NOT_AVAILABLE.to_string(),
            mentioned_apps: Vec::new(),
            key_people: Vec::new(),
            dates_or_deadlines: Vec::new(),
        }
    }
}

impl KeyInfo {
    /// Parse a model response into a complete record.
    ///
    /// Tolerates surrounding whitespace and a markdown code fence. A blank
    /// task name becomes `N/A`.
    pub fn parse(raw: &str) -> Result<Self> {
        let body = strip_code_fence(raw.trim());
        if body.is_empty() {
            return Err(Error::capability(
                "Key info extraction returned an empty response",
            ));
        }

        let mut info: KeyInfo = serde_json::from_str(body).map_err(|e| {
            Error::capability(format!("Key info response did not match the schema: {}", e))
        })?;

        if info.task_name.trim().is_empty() {
            info.task_name = NOT_AVAILABLE.to_string();
        }
        Ok(info)
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Bundle produced by a successful job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifacts {
    /// Raw transcript of the media
    #[serde(rename = "transcription")]
    pub transcript: String,
    /// Standard operating procedure in markdown
    pub sop: String,
    /// Executive summary
    pub summary: String,
    /// Bulleted action items
    pub action_items: String,
    /// Extracted key facts
    pub key_info: Option<KeyInfo>,
}

impl Artifacts {
    /// Text of one document, `None` for key info which is structured
    pub fn text(&self, kind: ArtifactKind) -> Option<&str> {
        match kind {
            ArtifactKind::Transcript => Some(&self.transcript),
            ArtifactKind::Sop => Some(&self.sop),
            ArtifactKind::Summary => Some(&self.summary),
            ArtifactKind::ActionItems => Some(&self.action_items),
            ArtifactKind::KeyInfo => None,
        }
    }
}

/// Word, character and reading-time counts for one document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentStats {
    pub words: usize,
    pub characters: usize,
    pub reading_time_minutes: usize,
}

impl DocumentStats {
    pub fn of(text: &str) -> Self {
        if text.is_empty() {
            return Self::default();
        }
        let words = text.split_whitespace().count();
        Self {
            words,
            characters: text.chars().count(),
            reading_time_minutes: words.div_ceil(WORDS_PER_MINUTE),
        }
    }
}

/// Stats for every text document of a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactStats {
    pub transcription: DocumentStats,
    pub sop: DocumentStats,
    pub summary: DocumentStats,
    pub action_items: DocumentStats,
}

impl From<&Artifacts> for ArtifactStats {
    fn from(artifacts: &Artifacts) -> Self {
        Self {
            transcription: DocumentStats::of(&artifacts.transcript),
            sop: DocumentStats::of(&artifacts.sop),
            summary: DocumentStats::of(&artifacts.summary),
            action_items: DocumentStats::of(&artifacts.action_items),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_info() {
        let raw = r#"{"taskName":"Invoice intake","mentionedApps":["SAP","Outlook"],"keyPeople":["Priya"],"datesOrDeadlines":["Friday"]}"#;
        let info = KeyInfo::parse(raw).unwrap();
        assert_eq!(info.task_name, "Invoice intake");
        assert_eq!(info.mentioned_apps, vec!["SAP", "Outlook"]);
        assert_eq!(info.key_people, vec!["Priya"]);
        assert_eq!(info.dates_or_deadlines, vec!["Friday"]);
    }

    #[test]
    fn test_parse_key_info_fenced() {
        let raw = "```json\n{\"taskName\":\"\",\"mentionedApps\":[],\"keyPeople\":[],\"datesOrDeadlines\":[]}\n```";
        let info = KeyInfo::parse(raw).unwrap();
        assert_eq!(info.task_name, NOT_AVAILABLE);
        assert!(info.mentioned_apps.is_empty());
    }

    #[test]
    fn test_partial_key_info_rejected() {
        let raw = r#"{"taskName":"Deploy","mentionedApps":["Slack"]}"#;
        let err = KeyInfo::parse(raw).unwrap_err();
        assert!(err.to_string().contains("schema"));

        assert!(KeyInfo::parse("   ").is_err());
    }

    #[test]
    fn test_document_stats() {
        assert_eq!(DocumentStats::of(""), DocumentStats::default());

        let stats = DocumentStats::of("one two  three\nfour");
        assert_eq!(stats.words, 4);
        assert_eq!(stats.characters, 19);
        assert_eq!(stats.reading_time_minutes, 1);

        let long = "word ".repeat(401);
        assert_eq!(DocumentStats::of(&long).reading_time_minutes, 3);
    }

    #[test]
    fn test_artifacts_wire_names() {
        let artifacts = Artifacts {
            transcript: "hello".into(),
            sop: "## SOP".into(),
            summary: "sum".into(),
            action_items: "- do it".into(),
            key_info: Some(KeyInfo::default()),
        };
        let json = serde_json::to_value(&artifacts).unwrap();
        assert_eq!(json["transcription"], "hello");
        assert_eq!(json["actionItems"], "- do it");
        assert_eq!(json["keyInfo"]["taskName"], NOT_AVAILABLE);
    }
}
