//! Prompt templates for transcription and document generation

use serde_json::{json, Value};
use std::fmt;

use crate::types::ArtifactKind;

/// Placeholder replaced by the transcript in every template
const TRANSCRIPT_PLACEHOLDER: &str = "{transcript}";

/// Text documents generated from a transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptKind {
    Sop,
    Summary,
    ActionItems,
}

impl PromptKind {
    pub const ALL: [PromptKind; 3] = [PromptKind::Sop, PromptKind::Summary, PromptKind::ActionItems];

    fn template(&self) -> &'static str {
        match self {
            PromptKind::Sop => SOP_TEMPLATE,
            PromptKind::Summary => SUMMARY_TEMPLATE,
            PromptKind::ActionItems => ACTION_ITEMS_TEMPLATE,
        }
    }
}

impl From<PromptKind> for ArtifactKind {
    fn from(kind: PromptKind) -> Self {
        match kind {
            PromptKind::Sop => ArtifactKind::Sop,
            PromptKind::Summary => ArtifactKind::Summary,
            PromptKind::ActionItems => ArtifactKind::ActionItems,
        }
    }
}

impl fmt::Display for PromptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        ArtifactKind::from(*self).fmt(f)
    }
}

const SOP_TEMPLATE: &str = r#"You write Standard Operating Procedures for corporate teams.
Turn the transcript below into one complete SOP in Markdown with these sections:

## General Info
A two-column table ("Field", "Value") covering: Task Name, Purpose of Task, Trigger,
Estimated Completion Time, Apps, Files used, Access / Things You Will Need,
Chat groups, How to Report Back, Additional Notes. Use "N/A" when the transcript
does not say.

## Big Picture / Overview
Bullets describing the goal and the main phases.

## SOP Section
Numbered, actionable steps in order.

## Q&A / Troubleshooting
Bullets answering questions a newcomer following this SOP is likely to have.

Transcript:
---
{transcript}
---

Respond with the SOP document only."#;

const SUMMARY_TEMPLATE: &str = r#"You are an analyst writing for executives.
Summarize the transcript below: the topic, the decisions made and the outcome.

Transcript:
---
{transcript}
---

Respond with a single paragraph."#;

const ACTION_ITEMS_TEMPLATE: &str = r#"You are a project manager.
List every action item, task or follow-up in the transcript below, with the owner
when one is named. If there are none, answer "No specific action items were identified."

Transcript:
---
{transcript}
---

Respond with a bulleted list."#;

const KEY_INFO_TEMPLATE: &str = r#"Extract the key information from the transcript below according to the response schema.

Transcript:
---
{transcript}
---"#;

/// Instruction sent alongside the media for transcription
pub const TRANSCRIPTION_INSTRUCTION: &str =
    "Transcribe this audio/video file. Respond with the transcribed text only, without commentary or formatting.";

/// Prompt builder for generation calls
pub struct PromptBuilder;

impl PromptBuilder {
    /// Full prompt for a text document
    pub fn document(kind: PromptKind, transcript: &str) -> String {
        kind.template().replace(TRANSCRIPT_PLACEHOLDER, transcript)
    }

    /// Prompt for key info extraction
    pub fn key_info(transcript: &str) -> String {
        KEY_INFO_TEMPLATE.replace(TRANSCRIPT_PLACEHOLDER, transcript)
    }

    /// JSON schema the key info response must follow, all fields required
    pub fn key_info_schema() -> Value {
        json!({
            "type": "OBJECT",
            "properties": {
                "taskName": {
                    "type": "STRING",
                    "description": "The primary task or purpose of the discussion. Use \"N/A\" if not mentioned."
                },
                "mentionedApps": {
                    "type": "ARRAY",
                    "description": "Software, applications or tools mentioned.",
                    "items": { "type": "STRING" }
                },
                "keyPeople": {
                    "type": "ARRAY",
                    "description": "Names of people involved or mentioned.",
                    "items": { "type": "STRING" }
                },
                "datesOrDeadlines": {
                    "type": "ARRAY",
                    "description": "Dates, deadlines or timeframes mentioned.",
                    "items": { "type": "STRING" }
                }
            },
            "required": ["taskName", "mentionedApps", "keyPeople", "datesOrDeadlines"]
        })
    }
}
