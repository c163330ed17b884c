//! Offline provider returning a fixed sample meeting
//!
//! Useful for running the server without an API key.

use async_trait::async_trait;
use std::time::Duration;

use super::generation::GenerationProvider;
use super::prompt::PromptKind;
use crate::error::Result;
use crate::types::KeyInfo;

pub const DEMO_TRANSCRIPT: &str = "\
Okay everyone, this is the walkthrough for the monthly vendor invoice intake. Priya, you own the shared inbox this month.

Right. Every morning I export new invoices from the Outlook inbox into the Invoices-Incoming folder on the finance drive.

Good. Then you check each invoice against the purchase order in SAP. If the amounts differ by more than two percent, flag it in the AP-exceptions channel on Teams and tag Marco.

And matching invoices go straight into the approval queue?

Yes. Enter them in SAP with the PO number and the cost centre, then move the PDF to Invoices-Processed. Marco approves anything over ten thousand euros himself.

I can do the approvals by Thursday noon so payments make the Friday run.

Perfect. Month-end close is the 28th, so nothing should be sitting in the inbox after the 26th. Questions?

None from me.";

pub const DEMO_SOP: &str = "\
## General Info
| Field | Value |
|---|---|
| Task Name | Monthly Vendor Invoice Intake |
| Purpose of Task | Record and approve vendor invoices in time for the weekly payment run. |
| Trigger | New invoices arriving in the shared inbox. |
| Estimated Completion Time | N/A |
| Apps | Outlook, SAP, Microsoft Teams |
| Files used | Invoices-Incoming, Invoices-Processed |
| Access / Things You Will Need | Shared inbox, finance drive, SAP AP access |
| Chat groups | AP-exceptions |
| How to Report Back | Flag exceptions in AP-exceptions and tag Marco. |
| Additional Notes | Inbox must be empty after the 26th. |

## Big Picture / Overview
* Collect new invoices from the shared inbox every morning.
* Match each invoice to its purchase order in SAP.
* Escalate mismatches, enter matches for approval.
* Finish before the month-end close.

## SOP Section
1. Export new invoices from Outlook into Invoices-Incoming.
2. Compare each invoice with its purchase order in SAP.
3. If the amounts differ by more than 2%, post in AP-exceptions and tag Marco.
4. Otherwise enter the invoice in SAP with the PO number and cost centre.
5. Move the PDF to Invoices-Processed.
6. Make sure approvals land by Thursday noon for the Friday payment run.

## Q&A / Troubleshooting
* **Who approves invoices above EUR 10,000?** Marco, personally.
* **What if an invoice arrives after the 26th?** Escalate in AP-exceptions before close on the 28th.";

pub const DEMO_SUMMARY: &str = "\
The team walked through the monthly vendor invoice intake: Priya exports new invoices from the shared \
Outlook inbox each morning, matches them against purchase orders in SAP and escalates differences above \
two percent to Marco via the AP-exceptions channel, while matching invoices are entered for approval. \
Approvals are due by Thursday noon for the Friday payment run and the inbox must be cleared by the 26th \
ahead of the month-end close on the 28th.";

pub const DEMO_ACTION_ITEMS: &str = "\
* Export new invoices from Outlook into Invoices-Incoming every morning (Priya).
* Match invoices to purchase orders in SAP and escalate >2% differences in AP-exceptions (Priya).
* Approve invoices above EUR 10,000 (Marco).
* Complete approvals by Thursday noon for the Friday payment run (Marco).
* Clear the inbox by the 26th ahead of month-end close (Priya).";

pub fn demo_key_info() -> KeyInfo {
    KeyInfo {
        task_name: "Monthly Vendor Invoice Intake".to_string(),
        mentioned_apps: vec![
            "Outlook".to_string(),
            "SAP".to_string(),
            "Microsoft Teams".to_string(),
        ],
        key_people: vec!["Priya".to_string(), "Marco".to_string()],
        dates_or_deadlines: vec![
            "Thursday noon".to_string(),
            "Friday payment run".to_string(),
            "26th".to_string(),
            "28th".to_string(),
        ],
    }
}

/// Provider that ignores its input and returns the sample meeting
pub struct DemoProvider {
    delay: Duration,
}

impl DemoProvider {
    /// Create a demo provider that waits `delay` on every call
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    async fn simulate_latency(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

impl Default for DemoProvider {
    fn default() -> Self {
        Self::new(Duration::from_millis(1500))
    }
}

#[async_trait]
impl GenerationProvider for DemoProvider {
    async fn transcribe(&self, media: &[u8], mime_type: &str) -> Result<String> {
        tracing::debug!(
            "Demo transcription of {} bytes ({}), returning sample transcript",
            media.len(),
            mime_type
        );
        self.simulate_latency().await;
        Ok(DEMO_TRANSCRIPT.to_string())
    }

    async fn generate(&self, kind: PromptKind, _transcript: &str) -> Result<String> {
        self.simulate_latency().await;
        let text = match kind {
            PromptKind::Sop => DEMO_SOP,
            PromptKind::Summary => DEMO_SUMMARY,
            PromptKind::ActionItems => DEMO_ACTION_ITEMS,
        };
        Ok(text.to_string())
    }

    async fn extract_key_info(&self, _transcript: &str) -> Result<KeyInfo> {
        self.simulate_latency().await;
        Ok(demo_key_info())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "demo"
    }

    fn model(&self) -> &str {
        "sample-meeting"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_demo_documents() {
        let provider = DemoProvider::new(Duration::ZERO);
        let transcript = provider.transcribe(b"ignored", "audio/mpeg").await.unwrap();
        assert_eq!(transcript, DEMO_TRANSCRIPT);

        let sop = provider.generate(PromptKind::Sop, &transcript).await.unwrap();
        assert!(sop.starts_with("## General Info"));

        let info = provider.extract_key_info(&transcript).await.unwrap();
        assert_eq!(info.key_people, vec!["Priya", "Marco"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_demo_latency() {
        let provider = DemoProvider::new(Duration::from_millis(250));
        let started = tokio::time::Instant::now();
        provider.generate(PromptKind::Summary, "x").await.unwrap();
        assert_eq!(started.elapsed(), Duration::from_millis(250));
    }
}
