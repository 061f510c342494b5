//! Email intelligence — classification and summary/reply generation.
//!
//! Two provider tiers sit behind the [`AnalysisProvider`] trait:
//! Together (primary) and OpenRouter (secondary). The
//! [`FallbackOrchestrator`] tries the primary once and, on any failure,
//! the secondary once.

pub mod openrouter;
pub mod orchestrator;
pub mod prompt;
pub mod provider;
pub mod together;

pub use openrouter::OpenRouterClient;
pub use orchestrator::FallbackOrchestrator;
pub use provider::AnalysisProvider;
pub use together::TogetherClient;

use serde::{Deserialize, Serialize};

use crate::error::ExtractionError;
use crate::extract::Extractable;

// ── Classification domains ──────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Otp,
    Work,
    Meeting,
    Personal,
    Transaction,
    Support,
    Marketing,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Inform,
    Request,
    Confirm,
    Escalate,
    Notify,
}

/// Which provider tier produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Primary,
    Secondary,
}

// ── Payloads parsed out of completions ──────────────────────────────

/// Classification fields as they appear in a completion. All four must be
/// present and in-domain; serde enforces both, so a conforming parse is a
/// valid classification.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClassificationFields {
    pub priority: Priority,
    pub sentiment: Sentiment,
    pub label: Label,
    pub intent: Intent,
}

impl Extractable for ClassificationFields {}

/// Summary and draft reply as they appear in a completion.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SummaryReplyFields {
    pub summary: String,
    pub reply: String,
}

impl Extractable for SummaryReplyFields {
    fn validate(&self) -> Result<(), ExtractionError> {
        if self.summary.trim().is_empty() {
            return Err(ExtractionError::EmptyField { field: "summary" });
        }
        if self.reply.trim().is_empty() {
            return Err(ExtractionError::EmptyField { field: "reply" });
        }
        Ok(())
    }
}

// ── Results returned to callers ─────────────────────────────────────

/// A validated classification, tagged with the tier that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassificationResult {
    pub priority: Priority,
    pub sentiment: Sentiment,
    pub label: Label,
    pub intent: Intent,
    pub source: Provenance,
}

impl ClassificationResult {
    pub fn from_fields(fields: ClassificationFields, source: Provenance) -> Self {
        Self {
            priority: fields.priority,
            sentiment: fields.sentiment,
            label: fields.label,
            intent: fields.intent,
            source,
        }
    }
}

/// A summary and draft reply, tagged with the tier that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryReplyResult {
    pub summary: String,
    pub reply: String,
    pub source: Provenance,
}

impl SummaryReplyResult {
    pub fn from_fields(fields: SummaryReplyFields, source: Provenance) -> Self {
        Self {
            summary: fields.summary,
            reply: fields.reply,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enums_serialize_lowercase() {
        assert_eq!(serde_json::to_value(Priority::High).unwrap(), "high");
        assert_eq!(serde_json::to_value(Sentiment::Neutral).unwrap(), "neutral");
        assert_eq!(serde_json::to_value(Label::Otp).unwrap(), "otp");
        assert_eq!(serde_json::to_value(Intent::Escalate).unwrap(), "escalate");
        assert_eq!(serde_json::to_value(Provenance::Primary).unwrap(), "primary");
    }

    #[test]
    fn classification_result_carries_provenance() {
        let fields = ClassificationFields {
            priority: Priority::Medium,
            sentiment: Sentiment::Neutral,
            label: Label::Meeting,
            intent: Intent::Inform,
        };
        let result = ClassificationResult::from_fields(fields, Provenance::Secondary);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["priority"], "medium");
        assert_eq!(json["label"], "meeting");
        assert_eq!(json["source"], "secondary");
    }

    #[test]
    fn summary_reply_result_serialization() {
        let result = SummaryReplyResult::from_fields(
            SummaryReplyFields {
                summary: "Team sync moved to 3pm.".into(),
                reply: "Works for me, see you then.".into(),
            },
            Provenance::Primary,
        );
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["summary"], "Team sync moved to 3pm.");
        assert_eq!(json["source"], "primary");
    }
}
