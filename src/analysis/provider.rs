//! Provider trait shared by both inference tiers.

use async_trait::async_trait;

use crate::analysis::{ClassificationResult, Provenance, SummaryReplyResult};
use crate::error::AnalysisError;

/// One inference provider, bound to a fixed model and prompt policy.
///
/// Implementations make exactly one network call per invocation and never
/// retry — retry-via-fallback belongs to the orchestrator. Results come back
/// tagged with the implementation's own [`Provenance`].
#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    /// Which fallback tier this provider occupies.
    fn provenance(&self) -> Provenance;

    /// Model identifier requests are pinned to.
    fn model_name(&self) -> &str;

    /// Classify an email from its subject and body.
    async fn classify(
        &self,
        subject: &str,
        body: &str,
    ) -> Result<ClassificationResult, AnalysisError>;

    /// Produce a summary and a draft reply for an email body.
    async fn summarize_and_reply(&self, body: &str)
    -> Result<SummaryReplyResult, AnalysisError>;
}
