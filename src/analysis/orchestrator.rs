//! Single-hop provider fallback.
//!
//! Attempt the primary tier once; on any failure attempt the secondary tier
//! once with the operation-equivalent prompt. The secondary's error, if any,
//! propagates verbatim — the caller sees only the final failure. No retry
//! loop, no backoff, no third tier, no caching.

use std::sync::Arc;

use tracing::warn;

use crate::analysis::provider::AnalysisProvider;
use crate::analysis::{ClassificationResult, SummaryReplyResult};
use crate::error::AnalysisError;

pub struct FallbackOrchestrator {
    primary: Arc<dyn AnalysisProvider>,
    secondary: Arc<dyn AnalysisProvider>,
}

impl FallbackOrchestrator {
    pub fn new(primary: Arc<dyn AnalysisProvider>, secondary: Arc<dyn AnalysisProvider>) -> Self {
        Self { primary, secondary }
    }

    /// Classify with fallback. One or two provider calls, never zero,
    /// never more than two.
    pub async fn classify_with_fallback(
        &self,
        subject: &str,
        body: &str,
    ) -> Result<ClassificationResult, AnalysisError> {
        match self.primary.classify(subject, body).await {
            Ok(result) => Ok(result),
            Err(primary_err) => {
                warn!(
                    model = self.primary.model_name(),
                    error = %primary_err,
                    "primary classification failed, falling back"
                );
                self.secondary.classify(subject, body).await
            }
        }
    }

    /// Summarize-and-reply with fallback. Same contract as classification.
    pub async fn summarize_with_fallback(
        &self,
        body: &str,
    ) -> Result<SummaryReplyResult, AnalysisError> {
        match self.primary.summarize_and_reply(body).await {
            Ok(result) => Ok(result),
            Err(primary_err) => {
                warn!(
                    model = self.primary.model_name(),
                    error = %primary_err,
                    "primary summarization failed, falling back"
                );
                self.secondary.summarize_and_reply(body).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::analysis::{
        ClassificationFields, Intent, Label, Priority, Provenance, Sentiment, SummaryReplyFields,
    };

    /// Scripted provider: either succeeds with a canned result or fails,
    /// counting every call.
    struct ScriptedProvider {
        provenance: Provenance,
        fail: bool,
        calls: AtomicUsize,
    }

    impl ScriptedProvider {
        fn ok(provenance: Provenance) -> Self {
            Self {
                provenance,
                fail: false,
                calls: AtomicUsize::new(0),
            }
        }

        fn failing(provenance: Provenance) -> Self {
            Self {
                provenance,
                fail: true,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn tier_name(&self) -> &'static str {
            match self.provenance {
                Provenance::Primary => "primary",
                Provenance::Secondary => "secondary",
            }
        }
    }

    #[async_trait]
    impl AnalysisProvider for ScriptedProvider {
        fn provenance(&self) -> Provenance {
            self.provenance
        }

        fn model_name(&self) -> &str {
            "scripted-model"
        }

        async fn classify(
            &self,
            _subject: &str,
            _body: &str,
        ) -> Result<ClassificationResult, AnalysisError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AnalysisError::Transport {
                    provider: self.tier_name().into(),
                    reason: "connection refused".into(),
                });
            }
            Ok(ClassificationResult::from_fields(
                ClassificationFields {
                    priority: Priority::Medium,
                    sentiment: Sentiment::Neutral,
                    label: Label::Meeting,
                    intent: Intent::Inform,
                },
                self.provenance,
            ))
        }

        async fn summarize_and_reply(
            &self,
            _body: &str,
        ) -> Result<SummaryReplyResult, AnalysisError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AnalysisError::EmptyCompletion {
                    provider: self.tier_name().into(),
                });
            }
            Ok(SummaryReplyResult::from_fields(
                SummaryReplyFields {
                    summary: "A meeting reminder.".into(),
                    reply: "Thanks, I'll be there.".into(),
                },
                self.provenance,
            ))
        }
    }

    fn orchestrator(
        primary: &Arc<ScriptedProvider>,
        secondary: &Arc<ScriptedProvider>,
    ) -> FallbackOrchestrator {
        FallbackOrchestrator::new(
            Arc::clone(primary) as Arc<dyn AnalysisProvider>,
            Arc::clone(secondary) as Arc<dyn AnalysisProvider>,
        )
    }

    #[tokio::test]
    async fn primary_success_never_touches_secondary() {
        let primary = Arc::new(ScriptedProvider::ok(Provenance::Primary));
        let secondary = Arc::new(ScriptedProvider::ok(Provenance::Secondary));

        let result = orchestrator(&primary, &secondary)
            .classify_with_fallback("subject", "body")
            .await
            .unwrap();

        assert_eq!(result.source, Provenance::Primary);
        assert_eq!(primary.calls(), 1);
        assert_eq!(secondary.calls(), 0);
    }

    #[tokio::test]
    async fn primary_failure_falls_back_once() {
        let primary = Arc::new(ScriptedProvider::failing(Provenance::Primary));
        let secondary = Arc::new(ScriptedProvider::ok(Provenance::Secondary));

        let result = orchestrator(&primary, &secondary)
            .classify_with_fallback("subject", "body")
            .await
            .unwrap();

        assert_eq!(result.source, Provenance::Secondary);
        assert_eq!(primary.calls(), 1);
        assert_eq!(secondary.calls(), 1);
    }

    #[tokio::test]
    async fn both_failures_surface_secondary_error() {
        let primary = Arc::new(ScriptedProvider::failing(Provenance::Primary));
        let secondary = Arc::new(ScriptedProvider::failing(Provenance::Secondary));

        let err = orchestrator(&primary, &secondary)
            .classify_with_fallback("subject", "body")
            .await
            .unwrap_err();

        // The surfaced error is the secondary's, not the primary's.
        match err {
            AnalysisError::Transport { provider, .. } => assert_eq!(provider, "secondary"),
            other => panic!("expected Transport from secondary, got {other:?}"),
        }
        assert_eq!(primary.calls(), 1);
        assert_eq!(secondary.calls(), 1);
    }

    #[tokio::test]
    async fn summarize_fallback_tags_secondary_provenance() {
        let primary = Arc::new(ScriptedProvider::failing(Provenance::Primary));
        let secondary = Arc::new(ScriptedProvider::ok(Provenance::Secondary));

        let result = orchestrator(&primary, &secondary)
            .summarize_with_fallback("a body")
            .await
            .unwrap();

        assert_eq!(result.source, Provenance::Secondary);
        assert!(!result.summary.is_empty());
        assert!(!result.reply.is_empty());
    }

    #[tokio::test]
    async fn repeated_invocations_always_call_providers_again() {
        let primary = Arc::new(ScriptedProvider::ok(Provenance::Primary));
        let secondary = Arc::new(ScriptedProvider::ok(Provenance::Secondary));
        let orch = orchestrator(&primary, &secondary);

        orch.classify_with_fallback("same", "input").await.unwrap();
        orch.classify_with_fallback("same", "input").await.unwrap();

        // No caching: identical inputs hit the provider twice.
        assert_eq!(primary.calls(), 2);
    }
}
