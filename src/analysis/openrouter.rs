//! Secondary inference tier — raw HTTPS POST to OpenRouter.
//!
//! Same chat-completion shape as the primary, but built and read as plain
//! JSON values rather than a typed SDK surface.

use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use async_trait::async_trait;

use crate::analysis::prompt;
use crate::analysis::provider::AnalysisProvider;
use crate::analysis::{
    ClassificationFields, ClassificationResult, Provenance, SummaryReplyFields, SummaryReplyResult,
};
use crate::error::AnalysisError;
use crate::extract;

pub const DEFAULT_MODEL: &str = "mistralai/Mistral-7B-Instruct-v0.2";
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api";

const PROVIDER_NAME: &str = "openrouter";

/// Secondary provider client.
pub struct OpenRouterClient {
    http: reqwest::Client,
    api_key: SecretString,
    model: String,
    base_url: String,
}

impl OpenRouterClient {
    pub fn new(http: reqwest::Client, api_key: SecretString, model: String) -> Self {
        Self {
            http,
            api_key,
            model,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Point the client at a different endpoint (tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn chat(
        &self,
        user_prompt: &str,
        temperature: f64,
        max_tokens: u32,
    ) -> Result<String, AnalysisError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": prompt::SYSTEM_PROMPT },
                { "role": "user", "content": user_prompt },
            ],
            "temperature": temperature,
            "max_tokens": max_tokens,
        });

        let response = self
            .http
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| AnalysisError::Transport {
                provider: PROVIDER_NAME.into(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let reason = response.text().await.unwrap_or_default();
            return Err(AnalysisError::Provider {
                provider: PROVIDER_NAME.into(),
                status: status.as_u16(),
                reason,
            });
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| AnalysisError::Transport {
                provider: PROVIDER_NAME.into(),
                reason: format!("failed to read completion body: {e}"),
            })?;

        let content = payload
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .map(str::trim)
            .unwrap_or_default();

        if content.is_empty() {
            return Err(AnalysisError::EmptyCompletion {
                provider: PROVIDER_NAME.into(),
            });
        }

        Ok(content.to_string())
    }
}

#[async_trait]
impl AnalysisProvider for OpenRouterClient {
    fn provenance(&self) -> Provenance {
        Provenance::Secondary
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn classify(
        &self,
        subject: &str,
        body: &str,
    ) -> Result<ClassificationResult, AnalysisError> {
        let content = self
            .chat(
                &prompt::classify_user_prompt(subject, body),
                prompt::CLASSIFY_TEMPERATURE,
                prompt::CLASSIFY_MAX_TOKENS,
            )
            .await?;
        let fields: ClassificationFields = extract::extract(&content)?;
        Ok(ClassificationResult::from_fields(fields, self.provenance()))
    }

    async fn summarize_and_reply(
        &self,
        body: &str,
    ) -> Result<SummaryReplyResult, AnalysisError> {
        let content = self
            .chat(
                &prompt::summarize_user_prompt(body),
                prompt::SUMMARIZE_TEMPERATURE,
                prompt::SUMMARIZE_MAX_TOKENS,
            )
            .await?;
        let fields: SummaryReplyFields = extract::extract(&content)?;
        Ok(SummaryReplyResult::from_fields(fields, self.provenance()))
    }
}
