//! Primary inference tier — Together chat completions.
//!
//! Typed request/response structs over the Together API. One call per
//! invocation; any failure is surfaced to the orchestrator, never retried
//! here.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use async_trait::async_trait;

use crate::analysis::prompt;
use crate::analysis::provider::AnalysisProvider;
use crate::analysis::{
    ClassificationFields, ClassificationResult, Provenance, SummaryReplyFields, SummaryReplyResult,
};
use crate::error::AnalysisError;
use crate::extract;

pub const DEFAULT_MODEL: &str = "meta-llama/Llama-3.3-70B-Instruct-Turbo-Free";
pub const DEFAULT_BASE_URL: &str = "https://api.together.xyz";

const PROVIDER_NAME: &str = "together";

/// Primary provider client.
pub struct TogetherClient {
    http: reqwest::Client,
    api_key: SecretString,
    model: String,
    base_url: String,
}

impl TogetherClient {
    /// The injected `http` client is expected to carry the service-wide
    /// request deadline.
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

    /// Run one chat completion and return the trimmed completion text.
    async fn chat(
        &self,
        user_prompt: &str,
        temperature: f64,
        max_tokens: u32,
    ) -> Result<String, AnalysisError> {
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: prompt::SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            temperature,
            max_tokens,
        };

        let response = self
            .http
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
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

        let completion: ChatResponse =
            response
                .json()
                .await
                .map_err(|e| AnalysisError::Transport {
                    provider: PROVIDER_NAME.into(),
                    reason: format!("failed to read completion body: {e}"),
                })?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|text| text.trim().to_string())
            .unwrap_or_default();

        if content.is_empty() {
            return Err(AnalysisError::EmptyCompletion {
                provider: PROVIDER_NAME.into(),
            });
        }

        Ok(content)
    }
}

#[async_trait]
impl AnalysisProvider for TogetherClient {
    fn provenance(&self) -> Provenance {
        Provenance::Primary
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

// ── Wire types ──────────────────────────────────────────────────────

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f64,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}
