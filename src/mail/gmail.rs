//! Thin Gmail REST adapter.
//!
//! Normalizes the interesting parts of a Gmail `users.messages.get` payload:
//! subject/from/date headers with fallbacks, snippet, and the body decoded
//! from base64url with a text/plain then text/html part preference.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;

use crate::error::MailError;
use crate::mail::{MailMessage, MailSource};

pub const DEFAULT_BASE_URL: &str = "https://gmail.googleapis.com";

/// How many inbox messages one listing returns.
const INBOX_PAGE_SIZE: usize = 10;

pub struct GmailClient {
    http: reqwest::Client,
    base_url: String,
}

impl GmailClient {
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Point the client at a different endpoint (tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: String,
        query: &[(&str, &str)],
        access_token: &str,
    ) -> Result<T, MailError> {
        let response = self
            .http
            .get(url)
            .query(query)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| MailError::Transport {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let reason = response.text().await.unwrap_or_default();
            return Err(MailError::Rejected {
                status: status.as_u16(),
                reason,
            });
        }

        response.json().await.map_err(|e| MailError::Malformed {
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl MailSource for GmailClient {
    async fn list_inbox(&self, access_token: &str) -> Result<Vec<String>, MailError> {
        let page_size = INBOX_PAGE_SIZE.to_string();
        let listing: MessageList = self
            .get_json(
                format!("{}/gmail/v1/users/me/messages", self.base_url),
                &[("maxResults", page_size.as_str()), ("labelIds", "INBOX")],
                access_token,
            )
            .await?;
        Ok(listing.messages.into_iter().map(|m| m.id).collect())
    }

    async fn fetch_message(
        &self,
        access_token: &str,
        id: &str,
    ) -> Result<MailMessage, MailError> {
        let message: FullMessage = self
            .get_json(
                format!("{}/gmail/v1/users/me/messages/{id}", self.base_url),
                &[("format", "full")],
                access_token,
            )
            .await?;

        Ok(MailMessage {
            id: message.id,
            subject: header_or(&message.payload.headers, "Subject", "No subject"),
            from: header_or(&message.payload.headers, "From", "Unknown sender"),
            date: header_or(&message.payload.headers, "Date", "Unknown date"),
            snippet: message.snippet,
            body: extract_body(&message.payload),
        })
    }
}

// ── Payload normalization ───────────────────────────────────────────

fn header_or(headers: &[Header], name: &str, fallback: &str) -> String {
    headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .map(|h| h.value.clone())
        .unwrap_or_else(|| fallback.to_string())
}

/// Body text from a message payload: the top-level body if present, else the
/// first text/plain part, else the first text/html part.
fn extract_body(payload: &Payload) -> String {
    if let Some(data) = payload.body.as_ref().and_then(|b| b.data.as_deref())
        && let Some(text) = decode_base64url(data)
    {
        return text;
    }

    for mime_type in ["text/plain", "text/html"] {
        if let Some(part) = payload.parts.iter().find(|p| p.mime_type == mime_type)
            && let Some(data) = part.body.as_ref().and_then(|b| b.data.as_deref())
            && let Some(text) = decode_base64url(data)
        {
            return text;
        }
    }

    "No body content found.".to_string()
}

/// Gmail body data is base64url, padded or not depending on the part.
fn decode_base64url(data: &str) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(data.trim_end_matches('=')).ok()?;
    Some(String::from_utf8_lossy(&bytes).into_owned())
}

// ── Wire types ──────────────────────────────────────────────────────

#[derive(Deserialize)]
struct MessageList {
    #[serde(default)]
    messages: Vec<MessageRef>,
}

#[derive(Deserialize)]
struct MessageRef {
    id: String,
}

#[derive(Deserialize)]
struct FullMessage {
    id: String,
    #[serde(default)]
    snippet: String,
    payload: Payload,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Payload {
    #[serde(default)]
    headers: Vec<Header>,
    #[serde(default)]
    body: Option<PartBody>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Header {
    name: String,
    value: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default)]
    mime_type: String,
    #[serde(default)]
    body: Option<PartBody>,
}

#[derive(Deserialize)]
struct PartBody {
    #[serde(default)]
    data: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(text: &str) -> String {
        URL_SAFE_NO_PAD.encode(text.as_bytes())
    }

    fn payload_from_json(json: serde_json::Value) -> Payload {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn body_prefers_top_level_data() {
        let payload = payload_from_json(serde_json::json!({
            "body": { "data": encode("top-level body") },
            "parts": [
                { "mimeType": "text/plain", "body": { "data": encode("part body") } }
            ]
        }));
        assert_eq!(extract_body(&payload), "top-level body");
    }

    #[test]
    fn body_falls_back_to_plain_part() {
        let payload = payload_from_json(serde_json::json!({
            "parts": [
                { "mimeType": "text/html", "body": { "data": encode("<p>html</p>") } },
                { "mimeType": "text/plain", "body": { "data": encode("plain wins") } }
            ]
        }));
        assert_eq!(extract_body(&payload), "plain wins");
    }

    #[test]
    fn body_falls_back_to_html_when_no_plain_part() {
        let payload = payload_from_json(serde_json::json!({
            "parts": [
                { "mimeType": "text/html", "body": { "data": encode("<p>only html</p>") } }
            ]
        }));
        assert_eq!(extract_body(&payload), "<p>only html</p>");
    }

    #[test]
    fn missing_body_yields_placeholder() {
        let payload = payload_from_json(serde_json::json!({
            "parts": [ { "mimeType": "image/png" } ]
        }));
        assert_eq!(extract_body(&payload), "No body content found.");
    }

    #[test]
    fn decodes_padded_and_unpadded_base64url() {
        // "Ma" encodes to "TWE=" padded, "TWE" unpadded.
        assert_eq!(decode_base64url("TWE=").as_deref(), Some("Ma"));
        assert_eq!(decode_base64url("TWE").as_deref(), Some("Ma"));
        // URL-safe alphabet: '-' and '_' must decode.
        let text = "subject?>>~";
        assert_eq!(decode_base64url(&encode(text)).as_deref(), Some(text));
    }

    #[test]
    fn header_lookup_is_case_insensitive_with_fallbacks() {
        let headers = vec![
            Header {
                name: "subject".to_string(),
                value: "Weekly sync".to_string(),
            },
            Header {
                name: "From".to_string(),
                value: "alice@example.com".to_string(),
            },
        ];
        assert_eq!(header_or(&headers, "Subject", "No subject"), "Weekly sync");
        assert_eq!(
            header_or(&headers, "From", "Unknown sender"),
            "alice@example.com"
        );
        assert_eq!(header_or(&headers, "Date", "Unknown date"), "Unknown date");
    }
}
