//! Identity-provider client: authorization-code and refresh-token exchange.
//!
//! Behind the [`IdentityExchange`] trait so the credential guard and the
//! HTTP handlers can be tested against a scripted identity provider.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::GoogleConfig;
use crate::error::IdentityError;

const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

const SCOPES: &str =
    "https://www.googleapis.com/auth/gmail.readonly https://www.googleapis.com/auth/userinfo.email";

/// A token set as returned by the identity provider, with the expiry already
/// resolved to an absolute timestamp.
#[derive(Debug, Clone)]
pub struct TokenSet {
    pub access_token: String,
    /// Absent on refresh responses that don't rotate the refresh token.
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

/// Outbound operations against the identity provider.
#[async_trait]
pub trait IdentityExchange: Send + Sync {
    /// Consent URL for the authorization redirect.
    fn authorize_url(&self, state: &str, code_challenge: &str) -> String;

    /// Authorization-code grant.
    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<TokenSet, IdentityError>;

    /// Refresh-token grant.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenSet, IdentityError>;

    /// Resolve the authenticated user's email address.
    async fn fetch_identity(&self, access_token: &str) -> Result<String, IdentityError>;
}

/// Google OAuth implementation.
pub struct GoogleIdentityClient {
    http: reqwest::Client,
    client_id: String,
    client_secret: SecretString,
    redirect_url: String,
    auth_url: String,
    token_url: String,
    userinfo_url: String,
}

impl GoogleIdentityClient {
    pub fn new(http: reqwest::Client, config: GoogleConfig) -> Self {
        Self {
            http,
            client_id: config.client_id,
            client_secret: config.client_secret,
            redirect_url: config.redirect_url,
            auth_url: AUTH_URL.to_string(),
            token_url: TOKEN_URL.to_string(),
            userinfo_url: USERINFO_URL.to_string(),
        }
    }

    /// Point the client at different endpoints (tests).
    pub fn with_endpoints(
        mut self,
        auth_url: impl Into<String>,
        token_url: impl Into<String>,
        userinfo_url: impl Into<String>,
    ) -> Self {
        self.auth_url = auth_url.into();
        self.token_url = token_url.into();
        self.userinfo_url = userinfo_url.into();
        self
    }

    async fn token_grant(&self, form: &[(&str, &str)]) -> Result<TokenSet, IdentityError> {
        let response = self
            .http
            .post(&self.token_url)
            .form(form)
            .send()
            .await
            .map_err(|e| IdentityError::Transport {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let reason = response.text().await.unwrap_or_default();
            return Err(IdentityError::Rejected {
                status: status.as_u16(),
                reason,
            });
        }

        let payload: TokenResponse =
            response.json().await.map_err(|e| IdentityError::Parse {
                reason: e.to_string(),
            })?;

        Ok(TokenSet {
            access_token: payload.access_token,
            refresh_token: payload.refresh_token,
            expires_at: Utc::now() + Duration::seconds(payload.expires_in),
        })
    }
}

#[async_trait]
impl IdentityExchange for GoogleIdentityClient {
    fn authorize_url(&self, state: &str, code_challenge: &str) -> String {
        let url = reqwest::Url::parse_with_params(
            &self.auth_url,
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_url.as_str()),
                ("response_type", "code"),
                ("access_type", "offline"),
                ("prompt", "consent"),
                ("scope", SCOPES),
                ("state", state),
                ("code_challenge", code_challenge),
                ("code_challenge_method", "S256"),
            ],
        )
        .expect("authorize endpoint is a valid URL");
        url.to_string()
    }

    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<TokenSet, IdentityError> {
        self.token_grant(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.expose_secret()),
            ("redirect_uri", self.redirect_url.as_str()),
            ("code_verifier", code_verifier),
        ])
        .await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenSet, IdentityError> {
        self.token_grant(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.expose_secret()),
        ])
        .await
    }

    async fn fetch_identity(&self, access_token: &str) -> Result<String, IdentityError> {
        let response = self
            .http
            .get(&self.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| IdentityError::Transport {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let reason = response.text().await.unwrap_or_default();
            return Err(IdentityError::Rejected {
                status: status.as_u16(),
                reason,
            });
        }

        let payload: UserInfoResponse =
            response.json().await.map_err(|e| IdentityError::Parse {
                reason: e.to_string(),
            })?;
        Ok(payload.email)
    }
}

// ── Login-state helpers ─────────────────────────────────────────────

/// Single-use CSRF token for one login round trip.
pub fn generate_state_token() -> String {
    Uuid::new_v4().simple().to_string()
}

/// PKCE code verifier (64 chars, well inside the RFC 7636 43..=128 range).
pub fn generate_code_verifier() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

/// S256 PKCE challenge for a verifier.
pub fn code_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

// ── Wire types ──────────────────────────────────────────────────────

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    expires_in: i64,
}

#[derive(Deserialize)]
struct UserInfoResponse {
    email: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorize_url_carries_required_params() {
        let client = GoogleIdentityClient::new(
            reqwest::Client::new(),
            GoogleConfig {
                client_id: "client-123".into(),
                client_secret: SecretString::from("shh"),
                redirect_url: "http://localhost:5000/auth/callback".into(),
            },
        );

        let url = client.authorize_url("state-abc", "challenge-xyz");
        assert!(url.starts_with(AUTH_URL));
        assert!(url.contains("client_id=client-123"));
        assert!(url.contains("access_type=offline"));
        assert!(url.contains("state=state-abc"));
        assert!(url.contains("code_challenge=challenge-xyz"));
        assert!(url.contains("code_challenge_method=S256"));
        assert!(url.contains("gmail.readonly"));
    }

    #[test]
    fn code_challenge_is_urlsafe_sha256() {
        // RFC 7636 appendix B reference vector.
        let challenge = code_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk");
        assert_eq!(challenge, "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");
    }

    #[test]
    fn code_verifier_length_in_allowed_range() {
        let verifier = generate_code_verifier();
        assert!((43..=128).contains(&verifier.len()));
    }
}
