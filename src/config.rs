//! Configuration, built from environment variables.

use std::time::Duration;

use secrecy::SecretString;

use crate::analysis::{openrouter, together};
use crate::error::ConfigError;

/// Default session lifetime: 7 days, rolling.
const DEFAULT_SESSION_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Default total deadline for every outbound HTTP call.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_FRONTEND_ORIGIN: &str = "http://localhost:8080";
const DEFAULT_COOKIE_NAME: &str = "mailsense_session";

/// Service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// API key for the primary inference provider (Together).
    pub together_api_key: SecretString,
    /// API key for the secondary inference provider (OpenRouter).
    pub openrouter_api_key: SecretString,
    /// Model identifier used on the primary tier.
    pub primary_model: String,
    /// Model identifier used on the secondary tier.
    pub secondary_model: String,
    /// OAuth client credentials for the identity provider.
    pub google: GoogleConfig,
    /// Port the HTTP server binds to.
    pub port: u16,
    /// Origin the browser frontend is served from (CORS + redirects).
    pub frontend_origin: String,
    /// Session cookie name.
    pub cookie_name: String,
    /// Rolling session lifetime.
    pub session_ttl: Duration,
    /// Total deadline for each outbound provider/identity/mail call.
    pub request_timeout: Duration,
}

/// Identity-provider (Google OAuth) client settings.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: SecretString,
    pub redirect_url: String,
}

impl Config {
    /// Build config from environment variables.
    ///
    /// Secrets have no defaults; everything else falls back to sensible
    /// development values.
    pub fn from_env() -> Result<Self, ConfigError> {
        let together_api_key = require_env("TOGETHER_API_KEY")?;
        let openrouter_api_key = require_env("OPENROUTER_API_KEY")?;

        let google = GoogleConfig {
            client_id: require_env("GOOGLE_CLIENT_ID")?,
            client_secret: SecretString::from(require_env("GOOGLE_CLIENT_SECRET")?),
            redirect_url: require_env("GOOGLE_REDIRECT_URL")?,
        };

        let primary_model = std::env::var("MAILSENSE_PRIMARY_MODEL")
            .unwrap_or_else(|_| together::DEFAULT_MODEL.to_string());
        let secondary_model = std::env::var("MAILSENSE_SECONDARY_MODEL")
            .unwrap_or_else(|_| openrouter::DEFAULT_MODEL.to_string());

        let port = parse_env("MAILSENSE_PORT", DEFAULT_PORT)?;
        let frontend_origin = std::env::var("MAILSENSE_FRONTEND_ORIGIN")
            .unwrap_or_else(|_| DEFAULT_FRONTEND_ORIGIN.to_string())
            .trim_end_matches('/')
            .to_string();
        let cookie_name = std::env::var("MAILSENSE_COOKIE_NAME")
            .unwrap_or_else(|_| DEFAULT_COOKIE_NAME.to_string());

        let session_ttl = Duration::from_secs(parse_env(
            "MAILSENSE_SESSION_TTL_SECS",
            DEFAULT_SESSION_TTL_SECS,
        )?);
        let request_timeout = Duration::from_secs(parse_env(
            "MAILSENSE_REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?);

        Ok(Self {
            together_api_key: SecretString::from(together_api_key),
            openrouter_api_key: SecretString::from(openrouter_api_key),
            primary_model,
            secondary_model,
            google,
            port,
            frontend_origin,
            cookie_name,
            session_ttl,
            request_timeout,
        })
    }
}

fn require_env(key: &str) -> Result<String, ConfigError> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::MissingEnvVar(key.to_string())),
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("'{raw}' is not a valid value"),
        }),
        Err(_) => Ok(default),
    }
}
