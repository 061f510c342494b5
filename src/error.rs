//! Error types for MailSense.

/// Top-level error type for the service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("Mail error: {0}")]
    Mail(#[from] MailError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors from the inference-provider chain.
///
/// Every variant carries the provider name so a fallback failure can be
/// traced to the tier that produced it.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("Provider {provider} transport failure: {reason}")]
    Transport { provider: String, reason: String },

    #[error("Provider {provider} returned status {status}: {reason}")]
    Provider {
        provider: String,
        status: u16,
        reason: String,
    },

    #[error("Provider {provider} returned an empty completion")]
    EmptyCompletion { provider: String },

    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractionError),
}

/// A completion did not contain a valid, schema-conforming payload.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("no JSON object found in completion text")]
    NoJsonObject,

    #[error("completion JSON is malformed: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("completion JSON does not match the expected shape: {reason}")]
    SchemaMismatch { reason: String },

    #[error("field '{field}' must be non-empty")]
    EmptyField { field: &'static str },
}

/// Credential-guard errors for protected operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("no credential present for this session")]
    Unauthenticated,

    #[error("credential refresh failed: {reason}")]
    SessionExpired { reason: String },

    #[error("authorization code exchange failed: {reason}")]
    Exchange { reason: String },

    #[error("failed to resolve authenticated identity: {reason}")]
    UserInfo { reason: String },

    #[error("login state token is missing, expired, or already used")]
    InvalidState,
}

/// Wire-level failures talking to the identity provider.
///
/// Callers fold these into [`AuthError`]: a failure during login becomes
/// `Exchange`/`UserInfo`, a failure during refresh becomes `SessionExpired`.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("identity provider unreachable: {reason}")]
    Transport { reason: String },

    #[error("identity provider returned status {status}: {reason}")]
    Rejected { status: u16, reason: String },

    #[error("identity provider response malformed: {reason}")]
    Parse { reason: String },
}

/// Failures talking to the mail provider.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("mail provider unreachable: {reason}")]
    Transport { reason: String },

    #[error("mail provider returned status {status}: {reason}")]
    Rejected { status: u16, reason: String },

    #[error("mail provider response malformed: {reason}")]
    Malformed { reason: String },
}

/// Result type alias for the service.
pub type Result<T> = std::result::Result<T, Error>;
