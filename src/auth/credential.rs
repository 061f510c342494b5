//! The delegated access/refresh token pair granting time-limited access to a
//! user's mailbox on their behalf.

use chrono::{DateTime, Utc};
use secrecy::SecretString;

use crate::auth::oauth::TokenSet;
use crate::error::AuthError;

/// Session-scoped OAuth credential. Owned exclusively by the session record;
/// mutated only by the credential guard.
#[derive(Debug, Clone)]
pub struct DelegatedCredential {
    pub access_token: SecretString,
    pub refresh_token: SecretString,
    pub expires_at: DateTime<Utc>,
    /// The authenticated user's address.
    pub identity: String,
}

impl DelegatedCredential {
    /// Build a credential from the initial authorization-code grant.
    ///
    /// The initial grant must include a refresh token (we request offline
    /// access); without one the session could never outlive the first
    /// access token.
    pub fn from_initial_grant(identity: String, tokens: TokenSet) -> Result<Self, AuthError> {
        let refresh_token = tokens.refresh_token.ok_or_else(|| AuthError::Exchange {
            reason: "identity provider did not issue a refresh token".to_string(),
        })?;
        Ok(Self {
            access_token: SecretString::from(tokens.access_token),
            refresh_token: SecretString::from(refresh_token),
            expires_at: tokens.expires_at,
            identity,
        })
    }

    /// Successor credential after a refresh exchange. The identity provider
    /// may omit a new refresh token, in which case the current one carries
    /// forward.
    pub fn refreshed(&self, tokens: TokenSet) -> Self {
        Self {
            access_token: SecretString::from(tokens.access_token),
            refresh_token: tokens
                .refresh_token
                .map(SecretString::from)
                .unwrap_or_else(|| self.refresh_token.clone()),
            expires_at: tokens.expires_at,
            identity: self.identity.clone(),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
