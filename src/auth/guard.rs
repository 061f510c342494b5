//! Credential guard — gates every protected operation on a valid delegated
//! credential, refreshing it transparently when expired.
//!
//! State machine per session credential:
//! absent → `Unauthenticated`; present and unexpired → pass through;
//! expired → refresh exchange, success overwrites the stored credential,
//! failure → `SessionExpired` with the stale credential left in place so a
//! later request can retry.
//!
//! At most one refresh is in flight per session: the session's refresh lock
//! serializes the expired path, and the guard re-reads the stored credential
//! after acquiring it so requests that queued behind a completed refresh
//! reuse its result instead of spending an already-rotated refresh token.

use std::sync::Arc;

use chrono::Utc;
use secrecy::ExposeSecret;
use tracing::{debug, info};

use crate::auth::oauth::IdentityExchange;
use crate::auth::DelegatedCredential;
use crate::error::AuthError;
use crate::session::SessionStore;

pub struct CredentialGuard {
    sessions: Arc<SessionStore>,
    identity: Arc<dyn IdentityExchange>,
}

impl CredentialGuard {
    pub fn new(sessions: Arc<SessionStore>, identity: Arc<dyn IdentityExchange>) -> Self {
        Self { sessions, identity }
    }

    /// Ensure the session holds a currently-valid credential and return it.
    ///
    /// Runs once per request; no proactive background refresh.
    pub async fn ensure_valid(&self, session_id: &str) -> Result<DelegatedCredential, AuthError> {
        let credential = self
            .sessions
            .credential(session_id)
            .await
            .ok_or(AuthError::Unauthenticated)?;

        if !credential.is_expired(Utc::now()) {
            return Ok(credential);
        }

        let lock = self
            .sessions
            .refresh_lock(session_id)
            .await
            .ok_or(AuthError::Unauthenticated)?;
        let _in_flight = lock.lock().await;

        // A request that queued behind a concurrent refresh sees the fresh
        // credential here and skips its own exchange.
        let credential = self
            .sessions
            .credential(session_id)
            .await
            .ok_or(AuthError::Unauthenticated)?;
        if !credential.is_expired(Utc::now()) {
            return Ok(credential);
        }

        debug!(identity = %credential.identity, "delegated credential expired, refreshing");

        let tokens = self
            .identity
            .refresh(credential.refresh_token.expose_secret())
            .await
            .map_err(|e| AuthError::SessionExpired {
                reason: e.to_string(),
            })?;

        let refreshed = credential.refreshed(tokens);
        self.sessions
            .set_credential(session_id, refreshed.clone())
            .await;
        info!(identity = %refreshed.identity, "delegated credential refreshed");
        Ok(refreshed)
    }
}
