//! In-memory session store.
//!
//! Each session owns the only copy of its [`DelegatedCredential`] plus the
//! per-session lock the credential guard uses to serialize refreshes.
//! Sessions expire on a rolling TTL: every successful lookup pushes the
//! expiry out again. Expired entries are treated as absent and dropped
//! lazily on access.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::auth::DelegatedCredential;

struct SessionEntry {
    credential: Option<DelegatedCredential>,
    expires_at: DateTime<Utc>,
    refresh_lock: Arc<Mutex<()>>,
}

pub struct SessionStore {
    ttl: Duration,
    sessions: RwLock<HashMap<String, SessionEntry>>,
}

impl SessionStore {
    pub fn new(ttl: std::time::Duration) -> Self {
        let ttl = Duration::from_std(ttl).unwrap_or_else(|_| Duration::days(7));
        Self {
            ttl,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Create a session holding `credential`, returning the new session id.
    pub async fn create(&self, credential: DelegatedCredential) -> String {
        let id = Uuid::new_v4().simple().to_string();
        let entry = SessionEntry {
            credential: Some(credential),
            expires_at: Utc::now() + self.ttl,
            refresh_lock: Arc::new(Mutex::new(())),
        };
        self.sessions.write().await.insert(id.clone(), entry);
        id
    }

    /// The session's stored credential, touching the rolling expiry.
    pub async fn credential(&self, id: &str) -> Option<DelegatedCredential> {
        let mut sessions = self.sessions.write().await;
        let entry = live_entry(&mut sessions, id)?;
        entry.expires_at = Utc::now() + self.ttl;
        entry.credential.clone()
    }

    /// The authenticated address bound to the session, if any.
    pub async fn identity(&self, id: &str) -> Option<String> {
        let mut sessions = self.sessions.write().await;
        let entry = live_entry(&mut sessions, id)?;
        entry.expires_at = Utc::now() + self.ttl;
        entry
            .credential
            .as_ref()
            .map(|credential| credential.identity.clone())
    }

    /// Overwrite the session's credential in place. Returns false when the
    /// session no longer exists.
    pub async fn set_credential(&self, id: &str, credential: DelegatedCredential) -> bool {
        let mut sessions = self.sessions.write().await;
        match live_entry(&mut sessions, id) {
            Some(entry) => {
                entry.credential = Some(credential);
                true
            }
            None => false,
        }
    }

    /// The session's refresh lock, shared across concurrent requests.
    pub async fn refresh_lock(&self, id: &str) -> Option<Arc<Mutex<()>>> {
        let mut sessions = self.sessions.write().await;
        let entry = live_entry(&mut sessions, id)?;
        Some(Arc::clone(&entry.refresh_lock))
    }

    /// Destroy a session (logout). Returns whether it existed.
    pub async fn remove(&self, id: &str) -> bool {
        self.sessions.write().await.remove(id).is_some()
    }
}

/// Look up an entry, dropping it when its TTL has elapsed.
fn live_entry<'a>(
    sessions: &'a mut HashMap<String, SessionEntry>,
    id: &str,
) -> Option<&'a mut SessionEntry> {
    let expired = sessions
        .get(id)
        .is_some_and(|entry| entry.expires_at <= Utc::now());
    if expired {
        sessions.remove(id);
        return None;
    }
    sessions.get_mut(id)
}
