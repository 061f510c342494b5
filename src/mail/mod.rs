//! Mail ingestion boundary.
//!
//! The mail provider is an external collaborator; this module only defines
//! the seam the rest of the service consumes plus a thin Gmail REST adapter.

pub mod gmail;

pub use gmail::GmailClient;

use async_trait::async_trait;

use crate::error::MailError;

/// A normalized inbound message.
#[derive(Debug, Clone)]
pub struct MailMessage {
    pub id: String,
    pub subject: String,
    pub from: String,
    pub date: String,
    pub snippet: String,
    pub body: String,
}

/// Read access to the user's mailbox, authorized per call by a delegated
/// access token.
#[async_trait]
pub trait MailSource: Send + Sync {
    /// Ids of the most recent inbox messages.
    async fn list_inbox(&self, access_token: &str) -> Result<Vec<String>, MailError>;

    /// Fetch one message in full, with headers and body normalized.
    async fn fetch_message(
        &self,
        access_token: &str,
        id: &str,
    ) -> Result<MailMessage, MailError>;
}
