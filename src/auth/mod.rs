//! Delegated-credential lifecycle: OAuth handshake, session-scoped storage,
//! and the guard that keeps the credential valid across requests.

pub mod credential;
pub mod guard;
pub mod oauth;

pub use credential::DelegatedCredential;
pub use guard::CredentialGuard;
pub use oauth::{GoogleIdentityClient, IdentityExchange, TokenSet};
