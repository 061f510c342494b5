use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::RwLock;

use mailsense::analysis::{FallbackOrchestrator, OpenRouterClient, TogetherClient};
use mailsense::api::{self, AppState};
use mailsense::auth::{CredentialGuard, GoogleIdentityClient, IdentityExchange};
use mailsense::config::Config;
use mailsense::mail::{GmailClient, MailSource};
use mailsense::session::SessionStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = Config::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!("  required: TOGETHER_API_KEY, OPENROUTER_API_KEY,");
        eprintln!("            GOOGLE_CLIENT_ID, GOOGLE_CLIENT_SECRET, GOOGLE_REDIRECT_URL");
        std::process::exit(1);
    });

    eprintln!("📬 MailSense v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Primary model:   {}", config.primary_model);
    eprintln!("   Secondary model: {}", config.secondary_model);
    eprintln!("   Listening on:    http://0.0.0.0:{}", config.port);

    // One shared HTTP client carries the outbound deadline for every
    // provider, identity, and mail call.
    let http = reqwest::Client::builder()
        .connect_timeout(std::time::Duration::from_secs(6))
        .timeout(config.request_timeout)
        .build()
        .context("failed to build HTTP client")?;

    let primary = Arc::new(TogetherClient::new(
        http.clone(),
        config.together_api_key.clone(),
        config.primary_model.clone(),
    ));
    let secondary = Arc::new(OpenRouterClient::new(
        http.clone(),
        config.openrouter_api_key.clone(),
        config.secondary_model.clone(),
    ));
    let orchestrator = Arc::new(FallbackOrchestrator::new(primary, secondary));

    let identity: Arc<dyn IdentityExchange> =
        Arc::new(GoogleIdentityClient::new(http.clone(), config.google.clone()));
    let mail: Arc<dyn MailSource> = Arc::new(GmailClient::new(http));

    let sessions = Arc::new(SessionStore::new(config.session_ttl));
    let guard = Arc::new(CredentialGuard::new(
        Arc::clone(&sessions),
        Arc::clone(&identity),
    ));

    let state = AppState {
        config: config.clone(),
        sessions,
        guard,
        identity,
        mail,
        orchestrator,
        login_states: Arc::new(RwLock::new(HashMap::new())),
    };

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("failed to bind port {}", config.port))?;

    axum::serve(listener, api::router(state))
        .await
        .context("server error")?;

    Ok(())
}
