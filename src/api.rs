//! HTTP surface: OAuth login flow, authenticated inbox intelligence, and the
//! standalone classify/summarize endpoints.
//!
//! Two trust boundaries coexist: `/api/emails*` requires a session that
//! passes the credential guard, while `/api/classify` and `/api/summarize`
//! accept raw text with no credential at all.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::RwLock;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::info;

use crate::analysis::{ClassificationResult, FallbackOrchestrator, Provenance, SummaryReplyResult};
use crate::auth::{CredentialGuard, DelegatedCredential, IdentityExchange, oauth};
use crate::config::Config;
use crate::error::{AnalysisError, AuthError, MailError};
use crate::mail::MailSource;
use crate::session::SessionStore;

/// How long a login round trip may take before its state token expires.
const LOGIN_STATE_TTL_MINUTES: i64 = 12;

/// One in-flight login: the CSRF state token maps to its PKCE verifier.
#[derive(Debug, Clone)]
pub struct PendingLogin {
    pub code_verifier: String,
    pub expires_at: DateTime<Utc>,
}

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub sessions: Arc<SessionStore>,
    pub guard: Arc<CredentialGuard>,
    pub identity: Arc<dyn IdentityExchange>,
    pub mail: Arc<dyn MailSource>,
    pub orchestrator: Arc<FallbackOrchestrator>,
    pub login_states: Arc<RwLock<HashMap<String, PendingLogin>>>,
}

/// Build the router with all auth and API routes.
pub fn router(state: AppState) -> Router {
    let frontend_origin = state.config.frontend_origin.clone();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(move |origin, _| {
            origin.as_bytes() == frontend_origin.as_bytes()
        }))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health))
        .route("/auth/login", get(auth_login))
        .route("/auth/callback", get(auth_callback))
        .route("/auth/status", get(auth_status))
        .route("/auth/logout", get(auth_logout))
        .route("/api/emails", get(list_emails))
        .route("/api/emails/{id}", get(get_email))
        .route("/api/classify", post(classify))
        .route("/api/summarize", post(summarize))
        .layer(cors)
        .with_state(state)
}

// ── Health ──────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "mailsense"
    }))
}

// ── Auth routes ─────────────────────────────────────────────────────

async fn auth_login(State(state): State<AppState>) -> impl IntoResponse {
    let state_token = oauth::generate_state_token();
    let code_verifier = oauth::generate_code_verifier();
    let code_challenge = oauth::code_challenge(&code_verifier);

    {
        let mut states = state.login_states.write().await;
        states.retain(|_, pending| pending.expires_at > Utc::now());
        states.insert(
            state_token.clone(),
            PendingLogin {
                code_verifier,
                expires_at: Utc::now() + chrono::Duration::minutes(LOGIN_STATE_TTL_MINUTES),
            },
        );
    }

    Redirect::to(&state.identity.authorize_url(&state_token, &code_challenge))
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

async fn auth_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Result<Response, ApiError> {
    if let Some(error) = query.error {
        return Err(ApiError::bad_request(format!(
            "authorization was denied: {error}"
        )));
    }

    let state_token = query.state.ok_or(AuthError::InvalidState)?;
    let pending = state
        .login_states
        .write()
        .await
        .remove(&state_token)
        .ok_or(AuthError::InvalidState)?;
    if pending.expires_at <= Utc::now() {
        return Err(AuthError::InvalidState.into());
    }

    let code = query
        .code
        .ok_or_else(|| ApiError::bad_request("missing authorization code".to_string()))?;

    let tokens = state
        .identity
        .exchange_code(&code, &pending.code_verifier)
        .await
        .map_err(|e| AuthError::Exchange {
            reason: e.to_string(),
        })?;

    let email = state
        .identity
        .fetch_identity(&tokens.access_token)
        .await
        .map_err(|e| AuthError::UserInfo {
            reason: e.to_string(),
        })?;

    let credential = DelegatedCredential::from_initial_grant(email, tokens)?;
    info!(identity = %credential.identity, "authentication successful");

    let session_id = state.sessions.create(credential).await;

    let mut response =
        Redirect::to(&format!("{}/dashboard", state.config.frontend_origin)).into_response();
    set_session_cookie(&mut response, &state.config, &session_id);
    Ok(response)
}

async fn auth_status(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(session_id) = read_cookie_value(&headers, &state.config.cookie_name)
        && let Some(email) = state.sessions.identity(&session_id).await
    {
        return Json(json!({ "logged_in": true, "email": email })).into_response();
    }
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "logged_in": false })),
    )
        .into_response()
}

async fn auth_logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(session_id) = read_cookie_value(&headers, &state.config.cookie_name) {
        state.sessions.remove(&session_id).await;
    }
    let mut response = Json(json!({ "success": true })).into_response();
    clear_session_cookie(&mut response, &state.config);
    response
}

// ── Authenticated mailbox routes ────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct EmailOverview {
    pub id: String,
    pub subject: String,
    pub from: String,
    pub snippet: String,
    pub classification: ClassificationResult,
}

async fn list_emails(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<EmailOverview>>, ApiError> {
    let session_id = read_cookie_value(&headers, &state.config.cookie_name)
        .ok_or(AuthError::Unauthenticated)?;
    let credential = state.guard.ensure_valid(&session_id).await?;
    let access_token = credential.access_token.expose_secret();

    let ids = state.mail.list_inbox(access_token).await?;
    let mut emails = Vec::with_capacity(ids.len());
    for id in ids {
        let message = state.mail.fetch_message(access_token, &id).await?;
        let classification = state
            .orchestrator
            .classify_with_fallback(&message.subject, &message.body)
            .await?;
        emails.push(EmailOverview {
            id: message.id,
            subject: message.subject,
            from: message.from,
            snippet: message.snippet,
            classification,
        });
    }
    Ok(Json(emails))
}

#[derive(Debug, Serialize)]
pub struct EmailDetail {
    pub id: String,
    pub subject: String,
    pub from: String,
    pub date: String,
    pub body: String,
    pub snippet: String,
    pub summary: String,
    pub reply: String,
    pub source: Provenance,
}

async fn get_email(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<EmailDetail>, ApiError> {
    let session_id = read_cookie_value(&headers, &state.config.cookie_name)
        .ok_or(AuthError::Unauthenticated)?;
    let credential = state.guard.ensure_valid(&session_id).await?;

    let message = state
        .mail
        .fetch_message(credential.access_token.expose_secret(), &id)
        .await?;
    let summary_reply = state
        .orchestrator
        .summarize_with_fallback(&message.body)
        .await?;

    Ok(Json(EmailDetail {
        id: message.id,
        subject: message.subject,
        from: message.from,
        date: message.date,
        body: message.body,
        snippet: message.snippet,
        summary: summary_reply.summary,
        reply: summary_reply.reply,
        source: summary_reply.source,
    }))
}

// ── Standalone analysis routes ──────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ClassifyRequest {
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub body: String,
}

async fn classify(
    State(state): State<AppState>,
    Json(request): Json<ClassifyRequest>,
) -> Result<Json<ClassificationResult>, ApiError> {
    if request.subject.trim().is_empty() || request.body.trim().is_empty() {
        return Err(ApiError::bad_request(
            "missing subject or body".to_string(),
        ));
    }
    let result = state
        .orchestrator
        .classify_with_fallback(&request.subject, &request.body)
        .await?;
    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
pub struct SummarizeRequest {
    #[serde(default)]
    pub body: String,
}

async fn summarize(
    State(state): State<AppState>,
    Json(request): Json<SummarizeRequest>,
) -> Result<Json<SummaryReplyResult>, ApiError> {
    if request.body.trim().is_empty() {
        return Err(ApiError::bad_request("missing email body".to_string()));
    }
    let result = state
        .orchestrator
        .summarize_with_fallback(&request.body)
        .await?;
    Ok(Json(result))
}

// ── Error mapping ───────────────────────────────────────────────────

/// Structured error response: `{ "error": <code>, "message": <cause> }`.
///
/// Auth failures get a 401 with a code the frontend can branch on to
/// redirect into re-authentication; upstream (provider/mail) failures get a
/// 502 so they read as transient.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    fn bad_request(message: String) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "invalid_request",
            message,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({ "error": self.code, "message": self.message })),
        )
            .into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let (status, code) = match &err {
            AuthError::Unauthenticated => (StatusCode::UNAUTHORIZED, "not_logged_in"),
            AuthError::SessionExpired { .. } => (StatusCode::UNAUTHORIZED, "session_expired"),
            AuthError::InvalidState => (StatusCode::BAD_REQUEST, "invalid_state"),
            AuthError::Exchange { .. } | AuthError::UserInfo { .. } => {
                (StatusCode::BAD_GATEWAY, "auth_failed")
            }
        };
        Self {
            status,
            code,
            message: err.to_string(),
        }
    }
}

impl From<AnalysisError> for ApiError {
    fn from(err: AnalysisError) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            code: "analysis_failed",
            message: err.to_string(),
        }
    }
}

impl From<MailError> for ApiError {
    fn from(err: MailError) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            code: "mail_fetch_failed",
            message: err.to_string(),
        }
    }
}

// ── Cookie helpers ──────────────────────────────────────────────────

fn read_cookie_value(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let raw = headers.get(header::COOKIE)?.to_str().ok()?;
    raw.split(';').find_map(|part| {
        let mut split = part.trim().splitn(2, '=');
        let key = split.next()?.trim();
        let value = split.next()?.trim();
        (key == cookie_name).then(|| value.to_string())
    })
}

fn set_session_cookie(response: &mut Response, config: &Config, session_id: &str) {
    let cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        config.cookie_name,
        session_id,
        config.session_ttl.as_secs()
    );
    if let Ok(value) = HeaderValue::from_str(&cookie) {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
}

fn clear_session_cookie(response: &mut Response, config: &Config) {
    let cookie = format!(
        "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0",
        config.cookie_name
    );
    if let Ok(value) = HeaderValue::from_str(&cookie) {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_cookie_among_several() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; mailsense_session=abc123; lang=en"),
        );
        assert_eq!(
            read_cookie_value(&headers, "mailsense_session").as_deref(),
            Some("abc123")
        );
        assert_eq!(read_cookie_value(&headers, "missing"), None);
    }

    #[test]
    fn missing_cookie_header_reads_none() {
        let headers = HeaderMap::new();
        assert_eq!(read_cookie_value(&headers, "mailsense_session"), None);
    }

    #[test]
    fn auth_errors_map_to_distinct_401_codes() {
        let unauthenticated = ApiError::from(AuthError::Unauthenticated);
        assert_eq!(unauthenticated.status, StatusCode::UNAUTHORIZED);
        assert_eq!(unauthenticated.code, "not_logged_in");

        let expired = ApiError::from(AuthError::SessionExpired {
            reason: "invalid_grant".to_string(),
        });
        assert_eq!(expired.status, StatusCode::UNAUTHORIZED);
        assert_eq!(expired.code, "session_expired");
    }

    #[test]
    fn upstream_errors_map_to_bad_gateway() {
        let analysis = ApiError::from(AnalysisError::EmptyCompletion {
            provider: "together".to_string(),
        });
        assert_eq!(analysis.status, StatusCode::BAD_GATEWAY);

        let mail = ApiError::from(MailError::Rejected {
            status: 403,
            reason: "forbidden".to_string(),
        });
        assert_eq!(mail.status, StatusCode::BAD_GATEWAY);
    }
}
