//! Session endpoints for cookie and bearer auth.

use axum::{
    Json,
    extract::Extension,
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{AUTHORIZATION, InvalidHeaderValue, SET_COOKIE},
    },
    response::IntoResponse,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;

use super::{
    principal::require_auth,
    state::{AuthConfig, AuthState},
    storage::{
        SessionRecord, insert_session, list_sessions, lookup_session, revoke_all_sessions,
        revoke_session,
    },
    types::{SessionInfo, SessionResponse, SessionsOverviewResponse},
    utils::compute_hash,
};

#[utoipa::path(
    get,
    path = "/v1/auth/session",
    responses(
        (status = 200, description = "Session is active", body = SessionResponse),
        (status = 204, description = "No active session")
    ),
    tag = "auth"
)]
pub async fn session(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    // Missing tokens are treated as "no session" to avoid leaking auth state.
    let Some(token) = extract_session_token(&headers, auth_state.config.cookie_name()) else {
        return StatusCode::NO_CONTENT.into_response();
    };
    // Only the keyed hash is stored; never compare raw tokens against the database.
    let token_hash = compute_hash(&token, auth_state.config.secret_key());
    match lookup_session(&pool, &token_hash).await {
        Ok(Some(SessionRecord {
            session_id: _,
            user_id,
            role,
        })) => {
            let response = SessionResponse {
                user_id: user_id.to_string(),
                role,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Ok(None) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            error!("Failed to lookup session: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Resolve a presented session token into a session record, if present.
///
/// Returns `Ok(None)` when the token is missing or does not match a live
/// session.
pub(crate) async fn authenticate_session(
    headers: &HeaderMap,
    pool: &PgPool,
    auth_state: &AuthState,
) -> Result<Option<SessionRecord>, StatusCode> {
    let Some(token) = extract_session_token(headers, auth_state.config.cookie_name()) else {
        return Ok(None);
    };
    let token_hash = compute_hash(&token, auth_state.config.secret_key());
    match lookup_session(pool, &token_hash).await {
        Ok(record) => Ok(record),
        Err(err) => {
            error!("Failed to lookup session: {err}");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Mint a session inside the caller's transaction and return the raw token
/// plus the cookie header to set.
pub(super) async fn create_session(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user_id: uuid::Uuid,
    auth_state: &AuthState,
    headers: &HeaderMap,
) -> anyhow::Result<HeaderValue> {
    let user_agent = headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|value| value.to_str().ok());
    let ip_address = super::utils::extract_client_ip(headers);

    let token = insert_session(
        tx,
        user_id,
        &auth_state.config,
        user_agent,
        ip_address.as_deref(),
    )
    .await?;

    session_cookie(auth_state, &token).map_err(anyhow::Error::from)
}

#[utoipa::path(
    post,
    path = "/v1/auth/logout",
    responses(
        (status = 204, description = "Session cleared")
    ),
    tag = "auth"
)]
pub async fn logout(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    match authenticate_session(&headers, &pool, &auth_state).await {
        Ok(Some(record)) => {
            if let Err(err) = revoke_session(&pool, record.session_id).await {
                error!("Failed to revoke session: {err}");
            }
        }
        Ok(None) => {}
        Err(_) => {}
    }

    // Always clear the cookie, even if the session record was missing.
    let mut response_headers = HeaderMap::new();
    if let Ok(cookie) = clear_session_cookie(&auth_state.config) {
        response_headers.insert(SET_COOKIE, cookie);
    }
    (StatusCode::NO_CONTENT, response_headers).into_response()
}

#[utoipa::path(
    post,
    path = "/v1/auth/logout/all",
    responses(
        (status = 204, description = "All sessions cleared"),
        (status = 401, description = "Not authenticated")
    ),
    tag = "auth"
)]
pub async fn logout_all(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &pool, &auth_state).await {
        Ok(principal) => principal,
        Err(status) => return status.into_response(),
    };

    if let Err(err) = revoke_all_sessions(&pool, principal.user_id).await {
        error!("Failed to revoke sessions: {err}");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    let mut response_headers = HeaderMap::new();
    if let Ok(cookie) = clear_session_cookie(&auth_state.config) {
        response_headers.insert(SET_COOKIE, cookie);
    }
    (StatusCode::NO_CONTENT, response_headers).into_response()
}

#[utoipa::path(
    get,
    path = "/v1/account/sessions",
    responses(
        (status = 200, description = "Live sessions for the caller", body = SessionsOverviewResponse),
        (status = 401, description = "Not authenticated")
    ),
    tag = "account"
)]
pub async fn sessions_overview(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &pool, &auth_state).await {
        Ok(principal) => principal,
        Err(status) => return status.into_response(),
    };

    match list_sessions(&pool, principal.user_id).await {
        Ok(records) => {
            let sessions = records
                .into_iter()
                .map(|record| SessionInfo {
                    id: record.id.to_string(),
                    user_agent: record.user_agent,
                    ip_address: record.ip_address,
                    created_at: record.created_at,
                    last_seen_at: record.last_seen_at,
                    expires_at: record.expires_at,
                    current: record.id == principal.session_id,
                })
                .collect();
            (StatusCode::OK, Json(SessionsOverviewResponse { sessions })).into_response()
        }
        Err(err) => {
            error!("Failed to list sessions: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Build a secure `HttpOnly` cookie for the session token.
pub(super) fn session_cookie(
    auth_state: &AuthState,
    token: &str,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let name = auth_state.config.cookie_name();
    let ttl_seconds = auth_state.config.session_ttl_seconds();
    // Only mark cookies secure when the frontend is served over HTTPS.
    let secure = auth_state.config.session_cookie_secure();
    let mut cookie =
        format!("{name}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={ttl_seconds}");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub(super) fn clear_session_cookie(
    auth_config: &AuthConfig,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let name = auth_config.cookie_name();
    let secure = auth_config.session_cookie_secure();
    let mut cookie = format!("{name}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// Cookie first; the Authorization header is a fallback for non-browser
/// clients.
fn extract_session_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    if let Some(token) = extract_cookie_token(headers, cookie_name) {
        return Some(token);
    }
    extract_bearer_token(headers)
}

fn extract_cookie_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let header = headers.get(axum::http::header::COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        let trimmed = pair.trim();
        let mut parts = trimmed.splitn(2, '=');
        let key = parts.next()?.trim();
        let val = parts.next()?.trim();
        if key == cookie_name && !val.is_empty() {
            return Some(val.to_string());
        }
    }
    None
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::auth::rate_limit::NoopRateLimiter;
    use secrecy::SecretString;

    fn state(frontend: &str) -> AuthState {
        AuthState::new(
            AuthConfig::new(SecretString::from("secret"), frontend.to_string()),
            Arc::new(NoopRateLimiter),
        )
    }

    #[test]
    fn cookie_token_wins_over_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::COOKIE,
            HeaderValue::from_static("aliro_session=cookie-token; other=x"),
        );
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer header-token"));
        assert_eq!(
            extract_session_token(&headers, "aliro_session").as_deref(),
            Some("cookie-token")
        );
    }

    #[test]
    fn bearer_token_is_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        assert_eq!(
            extract_session_token(&headers, "aliro_session").as_deref(),
            Some("abc123")
        );
    }

    #[test]
    fn empty_tokens_are_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::COOKIE,
            HeaderValue::from_static("aliro_session="),
        );
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(extract_session_token(&headers, "aliro_session"), None);
    }

    #[test]
    fn session_cookie_sets_attributes() {
        let state = state("https://aliro.dev");
        let cookie = session_cookie(&state, "token").unwrap();
        let value = cookie.to_str().unwrap();
        assert!(value.starts_with("aliro_session=token; "));
        assert!(value.contains("HttpOnly"));
        assert!(value.contains("SameSite=Lax"));
        assert!(value.contains("Max-Age=2592000"));
        assert!(value.ends_with("; Secure"));
    }

    #[test]
    fn session_cookie_not_secure_for_http_frontend() {
        let state = state("http://localhost:3000");
        let cookie = session_cookie(&state, "token").unwrap();
        assert!(!cookie.to_str().unwrap().contains("Secure"));
    }

    #[test]
    fn clear_cookie_expires_immediately() {
        let state = state("https://aliro.dev");
        let cookie = clear_session_cookie(&state.config).unwrap();
        let value = cookie.to_str().unwrap();
        assert!(value.starts_with("aliro_session=; "));
        assert!(value.contains("Max-Age=0"));
    }
}
