//! Authenticated principal extraction.

use axum::http::{HeaderMap, StatusCode};
use sqlx::PgPool;

use super::session::authenticate_session;
use super::state::AuthState;

/// Authenticated user context derived from the session token.
#[derive(Clone, Debug)]
pub struct Principal {
    pub user_id: uuid::Uuid,
    pub role: String,
    pub session_id: uuid::Uuid,
}

/// Resolve a session token into a principal, or return 401 for missing
/// sessions.
pub async fn require_auth(
    headers: &HeaderMap,
    pool: &PgPool,
    auth_state: &AuthState,
) -> Result<Principal, StatusCode> {
    match authenticate_session(headers, pool, auth_state).await {
        Ok(Some(record)) => Ok(Principal {
            user_id: record.user_id,
            role: record.role,
            session_id: record.session_id,
        }),
        Ok(None) => Err(StatusCode::UNAUTHORIZED),
        Err(status) => Err(status),
    }
}
