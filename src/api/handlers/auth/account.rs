//! Authenticated account profile and password change.

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;

use super::outcome::AuthFailure;
use super::principal::require_auth;
use super::state::AuthState;
use super::storage::{lookup_user_by_id, update_password};
use super::types::{MeResponse, PasswordChangeRequest};
use super::utils::{hash_password, verify_password};

const MIN_PASSWORD_LENGTH: usize = 8;

/// The caller's own account profile, including any staged contact changes.
#[utoipa::path(
    get,
    path = "/v1/account/me",
    responses(
        (status = 200, description = "Account profile", body = MeResponse),
        (status = 401, description = "Not authenticated")
    ),
    tag = "account"
)]
pub async fn me(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &pool, &auth_state).await {
        Ok(principal) => principal,
        Err(status) => return status.into_response(),
    };

    let user = match lookup_user_by_id(&pool, principal.user_id).await {
        Ok(Some(user)) => user,
        // The account was deactivated under a still-live session.
        Ok(None) => return AuthFailure::Unauthorized.into_response(),
        Err(err) => return AuthFailure::from_storage(&err).into_response(),
    };

    let response = MeResponse {
        id: user.id.to_string(),
        name: user.name,
        email: user.email,
        phone_e164: user.phone_e164,
        role: user.role,
        is_verified: user.is_verified,
        must_change_password: user.must_change_password,
        pending_email: user.pending_email,
        pending_phone_e164: user.pending_phone_e164,
    };
    (StatusCode::OK, Json(response)).into_response()
}

/// Rotate the password of an authenticated account.
///
/// The current password is re-checked even though the caller holds a valid
/// session; a stolen cookie alone must not be enough to lock the owner out.
#[utoipa::path(
    post,
    path = "/v1/account/password/change",
    request_body = PasswordChangeRequest,
    responses(
        (status = 204, description = "Password rotated"),
        (status = 400, description = "Missing payload or new password too short"),
        (status = 401, description = "Not authenticated or wrong current password")
    ),
    tag = "account"
)]
pub async fn password_change(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<PasswordChangeRequest>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &pool, &auth_state).await {
        Ok(principal) => principal,
        Err(status) => return status.into_response(),
    };

    let Some(Json(request)) = payload else {
        return AuthFailure::BadRequest.into_response();
    };

    if request.new_password.len() < MIN_PASSWORD_LENGTH {
        return AuthFailure::BadRequest.into_response();
    }

    let user = match lookup_user_by_id(&pool, principal.user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => return AuthFailure::Unauthorized.into_response(),
        Err(err) => return AuthFailure::from_storage(&err).into_response(),
    };

    if !verify_password(&user.password_hash, &request.current_password) {
        return AuthFailure::Unauthorized.into_response();
    }

    let password_hash = match hash_password(&request.new_password) {
        Ok(hash) => hash,
        Err(err) => return AuthFailure::from_storage(&err).into_response(),
    };

    let mut tx = match pool.begin().await {
        Ok(tx) => tx,
        Err(err) => {
            error!("Failed to start password-change transaction: {err}");
            return AuthFailure::Internal.into_response();
        }
    };
    if let Err(err) = update_password(&mut tx, user.id, &password_hash).await {
        let _ = tx.rollback().await;
        return AuthFailure::from_storage(&err).into_response();
    }
    if let Err(err) = tx.commit().await {
        error!("Failed to commit password-change transaction: {err}");
        return AuthFailure::Internal.into_response();
    }

    StatusCode::NO_CONTENT.into_response()
}
