//! Password reset flow.

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;

use super::challenge::{create_challenge, parse_preset_id, redeem_challenge};
use super::outcome::AuthFailure;
use super::purpose::ChallengePurpose;
use super::rate_limit::{RateLimitAction, RateLimitDecision};
use super::state::AuthState;
use super::storage::{
    insert_challenge, lookup_user_by_email, mark_challenge_verified, revoke_all_sessions,
    update_password,
};
use super::types::{ChallengeResponse, PasswordResetRequest, PasswordResetVerifyRequest};
use super::utils::{extract_client_ip, hash_password, normalize_email};

const MIN_PASSWORD_LENGTH: usize = 8;

/// Start a password reset. The code goes to the account's phone; the
/// response body carries only the challenge id.
#[utoipa::path(
    post,
    path = "/v1/auth/password/reset",
    request_body = PasswordResetRequest,
    responses(
        (status = 200, description = "Challenge issued", body = ChallengeResponse),
        (status = 400, description = "Missing payload or malformed challenge id"),
        (status = 404, description = "Unknown account"),
        (status = 409, description = "Challenge id already used"),
        (status = 429, description = "Rate limited")
    ),
    tag = "auth"
)]
pub async fn password_reset(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<PasswordResetRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return AuthFailure::BadRequest.into_response();
    };

    let client_ip = extract_client_ip(&headers);
    if auth_state
        .rate_limiter
        .check_ip(client_ip.as_deref(), RateLimitAction::PasswordReset)
        == RateLimitDecision::Limited
    {
        return AuthFailure::TooManyRequests.into_response();
    }

    let preset_id = match parse_preset_id(request.challenge_id.as_deref()) {
        Ok(preset_id) => preset_id,
        Err(failure) => return failure.into_response(),
    };

    let email = normalize_email(&request.email);
    let user = match lookup_user_by_email(&pool, &email).await {
        Ok(Some(user)) => user,
        Ok(None) => return AuthFailure::NotFound.into_response(),
        Err(err) => return AuthFailure::from_storage(&err).into_response(),
    };

    let created = create_challenge(
        preset_id,
        user.id,
        ChallengePurpose::PasswordReset,
        None,
        Some(user.phone_e164.clone()),
        &auth_state.config,
    );
    let (challenge, _code) = match created {
        Ok(created) => created,
        Err(err) => return AuthFailure::from_storage(&err).into_response(),
    };

    let mut tx = match pool.begin().await {
        Ok(tx) => tx,
        Err(err) => {
            error!("Failed to start password-reset transaction: {err}");
            return AuthFailure::Internal.into_response();
        }
    };
    match insert_challenge(&mut tx, &challenge).await {
        Ok(true) => {}
        Ok(false) => {
            let _ = tx.rollback().await;
            return AuthFailure::Conflict.into_response();
        }
        Err(err) => {
            let _ = tx.rollback().await;
            return AuthFailure::from_storage(&err).into_response();
        }
    }
    if let Err(err) = tx.commit().await {
        error!("Failed to commit password-reset transaction: {err}");
        return AuthFailure::Internal.into_response();
    }

    let response = ChallengeResponse {
        challenge_id: challenge.id.to_string(),
        code: None,
    };
    (StatusCode::OK, Json(response)).into_response()
}

/// Redeem a password-reset challenge and rotate the password.
///
/// Every live session of the account is revoked once the rotation commits.
#[utoipa::path(
    post,
    path = "/v1/auth/password/reset/verify",
    request_body = PasswordResetVerifyRequest,
    responses(
        (status = 204, description = "Password rotated"),
        (status = 400, description = "Invalid input or stale challenge"),
        (status = 401, description = "Invalid challenge or code"),
        (status = 429, description = "Attempt cap reached or rate limited")
    ),
    tag = "auth"
)]
pub async fn password_reset_verify(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<PasswordResetVerifyRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return AuthFailure::BadRequest.into_response();
    };

    let client_ip = extract_client_ip(&headers);
    if auth_state
        .rate_limiter
        .check_ip(client_ip.as_deref(), RateLimitAction::Verify)
        == RateLimitDecision::Limited
    {
        return AuthFailure::TooManyRequests.into_response();
    }

    if request.new_password.len() < MIN_PASSWORD_LENGTH {
        return AuthFailure::BadRequest.into_response();
    }

    let (challenge, user) = match redeem_challenge(
        &pool,
        &auth_state.config,
        &request.challenge_id,
        ChallengePurpose::PasswordReset,
        None,
        &request.code,
    )
    .await
    {
        Ok(redeemed) => redeemed,
        Err(failure) => return failure.into_response(),
    };

    // A reset issued against an old phone number must not go through after
    // the account's phone changed.
    let target = challenge.target_phone_e164.as_deref().unwrap_or_default();
    if target.is_empty() || target != user.phone_e164 {
        return AuthFailure::BadRequest.into_response();
    }

    let password_hash = match hash_password(&request.new_password) {
        Ok(hash) => hash,
        Err(err) => return AuthFailure::from_storage(&err).into_response(),
    };

    let mut tx = match pool.begin().await {
        Ok(tx) => tx,
        Err(err) => {
            error!("Failed to start password-reset-verify transaction: {err}");
            return AuthFailure::Internal.into_response();
        }
    };

    match mark_challenge_verified(&mut tx, challenge.id).await {
        Ok(true) => {}
        Ok(false) => {
            let _ = tx.rollback().await;
            return AuthFailure::Unauthorized.into_response();
        }
        Err(err) => {
            let _ = tx.rollback().await;
            return AuthFailure::from_storage(&err).into_response();
        }
    }

    if let Err(err) = update_password(&mut tx, user.id, &password_hash).await {
        let _ = tx.rollback().await;
        return AuthFailure::from_storage(&err).into_response();
    }

    if let Err(err) = tx.commit().await {
        error!("Failed to commit password-reset-verify transaction: {err}");
        return AuthFailure::Internal.into_response();
    }

    if let Err(err) = revoke_all_sessions(&pool, user.id).await {
        // The password is already rotated; stale sessions expire on their own.
        error!("Failed to revoke sessions after password reset: {err}");
    }

    StatusCode::NO_CONTENT.into_response()
}
