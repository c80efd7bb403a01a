//! Registration flow: account creation gated by a register challenge.

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::IntoResponse,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;

use super::challenge::{create_challenge, parse_preset_id, redeem_challenge};
use super::outcome::AuthFailure;
use super::purpose::ChallengePurpose;
use super::rate_limit::{RateLimitAction, RateLimitDecision};
use super::session::create_session;
use super::state::AuthState;
use super::storage::{
    RegisterOutcome, contact_taken, insert_challenge, insert_user, mark_challenge_verified,
    pick_active_therapist, set_user_verified,
};
use super::types::{ChallengeResponse, RegisterRequest, VerifyRequest};
use super::utils::{
    extract_client_ip, hash_password, normalize_email, normalize_phone, valid_email, valid_phone,
};

const MIN_PASSWORD_LENGTH: usize = 8;

/// Create an account and issue its register challenge.
///
/// The account row and the challenge land in one transaction; a failed
/// challenge insert must not leave an orphaned unverified account.
#[utoipa::path(
    post,
    path = "/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Account created, challenge issued", body = ChallengeResponse),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Email, phone, or challenge id already in use"),
        (status = 429, description = "Rate limited"),
        (status = 503, description = "No active therapist to assign")
    ),
    tag = "auth"
)]
pub async fn register(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<RegisterRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return AuthFailure::BadRequest.into_response();
    };

    let client_ip = extract_client_ip(&headers);
    if auth_state
        .rate_limiter
        .check_ip(client_ip.as_deref(), RateLimitAction::Register)
        == RateLimitDecision::Limited
    {
        return AuthFailure::TooManyRequests.into_response();
    }

    let preset_id = match parse_preset_id(request.challenge_id.as_deref()) {
        Ok(preset_id) => preset_id,
        Err(failure) => return failure.into_response(),
    };

    let name = request.name.trim();
    let email = normalize_email(&request.email);
    let phone = normalize_phone(&request.phone_e164);
    if name.is_empty()
        || !valid_email(&email)
        || !valid_phone(&phone)
        || request.password.len() < MIN_PASSWORD_LENGTH
    {
        return AuthFailure::BadRequest.into_response();
    }

    match contact_taken(&pool, &email, &phone, None).await {
        Ok(true) => return AuthFailure::Conflict.into_response(),
        Ok(false) => {}
        Err(err) => return AuthFailure::from_storage(&err).into_response(),
    }

    let therapist_user_id = match pick_active_therapist(&pool).await {
        Ok(Some(id)) => id,
        Ok(None) => return AuthFailure::ServiceUnavailable.into_response(),
        Err(err) => return AuthFailure::from_storage(&err).into_response(),
    };

    let password_hash = match hash_password(&request.password) {
        Ok(hash) => hash,
        Err(err) => return AuthFailure::from_storage(&err).into_response(),
    };

    let mut tx = match pool.begin().await {
        Ok(tx) => tx,
        Err(err) => {
            error!("Failed to start register transaction: {err}");
            return AuthFailure::Internal.into_response();
        }
    };

    let user_id = match insert_user(
        &mut tx,
        name,
        &email,
        &phone,
        &password_hash,
        therapist_user_id,
    )
    .await
    {
        Ok(RegisterOutcome::Created(user_id)) => user_id,
        Ok(RegisterOutcome::Conflict) => {
            let _ = tx.rollback().await;
            return AuthFailure::Conflict.into_response();
        }
        Err(err) => {
            let _ = tx.rollback().await;
            return AuthFailure::from_storage(&err).into_response();
        }
    };

    let created = create_challenge(
        preset_id,
        user_id,
        ChallengePurpose::Register,
        None,
        Some(phone),
        &auth_state.config,
    );
    let (challenge, code) = match created {
        Ok(created) => created,
        Err(err) => {
            let _ = tx.rollback().await;
            return AuthFailure::from_storage(&err).into_response();
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
        error!("Failed to commit register transaction: {err}");
        return AuthFailure::Internal.into_response();
    }

    let response = ChallengeResponse {
        challenge_id: challenge.id.to_string(),
        code: Some(code),
    };
    (StatusCode::OK, Json(response)).into_response()
}

/// Redeem a register challenge, activate the account, and mint a session.
#[utoipa::path(
    post,
    path = "/v1/auth/register/verify",
    request_body = VerifyRequest,
    responses(
        (status = 204, description = "Account verified; session cookie set"),
        (status = 400, description = "Missing payload"),
        (status = 401, description = "Invalid challenge or code"),
        (status = 429, description = "Attempt cap reached or rate limited")
    ),
    tag = "auth"
)]
pub async fn register_verify(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<VerifyRequest>>,
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

    let (challenge, user) = match redeem_challenge(
        &pool,
        &auth_state.config,
        &request.challenge_id,
        ChallengePurpose::Register,
        None,
        &request.code,
    )
    .await
    {
        Ok(redeemed) => redeemed,
        Err(failure) => return failure.into_response(),
    };

    let mut tx = match pool.begin().await {
        Ok(tx) => tx,
        Err(err) => {
            error!("Failed to start register-verify transaction: {err}");
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

    if let Err(err) = set_user_verified(&mut tx, user.id).await {
        let _ = tx.rollback().await;
        return AuthFailure::from_storage(&err).into_response();
    }

    let cookie = match create_session(&mut tx, user.id, &auth_state, &headers).await {
        Ok(cookie) => cookie,
        Err(err) => {
            let _ = tx.rollback().await;
            return AuthFailure::from_storage(&err).into_response();
        }
    };

    if let Err(err) = tx.commit().await {
        error!("Failed to commit register-verify transaction: {err}");
        return AuthFailure::Internal.into_response();
    }

    let mut response_headers = HeaderMap::new();
    response_headers.insert(SET_COOKIE, cookie);
    (StatusCode::NO_CONTENT, response_headers).into_response()
}
