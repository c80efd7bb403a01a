//! Login flow: password check, login challenge, session mint.

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
use super::storage::{insert_challenge, lookup_user_by_email, mark_challenge_verified};
use super::types::{ChallengeResponse, LoginRequest, VerifyRequest};
use super::utils::{extract_client_ip, normalize_email, verify_password};

/// Start a login: check the password and issue a login challenge.
///
/// Unknown email, inactive account, and wrong password all collapse into the
/// same 401.
#[utoipa::path(
    post,
    path = "/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Challenge issued", body = ChallengeResponse),
        (status = 400, description = "Missing payload or malformed challenge id"),
        (status = 401, description = "Invalid credentials"),
        (status = 409, description = "Challenge id already used"),
        (status = 429, description = "Rate limited")
    ),
    tag = "auth"
)]
pub async fn login(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return AuthFailure::BadRequest.into_response();
    };

    let client_ip = extract_client_ip(&headers);
    if auth_state
        .rate_limiter
        .check_ip(client_ip.as_deref(), RateLimitAction::Login)
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
        Ok(None) => return AuthFailure::Unauthorized.into_response(),
        Err(err) => return AuthFailure::from_storage(&err).into_response(),
    };

    if !verify_password(&user.password_hash, &request.password) {
        return AuthFailure::Unauthorized.into_response();
    }

    let created = create_challenge(
        preset_id,
        user.id,
        ChallengePurpose::Login,
        None,
        Some(user.phone_e164.clone()),
        &auth_state.config,
    );
    let (challenge, code) = match created {
        Ok(created) => created,
        Err(err) => return AuthFailure::from_storage(&err).into_response(),
    };

    let mut tx = match pool.begin().await {
        Ok(tx) => tx,
        Err(err) => {
            error!("Failed to start login transaction: {err}");
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
        error!("Failed to commit login transaction: {err}");
        return AuthFailure::Internal.into_response();
    }

    let response = ChallengeResponse {
        challenge_id: challenge.id.to_string(),
        code: Some(code),
    };
    (StatusCode::OK, Json(response)).into_response()
}

/// Redeem a login challenge and mint a session.
#[utoipa::path(
    post,
    path = "/v1/auth/login/verify",
    request_body = VerifyRequest,
    responses(
        (status = 204, description = "Logged in; session cookie set"),
        (status = 400, description = "Missing payload"),
        (status = 401, description = "Invalid challenge or code"),
        (status = 429, description = "Attempt cap reached or rate limited")
    ),
    tag = "auth"
)]
pub async fn login_verify(
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
        ChallengePurpose::Login,
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
            error!("Failed to start login-verify transaction: {err}");
            return AuthFailure::Internal.into_response();
        }
    };

    match mark_challenge_verified(&mut tx, challenge.id).await {
        Ok(true) => {}
        Ok(false) => {
            // Another request redeemed the challenge first.
            let _ = tx.rollback().await;
            return AuthFailure::Unauthorized.into_response();
        }
        Err(err) => {
            let _ = tx.rollback().await;
            return AuthFailure::from_storage(&err).into_response();
        }
    }

    let cookie = match create_session(&mut tx, user.id, &auth_state, &headers).await {
        Ok(cookie) => cookie,
        Err(err) => {
            let _ = tx.rollback().await;
            return AuthFailure::from_storage(&err).into_response();
        }
    };

    if let Err(err) = tx.commit().await {
        error!("Failed to commit login-verify transaction: {err}");
        return AuthFailure::Internal.into_response();
    }

    let mut response_headers = HeaderMap::new();
    response_headers.insert(SET_COOKIE, cookie);
    (StatusCode::NO_CONTENT, response_headers).into_response()
}
