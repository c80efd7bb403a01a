//! Resend a one-time code for an existing challenge.

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use super::outcome::AuthFailure;
use super::policy::validate_resend;
use super::rate_limit::{RateLimitAction, RateLimitDecision};
use super::session::authenticate_session;
use super::state::AuthState;
use super::storage::{fetch_active_challenge_any_purpose, replace_challenge_code};
use super::types::{ChallengeResponse, ResendCodeRequest};
use super::utils::{compute_hash, extract_client_ip, generate_code};

/// Issue a fresh code for a still-active challenge.
///
/// The purpose's resend policy decides who may ask and against what state;
/// the fresh code resets the attempt counter and extends the deadline. The
/// code is returned in-band only for pre-authentication purposes.
#[utoipa::path(
    post,
    path = "/v1/auth/challenge/resend",
    request_body = ResendCodeRequest,
    responses(
        (status = 200, description = "Fresh code issued", body = ChallengeResponse),
        (status = 400, description = "Policy rejected the request"),
        (status = 401, description = "Requester not allowed"),
        (status = 404, description = "No active challenge"),
        (status = 429, description = "Rate limited")
    ),
    tag = "auth"
)]
pub async fn resend_code(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<ResendCodeRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return AuthFailure::BadRequest.into_response();
    };

    let client_ip = extract_client_ip(&headers);
    if auth_state
        .rate_limiter
        .check_ip(client_ip.as_deref(), RateLimitAction::Resend)
        == RateLimitDecision::Limited
    {
        return AuthFailure::TooManyRequests.into_response();
    }

    let Ok(challenge_id) = Uuid::parse_str(request.challenge_id.trim()) else {
        return AuthFailure::NotFound.into_response();
    };

    // An authenticated requester is optional; the policy decides whether one
    // is required for this purpose.
    let requester = match authenticate_session(&headers, &pool, &auth_state).await {
        Ok(record) => record.map(|record| record.user_id),
        Err(_) => None,
    };

    let fetched = match fetch_active_challenge_any_purpose(&pool, challenge_id).await {
        Ok(fetched) => fetched,
        Err(err) => return AuthFailure::from_storage(&err).into_response(),
    };
    let Some((challenge, user)) = fetched else {
        return AuthFailure::NotFound.into_response();
    };

    if let Err(failure) = validate_resend(&challenge, &user, requester) {
        return failure.into_response();
    }

    let code = match generate_code() {
        Ok(code) => code,
        Err(err) => return AuthFailure::from_storage(&err).into_response(),
    };
    let code_hash = compute_hash(&code, auth_state.config.secret_key());

    match replace_challenge_code(
        &pool,
        challenge.id,
        &code_hash,
        auth_state.config.code_ttl_seconds(),
    )
    .await
    {
        Ok(true) => {}
        // The challenge expired between the lookup and the swap.
        Ok(false) => return AuthFailure::NotFound.into_response(),
        Err(err) => return AuthFailure::from_storage(&err).into_response(),
    }

    // Mirror the persisted swap so the response reflects the refreshed state.
    let challenge = challenge.with_new_code(
        code_hash,
        chrono::Utc::now(),
        auth_state.config.code_ttl_seconds(),
    );

    let response = ChallengeResponse {
        challenge_id: challenge.id.to_string(),
        code: challenge.purpose.returns_code_in_band().then_some(code),
    };
    (StatusCode::OK, Json(response)).into_response()
}
