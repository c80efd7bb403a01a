//! Email and phone change flows for authenticated accounts.
//!
//! A change stages the new value in a pending slot, issues a challenge bound
//! to it, and only promotes the value once the challenge is redeemed by the
//! same account. Cancel clears the pending slot; the challenge itself is left
//! to expire and becomes unredeemable through the pending-match check.

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
use super::principal::require_auth;
use super::purpose::ChallengePurpose;
use super::rate_limit::{RateLimitAction, RateLimitDecision};
use super::state::AuthState;
use super::storage::{
    clear_pending_email, clear_pending_phone, contact_taken, insert_challenge,
    mark_challenge_verified, promote_pending_email, promote_pending_phone, set_pending_email,
    set_pending_phone,
};
use super::types::{ChallengeResponse, ChangeEmailRequest, ChangePhoneRequest, VerifyRequest};
use super::utils::{extract_client_ip, normalize_email, normalize_phone, valid_email, valid_phone};

#[utoipa::path(
    post,
    path = "/v1/account/email/change",
    request_body = ChangeEmailRequest,
    responses(
        (status = 200, description = "Challenge issued", body = ChallengeResponse),
        (status = 400, description = "Invalid email"),
        (status = 401, description = "Not authenticated"),
        (status = 409, description = "Email already in use"),
        (status = 429, description = "Rate limited")
    ),
    tag = "account"
)]
pub async fn change_email(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<ChangeEmailRequest>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &pool, &auth_state).await {
        Ok(principal) => principal,
        Err(status) => return status.into_response(),
    };

    let Some(Json(request)) = payload else {
        return AuthFailure::BadRequest.into_response();
    };

    let client_ip = extract_client_ip(&headers);
    if auth_state
        .rate_limiter
        .check_ip(client_ip.as_deref(), RateLimitAction::ChangeContact)
        == RateLimitDecision::Limited
    {
        return AuthFailure::TooManyRequests.into_response();
    }

    let preset_id = match parse_preset_id(request.challenge_id.as_deref()) {
        Ok(preset_id) => preset_id,
        Err(failure) => return failure.into_response(),
    };

    let email = normalize_email(&request.new_email);
    if !valid_email(&email) {
        return AuthFailure::BadRequest.into_response();
    }

    match contact_taken(&pool, &email, "", Some(principal.user_id)).await {
        Ok(true) => return AuthFailure::Conflict.into_response(),
        Ok(false) => {}
        Err(err) => return AuthFailure::from_storage(&err).into_response(),
    }

    if let Err(err) = set_pending_email(&pool, principal.user_id, &email).await {
        return AuthFailure::from_storage(&err).into_response();
    }

    let created = create_challenge(
        preset_id,
        principal.user_id,
        ChallengePurpose::ChangeEmail,
        Some(email),
        None,
        &auth_state.config,
    );
    let (challenge, _code) = match created {
        Ok(created) => created,
        Err(err) => return AuthFailure::from_storage(&err).into_response(),
    };

    let mut tx = match pool.begin().await {
        Ok(tx) => tx,
        Err(err) => {
            error!("Failed to start change-email transaction: {err}");
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
        error!("Failed to commit change-email transaction: {err}");
        return AuthFailure::Internal.into_response();
    }

    let response = ChallengeResponse {
        challenge_id: challenge.id.to_string(),
        code: None,
    };
    (StatusCode::OK, Json(response)).into_response()
}

#[utoipa::path(
    post,
    path = "/v1/account/email/change/verify",
    request_body = VerifyRequest,
    responses(
        (status = 204, description = "Email changed"),
        (status = 400, description = "Stale challenge"),
        (status = 401, description = "Invalid challenge, code, or requester"),
        (status = 409, description = "Email claimed while the challenge was in flight"),
        (status = 429, description = "Attempt cap reached or rate limited")
    ),
    tag = "account"
)]
pub async fn change_email_verify(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<VerifyRequest>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &pool, &auth_state).await {
        Ok(principal) => principal,
        Err(status) => return status.into_response(),
    };

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

    // The lookup is scoped to the caller, so a foreign challenge is an
    // opaque miss before any code comparison.
    let (challenge, user) = match redeem_challenge(
        &pool,
        &auth_state.config,
        &request.challenge_id,
        ChallengePurpose::ChangeEmail,
        Some(principal.user_id),
        &request.code,
    )
    .await
    {
        Ok(redeemed) => redeemed,
        Err(failure) => return failure.into_response(),
    };

    // The challenge target must still be the account's pending value.
    let target = match (&challenge.target_email, &user.pending_email) {
        (Some(target), Some(pending)) if target == pending => target.clone(),
        _ => return AuthFailure::BadRequest.into_response(),
    };

    let mut tx = match pool.begin().await {
        Ok(tx) => tx,
        Err(err) => {
            error!("Failed to start change-email-verify transaction: {err}");
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

    match promote_pending_email(&mut tx, user.id, &target).await {
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
        error!("Failed to commit change-email-verify transaction: {err}");
        return AuthFailure::Internal.into_response();
    }

    StatusCode::NO_CONTENT.into_response()
}

#[utoipa::path(
    post,
    path = "/v1/account/email/change/cancel",
    responses(
        (status = 204, description = "Pending email cleared"),
        (status = 401, description = "Not authenticated")
    ),
    tag = "account"
)]
pub async fn change_email_cancel(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &pool, &auth_state).await {
        Ok(principal) => principal,
        Err(status) => return status.into_response(),
    };

    if let Err(err) = clear_pending_email(&pool, principal.user_id).await {
        return AuthFailure::from_storage(&err).into_response();
    }

    StatusCode::NO_CONTENT.into_response()
}

#[utoipa::path(
    post,
    path = "/v1/account/phone/change",
    request_body = ChangePhoneRequest,
    responses(
        (status = 200, description = "Challenge issued", body = ChallengeResponse),
        (status = 400, description = "Invalid phone number"),
        (status = 401, description = "Not authenticated"),
        (status = 409, description = "Phone already in use"),
        (status = 429, description = "Rate limited")
    ),
    tag = "account"
)]
pub async fn change_phone(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<ChangePhoneRequest>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &pool, &auth_state).await {
        Ok(principal) => principal,
        Err(status) => return status.into_response(),
    };

    let Some(Json(request)) = payload else {
        return AuthFailure::BadRequest.into_response();
    };

    let client_ip = extract_client_ip(&headers);
    if auth_state
        .rate_limiter
        .check_ip(client_ip.as_deref(), RateLimitAction::ChangeContact)
        == RateLimitDecision::Limited
    {
        return AuthFailure::TooManyRequests.into_response();
    }

    let preset_id = match parse_preset_id(request.challenge_id.as_deref()) {
        Ok(preset_id) => preset_id,
        Err(failure) => return failure.into_response(),
    };

    let phone = normalize_phone(&request.new_phone_e164);
    if !valid_phone(&phone) {
        return AuthFailure::BadRequest.into_response();
    }

    match contact_taken(&pool, "", &phone, Some(principal.user_id)).await {
        Ok(true) => return AuthFailure::Conflict.into_response(),
        Ok(false) => {}
        Err(err) => return AuthFailure::from_storage(&err).into_response(),
    }

    if let Err(err) = set_pending_phone(&pool, principal.user_id, &phone).await {
        return AuthFailure::from_storage(&err).into_response();
    }

    let created = create_challenge(
        preset_id,
        principal.user_id,
        ChallengePurpose::ChangePhone,
        None,
        Some(phone),
        &auth_state.config,
    );
    let (challenge, _code) = match created {
        Ok(created) => created,
        Err(err) => return AuthFailure::from_storage(&err).into_response(),
    };

    let mut tx = match pool.begin().await {
        Ok(tx) => tx,
        Err(err) => {
            error!("Failed to start change-phone transaction: {err}");
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
        error!("Failed to commit change-phone transaction: {err}");
        return AuthFailure::Internal.into_response();
    }

    let response = ChallengeResponse {
        challenge_id: challenge.id.to_string(),
        code: None,
    };
    (StatusCode::OK, Json(response)).into_response()
}

#[utoipa::path(
    post,
    path = "/v1/account/phone/change/verify",
    request_body = VerifyRequest,
    responses(
        (status = 204, description = "Phone changed"),
        (status = 400, description = "Stale challenge"),
        (status = 401, description = "Invalid challenge, code, or requester"),
        (status = 409, description = "Phone claimed while the challenge was in flight"),
        (status = 429, description = "Attempt cap reached or rate limited")
    ),
    tag = "account"
)]
pub async fn change_phone_verify(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<VerifyRequest>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &pool, &auth_state).await {
        Ok(principal) => principal,
        Err(status) => return status.into_response(),
    };

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
        ChallengePurpose::ChangePhone,
        Some(principal.user_id),
        &request.code,
    )
    .await
    {
        Ok(redeemed) => redeemed,
        Err(failure) => return failure.into_response(),
    };

    let target = match (&challenge.target_phone_e164, &user.pending_phone_e164) {
        (Some(target), Some(pending)) if target == pending => target.clone(),
        _ => return AuthFailure::BadRequest.into_response(),
    };

    let mut tx = match pool.begin().await {
        Ok(tx) => tx,
        Err(err) => {
            error!("Failed to start change-phone-verify transaction: {err}");
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

    match promote_pending_phone(&mut tx, user.id, &target).await {
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
        error!("Failed to commit change-phone-verify transaction: {err}");
        return AuthFailure::Internal.into_response();
    }

    StatusCode::NO_CONTENT.into_response()
}

#[utoipa::path(
    post,
    path = "/v1/account/phone/change/cancel",
    responses(
        (status = 204, description = "Pending phone cleared"),
        (status = 401, description = "Not authenticated")
    ),
    tag = "account"
)]
pub async fn change_phone_cancel(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &pool, &auth_state).await {
        Ok(principal) => principal,
        Err(status) => return status.into_response(),
    };

    if let Err(err) = clear_pending_phone(&pool, principal.user_id).await {
        return AuthFailure::from_storage(&err).into_response();
    }

    StatusCode::NO_CONTENT.into_response()
}
