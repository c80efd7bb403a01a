//! Auth module tests.
//!
//! Handler tests use a lazy pool so paths that fail before touching the
//! database can be exercised without one.

use super::rate_limit::{RateLimitAction, RateLimitDecision, RateLimiter};
use super::state::{AuthConfig, AuthState};
use super::types::{
    ChangeEmailRequest, LoginRequest, PasswordChangeRequest, PasswordResetVerifyRequest,
    RegisterRequest, ResendCodeRequest, VerifyRequest,
};
use super::{NoopRateLimiter, account, contact, login, password, register, resend, session};
use anyhow::Result;
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::{Json, extract::Extension};
use secrecy::SecretString;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;

struct DenyAllRateLimiter;

impl RateLimiter for DenyAllRateLimiter {
    fn check_ip(&self, _ip: Option<&str>, _action: RateLimitAction) -> RateLimitDecision {
        RateLimitDecision::Limited
    }
}

fn auth_state() -> Arc<AuthState> {
    let config = AuthConfig::new(
        SecretString::from("test-secret"),
        "https://aliro.dev".to_string(),
    );
    Arc::new(AuthState::new(config, Arc::new(NoopRateLimiter)))
}

fn rate_limited_state() -> Arc<AuthState> {
    let config = AuthConfig::new(
        SecretString::from("test-secret"),
        "https://aliro.dev".to_string(),
    );
    Arc::new(AuthState::new(config, Arc::new(DenyAllRateLimiter)))
}

fn lazy_pool() -> Result<sqlx::PgPool> {
    Ok(PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?)
}

#[tokio::test]
async fn login_missing_payload() -> Result<()> {
    let pool = lazy_pool()?;
    let response = login::login(HeaderMap::new(), Extension(pool), Extension(auth_state()), None)
        .await
        .into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn login_rate_limited() -> Result<()> {
    let pool = lazy_pool()?;
    let response = login::login(
        HeaderMap::new(),
        Extension(pool),
        Extension(rate_limited_state()),
        Some(Json(LoginRequest {
            email: "alice@example.com".to_string(),
            password: "password123".to_string(),
            challenge_id: None,
        })),
    )
    .await
    .into_response();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    Ok(())
}

#[tokio::test]
async fn login_verify_missing_payload() -> Result<()> {
    let pool = lazy_pool()?;
    let response = login::login_verify(
        HeaderMap::new(),
        Extension(pool),
        Extension(auth_state()),
        None,
    )
    .await
    .into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn register_missing_payload() -> Result<()> {
    let pool = lazy_pool()?;
    let response = register::register(
        HeaderMap::new(),
        Extension(pool),
        Extension(auth_state()),
        None,
    )
    .await
    .into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn register_rejects_invalid_input() -> Result<()> {
    let cases = [
        // invalid email
        RegisterRequest {
            name: "Alice".to_string(),
            email: "not-an-email".to_string(),
            phone_e164: "+491512345678".to_string(),
            password: "password123".to_string(),
            challenge_id: None,
        },
        // invalid phone
        RegisterRequest {
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
            phone_e164: "0151 2345678".to_string(),
            password: "password123".to_string(),
            challenge_id: None,
        },
        // short password
        RegisterRequest {
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
            phone_e164: "+491512345678".to_string(),
            password: "short".to_string(),
            challenge_id: None,
        },
        // empty name
        RegisterRequest {
            name: " ".to_string(),
            email: "alice@example.com".to_string(),
            phone_e164: "+491512345678".to_string(),
            password: "password123".to_string(),
            challenge_id: None,
        },
        // malformed preset challenge id
        RegisterRequest {
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
            phone_e164: "+491512345678".to_string(),
            password: "password123".to_string(),
            challenge_id: Some("not-a-uuid".to_string()),
        },
    ];

    for request in cases {
        let pool = lazy_pool()?;
        let response = register::register(
            HeaderMap::new(),
            Extension(pool),
            Extension(auth_state()),
            Some(Json(request)),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
    Ok(())
}

#[tokio::test]
async fn register_verify_missing_payload() -> Result<()> {
    let pool = lazy_pool()?;
    let response = register::register_verify(
        HeaderMap::new(),
        Extension(pool),
        Extension(auth_state()),
        None,
    )
    .await
    .into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn verify_rejects_malformed_challenge_id_opaquely() -> Result<()> {
    let pool = lazy_pool()?;
    let response = login::login_verify(
        HeaderMap::new(),
        Extension(pool),
        Extension(auth_state()),
        Some(Json(VerifyRequest {
            challenge_id: "not-a-uuid".to_string(),
            code: "123456".to_string(),
        })),
    )
    .await
    .into_response();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn password_reset_missing_payload() -> Result<()> {
    let pool = lazy_pool()?;
    let response = password::password_reset(
        HeaderMap::new(),
        Extension(pool),
        Extension(auth_state()),
        None,
    )
    .await
    .into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn password_reset_verify_rejects_short_password() -> Result<()> {
    let pool = lazy_pool()?;
    let response = password::password_reset_verify(
        HeaderMap::new(),
        Extension(pool),
        Extension(auth_state()),
        Some(Json(PasswordResetVerifyRequest {
            challenge_id: "b54c4ef0-3f4a-4f28-a4a0-3c4b0ad4f8e3".to_string(),
            code: "123456".to_string(),
            new_password: "short".to_string(),
        })),
    )
    .await
    .into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn resend_missing_payload() -> Result<()> {
    let pool = lazy_pool()?;
    let response = resend::resend_code(
        HeaderMap::new(),
        Extension(pool),
        Extension(auth_state()),
        None,
    )
    .await
    .into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn resend_unknown_id_format_is_not_found() -> Result<()> {
    let pool = lazy_pool()?;
    let response = resend::resend_code(
        HeaderMap::new(),
        Extension(pool),
        Extension(auth_state()),
        Some(Json(ResendCodeRequest {
            challenge_id: "not-a-uuid".to_string(),
        })),
    )
    .await
    .into_response();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn session_without_token_is_no_content() -> Result<()> {
    let pool = lazy_pool()?;
    let response = session::session(HeaderMap::new(), Extension(pool), Extension(auth_state()))
        .await
        .into_response();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    Ok(())
}

#[tokio::test]
async fn logout_without_token_clears_cookie() -> Result<()> {
    let pool = lazy_pool()?;
    let response = session::logout(HeaderMap::new(), Extension(pool), Extension(auth_state()))
        .await
        .into_response();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let cookie = response
        .headers()
        .get(SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    assert!(cookie.starts_with("aliro_session=; "));
    assert!(cookie.contains("Max-Age=0"));
    Ok(())
}

#[tokio::test]
async fn logout_all_requires_auth() -> Result<()> {
    let pool = lazy_pool()?;
    let response = session::logout_all(HeaderMap::new(), Extension(pool), Extension(auth_state()))
        .await
        .into_response();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn sessions_overview_requires_auth() -> Result<()> {
    let pool = lazy_pool()?;
    let response = session::sessions_overview(
        HeaderMap::new(),
        Extension(pool),
        Extension(auth_state()),
    )
    .await
    .into_response();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn change_email_requires_auth() -> Result<()> {
    let pool = lazy_pool()?;
    let response = contact::change_email(
        HeaderMap::new(),
        Extension(pool),
        Extension(auth_state()),
        Some(Json(ChangeEmailRequest {
            new_email: "new@example.com".to_string(),
            challenge_id: None,
        })),
    )
    .await
    .into_response();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn change_email_cancel_requires_auth() -> Result<()> {
    let pool = lazy_pool()?;
    let response =
        contact::change_email_cancel(HeaderMap::new(), Extension(pool), Extension(auth_state()))
            .await
            .into_response();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn login_rejects_malformed_preset_challenge_id() -> Result<()> {
    let pool = lazy_pool()?;
    let response = login::login(
        HeaderMap::new(),
        Extension(pool),
        Extension(auth_state()),
        Some(Json(LoginRequest {
            email: "alice@example.com".to_string(),
            password: "password123".to_string(),
            challenge_id: Some("not-a-uuid".to_string()),
        })),
    )
    .await
    .into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn me_requires_auth() -> Result<()> {
    let pool = lazy_pool()?;
    let response = account::me(HeaderMap::new(), Extension(pool), Extension(auth_state()))
        .await
        .into_response();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn password_change_requires_auth() -> Result<()> {
    let pool = lazy_pool()?;
    let response = account::password_change(
        HeaderMap::new(),
        Extension(pool),
        Extension(auth_state()),
        Some(Json(PasswordChangeRequest {
            current_password: "old password".to_string(),
            new_password: "new password".to_string(),
        })),
    )
    .await
    .into_response();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}
