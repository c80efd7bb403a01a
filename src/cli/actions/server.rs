use crate::api;
use crate::api::handlers::auth::{AuthConfig, AuthState, FixedWindowRateLimiter};
use crate::api::sweeper::SweeperConfig;
use anyhow::Result;
use secrecy::SecretString;
use std::sync::Arc;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub secret_key: String,
    pub frontend_base_url: String,
    pub cookie_name: String,
    pub code_ttl_seconds: i64,
    pub session_ttl_seconds: i64,
    pub max_attempts: i32,
    pub rate_limit_permit: u32,
    pub rate_limit_window_seconds: u64,
    pub sweeper_interval_seconds: u64,
}

/// Execute the server action.
///
/// # Errors
/// Returns an error if the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let auth_config = AuthConfig::new(
        SecretString::from(args.secret_key),
        args.frontend_base_url,
    )
    .with_cookie_name(args.cookie_name)
    .with_code_ttl_seconds(args.code_ttl_seconds)
    .with_session_ttl_seconds(args.session_ttl_seconds)
    .with_max_attempts(args.max_attempts);

    let rate_limiter = Arc::new(FixedWindowRateLimiter::new(
        args.rate_limit_permit,
        args.rate_limit_window_seconds,
    ));

    let auth_state = AuthState::new(auth_config, rate_limiter);

    let sweeper_config =
        SweeperConfig::new().with_interval_seconds(args.sweeper_interval_seconds);

    api::new(args.port, args.dsn, auth_state, sweeper_config).await
}
