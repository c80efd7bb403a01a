//! Auth state and configuration.

use secrecy::SecretString;
use std::sync::Arc;

use super::rate_limit::RateLimiter;

const DEFAULT_CODE_TTL_SECONDS: i64 = 10 * 60;
const DEFAULT_SESSION_TTL_SECONDS: i64 = 30 * 24 * 60 * 60;
const DEFAULT_MAX_ATTEMPTS: i32 = 5;
const DEFAULT_COOKIE_NAME: &str = "aliro_session";

#[derive(Clone)]
pub struct AuthConfig {
    secret_key: SecretString,
    frontend_base_url: String,
    cookie_name: String,
    code_ttl_seconds: i64,
    session_ttl_seconds: i64,
    max_attempts: i32,
}

impl AuthConfig {
    #[must_use]
    pub fn new(secret_key: SecretString, frontend_base_url: String) -> Self {
        Self {
            secret_key,
            frontend_base_url,
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            code_ttl_seconds: DEFAULT_CODE_TTL_SECONDS,
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    #[must_use]
    pub fn with_cookie_name(mut self, name: String) -> Self {
        self.cookie_name = name;
        self
    }

    #[must_use]
    pub fn with_code_ttl_seconds(mut self, seconds: i64) -> Self {
        self.code_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: i32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    #[must_use]
    pub fn secret_key(&self) -> &SecretString {
        &self.secret_key
    }

    #[must_use]
    pub fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    #[must_use]
    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    #[must_use]
    pub const fn code_ttl_seconds(&self) -> i64 {
        self.code_ttl_seconds
    }

    #[must_use]
    pub const fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }

    #[must_use]
    pub const fn max_attempts(&self) -> i32 {
        self.max_attempts
    }

    /// Cookies are marked `Secure` whenever the frontend is served over TLS.
    #[must_use]
    pub fn session_cookie_secure(&self) -> bool {
        self.frontend_base_url.starts_with("https://")
    }
}

#[derive(Clone)]
pub struct AuthState {
    pub config: AuthConfig,
    pub rate_limiter: Arc<dyn RateLimiter>,
}

impl AuthState {
    #[must_use]
    pub fn new(config: AuthConfig, rate_limiter: Arc<dyn RateLimiter>) -> Self {
        Self {
            config,
            rate_limiter,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::auth::rate_limit::NoopRateLimiter;

    fn config(frontend: &str) -> AuthConfig {
        AuthConfig::new(SecretString::from("secret"), frontend.to_string())
    }

    #[test]
    fn defaults_are_sane() {
        let config = config("https://aliro.dev");
        assert_eq!(config.cookie_name(), "aliro_session");
        assert_eq!(config.code_ttl_seconds(), 600);
        assert_eq!(config.session_ttl_seconds(), 2_592_000);
        assert_eq!(config.max_attempts(), 5);
    }

    #[test]
    fn builders_override_defaults() {
        let config = config("https://aliro.dev")
            .with_cookie_name("session".to_string())
            .with_code_ttl_seconds(120)
            .with_session_ttl_seconds(3600)
            .with_max_attempts(3);
        assert_eq!(config.cookie_name(), "session");
        assert_eq!(config.code_ttl_seconds(), 120);
        assert_eq!(config.session_ttl_seconds(), 3600);
        assert_eq!(config.max_attempts(), 3);
    }

    #[test]
    fn cookie_secure_follows_frontend_scheme() {
        assert!(config("https://aliro.dev").session_cookie_secure());
        assert!(!config("http://localhost:3000").session_cookie_secure());
    }

    #[test]
    fn state_is_cloneable() {
        let state = AuthState::new(config("https://aliro.dev"), Arc::new(NoopRateLimiter));
        let cloned = state.clone();
        assert_eq!(cloned.config.cookie_name(), "aliro_session");
    }
}
