//! Rate limiting primitives for auth flows.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug)]
pub enum RateLimitAction {
    Login,
    Register,
    PasswordReset,
    ChangeContact,
    Resend,
    Verify,
}

impl RateLimitAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Register => "register",
            Self::PasswordReset => "password_reset",
            Self::ChangeContact => "change_contact",
            Self::Resend => "resend",
            Self::Verify => "verify",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Limited,
}

pub trait RateLimiter: Send + Sync {
    fn check_ip(&self, ip: Option<&str>, action: RateLimitAction) -> RateLimitDecision;
}

#[derive(Clone, Debug)]
pub struct NoopRateLimiter;

impl RateLimiter for NoopRateLimiter {
    fn check_ip(&self, _ip: Option<&str>, _action: RateLimitAction) -> RateLimitDecision {
        RateLimitDecision::Allowed
    }
}

/// Fixed-window counter keyed by client IP and action.
///
/// Requests without a resolvable IP share a single bucket.
pub struct FixedWindowRateLimiter {
    permit_limit: u32,
    window: Duration,
    windows: Mutex<HashMap<String, (Instant, u32)>>,
}

impl FixedWindowRateLimiter {
    #[must_use]
    pub fn new(permit_limit: u32, window_seconds: u64) -> Self {
        Self {
            permit_limit: permit_limit.max(1),
            window: Duration::from_secs(window_seconds.max(1)),
            windows: Mutex::new(HashMap::new()),
        }
    }
}

impl RateLimiter for FixedWindowRateLimiter {
    fn check_ip(&self, ip: Option<&str>, action: RateLimitAction) -> RateLimitDecision {
        let key = format!("{}:{}", ip.unwrap_or("unknown"), action.as_str());
        let now = Instant::now();

        let Ok(mut windows) = self.windows.lock() else {
            return RateLimitDecision::Allowed;
        };

        windows.retain(|_, (started, _)| now.duration_since(*started) < self.window);

        let entry = windows.entry(key).or_insert((now, 0));
        if entry.1 >= self.permit_limit {
            return RateLimitDecision::Limited;
        }
        entry.1 += 1;
        RateLimitDecision::Allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_rate_limiter_allows() {
        let limiter = NoopRateLimiter;
        assert_eq!(
            limiter.check_ip(None, RateLimitAction::Login),
            RateLimitDecision::Allowed
        );
    }

    #[test]
    fn fixed_window_limits_after_permit() {
        let limiter = FixedWindowRateLimiter::new(2, 60);
        let ip = Some("203.0.113.9");
        assert_eq!(
            limiter.check_ip(ip, RateLimitAction::Login),
            RateLimitDecision::Allowed
        );
        assert_eq!(
            limiter.check_ip(ip, RateLimitAction::Login),
            RateLimitDecision::Allowed
        );
        assert_eq!(
            limiter.check_ip(ip, RateLimitAction::Login),
            RateLimitDecision::Limited
        );
    }

    #[test]
    fn buckets_are_per_ip_and_action() {
        let limiter = FixedWindowRateLimiter::new(1, 60);
        assert_eq!(
            limiter.check_ip(Some("203.0.113.9"), RateLimitAction::Login),
            RateLimitDecision::Allowed
        );
        // Different IP, same action
        assert_eq!(
            limiter.check_ip(Some("203.0.113.10"), RateLimitAction::Login),
            RateLimitDecision::Allowed
        );
        // Same IP, different action
        assert_eq!(
            limiter.check_ip(Some("203.0.113.9"), RateLimitAction::Resend),
            RateLimitDecision::Allowed
        );
        assert_eq!(
            limiter.check_ip(Some("203.0.113.9"), RateLimitAction::Login),
            RateLimitDecision::Limited
        );
    }

    #[test]
    fn missing_ip_shares_a_bucket() {
        let limiter = FixedWindowRateLimiter::new(1, 60);
        assert_eq!(
            limiter.check_ip(None, RateLimitAction::Verify),
            RateLimitDecision::Allowed
        );
        assert_eq!(
            limiter.check_ip(None, RateLimitAction::Verify),
            RateLimitDecision::Limited
        );
    }
}
