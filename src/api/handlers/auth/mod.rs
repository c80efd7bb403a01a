//! Auth handlers and supporting modules.
//!
//! This module coordinates challenge issuance and verification, the sessions
//! minted from successful verifications, and the account flows gated by them.
//!
//! ## Challenges
//!
//! Every flow issues a challenge bound to a user, a purpose, and a target
//! contact value. The stored row holds only a keyed hash of the one-time
//! code; failures increment a durable attempt counter and collapse into an
//! opaque 401. At the attempt cap requests are rejected with 429 without
//! moving the counter.
//!
//! ## Sessions
//!
//! Session tokens are opaque, delivered once in an `HttpOnly` cookie, and
//! stored only as keyed hashes. Bearer headers are accepted as a fallback
//! for non-browser clients.

pub(crate) mod account;
mod challenge;
pub(crate) mod contact;
pub(crate) mod login;
mod outcome;
pub(crate) mod password;
mod policy;
pub(crate) mod principal;
mod purpose;
mod rate_limit;
pub(crate) mod register;
pub(crate) mod resend;
pub(crate) mod session;
mod state;
mod storage;
pub(crate) mod types;
mod utils;

pub use rate_limit::{FixedWindowRateLimiter, NoopRateLimiter, RateLimiter};
pub use state::{AuthConfig, AuthState};

pub(crate) use storage::delete_expired_challenges;

#[cfg(test)]
mod tests;
