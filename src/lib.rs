//! # Aliro (Challenge-Based Authentication & Sessions)
//!
//! `aliro` issues and verifies short-lived one-time codes ("challenges") that
//! gate login, registration, password reset, and email/phone changes, and
//! manages the opaque bearer session tokens minted after a successful
//! verification.
//!
//! ## Challenges
//!
//! Every sensitive flow starts by creating a challenge bound to a user, a
//! purpose, and a target contact value. The caller then submits the challenge
//! id plus the one-time code. Codes are never stored or compared in
//! plaintext; the database only holds a keyed HMAC-SHA256 hash, and all hash
//! comparisons are constant-time.
//!
//! - **Attempt cap:** failed verifications increment a durable counter; at
//!   the cap further attempts are rejected without revealing how many
//!   remain.
//! - **Opaque failures:** unknown id, wrong purpose, expired, and wrong code
//!   all surface as the same `401` so callers cannot probe challenge state.
//! - **Resend policies:** each purpose has its own rule deciding whether a
//!   fresh code may be issued for an existing challenge.
//!
//! ## Sessions
//!
//! Sessions are identified externally by an opaque URL-safe token delivered
//! once in an `HttpOnly` cookie (or accepted as a bearer header). The server
//! stores only the token's keyed hash. Logout revokes the exact session row;
//! logout-all revokes every session of the owning user.

pub mod api;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
