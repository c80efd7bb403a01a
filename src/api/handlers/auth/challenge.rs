//! Challenge records and the code verification state machine.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use secrecy::SecretString;
use sqlx::PgPool;
use uuid::Uuid;

use super::outcome::AuthFailure;
use super::purpose::ChallengePurpose;
use super::state::AuthConfig;
use super::storage::{UserRecord, fetch_active_challenge, record_failed_attempt};
use super::utils::{compute_hash, generate_code, hashes_match};

/// One in-flight verification, as stored in `auth_challenges`.
#[derive(Clone, Debug)]
pub(crate) struct ChallengeRecord {
    pub(crate) id: Uuid,
    pub(crate) user_id: Uuid,
    pub(crate) purpose: ChallengePurpose,
    pub(crate) target_email: Option<String>,
    pub(crate) target_phone_e164: Option<String>,
    pub(crate) code_hash: Vec<u8>,
    pub(crate) attempt_count: i32,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) expires_at: DateTime<Utc>,
    pub(crate) verified_at: Option<DateTime<Utc>>,
}

impl ChallengeRecord {
    /// A challenge can be redeemed only while unverified and unexpired.
    pub(crate) fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.verified_at.is_none() && self.expires_at > now
    }

    /// Apply a resend: swap in the fresh code hash, reset the attempt
    /// counter, and extend the deadline. The old code no longer matches.
    #[must_use]
    pub(super) fn with_new_code(
        mut self,
        code_hash: Vec<u8>,
        now: DateTime<Utc>,
        ttl_seconds: i64,
    ) -> Self {
        self.code_hash = code_hash;
        self.attempt_count = 0;
        self.expires_at = now + Duration::seconds(ttl_seconds);
        self
    }
}

/// Parse an optional caller-supplied challenge id.
///
/// Clients may pick the id up front to link a flow idempotently; a malformed
/// value is a bad request, not an opaque miss.
pub(super) fn parse_preset_id(value: Option<&str>) -> Result<Option<Uuid>, AuthFailure> {
    match value {
        None => Ok(None),
        Some(raw) => Uuid::parse_str(raw.trim())
            .map(Some)
            .map_err(|_| AuthFailure::BadRequest),
    }
}

/// Build a fresh challenge and return it with the raw code.
///
/// The record holds only the keyed code hash; the raw code is either sent
/// back in-band or delivered out of band, depending on the purpose.
pub(super) fn create_challenge(
    preset_id: Option<Uuid>,
    user_id: Uuid,
    purpose: ChallengePurpose,
    target_email: Option<String>,
    target_phone_e164: Option<String>,
    config: &AuthConfig,
) -> Result<(ChallengeRecord, String)> {
    let code = generate_code()?;
    let code_hash = compute_hash(&code, config.secret_key());
    let now = Utc::now();

    let record = ChallengeRecord {
        id: preset_id.unwrap_or_else(Uuid::new_v4),
        user_id,
        purpose,
        target_email,
        target_phone_e164,
        code_hash,
        attempt_count: 0,
        created_at: now,
        expires_at: now + Duration::seconds(config.code_ttl_seconds()),
        verified_at: None,
    };

    Ok((record, code))
}

/// Resolve and check a submitted challenge id + code for the given purpose.
///
/// `owner` scopes the lookup to that user's challenges; a foreign caller is
/// rejected before any code comparison, so their guesses never move the
/// owner's attempt counter. Failed attempts are persisted here; marking the
/// challenge verified is left to the caller's transaction. Every miss
/// collapses into the same 401.
pub(super) async fn redeem_challenge(
    pool: &PgPool,
    config: &AuthConfig,
    challenge_id: &str,
    purpose: ChallengePurpose,
    owner: Option<Uuid>,
    code: &str,
) -> Result<(ChallengeRecord, UserRecord), AuthFailure> {
    let Ok(challenge_id) = Uuid::parse_str(challenge_id.trim()) else {
        return Err(AuthFailure::Unauthorized);
    };

    let fetched = fetch_active_challenge(pool, challenge_id, purpose, owner)
        .await
        .map_err(|err| AuthFailure::from_storage(&err))?;

    let Some((challenge, user)) = fetched else {
        return Err(AuthFailure::Unauthorized);
    };

    match redeem_decision(
        &challenge,
        owner,
        code.trim(),
        config.secret_key(),
        config.max_attempts(),
    ) {
        VerifyDecision::Verified => Ok((challenge, user)),
        VerifyDecision::WrongCode => {
            record_failed_attempt(pool, challenge.id, config.max_attempts())
                .await
                .map_err(|err| AuthFailure::from_storage(&err))?;
            Err(AuthFailure::Unauthorized)
        }
        VerifyDecision::NotOwner => Err(AuthFailure::Unauthorized),
        VerifyDecision::AttemptsExhausted => Err(AuthFailure::TooManyRequests),
    }
}

/// Result of checking a submitted code against a challenge.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum VerifyDecision {
    /// Code matched; the caller must persist `verified_at`.
    Verified,
    /// Code did not match; the caller must persist the attempt increment.
    WrongCode,
    /// The challenge belongs to someone else. No state changes.
    NotOwner,
    /// The attempt cap was already reached. No state changes.
    AttemptsExhausted,
}

/// Decide what a redeem attempt does to the challenge.
///
/// Ownership is checked before the code, so a foreign caller can never be
/// classified as `WrongCode` and move the counter.
pub(crate) fn redeem_decision(
    challenge: &ChallengeRecord,
    owner: Option<Uuid>,
    code: &str,
    key: &SecretString,
    max_attempts: i32,
) -> VerifyDecision {
    if owner.is_some_and(|owner| owner != challenge.user_id) {
        return VerifyDecision::NotOwner;
    }
    verify_code(challenge, code, key, max_attempts)
}

/// Check a submitted code.
///
/// The cap is enforced before any hashing so exhausted challenges cost
/// nothing and never move their counter.
pub(crate) fn verify_code(
    challenge: &ChallengeRecord,
    code: &str,
    key: &SecretString,
    max_attempts: i32,
) -> VerifyDecision {
    if challenge.attempt_count >= max_attempts {
        return VerifyDecision::AttemptsExhausted;
    }

    let submitted = compute_hash(code, key);
    if hashes_match(&submitted, &challenge.code_hash) {
        VerifyDecision::Verified
    } else {
        VerifyDecision::WrongCode
    }
}
