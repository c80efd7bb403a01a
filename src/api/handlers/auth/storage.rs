//! Database helpers for challenge, session, and account state.

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use tracing::Instrument;
use uuid::Uuid;

use super::challenge::ChallengeRecord;
use super::purpose::ChallengePurpose;
use super::state::AuthConfig;
use super::utils::{compute_hash, generate_session_token, is_unique_violation};

/// Outcome when attempting to create a new user.
#[derive(Debug)]
pub(super) enum RegisterOutcome {
    Created(Uuid),
    Conflict,
}

/// Account fields needed by the auth flows.
#[derive(Clone, Debug)]
pub(crate) struct UserRecord {
    pub(crate) id: Uuid,
    pub(crate) name: String,
    pub(crate) email: String,
    pub(crate) phone_e164: String,
    pub(crate) role: String,
    pub(crate) password_hash: String,
    pub(crate) is_active: bool,
    pub(crate) is_verified: bool,
    pub(crate) must_change_password: bool,
    pub(crate) pending_email: Option<String>,
    pub(crate) pending_phone_e164: Option<String>,
}

/// Minimal data returned for a valid session token.
pub(crate) struct SessionRecord {
    pub(crate) session_id: Uuid,
    pub(crate) user_id: Uuid,
    pub(crate) role: String,
}

/// One row of the authenticated user's session overview.
pub(crate) struct SessionOverviewRecord {
    pub(crate) id: Uuid,
    pub(crate) user_agent: Option<String>,
    pub(crate) ip_address: Option<String>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) last_seen_at: DateTime<Utc>,
    pub(crate) expires_at: DateTime<Utc>,
}

const USER_COLUMNS: &str = "id, name, email, phone_e164, role, password_hash, \
     is_active, is_verified, must_change_password, pending_email, pending_phone_e164";

fn row_to_user(row: &PgRow) -> UserRecord {
    UserRecord {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        phone_e164: row.get("phone_e164"),
        role: row.get("role"),
        password_hash: row.get("password_hash"),
        is_active: row.get("is_active"),
        is_verified: row.get("is_verified"),
        must_change_password: row.get("must_change_password"),
        pending_email: row.get("pending_email"),
        pending_phone_e164: row.get("pending_phone_e164"),
    }
}

fn row_to_challenge(row: &PgRow) -> Result<ChallengeRecord> {
    let purpose: String = row.get("purpose");
    let purpose = ChallengePurpose::parse(&purpose)
        .ok_or_else(|| anyhow!("unknown challenge purpose: {purpose}"))?;
    Ok(ChallengeRecord {
        id: row.get("id"),
        user_id: row.get("user_id"),
        purpose,
        target_email: row.get("target_email"),
        target_phone_e164: row.get("target_phone_e164"),
        code_hash: row.get("code_hash"),
        attempt_count: row.get("attempt_count"),
        created_at: row.get("created_at"),
        expires_at: row.get("expires_at"),
        verified_at: row.get("verified_at"),
    })
}

/// Look up an active account by normalized email.
pub(super) async fn lookup_user_by_email(pool: &PgPool, email: &str) -> Result<Option<UserRecord>> {
    let query = &format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1 AND is_active = TRUE");
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(query)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user by email")?;

    Ok(row.map(|row| row_to_user(&row)))
}

/// Look up an active account by id.
pub(super) async fn lookup_user_by_id(pool: &PgPool, user_id: Uuid) -> Result<Option<UserRecord>> {
    let query = &format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND is_active = TRUE");
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(query)
        .bind(user_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user by id")?;

    Ok(row.map(|row| row_to_user(&row)))
}

/// Check whether an email or phone already belongs to another account,
/// including pending contact changes. `exclude_user` skips the caller's own
/// row so re-submitting the same change request is not a conflict.
pub(super) async fn contact_taken(
    pool: &PgPool,
    email: &str,
    phone: &str,
    exclude_user: Option<Uuid>,
) -> Result<bool> {
    let query = r"
        SELECT EXISTS (
            SELECT 1 FROM users
            WHERE (email = $1 OR phone_e164 = $2
               OR pending_email = $1 OR pending_phone_e164 = $2)
              AND ($3::uuid IS NULL OR id <> $3)
        ) AS taken
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .bind(phone)
        .bind(exclude_user)
        .fetch_one(pool)
        .instrument(span)
        .await
        .context("failed to check contact uniqueness")?;

    Ok(row.get("taken"))
}

/// Pick the active therapist with the fewest assigned clients.
pub(super) async fn pick_active_therapist(pool: &PgPool) -> Result<Option<Uuid>> {
    let query = r"
        SELECT t.id
        FROM users t
        LEFT JOIN users c ON c.therapist_user_id = t.id
        WHERE t.role = 'therapist' AND t.is_active = TRUE
        GROUP BY t.id
        ORDER BY COUNT(c.id) ASC, t.created_at ASC
        LIMIT 1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to pick active therapist")?;

    Ok(row.map(|row| row.get("id")))
}

pub(super) async fn insert_user(
    tx: &mut Transaction<'_, Postgres>,
    name: &str,
    email: &str,
    phone: &str,
    password_hash: &str,
    therapist_user_id: Uuid,
) -> Result<RegisterOutcome> {
    let query = r"
        INSERT INTO users
            (name, email, phone_e164, password_hash, therapist_user_id)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(name)
        .bind(email)
        .bind(phone)
        .bind(password_hash)
        .bind(therapist_user_id)
        .fetch_one(&mut **tx)
        .instrument(span)
        .await;

    match row {
        Ok(row) => Ok(RegisterOutcome::Created(row.get("id"))),
        Err(err) => {
            if is_unique_violation(&err) {
                return Ok(RegisterOutcome::Conflict);
            }
            Err(err).context("failed to insert user")
        }
    }
}

/// Insert a challenge row. Returns false when the id is already taken, which
/// only happens for caller-supplied preset ids.
pub(super) async fn insert_challenge(
    tx: &mut Transaction<'_, Postgres>,
    challenge: &ChallengeRecord,
) -> Result<bool> {
    let query = r"
        INSERT INTO auth_challenges
            (id, user_id, purpose, target_email, target_phone_e164,
             code_hash, attempt_count, created_at, expires_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(challenge.id)
        .bind(challenge.user_id)
        .bind(challenge.purpose.as_str())
        .bind(&challenge.target_email)
        .bind(&challenge.target_phone_e164)
        .bind(&challenge.code_hash)
        .bind(challenge.attempt_count)
        .bind(challenge.created_at)
        .bind(challenge.expires_at)
        .execute(&mut **tx)
        .instrument(span)
        .await;

    match result {
        Ok(_) => Ok(true),
        Err(err) if is_unique_violation(&err) => Ok(false),
        Err(err) => Err(err).context("failed to insert challenge"),
    }
}

const CHALLENGE_JOIN_COLUMNS: &str = "c.id, c.user_id, c.purpose, c.target_email, \
     c.target_phone_e164, c.code_hash, c.attempt_count, c.created_at, c.expires_at, \
     c.verified_at, u.id AS u_id, u.name, u.email, u.phone_e164, u.role, \
     u.password_hash, u.is_active, u.is_verified, u.must_change_password, \
     u.pending_email, u.pending_phone_e164";

fn row_to_challenge_with_user(row: &PgRow) -> Result<(ChallengeRecord, UserRecord)> {
    let challenge = row_to_challenge(row)?;
    let user = UserRecord {
        id: row.get("u_id"),
        name: row.get("name"),
        email: row.get("email"),
        phone_e164: row.get("phone_e164"),
        role: row.get("role"),
        password_hash: row.get("password_hash"),
        is_active: row.get("is_active"),
        is_verified: row.get("is_verified"),
        must_change_password: row.get("must_change_password"),
        pending_email: row.get("pending_email"),
        pending_phone_e164: row.get("pending_phone_e164"),
    };
    Ok((challenge, user))
}

/// Fetch an unverified, unexpired challenge of the given purpose together
/// with its (active) owner. When `owner` is given the challenge must belong
/// to that user. Any miss is indistinguishable from the rest.
pub(super) async fn fetch_active_challenge(
    pool: &PgPool,
    challenge_id: Uuid,
    purpose: ChallengePurpose,
    owner: Option<Uuid>,
) -> Result<Option<(ChallengeRecord, UserRecord)>> {
    let query = &format!(
        r"
        SELECT {CHALLENGE_JOIN_COLUMNS}
        FROM auth_challenges c
        JOIN users u ON u.id = c.user_id
        WHERE c.id = $1
          AND c.purpose = $2
          AND ($3::uuid IS NULL OR c.user_id = $3)
          AND c.verified_at IS NULL
          AND c.expires_at > NOW()
          AND u.is_active = TRUE
    "
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(query)
        .bind(challenge_id)
        .bind(purpose.as_str())
        .bind(owner)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to fetch active challenge")?;

    row.map(|row| row_to_challenge_with_user(&row)).transpose()
}

/// Same as [`fetch_active_challenge`] but without pinning the purpose; used
/// by resend, where the purpose is read from the stored row.
pub(super) async fn fetch_active_challenge_any_purpose(
    pool: &PgPool,
    challenge_id: Uuid,
) -> Result<Option<(ChallengeRecord, UserRecord)>> {
    let query = &format!(
        r"
        SELECT {CHALLENGE_JOIN_COLUMNS}
        FROM auth_challenges c
        JOIN users u ON u.id = c.user_id
        WHERE c.id = $1
          AND c.verified_at IS NULL
          AND c.expires_at > NOW()
          AND u.is_active = TRUE
    "
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(query)
        .bind(challenge_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to fetch active challenge")?;

    row.map(|row| row_to_challenge_with_user(&row)).transpose()
}

/// Persist a failed attempt. The guard keeps the counter from moving past
/// the cap under concurrent submissions.
pub(super) async fn record_failed_attempt(
    pool: &PgPool,
    challenge_id: Uuid,
    max_attempts: i32,
) -> Result<()> {
    let query = r"
        UPDATE auth_challenges
        SET attempt_count = attempt_count + 1
        WHERE id = $1 AND attempt_count < $2
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(challenge_id)
        .bind(max_attempts)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to record challenge attempt")?;

    Ok(())
}

/// Mark a challenge verified. Returns false when another request won the
/// race; a challenge is redeemable exactly once.
pub(super) async fn mark_challenge_verified(
    tx: &mut Transaction<'_, Postgres>,
    challenge_id: Uuid,
) -> Result<bool> {
    let query = r"
        UPDATE auth_challenges
        SET verified_at = NOW()
        WHERE id = $1 AND verified_at IS NULL
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(challenge_id)
        .execute(&mut **tx)
        .instrument(span)
        .await
        .context("failed to mark challenge verified")?;

    Ok(result.rows_affected() == 1)
}

/// Swap in a fresh code hash, reset the attempt counter, and extend the
/// deadline. Only touches still-active challenges.
pub(super) async fn replace_challenge_code(
    pool: &PgPool,
    challenge_id: Uuid,
    code_hash: &[u8],
    ttl_seconds: i64,
) -> Result<bool> {
    let query = r"
        UPDATE auth_challenges
        SET code_hash = $2,
            attempt_count = 0,
            expires_at = NOW() + ($3 * INTERVAL '1 second')
        WHERE id = $1 AND verified_at IS NULL AND expires_at > NOW()
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(challenge_id)
        .bind(code_hash)
        .bind(ttl_seconds)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to replace challenge code")?;

    Ok(result.rows_affected() == 1)
}

/// Create a session and return the raw token for the cookie.
///
/// Retries a few times if the token hash collides with an existing row.
pub(super) async fn insert_session(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    config: &AuthConfig,
    user_agent: Option<&str>,
    ip_address: Option<&str>,
) -> Result<String> {
    let query = r"
        INSERT INTO sessions
            (user_id, token_hash, user_agent, ip_address, expires_at)
        VALUES ($1, $2, $3, $4, NOW() + ($5 * INTERVAL '1 second'))
    ";

    for _ in 0..3 {
        let token = generate_session_token()?;
        let token_hash = compute_hash(&token, config.secret_key());

        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(user_id)
            .bind(token_hash)
            .bind(user_agent)
            .bind(ip_address)
            .bind(config.session_ttl_seconds())
            .execute(&mut **tx)
            .instrument(span)
            .await;

        match result {
            Ok(_) => return Ok(token),
            Err(err) if is_unique_violation(&err) => {}
            Err(err) => return Err(err).context("failed to insert session"),
        }
    }

    Err(anyhow!("failed to create a unique session token"))
}

/// Resolve a presented token hash to a live session and touch `last_seen_at`.
pub(super) async fn lookup_session(
    pool: &PgPool,
    token_hash: &[u8],
) -> Result<Option<SessionRecord>> {
    let query = r"
        SELECT s.id, s.user_id, u.role
        FROM sessions s
        JOIN users u ON u.id = s.user_id
        WHERE s.token_hash = $1
          AND s.revoked_at IS NULL
          AND s.expires_at > NOW()
          AND u.is_active = TRUE
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(token_hash)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup session")?;

    let Some(row) = row else {
        return Ok(None);
    };

    let record = SessionRecord {
        session_id: row.get("id"),
        user_id: row.get("user_id"),
        role: row.get("role"),
    };

    let query = "UPDATE sessions SET last_seen_at = NOW() WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(record.session_id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to touch session")?;

    Ok(Some(record))
}

pub(super) async fn revoke_session(pool: &PgPool, session_id: Uuid) -> Result<()> {
    let query = "UPDATE sessions SET revoked_at = NOW() WHERE id = $1 AND revoked_at IS NULL";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(session_id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to revoke session")?;

    Ok(())
}

pub(super) async fn revoke_all_sessions(pool: &PgPool, user_id: Uuid) -> Result<u64> {
    let query = "UPDATE sessions SET revoked_at = NOW() WHERE user_id = $1 AND revoked_at IS NULL";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(user_id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to revoke sessions")?;

    Ok(result.rows_affected())
}

/// List the user's live sessions, newest first.
pub(super) async fn list_sessions(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<SessionOverviewRecord>> {
    let query = r"
        SELECT id, user_agent, ip_address, created_at, last_seen_at, expires_at
        FROM sessions
        WHERE user_id = $1 AND revoked_at IS NULL AND expires_at > NOW()
        ORDER BY last_seen_at DESC
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let rows = sqlx::query(query)
        .bind(user_id)
        .fetch_all(pool)
        .instrument(span)
        .await
        .context("failed to list sessions")?;

    Ok(rows
        .iter()
        .map(|row| SessionOverviewRecord {
            id: row.get("id"),
            user_agent: row.get("user_agent"),
            ip_address: row.get("ip_address"),
            created_at: row.get("created_at"),
            last_seen_at: row.get("last_seen_at"),
            expires_at: row.get("expires_at"),
        })
        .collect())
}

pub(super) async fn set_user_verified(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
) -> Result<()> {
    let query = "UPDATE users SET is_verified = TRUE, updated_at = NOW() WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .execute(&mut **tx)
        .instrument(span)
        .await
        .context("failed to mark user verified")?;

    Ok(())
}

pub(super) async fn update_password(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    password_hash: &str,
) -> Result<()> {
    let query = r"
        UPDATE users
        SET password_hash = $2, must_change_password = FALSE, updated_at = NOW()
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .bind(password_hash)
        .execute(&mut **tx)
        .instrument(span)
        .await
        .context("failed to update password")?;

    Ok(())
}

pub(super) async fn set_pending_email(pool: &PgPool, user_id: Uuid, email: &str) -> Result<()> {
    let query = "UPDATE users SET pending_email = $2, updated_at = NOW() WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .bind(email)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to set pending email")?;

    Ok(())
}

pub(super) async fn set_pending_phone(pool: &PgPool, user_id: Uuid, phone: &str) -> Result<()> {
    let query = "UPDATE users SET pending_phone_e164 = $2, updated_at = NOW() WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .bind(phone)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to set pending phone")?;

    Ok(())
}

pub(super) async fn clear_pending_email(pool: &PgPool, user_id: Uuid) -> Result<()> {
    let query = "UPDATE users SET pending_email = NULL, updated_at = NOW() WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to clear pending email")?;

    Ok(())
}

pub(super) async fn clear_pending_phone(pool: &PgPool, user_id: Uuid) -> Result<()> {
    let query = "UPDATE users SET pending_phone_e164 = NULL, updated_at = NOW() WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to clear pending phone")?;

    Ok(())
}

/// Promote the pending email to the primary slot. Unique violations mean the
/// address was claimed while the challenge was in flight.
pub(super) async fn promote_pending_email(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    email: &str,
) -> Result<bool> {
    let query = r"
        UPDATE users
        SET email = $2, pending_email = NULL, updated_at = NOW()
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(user_id)
        .bind(email)
        .execute(&mut **tx)
        .instrument(span)
        .await;

    match result {
        Ok(_) => Ok(true),
        Err(err) if is_unique_violation(&err) => Ok(false),
        Err(err) => Err(err).context("failed to promote pending email"),
    }
}

pub(super) async fn promote_pending_phone(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    phone: &str,
) -> Result<bool> {
    let query = r"
        UPDATE users
        SET phone_e164 = $2, pending_phone_e164 = NULL, updated_at = NOW()
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(user_id)
        .bind(phone)
        .execute(&mut **tx)
        .instrument(span)
        .await;

    match result {
        Ok(_) => Ok(true),
        Err(err) if is_unique_violation(&err) => Ok(false),
        Err(err) => Err(err).context("failed to promote pending phone"),
    }
}

/// Remove challenges that expired without ever being verified.
pub(crate) async fn delete_expired_challenges(pool: &PgPool) -> Result<u64> {
    let query = r"
        DELETE FROM auth_challenges
        WHERE verified_at IS NULL AND expires_at <= NOW()
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to delete expired challenges")?;

    Ok(result.rows_affected())
}
