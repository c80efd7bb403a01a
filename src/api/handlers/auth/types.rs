//! Request and response payloads for the auth endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    /// Optional client-chosen id for the issued challenge.
    #[serde(default)]
    pub challenge_id: Option<String>,
}

/// A freshly created or refreshed challenge.
///
/// `code` is only present for pre-authentication flows where no out-of-band
/// delivery channel is wired up yet.
#[derive(Debug, Serialize, ToSchema)]
pub struct ChallengeResponse {
    pub challenge_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyRequest {
    pub challenge_id: String,
    pub code: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub phone_e164: String,
    pub password: String,
    #[serde(default)]
    pub challenge_id: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PasswordResetRequest {
    pub email: String,
    #[serde(default)]
    pub challenge_id: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PasswordResetVerifyRequest {
    pub challenge_id: String,
    pub code: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ResendCodeRequest {
    pub challenge_id: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChangeEmailRequest {
    pub new_email: String,
    #[serde(default)]
    pub challenge_id: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChangePhoneRequest {
    pub new_phone_e164: String,
    #[serde(default)]
    pub challenge_id: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PasswordChangeRequest {
    pub current_password: String,
    pub new_password: String,
}

/// The authenticated account's own profile.
#[derive(Debug, Serialize, ToSchema)]
pub struct MeResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone_e164: String,
    pub role: String,
    pub is_verified: bool,
    pub must_change_password: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_phone_e164: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    pub user_id: String,
    pub role: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionInfo {
    pub id: String,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub current: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionsOverviewResponse {
    pub sessions: Vec<SessionInfo>,
}
