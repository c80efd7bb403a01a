//! Per-purpose rules deciding whether a fresh code may be issued for an
//! existing challenge.

use uuid::Uuid;

use super::challenge::ChallengeRecord;
use super::outcome::AuthFailure;
use super::purpose::ChallengePurpose;
use super::storage::UserRecord;

/// Validate a resend request against the purpose's policy.
///
/// `requester` is the authenticated caller, if any; pre-authentication flows
/// accept anonymous requests.
pub(crate) fn validate_resend(
    challenge: &ChallengeRecord,
    user: &UserRecord,
    requester: Option<Uuid>,
) -> Result<(), AuthFailure> {
    match challenge.purpose {
        ChallengePurpose::Login | ChallengePurpose::Register => Ok(()),
        ChallengePurpose::PasswordReset => {
            // The reset code goes to the phone captured at challenge creation.
            // If the account's phone changed since, the stale challenge must
            // not be refreshed.
            let target = challenge.target_phone_e164.as_deref().unwrap_or_default();
            if !target.is_empty() && target == user.phone_e164 {
                Ok(())
            } else {
                Err(AuthFailure::BadRequest)
            }
        }
        ChallengePurpose::ChangeEmail => {
            if requester != Some(challenge.user_id) {
                return Err(AuthFailure::Unauthorized);
            }
            match (&challenge.target_email, &user.pending_email) {
                (Some(target), Some(pending)) if target == pending => Ok(()),
                _ => Err(AuthFailure::BadRequest),
            }
        }
        ChallengePurpose::ChangePhone => {
            if requester != Some(challenge.user_id) {
                return Err(AuthFailure::Unauthorized);
            }
            match (&challenge.target_phone_e164, &user.pending_phone_e164) {
                (Some(target), Some(pending)) if target == pending => Ok(()),
                _ => Err(AuthFailure::BadRequest),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn user() -> UserRecord {
        UserRecord {
            id: Uuid::new_v4(),
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
            phone_e164: "+491512345678".to_string(),
            role: "client".to_string(),
            password_hash: String::new(),
            is_active: true,
            is_verified: true,
            must_change_password: false,
            pending_email: None,
            pending_phone_e164: None,
        }
    }

    fn challenge(purpose: ChallengePurpose, user_id: Uuid) -> ChallengeRecord {
        let now = Utc::now();
        ChallengeRecord {
            id: Uuid::new_v4(),
            user_id,
            purpose,
            target_email: None,
            target_phone_e164: None,
            code_hash: vec![0; 32],
            attempt_count: 0,
            created_at: now,
            expires_at: now + Duration::minutes(10),
            verified_at: None,
        }
    }

    #[test]
    fn login_and_register_always_allowed() {
        let user = user();
        for purpose in [ChallengePurpose::Login, ChallengePurpose::Register] {
            let challenge = challenge(purpose, user.id);
            assert_eq!(validate_resend(&challenge, &user, None), Ok(()));
        }
    }

    #[test]
    fn password_reset_requires_current_phone() {
        let user = user();
        let mut challenge = challenge(ChallengePurpose::PasswordReset, user.id);

        challenge.target_phone_e164 = Some(user.phone_e164.clone());
        assert_eq!(validate_resend(&challenge, &user, None), Ok(()));

        challenge.target_phone_e164 = Some("+14155552671".to_string());
        assert_eq!(
            validate_resend(&challenge, &user, None),
            Err(AuthFailure::BadRequest)
        );

        challenge.target_phone_e164 = None;
        assert_eq!(
            validate_resend(&challenge, &user, None),
            Err(AuthFailure::BadRequest)
        );
    }

    #[test]
    fn change_email_requires_owner_and_pending_match() {
        let mut user = user();
        user.pending_email = Some("new@example.com".to_string());
        let mut challenge = challenge(ChallengePurpose::ChangeEmail, user.id);
        challenge.target_email = Some("new@example.com".to_string());

        assert_eq!(validate_resend(&challenge, &user, Some(user.id)), Ok(()));
        assert_eq!(
            validate_resend(&challenge, &user, None),
            Err(AuthFailure::Unauthorized)
        );
        assert_eq!(
            validate_resend(&challenge, &user, Some(Uuid::new_v4())),
            Err(AuthFailure::Unauthorized)
        );

        user.pending_email = Some("other@example.com".to_string());
        assert_eq!(
            validate_resend(&challenge, &user, Some(user.id)),
            Err(AuthFailure::BadRequest)
        );

        user.pending_email = None;
        assert_eq!(
            validate_resend(&challenge, &user, Some(user.id)),
            Err(AuthFailure::BadRequest)
        );
    }

    #[test]
    fn change_phone_requires_owner_and_pending_match() {
        let mut user = user();
        user.pending_phone_e164 = Some("+14155552671".to_string());
        let mut challenge = challenge(ChallengePurpose::ChangePhone, user.id);
        challenge.target_phone_e164 = Some("+14155552671".to_string());

        assert_eq!(validate_resend(&challenge, &user, Some(user.id)), Ok(()));
        assert_eq!(
            validate_resend(&challenge, &user, Some(Uuid::new_v4())),
            Err(AuthFailure::Unauthorized)
        );

        user.pending_phone_e164 = None;
        assert_eq!(
            validate_resend(&challenge, &user, Some(user.id)),
            Err(AuthFailure::BadRequest)
        );
    }
}
