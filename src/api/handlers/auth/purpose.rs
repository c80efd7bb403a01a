//! Challenge purposes and their wire representation.

/// What a challenge authorizes once its code is verified.
///
/// The purpose is fixed at creation time; verification requests must name the
/// same purpose or the challenge is not found.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChallengePurpose {
    Login,
    Register,
    PasswordReset,
    ChangeEmail,
    ChangePhone,
}

impl ChallengePurpose {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Register => "register",
            Self::PasswordReset => "password_reset",
            Self::ChangeEmail => "change_email",
            Self::ChangePhone => "change_phone",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "login" => Some(Self::Login),
            "register" => Some(Self::Register),
            "password_reset" => Some(Self::PasswordReset),
            "change_email" => Some(Self::ChangeEmail),
            "change_phone" => Some(Self::ChangePhone),
            _ => None,
        }
    }

    /// Whether the one-time code travels back to the caller in the response
    /// body. Only pre-authentication flows qualify; every other purpose
    /// delivers the code out of band.
    #[must_use]
    pub const fn returns_code_in_band(self) -> bool {
        matches!(self, Self::Login | Self::Register)
    }
}

#[cfg(test)]
mod tests {
    use super::ChallengePurpose;

    #[test]
    fn parse_round_trips_every_purpose() {
        for purpose in [
            ChallengePurpose::Login,
            ChallengePurpose::Register,
            ChallengePurpose::PasswordReset,
            ChallengePurpose::ChangeEmail,
            ChallengePurpose::ChangePhone,
        ] {
            assert_eq!(ChallengePurpose::parse(purpose.as_str()), Some(purpose));
        }
    }

    #[test]
    fn parse_rejects_unknown() {
        assert_eq!(ChallengePurpose::parse("mfa"), None);
        assert_eq!(ChallengePurpose::parse(""), None);
        assert_eq!(ChallengePurpose::parse("Login"), None);
    }

    #[test]
    fn code_in_band_only_for_pre_auth_flows() {
        assert!(ChallengePurpose::Login.returns_code_in_band());
        assert!(ChallengePurpose::Register.returns_code_in_band());
        assert!(!ChallengePurpose::PasswordReset.returns_code_in_band());
        assert!(!ChallengePurpose::ChangeEmail.returns_code_in_band());
        assert!(!ChallengePurpose::ChangePhone.returns_code_in_band());
    }
}
