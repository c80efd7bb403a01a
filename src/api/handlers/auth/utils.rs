//! Small helpers for code generation, keyed hashing, and input validation.

use anyhow::{Context, Result, anyhow};
use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use base64::Engine;
use hmac::{Hmac, Mac};
use rand::{RngCore, rngs::OsRng};
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

/// Digits in a one-time code.
pub(crate) const CODE_LENGTH: usize = 6;

// Largest multiple of 1_000_000 that fits in u32; values at or above it are
// rejected to keep the modulo unbiased.
const CODE_SAMPLE_LIMIT: u32 = 4_294_000_000;

/// Generate a zero-padded numeric one-time code.
///
/// The raw code is only delivered to the user; the database stores a keyed
/// hash.
pub(super) fn generate_code() -> Result<String> {
    loop {
        let mut bytes = [0u8; 4];
        OsRng
            .try_fill_bytes(&mut bytes)
            .context("failed to generate one-time code")?;
        let sample = u32::from_be_bytes(bytes);
        if sample < CODE_SAMPLE_LIMIT {
            return Ok(format!(
                "{:0width$}",
                sample % 1_000_000,
                width = CODE_LENGTH
            ));
        }
    }
}

/// Create a new session token for the auth cookie.
/// The raw value is only returned to set the cookie; the database stores a hash.
pub(crate) fn generate_session_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate session token")?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
}

/// Keyed hash of a one-time code or session token so raw values never touch
/// the database.
pub(crate) fn compute_hash(value: &str, key: &SecretString) -> Vec<u8> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key.expose_secret().as_bytes())
        .expect("HMAC accepts any key length");
    mac.update(value.as_bytes());
    mac.finalize().into_bytes().to_vec()
}

/// Constant-time hash comparison.
pub(crate) fn hashes_match(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Hash a password for storage.
pub(super) fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| anyhow!("failed to hash password: {err}"))
}

/// Check a password against its stored hash.
pub(super) fn verify_password(password_hash: &str, password: &str) -> bool {
    PasswordHash::new(password_hash)
        .and_then(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed))
        .is_ok()
}

/// Normalize an email for lookup/uniqueness checks.
pub(super) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email format check on already-normalized input.
pub(super) fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email_normalized))
}

/// Normalize a phone number for lookup/uniqueness checks.
pub(super) fn normalize_phone(phone: &str) -> String {
    phone.chars().filter(|c| !c.is_whitespace()).collect()
}

/// E.164 format check on already-normalized input.
pub(super) fn valid_phone(phone_normalized: &str) -> bool {
    Regex::new(r"^\+[1-9]\d{6,14}$").is_ok_and(|regex| regex.is_match(phone_normalized))
}

pub(super) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

/// Extract a client IP for rate limiting from common proxy headers.
pub(super) fn extract_client_ip(headers: &axum::http::HeaderMap) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    if forwarded.is_some() {
        return forwarded.map(str::to_string);
    }
    headers
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, HeaderValue};

    #[test]
    fn generate_code_is_six_digits() {
        for _ in 0..32 {
            let code = generate_code().unwrap();
            assert_eq!(code.len(), CODE_LENGTH);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn generate_session_token_is_url_safe() {
        let token = generate_session_token().unwrap();
        // 32 bytes => 43 chars of unpadded base64
        assert_eq!(token.len(), 43);
        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn compute_hash_is_keyed() {
        let key_a = SecretString::from("key-a");
        let key_b = SecretString::from("key-b");
        let hash_a = compute_hash("123456", &key_a);
        let hash_b = compute_hash("123456", &key_b);
        assert_eq!(hash_a.len(), 32);
        assert_ne!(hash_a, hash_b);
        assert_eq!(hash_a, compute_hash("123456", &key_a));
    }

    #[test]
    fn hashes_match_requires_equal_bytes() {
        let key = SecretString::from("key");
        let hash = compute_hash("123456", &key);
        assert!(hashes_match(&hash, &hash.clone()));
        assert!(!hashes_match(&hash, &compute_hash("654321", &key)));
        assert!(!hashes_match(&hash, &hash[..16]));
    }

    #[test]
    fn password_round_trip() {
        let hash = hash_password("correct horse battery staple").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password(&hash, "correct horse battery staple"));
        assert!(!verify_password(&hash, "wrong password"));
    }

    #[test]
    fn verify_password_rejects_malformed_hash() {
        assert!(!verify_password("not-a-hash", "password"));
    }

    #[test]
    fn normalize_email_trims_and_lowercases() {
        assert_eq!(normalize_email(" Alice@Example.COM "), "alice@example.com");
    }

    #[test]
    fn valid_email_accepts_basic_format() {
        assert!(valid_email("a@example.com"));
        assert!(valid_email("name.surname@example.co"));
    }

    #[test]
    fn valid_email_rejects_missing_parts() {
        assert!(!valid_email("not-an-email"));
        assert!(!valid_email("missing-at.example.com"));
        assert!(!valid_email("missing-domain@"));
    }

    #[test]
    fn normalize_phone_strips_whitespace() {
        assert_eq!(normalize_phone(" +49 151 2345678 "), "+491512345678");
    }

    #[test]
    fn valid_phone_requires_e164() {
        assert!(valid_phone("+491512345678"));
        assert!(valid_phone("+14155552671"));
        assert!(!valid_phone("0151 2345678"));
        assert!(!valid_phone("+0123456"));
        assert!(!valid_phone("491512345678"));
    }

    #[test]
    fn extract_client_ip_prefers_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.9, 10.0.0.1"),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.4"));
        assert_eq!(extract_client_ip(&headers).as_deref(), Some("203.0.113.9"));
    }

    #[test]
    fn extract_client_ip_falls_back_to_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.4"));
        assert_eq!(extract_client_ip(&headers).as_deref(), Some("198.51.100.4"));
    }

    #[test]
    fn extract_client_ip_none_without_headers() {
        let headers = HeaderMap::new();
        assert_eq!(extract_client_ip(&headers), None);
    }
}
