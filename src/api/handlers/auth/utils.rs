//! Small helpers for login artifact and session token handling.

use anyhow::{Context, Result};
use base64::Engine;
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};

pub(super) const MAGIC_LINK_PURPOSE: &str = "magiclink";

/// Create the random token backing an emailed sign-in link.
///
/// The raw token never leaves this process; its hash is stored and the
/// base64url form of that hash goes into the link.
pub(super) fn generate_login_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate login token")?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
}

/// Create the 6-digit code offered as the manual-entry alternative.
pub(super) fn generate_otp_code() -> Result<String> {
    let mut bytes = [0u8; 4];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate one-time code")?;
    let value = u32::from_be_bytes(bytes) % 1_000_000;
    Ok(format!("{value:06}"))
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

/// Hash a login token or one-time code so raw values never touch the database.
pub(super) fn hash_login_secret(secret: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.finalize().to_vec()
}

/// Hash a session token; the hash is used for lookups when the cookie is presented.
pub(crate) fn hash_session_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

/// Base64url form of a stored token hash, as embedded in the emailed link.
pub(super) fn encode_token_hash(hash: &[u8]) -> String {
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(hash)
}

/// Decode the `token_hash` a client lifted from the link fragment.
pub(super) fn decode_token_hash(value: &str) -> Result<Vec<u8>, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("Missing token hash".to_string());
    }
    base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(trimmed)
        .map_err(|_| "Invalid token hash".to_string())
}

/// Build the sign-in link delivered by email. The artifact travels in the
/// fragment so it never reaches intermediate servers in a request line.
pub(super) fn build_action_link(redirect_to: &str, token_hash_encoded: &str, email: &str) -> String {
    format!("{redirect_to}#type={MAGIC_LINK_PURPOSE}&token_hash={token_hash_encoded}&email={email}")
}

/// Six ASCII digits, the only accepted code shape.
pub(super) fn valid_otp_code(code: &str) -> bool {
    code.len() == 6 && code.bytes().all(|byte| byte.is_ascii_digit())
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
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::borrow::Cow;
    use std::error::Error as StdError;
    use std::fmt;

    #[test]
    fn generate_login_token_round_trip() {
        let decoded_len = generate_login_token()
            .ok()
            .and_then(|token| URL_SAFE_NO_PAD.decode(token.as_bytes()).ok())
            .map(|bytes| bytes.len());
        assert_eq!(decoded_len, Some(32));
    }

    #[test]
    fn generate_otp_code_is_six_digits() {
        for _ in 0..32 {
            let code = generate_otp_code().expect("code");
            assert!(valid_otp_code(&code), "unexpected code shape: {code}");
        }
    }

    #[test]
    fn valid_otp_code_rejects_bad_shapes() {
        assert!(valid_otp_code("123456"));
        assert!(!valid_otp_code("12345"));
        assert!(!valid_otp_code("1234567"));
        assert!(!valid_otp_code("12345a"));
        assert!(!valid_otp_code("½23456"));
    }

    #[test]
    fn hash_login_secret_stable() {
        let first = hash_login_secret("token");
        let second = hash_login_secret("token");
        let different = hash_login_secret("other");
        assert_eq!(first, second);
        assert_ne!(first, different);
    }

    #[test]
    fn token_hash_encoding_round_trips() {
        let hash = hash_login_secret("token");
        let encoded = encode_token_hash(&hash);
        assert_eq!(decode_token_hash(&encoded).as_deref(), Ok(hash.as_slice()));
    }

    #[test]
    fn decode_token_hash_rejects_empty_or_invalid() {
        assert!(decode_token_hash(" ").is_err());
        assert!(decode_token_hash("not/base64url!").is_err());
    }

    #[test]
    fn build_action_link_wire_format() {
        let link = build_action_link("https://invest.vitrino.dev/", "abc123", "a@example.com");
        assert_eq!(
            link,
            "https://invest.vitrino.dev/#type=magiclink&token_hash=abc123&email=a@example.com"
        );
    }

    #[derive(Debug)]
    struct TestDbError {
        code: Option<&'static str>,
    }

    impl fmt::Display for TestDbError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "test database error")
        }
    }

    impl StdError for TestDbError {}

    impl DatabaseError for TestDbError {
        fn message(&self) -> &'static str {
            "test database error"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            self.code.map(Cow::Borrowed)
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            ErrorKind::UniqueViolation
        }
    }

    #[test]
    fn is_unique_violation_matches_sqlstate() {
        let err = sqlx::Error::Database(Box::new(TestDbError {
            code: Some("23505"),
        }));
        assert!(is_unique_violation(&err));

        let err = sqlx::Error::Database(Box::new(TestDbError {
            code: Some("99999"),
        }));
        assert!(!is_unique_violation(&err));

        let err = sqlx::Error::RowNotFound;
        assert!(!is_unique_violation(&err));
    }

    #[test]
    fn extract_client_ip_prefers_forwarded() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("1.2.3.4, 5.6.7.8"),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("9.9.9.9"));
        assert_eq!(extract_client_ip(&headers), Some("1.2.3.4".to_string()));
    }

    #[test]
    fn extract_client_ip_falls_back_to_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("9.9.9.9"));
        assert_eq!(extract_client_ip(&headers), Some("9.9.9.9".to_string()));
    }

    #[test]
    fn extract_client_ip_none_when_missing() {
        let headers = HeaderMap::new();
        assert_eq!(extract_client_ip(&headers), None);
    }
}
