//! Artifact redemption endpoints: one-time code and link token paths.
//!
//! Both paths terminate in the same state: a `user_sessions` row plus a
//! session cookie on the response.

use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;

use crate::api::handlers::{normalize_email, valid_email};

use super::rate_limit::{RateLimitAction, RateLimitDecision};
use super::session::session_cookie;
use super::state::AuthState;
use super::storage::{
    consume_artifact_by_otp, consume_artifact_by_token_hash, insert_session, upsert_user,
};
use super::types::{SessionResponse, VerifyOtpRequest, VerifyTokenRequest};
use super::utils::{
    decode_token_hash, extract_client_ip, hash_login_secret, valid_otp_code, MAGIC_LINK_PURPOSE,
};

/// Redeem the emailed 6-digit code for a session.
#[utoipa::path(
    post,
    path = "/v1/auth/verify-otp",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "Signed in", body = SessionResponse),
        (status = 400, description = "Invalid or expired code", body = String),
        (status = 429, description = "Rate limited", body = String)
    ),
    tag = "auth"
)]
pub async fn verify_otp(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<VerifyOtpRequest>>,
) -> impl IntoResponse {
    let request: VerifyOtpRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return (StatusCode::BAD_REQUEST, "Invalid email".to_string()).into_response();
    }
    let code = request.code.trim();
    if !valid_otp_code(code) {
        return (
            StatusCode::BAD_REQUEST,
            "Code must be 6 digits".to_string(),
        )
            .into_response();
    }

    let client_ip = extract_client_ip(&headers);
    if auth_state
        .rate_limiter()
        .check_ip(client_ip.as_deref(), RateLimitAction::VerifyOtp)
        == RateLimitDecision::Limited
        || auth_state
            .rate_limiter()
            .check_email(&email, RateLimitAction::VerifyOtp)
            == RateLimitDecision::Limited
    {
        return (StatusCode::TOO_MANY_REQUESTS, "Rate limited".to_string()).into_response();
    }

    let otp_hash = hash_login_secret(code);
    establish_session(&pool, &auth_state, &email, ConsumeBy::Otp(&otp_hash))
        .await
        .into_response()
}

/// Redeem the link's token hash for a session.
///
/// The client parses `#type=magiclink&token_hash=...&email=...` from the
/// emailed link and posts the parts here.
#[utoipa::path(
    post,
    path = "/v1/auth/verify-token",
    request_body = VerifyTokenRequest,
    responses(
        (status = 200, description = "Signed in", body = SessionResponse),
        (status = 400, description = "Invalid or expired link", body = String),
        (status = 429, description = "Rate limited", body = String)
    ),
    tag = "auth"
)]
pub async fn verify_token(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<VerifyTokenRequest>>,
) -> impl IntoResponse {
    let request: VerifyTokenRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    if request.kind != MAGIC_LINK_PURPOSE {
        return (StatusCode::BAD_REQUEST, "Unsupported link type".to_string()).into_response();
    }
    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return (StatusCode::BAD_REQUEST, "Invalid email".to_string()).into_response();
    }
    let token_hash = match decode_token_hash(&request.token_hash) {
        Ok(hash) => hash,
        Err(message) => return (StatusCode::BAD_REQUEST, message).into_response(),
    };

    let client_ip = extract_client_ip(&headers);
    if auth_state
        .rate_limiter()
        .check_ip(client_ip.as_deref(), RateLimitAction::VerifyToken)
        == RateLimitDecision::Limited
        || auth_state
            .rate_limiter()
            .check_email(&email, RateLimitAction::VerifyToken)
            == RateLimitDecision::Limited
    {
        return (StatusCode::TOO_MANY_REQUESTS, "Rate limited".to_string()).into_response();
    }

    establish_session(&pool, &auth_state, &email, ConsumeBy::TokenHash(&token_hash))
        .await
        .into_response()
}

enum ConsumeBy<'a> {
    Otp(&'a [u8]),
    TokenHash(&'a [u8]),
}

impl ConsumeBy<'_> {
    const fn rejection(&self) -> &'static str {
        match self {
            Self::Otp(_) => "Invalid or expired code",
            Self::TokenHash(_) => "Invalid or expired link",
        }
    }
}

/// Consume the artifact, create the identity on first sign-in, and open the
/// auth session, all in one transaction.
async fn establish_session(
    pool: &PgPool,
    auth_state: &AuthState,
    email: &str,
    consume: ConsumeBy<'_>,
) -> axum::response::Response {
    let mut tx = match pool.begin().await {
        Ok(tx) => tx,
        Err(err) => {
            error!("Failed to start verification transaction: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Verification failed".to_string(),
            )
                .into_response();
        }
    };

    let consumed = match &consume {
        ConsumeBy::Otp(otp_hash) => consume_artifact_by_otp(&mut tx, email, otp_hash).await,
        ConsumeBy::TokenHash(token_hash) => {
            consume_artifact_by_token_hash(&mut tx, token_hash, email).await
        }
    };

    match consumed {
        Ok(true) => {}
        Ok(false) => {
            let _ = tx.rollback().await;
            return (StatusCode::BAD_REQUEST, consume.rejection().to_string()).into_response();
        }
        Err(err) => {
            error!("Failed to consume login artifact: {err}");
            let _ = tx.rollback().await;
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Verification failed".to_string(),
            )
                .into_response();
        }
    }

    let (user_id, role) = match upsert_user(&mut tx, email).await {
        Ok(user) => user,
        Err(err) => {
            error!("Failed to upsert user: {err}");
            let _ = tx.rollback().await;
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Verification failed".to_string(),
            )
                .into_response();
        }
    };

    let ttl_seconds = auth_state.config().session_ttl_seconds();
    let token = match insert_session(&mut tx, user_id, ttl_seconds).await {
        Ok(token) => token,
        Err(err) => {
            error!("Failed to insert session: {err}");
            let _ = tx.rollback().await;
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Verification failed".to_string(),
            )
                .into_response();
        }
    };

    if let Err(err) = tx.commit().await {
        error!("Failed to commit verification transaction: {err}");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Verification failed".to_string(),
        )
            .into_response();
    }

    let mut response_headers = HeaderMap::new();
    if let Ok(cookie) = session_cookie(auth_state, &token) {
        response_headers.insert(SET_COOKIE, cookie);
    }

    let response = SessionResponse {
        user_id: user_id.to_string(),
        email: email.to_string(),
        role,
    };
    (StatusCode::OK, response_headers, Json(response)).into_response()
}

#[cfg(test)]
mod tests {
    use super::super::rate_limit::NoopRateLimiter;
    use super::super::state::{AuthConfig, AuthState};
    use super::{verify_otp, verify_token, VerifyOtpRequest, VerifyTokenRequest};
    use anyhow::Result;
    use axum::extract::Extension;
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use axum::Json;
    use sqlx::postgres::PgPoolOptions;
    use std::sync::Arc;

    fn auth_state() -> Arc<AuthState> {
        let config = AuthConfig::new("https://invest.vitrino.dev".to_string());
        Arc::new(AuthState::new(config, Arc::new(NoopRateLimiter)))
    }

    #[tokio::test]
    async fn verify_otp_missing_payload() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = verify_otp(HeaderMap::new(), Extension(pool), Extension(auth_state()), None)
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn verify_otp_rejects_short_code() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = verify_otp(
            HeaderMap::new(),
            Extension(pool),
            Extension(auth_state()),
            Some(Json(VerifyOtpRequest {
                email: "investor@example.com".to_string(),
                code: "123".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn verify_token_rejects_unknown_type() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = verify_token(
            HeaderMap::new(),
            Extension(pool),
            Extension(auth_state()),
            Some(Json(VerifyTokenRequest {
                token_hash: "abc".to_string(),
                kind: "recovery".to_string(),
                email: "investor@example.com".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn verify_token_rejects_bad_hash_encoding() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = verify_token(
            HeaderMap::new(),
            Extension(pool),
            Extension(auth_state()),
            Some(Json(VerifyTokenRequest {
                token_hash: "not/base64url!".to_string(),
                kind: "magiclink".to_string(),
                email: "investor@example.com".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }
}
