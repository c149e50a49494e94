//! Sign-in email issuance endpoint.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;

use crate::api::handlers::{normalize_email, valid_email};

use super::rate_limit::{RateLimitAction, RateLimitDecision};
use super::state::AuthState;
use super::storage::{issue_login_artifact, IssueOutcome};
use super::types::{MagicLinkRequest, MagicLinkResponse};
use super::utils::extract_client_ip;

/// Mint a single-use login artifact and email it to the address.
///
/// The response never carries artifact contents; the link and code exist
/// only inside the delivered email. Cooldown hits still answer `{ok: true}`
/// so the endpoint cannot be used to probe for addresses.
#[utoipa::path(
    post,
    path = "/v1/auth/magic-link",
    request_body = MagicLinkRequest,
    responses(
        (status = 200, description = "Sign-in email queued", body = MagicLinkResponse),
        (status = 400, description = "Missing or invalid email", body = String),
        (status = 429, description = "Rate limited", body = String)
    ),
    tag = "auth"
)]
pub async fn magic_link(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<MagicLinkRequest>>,
) -> impl IntoResponse {
    let request: MagicLinkRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let email = normalize_email(&request.email);
    if email.is_empty() {
        return (StatusCode::BAD_REQUEST, "Email is required".to_string()).into_response();
    }
    if !valid_email(&email) {
        return (StatusCode::BAD_REQUEST, "Invalid email".to_string()).into_response();
    }

    let client_ip = extract_client_ip(&headers);
    if auth_state
        .rate_limiter()
        .check_ip(client_ip.as_deref(), RateLimitAction::IssueMagicLink)
        == RateLimitDecision::Limited
    {
        return (StatusCode::TOO_MANY_REQUESTS, "Rate limited".to_string()).into_response();
    }
    if auth_state
        .rate_limiter()
        .check_email(&email, RateLimitAction::IssueMagicLink)
        == RateLimitDecision::Limited
    {
        return (StatusCode::TOO_MANY_REQUESTS, "Rate limited".to_string()).into_response();
    }

    // Fall back to the site root when the caller did not name a destination.
    let redirect_to = request
        .redirect_to
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| auth_state.config().frontend_base_url())
        .to_string();

    match issue_login_artifact(&pool, &email, &redirect_to, auth_state.config()).await {
        Ok(IssueOutcome::Queued | IssueOutcome::Cooldown) => {
            (StatusCode::OK, Json(MagicLinkResponse { ok: true })).into_response()
        }
        Err(err) => {
            error!("Failed to issue login artifact: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Unable to send sign-in email".to_string(),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::rate_limit::NoopRateLimiter;
    use super::super::state::{AuthConfig, AuthState};
    use super::{magic_link, MagicLinkRequest};
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
    async fn magic_link_missing_payload() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = magic_link(HeaderMap::new(), Extension(pool), Extension(auth_state()), None)
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn magic_link_empty_email() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = magic_link(
            HeaderMap::new(),
            Extension(pool),
            Extension(auth_state()),
            Some(Json(MagicLinkRequest {
                email: "  ".to_string(),
                redirect_to: None,
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn magic_link_invalid_email() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = magic_link(
            HeaderMap::new(),
            Extension(pool),
            Extension(auth_state()),
            Some(Json(MagicLinkRequest {
                email: "not-an-email".to_string(),
                redirect_to: None,
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }
}
