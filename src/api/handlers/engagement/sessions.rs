//! Viewer session creation.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use sqlx::PgPool;
use tracing::error;

use crate::api::handlers::auth::session::authenticate_session;

use super::storage::create_viewer_session;
use super::types::CreateSessionResponse;

/// Open one viewer session for the authenticated visit.
///
/// The client calls this once on mount and holds the id in memory; a page
/// reload starts a fresh session rather than resuming one.
#[utoipa::path(
    post,
    path = "/v1/engagement/sessions",
    responses(
        (status = 201, description = "Viewer session created", body = CreateSessionResponse),
        (status = 401, description = "Not signed in", body = String)
    ),
    tag = "engagement"
)]
pub async fn create_session(headers: HeaderMap, pool: Extension<PgPool>) -> impl IntoResponse {
    let record = match authenticate_session(&headers, &pool).await {
        Ok(Some(record)) => record,
        Ok(None) => {
            return (StatusCode::UNAUTHORIZED, "Not signed in".to_string()).into_response()
        }
        Err(status) => return status.into_response(),
    };

    match create_viewer_session(&pool, record.user_id, &record.email).await {
        Ok(id) => (
            StatusCode::CREATED,
            Json(CreateSessionResponse { id: id.to_string() }),
        )
            .into_response(),
        Err(err) => {
            error!("Failed to create viewer session: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Unable to start session".to_string(),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::create_session;
    use anyhow::Result;
    use axum::extract::Extension;
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use sqlx::postgres::PgPoolOptions;

    #[tokio::test]
    async fn create_session_requires_auth() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = create_session(HeaderMap::new(), Extension(pool))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        Ok(())
    }
}
