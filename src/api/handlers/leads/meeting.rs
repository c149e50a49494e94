//! Meeting request endpoint.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;

use crate::api::handlers::auth::session::authenticate_session;

use super::storage::insert_meeting_request;
use super::types::{LeadCreatedResponse, MeetingRequestPayload};
use super::LeadsConfig;

/// Save a meeting request and hand back the external scheduling page.
///
/// The record is saved regardless of what the caller does with the
/// scheduling page. Sign-in is optional; a present session attributes the
/// request to the user.
#[utoipa::path(
    post,
    path = "/v1/leads/meeting-requests",
    request_body = MeetingRequestPayload,
    responses(
        (status = 201, description = "Meeting request saved", body = LeadCreatedResponse),
        (status = 400, description = "Validation failed", body = String)
    ),
    tag = "leads"
)]
pub async fn create_meeting_request(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    leads_config: Extension<Arc<LeadsConfig>>,
    payload: Option<Json<MeetingRequestPayload>>,
) -> impl IntoResponse {
    let request: MeetingRequestPayload = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    if let Err(message) = request.validate() {
        return (StatusCode::BAD_REQUEST, message).into_response();
    }

    let user_id = match authenticate_session(&headers, &pool).await {
        Ok(record) => record.map(|record| record.user_id),
        Err(status) => return status.into_response(),
    };

    match insert_meeting_request(&pool, user_id, &request).await {
        Ok(id) => {
            let response = LeadCreatedResponse {
                id: id.to_string(),
                scheduling_url: leads_config.scheduling_url().map(ToString::to_string),
            };
            (StatusCode::CREATED, Json(response)).into_response()
        }
        Err(err) => {
            error!("Failed to insert meeting request: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Unable to save request".to_string(),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::LeadsConfig;
    use super::{create_meeting_request, MeetingRequestPayload};
    use anyhow::Result;
    use axum::extract::Extension;
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use axum::Json;
    use sqlx::postgres::PgPoolOptions;
    use std::sync::Arc;

    fn leads_config() -> Arc<LeadsConfig> {
        Arc::new(LeadsConfig::new(Some(
            "https://cal.example/vitrino".to_string(),
        )))
    }

    #[tokio::test]
    async fn meeting_request_missing_payload() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = create_meeting_request(
            HeaderMap::new(),
            Extension(pool),
            Extension(leads_config()),
            None,
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn meeting_request_surfaces_first_validation_error() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = create_meeting_request(
            HeaderMap::new(),
            Extension(pool),
            Extension(leads_config()),
            Some(Json(MeetingRequestPayload {
                company: String::new(),
                email: "not-an-email".to_string(),
                aum: None,
                mandate_type: None,
                cheque_size: None,
                timing: None,
                message: None,
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }
}
