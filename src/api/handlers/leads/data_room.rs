//! Data-room access request endpoint.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use sqlx::PgPool;
use tracing::error;

use crate::api::handlers::auth::session::authenticate_session;

use super::storage::insert_data_room_request;
use super::types::{DataRoomRequestPayload, LeadCreatedResponse};

/// Save a data-room access request.
///
/// The NDA acknowledgement gates the whole operation: without it, nothing is
/// validated further and nothing is written.
#[utoipa::path(
    post,
    path = "/v1/leads/data-room-requests",
    request_body = DataRoomRequestPayload,
    responses(
        (status = 201, description = "Data-room request saved", body = LeadCreatedResponse),
        (status = 400, description = "Validation failed or NDA not acknowledged", body = String)
    ),
    tag = "leads"
)]
pub async fn create_data_room_request(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    payload: Option<Json<DataRoomRequestPayload>>,
) -> impl IntoResponse {
    let request: DataRoomRequestPayload = match payload {
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

    match insert_data_room_request(&pool, user_id, &request).await {
        Ok(id) => {
            let response = LeadCreatedResponse {
                id: id.to_string(),
                scheduling_url: None,
            };
            (StatusCode::CREATED, Json(response)).into_response()
        }
        Err(err) => {
            error!("Failed to insert data room request: {err}");
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
    use super::{create_data_room_request, DataRoomRequestPayload};
    use anyhow::Result;
    use axum::body::to_bytes;
    use axum::extract::Extension;
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use axum::Json;
    use sqlx::postgres::PgPoolOptions;

    fn payload(nda_accepted: bool) -> DataRoomRequestPayload {
        DataRoomRequestPayload {
            company: "Emerging Markets Fund".to_string(),
            role: "Managing Partner".to_string(),
            email: "partner@fund.example".to_string(),
            message: None,
            nda_accepted,
        }
    }

    #[tokio::test]
    async fn data_room_request_missing_payload() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = create_data_room_request(HeaderMap::new(), Extension(pool), None)
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn data_room_request_blocked_without_nda() -> Result<()> {
        // The lazy pool is never reached: the NDA check fails before any
        // database work, so no create-operation can happen.
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response =
            create_data_room_request(HeaderMap::new(), Extension(pool), Some(Json(payload(false))))
                .await
                .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = to_bytes(response.into_body(), 1024).await?;
        assert_eq!(body.as_ref(), b"NDA acknowledgement is required");
        Ok(())
    }
}
