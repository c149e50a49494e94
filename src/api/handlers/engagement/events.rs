//! Append-only engagement events: section views and call-to-action clicks.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use sqlx::PgPool;
use tracing::error;
use uuid::Uuid;

use crate::api::handlers::auth::session::authenticate_session;

use super::storage::{record_cta_click, record_section_view, session_owner};
use super::types::{CtaClickRequest, CtaClickResponse, SectionViewRequest};

const MAX_SLUG_LENGTH: usize = 100;
const MAX_LABEL_LENGTH: usize = 200;

/// Record that a deck section became majority-visible.
///
/// No de-duplication: scrolling past a section again re-fires the event,
/// which is the intended engagement signal.
#[utoipa::path(
    post,
    path = "/v1/engagement/section-views",
    request_body = SectionViewRequest,
    responses(
        (status = 202, description = "Event accepted"),
        (status = 400, description = "Malformed event", body = String),
        (status = 401, description = "Not signed in", body = String),
        (status = 404, description = "Unknown viewer session", body = String)
    ),
    tag = "engagement"
)]
pub async fn section_view(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    payload: Option<Json<SectionViewRequest>>,
) -> impl IntoResponse {
    let request: SectionViewRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let slug = request.section_slug.trim();
    if slug.is_empty() || slug.len() > MAX_SLUG_LENGTH {
        return (StatusCode::BAD_REQUEST, "Invalid section slug".to_string()).into_response();
    }

    let session_id = match authorize_event(&headers, &pool, &request.session_id).await {
        Ok(session_id) => session_id,
        Err(response) => return response,
    };

    // Best-effort: a failed write is logged, never surfaced to the visitor.
    if let Err(err) = record_section_view(&pool, session_id, slug, request.dwell_time_ms).await {
        error!("Failed to record section view: {err}");
    }

    StatusCode::ACCEPTED.into_response()
}

/// Record a call-to-action activation and answer with its navigation target.
///
/// The closed `action` variant drives navigation; the free-text label is for
/// reporting only.
#[utoipa::path(
    post,
    path = "/v1/engagement/cta-clicks",
    request_body = CtaClickRequest,
    responses(
        (status = 200, description = "Event accepted", body = CtaClickResponse),
        (status = 400, description = "Malformed event", body = String),
        (status = 401, description = "Not signed in", body = String),
        (status = 404, description = "Unknown viewer session", body = String)
    ),
    tag = "engagement"
)]
pub async fn cta_click(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    payload: Option<Json<CtaClickRequest>>,
) -> impl IntoResponse {
    let request: CtaClickRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let label = request.label.trim();
    if label.is_empty() || label.len() > MAX_LABEL_LENGTH {
        return (StatusCode::BAD_REQUEST, "Invalid label".to_string()).into_response();
    }

    let session_id = match authorize_event(&headers, &pool, &request.session_id).await {
        Ok(session_id) => session_id,
        Err(response) => return response,
    };

    if let Err(err) = record_cta_click(&pool, session_id, label, request.action.as_str()).await {
        error!("Failed to record cta click: {err}");
    }

    // The redirect is computed either way; navigation never waits on storage.
    let response = CtaClickResponse {
        redirect: request.action.redirect().map(ToString::to_string),
    };
    (StatusCode::OK, Json(response)).into_response()
}

/// Shared gate for event writes: the caller must be signed in and must own
/// the open viewer session it is reporting against.
///
/// Unknown and foreign sessions both answer 404 so session ids cannot be
/// probed.
async fn authorize_event(
    headers: &HeaderMap,
    pool: &PgPool,
    session_id: &str,
) -> Result<Uuid, axum::response::Response> {
    let Ok(session_id) = session_id.parse::<Uuid>() else {
        return Err(
            (StatusCode::BAD_REQUEST, "Invalid session id".to_string()).into_response()
        );
    };

    let record = match authenticate_session(headers, pool).await {
        Ok(Some(record)) => record,
        Ok(None) => {
            return Err((StatusCode::UNAUTHORIZED, "Not signed in".to_string()).into_response())
        }
        Err(status) => return Err(status.into_response()),
    };

    match session_owner(pool, session_id).await {
        Ok(Some(owner)) if owner == record.user_id => Ok(session_id),
        Ok(_) => Err(
            (StatusCode::NOT_FOUND, "Unknown viewer session".to_string()).into_response()
        ),
        Err(err) => {
            error!("Failed to authorize event: {err}");
            Err(StatusCode::INTERNAL_SERVER_ERROR.into_response())
        }
    }
}
