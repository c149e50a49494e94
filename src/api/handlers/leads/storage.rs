//! Database helpers for lead capture.

use anyhow::{Context, Result};
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::types::{DataRoomRequestPayload, MeetingRequestPayload};

pub(super) async fn insert_meeting_request(
    pool: &PgPool,
    user_id: Option<Uuid>,
    payload: &MeetingRequestPayload,
) -> Result<Uuid> {
    let query = r"
        INSERT INTO meeting_requests
            (user_id, company, email, aum, mandate_type, cheque_size, timing, message)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(user_id)
        .bind(payload.company.trim())
        .bind(payload.email.trim())
        .bind(payload.aum.as_deref())
        .bind(payload.mandate_type.as_deref())
        .bind(payload.cheque_size.as_deref())
        .bind(payload.timing.as_deref())
        .bind(payload.message.as_deref())
        .fetch_one(pool)
        .instrument(span)
        .await
        .context("failed to insert meeting request")?;
    Ok(row.get("id"))
}

pub(super) async fn insert_data_room_request(
    pool: &PgPool,
    user_id: Option<Uuid>,
    payload: &DataRoomRequestPayload,
) -> Result<Uuid> {
    let query = r"
        INSERT INTO data_room_requests
            (user_id, company, role, email, message, nda_accepted)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(user_id)
        .bind(payload.company.trim())
        .bind(payload.role.trim())
        .bind(payload.email.trim())
        .bind(payload.message.as_deref())
        .bind(payload.nda_accepted)
        .fetch_one(pool)
        .instrument(span)
        .await
        .context("failed to insert data room request")?;
    Ok(row.get("id"))
}
