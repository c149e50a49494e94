//! Database helpers for viewer sessions and engagement events.

use anyhow::{Context, Result};
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::types::SECTION_SLUGS;

/// Open a viewer session for an authenticated visit.
pub(super) async fn create_viewer_session(
    pool: &PgPool,
    user_id: Uuid,
    email: &str,
) -> Result<Uuid> {
    let query = r"
        INSERT INTO viewer_sessions (user_id, email)
        VALUES ($1, $2)
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
        .bind(email)
        .fetch_one(pool)
        .instrument(span)
        .await
        .context("failed to create viewer session")?;
    Ok(row.get("id"))
}

/// Owner of an open viewer session, or `None` when the id is unknown/closed.
pub(super) async fn session_owner(pool: &PgPool, session_id: Uuid) -> Result<Option<Uuid>> {
    // user_id can be NULL after a user deletion; such sessions accept no
    // further events.
    let query = r"
        SELECT user_id
        FROM viewer_sessions
        WHERE id = $1
          AND closed_at IS NULL
          AND user_id IS NOT NULL
        LIMIT 1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(session_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup viewer session owner")?;
    Ok(row.map(|row| row.get("user_id")))
}

/// Append one section-view event and refresh the owning session's stats.
///
/// Events are append-only; re-scrolling a section inserts another row.
pub(super) async fn record_section_view(
    pool: &PgPool,
    session_id: Uuid,
    section_slug: &str,
    dwell_time_ms: Option<i64>,
) -> Result<()> {
    let mut tx = pool.begin().await.context("begin section view")?;

    let query = r"
        INSERT INTO section_views (session_id, section_slug, dwell_time_ms)
        VALUES ($1, $2, $3)
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    sqlx::query(query)
        .bind(session_id)
        .bind(section_slug)
        .bind(dwell_time_ms)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to insert section view")?;

    // Dwell time and completion rate roll up on the session as events land;
    // there is no explicit close step for ordinary visits.
    let query = r"
        UPDATE viewer_sessions
        SET last_active_at = NOW(),
            total_dwell_time = total_dwell_time + $2,
            completion_rate = LEAST(
                (
                    SELECT COUNT(DISTINCT section_slug)::real
                    FROM section_views
                    WHERE session_id = $1
                      AND section_slug = ANY($3)
                ) / $4,
                1.0
            )
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let slugs: Vec<String> = SECTION_SLUGS.iter().map(ToString::to_string).collect();
    sqlx::query(query)
        .bind(session_id)
        .bind(dwell_time_ms.unwrap_or(0))
        .bind(&slugs)
        .bind(SECTION_SLUGS.len() as f32)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to update viewer session stats")?;

    tx.commit().await.context("commit section view")?;
    Ok(())
}

/// Append one call-to-action click event.
pub(super) async fn record_cta_click(
    pool: &PgPool,
    session_id: Uuid,
    label: &str,
    action: &str,
) -> Result<()> {
    let mut tx = pool.begin().await.context("begin cta click")?;

    let query = r"
        INSERT INTO cta_clicks (session_id, cta_label, action)
        VALUES ($1, $2, $3)
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    sqlx::query(query)
        .bind(session_id)
        .bind(label)
        .bind(action)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to insert cta click")?;

    let query = r"
        UPDATE viewer_sessions
        SET last_active_at = NOW()
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(session_id)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to touch viewer session")?;

    tx.commit().await.context("commit cta click")?;
    Ok(())
}

/// Close every open viewer session for a user. Called on sign-out.
pub(crate) async fn close_open_sessions(pool: &PgPool, user_id: Uuid) -> Result<()> {
    let query = r"
        UPDATE viewer_sessions
        SET closed_at = NOW()
        WHERE user_id = $1
          AND closed_at IS NULL
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to close viewer sessions")?;
    Ok(())
}
