//! Database helpers for login artifacts and auth sessions.

use anyhow::{anyhow, Context, Result};
use serde_json::json;
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::state::AuthConfig;
use super::utils::{
    build_action_link, encode_token_hash, generate_login_token, generate_otp_code,
    generate_session_token, hash_login_secret, hash_session_token, is_unique_violation,
    MAGIC_LINK_PURPOSE,
};

/// Outcome for an issuance request (the response is `{ok: true}` either way
/// to keep the endpoint opaque against address probing).
#[derive(Debug)]
pub(super) enum IssueOutcome {
    Queued,
    Cooldown,
}

/// Minimal data returned for a valid session cookie.
pub(crate) struct SessionRecord {
    pub(crate) user_id: Uuid,
    pub(crate) email: String,
    pub(crate) role: String,
}

/// Mint one login artifact and enqueue exactly one email, atomically.
///
/// Any live artifact for the same address is superseded in the same
/// transaction, so at most one artifact can ever be redeemed.
pub(super) async fn issue_login_artifact(
    pool: &PgPool,
    email: &str,
    redirect_to: &str,
    config: &AuthConfig,
) -> Result<IssueOutcome> {
    let mut tx = pool.begin().await.context("begin issuance transaction")?;

    if issue_cooldown_active(&mut tx, email, config.issue_cooldown_seconds()).await? {
        tx.commit().await.context("commit issuance cooldown")?;
        return Ok(IssueOutcome::Cooldown);
    }

    let query = r"
        UPDATE login_tokens
        SET superseded_at = NOW()
        WHERE email = $1
          AND consumed_at IS NULL
          AND superseded_at IS NULL
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(email)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to supersede prior login artifacts")?;

    let token = generate_login_token()?;
    let token_hash = hash_login_secret(&token);
    let code = generate_otp_code()?;
    let otp_hash = hash_login_secret(&code);

    let query = r"
        INSERT INTO login_tokens
            (email, token_hash, otp_hash, purpose, expires_at)
        VALUES ($1, $2, $3, $4, NOW() + ($5 * INTERVAL '1 second'))
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    sqlx::query(query)
        .bind(email)
        .bind(&token_hash)
        .bind(&otp_hash)
        .bind(MAGIC_LINK_PURPOSE)
        .bind(config.magic_link_ttl_seconds())
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to insert login artifact")?;

    // The email carries the hash form of the token, never the raw code hash.
    let delivery = config.delivery();
    let mut payload = json!({
        "email": email,
        "valid_minutes": config.magic_link_ttl_seconds() / 60,
    });
    if delivery.includes_link() {
        let action_link = build_action_link(redirect_to, &encode_token_hash(&token_hash), email);
        payload["action_link"] = json!(action_link);
    }
    if delivery.includes_code() {
        payload["code"] = json!(code);
    }
    let payload_text =
        serde_json::to_string(&payload).context("failed to serialize email payload")?;

    let query = r"
        INSERT INTO email_outbox (to_email, template, payload_json)
        VALUES ($1, $2, $3::jsonb)
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    sqlx::query(query)
        .bind(email)
        .bind("magic_link")
        .bind(payload_text)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to insert email outbox row")?;

    tx.commit().await.context("commit issuance transaction")?;

    Ok(IssueOutcome::Queued)
}

async fn issue_cooldown_active(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    email: &str,
    cooldown_seconds: i64,
) -> Result<bool> {
    // Cooldown prevents repeated issuance requests from spamming the outbox.
    let query = r"
        SELECT 1
        FROM login_tokens
        WHERE email = $1
          AND created_at > NOW() - ($2 * INTERVAL '1 second')
        LIMIT 1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .bind(cooldown_seconds)
        .fetch_optional(&mut **tx)
        .instrument(span)
        .await
        .context("failed to check issuance cooldown")?;
    Ok(row.is_some())
}

/// Consume the live artifact matching an emailed 6-digit code.
///
/// The filter on `consumed_at IS NULL` makes redemption single-use: the
/// first call wins, a replay of the same code matches nothing.
pub(super) async fn consume_artifact_by_otp(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    email: &str,
    otp_hash: &[u8],
) -> Result<bool> {
    let query = r"
        UPDATE login_tokens
        SET consumed_at = NOW()
        WHERE email = $1
          AND otp_hash = $2
          AND consumed_at IS NULL
          AND superseded_at IS NULL
          AND expires_at > NOW()
        RETURNING id
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .bind(otp_hash)
        .fetch_optional(&mut **tx)
        .instrument(span)
        .await
        .context("failed to consume one-time code")?;
    Ok(row.is_some())
}

/// Consume the live artifact matching a link's token hash.
pub(super) async fn consume_artifact_by_token_hash(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    token_hash: &[u8],
    email: &str,
) -> Result<bool> {
    let query = r"
        UPDATE login_tokens
        SET consumed_at = NOW()
        WHERE token_hash = $1
          AND email = $2
          AND consumed_at IS NULL
          AND superseded_at IS NULL
          AND expires_at > NOW()
        RETURNING id
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(token_hash)
        .bind(email)
        .fetch_optional(&mut **tx)
        .instrument(span)
        .await
        .context("failed to consume login token")?;
    Ok(row.is_some())
}

/// Create the user on first verification; later verifications only touch
/// `updated_at`. The identifier is immutable once created.
pub(super) async fn upsert_user(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    email: &str,
) -> Result<(Uuid, String)> {
    let query = r"
        INSERT INTO users (email)
        VALUES ($1)
        ON CONFLICT (email) DO UPDATE SET updated_at = NOW()
        RETURNING id, role::text AS role
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .fetch_one(&mut **tx)
        .instrument(span)
        .await
        .context("failed to upsert user")?;
    Ok((row.get("id"), row.get("role")))
}

pub(super) async fn insert_session(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user_id: Uuid,
    ttl_seconds: i64,
) -> Result<String> {
    // Generate a random token, store only its hash, and return the raw value
    // so the caller can set the session cookie.
    let token = generate_session_token()?;
    let token_hash = hash_session_token(&token);

    let query = r"
        INSERT INTO user_sessions (user_id, session_hash, expires_at)
        VALUES ($1, $2, NOW() + ($3 * INTERVAL '1 second'))
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(user_id)
        .bind(token_hash)
        .bind(ttl_seconds)
        .execute(&mut **tx)
        .instrument(span)
        .await;

    match result {
        Ok(_) => Ok(token),
        Err(err) if is_unique_violation(&err) => {
            Err(anyhow!("session token collision, retry sign-in"))
        }
        Err(err) => Err(err).context("failed to insert session"),
    }
}

pub(crate) async fn lookup_session(
    pool: &PgPool,
    token_hash: &[u8],
) -> Result<Option<SessionRecord>> {
    // Only accept unexpired sessions.
    let query = r"
        SELECT users.id, users.email, users.role::text AS role
        FROM user_sessions
        JOIN users ON users.id = user_sessions.user_id
        WHERE user_sessions.session_hash = $1
          AND user_sessions.expires_at > NOW()
        LIMIT 1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(token_hash)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup session")?;

    if row.is_none() {
        return Ok(None);
    }

    // Record activity for audit/visibility without extending the session TTL.
    let query = r"
        UPDATE user_sessions
        SET last_seen_at = NOW()
        WHERE session_hash = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(token_hash)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to update session last_seen_at")?;

    Ok(row.map(|row| SessionRecord {
        user_id: row.get("id"),
        email: row.get("email"),
        role: row.get("role"),
    }))
}

pub(super) async fn delete_session(pool: &PgPool, token_hash: &[u8]) -> Result<()> {
    // Logout is idempotent; it's fine if no rows are deleted.
    let query = "DELETE FROM user_sessions WHERE session_hash = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(token_hash)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to delete session")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{IssueOutcome, SessionRecord};
    use uuid::Uuid;

    #[test]
    fn issue_outcome_debug_names() {
        assert_eq!(format!("{:?}", IssueOutcome::Queued), "Queued");
        assert_eq!(format!("{:?}", IssueOutcome::Cooldown), "Cooldown");
    }

    #[test]
    fn session_record_holds_values() {
        let record = SessionRecord {
            user_id: Uuid::nil(),
            email: "investor@example.com".to_string(),
            role: "viewer".to_string(),
        };
        assert_eq!(record.user_id, Uuid::nil());
        assert_eq!(record.email, "investor@example.com");
        assert_eq!(record.role, "viewer");
    }
}
