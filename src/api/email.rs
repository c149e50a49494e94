//! Email outbox worker and delivery abstractions.
//!
//! Sign-in issuance enqueues rows in `email_outbox` with status `pending`.
//! A background task periodically polls that table, locks a batch via
//! `FOR UPDATE SKIP LOCKED`, and hands each row to an `EmailSender`.
//! The sender decides how to deliver (provider API, log, etc.) and returns
//! `Ok`/`Err`. The worker then updates the outbox row to `sent` or schedules
//! a retry.
//!
//! ### Consistency & Scalability
//!
//! This is a lightweight transactional outbox (DB-backed queue): minting a
//! login artifact and enqueuing its email commit atomically, so a caller is
//! never told "sent" while nothing was recorded, and a minted artifact is
//! never silently delivered twice.
//!
//! - **Retries:** Failed rows are retried with exponential backoff and jitter
//!   until a max attempt threshold is reached, then marked `failed`.
//! - **Throughput:** For current scale, the DB outbox keeps infrastructure
//!   minimal. A broker-backed `EmailSender` can replace it without touching
//!   the issuance path.
//!
//! The default sender when no API key is configured is `LogSender`, which
//! logs and returns `Ok(())`. Poll interval and retry/backoff settings are
//! configurable via `EmailWorkerConfig`.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use rand::Rng;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use sqlx::{PgPool, Row};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

const RESEND_API_URL: &str = "https://api.resend.com/emails";

#[derive(Clone, Debug)]
pub struct EmailMessage {
    pub to_email: String,
    pub template: String,
    pub payload_json: String,
}

/// Email delivery abstraction used by the outbox worker.
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Deliver a message or return an error to schedule a retry.
    async fn send(&self, message: &EmailMessage) -> Result<()>;
}

/// Local dev sender that logs the payload instead of sending real email.
#[derive(Clone, Debug)]
pub struct LogSender;

#[async_trait]
impl EmailSender for LogSender {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        info!(
            to_email = %message.to_email,
            template = %message.template,
            payload = %message.payload_json,
            "email outbox send stub"
        );
        Ok(())
    }
}

/// Sender backed by the Resend transactional email API.
pub struct ResendSender {
    client: Client,
    from: String,
    api_key: SecretString,
}

impl ResendSender {
    /// Build a sender with the crate user agent.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(from: String, api_key: SecretString) -> Result<Self> {
        let client = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .build()
            .context("failed to build email HTTP client")?;
        Ok(Self {
            client,
            from,
            api_key,
        })
    }
}

#[async_trait]
impl EmailSender for ResendSender {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        let rendered = render_template(&message.template, &message.payload_json)?;

        let body = json!({
            "from": self.from,
            "to": [message.to_email],
            "subject": rendered.subject,
            "html": rendered.html,
        });

        let response = self
            .client
            .post(RESEND_API_URL)
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .context("email provider request failed")?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let detail = response.text().await.unwrap_or_default();
            Err(anyhow!("email provider returned {status}: {detail}"))
        }
    }
}

pub(crate) struct RenderedEmail {
    pub(crate) subject: String,
    pub(crate) html: String,
}

/// Render an outbox row into a subject and HTML body.
///
/// # Errors
/// Returns an error for unknown templates or malformed payloads.
pub(crate) fn render_template(template: &str, payload_json: &str) -> Result<RenderedEmail> {
    match template {
        "magic_link" => {
            let payload: Value =
                serde_json::from_str(payload_json).context("malformed email payload")?;
            Ok(render_magic_link(&payload))
        }
        other => Err(anyhow!("unknown email template: {other}")),
    }
}

fn render_magic_link(payload: &Value) -> RenderedEmail {
    let action_link = payload.get("action_link").and_then(Value::as_str);
    let code = payload.get("code").and_then(Value::as_str);
    let valid_minutes = payload
        .get("valid_minutes")
        .and_then(Value::as_i64)
        .unwrap_or(60);
    let validity = if valid_minutes >= 60 && valid_minutes % 60 == 0 {
        let hours = valid_minutes / 60;
        if hours == 1 {
            "1 hour".to_string()
        } else {
            format!("{hours} hours")
        }
    } else {
        format!("{valid_minutes} minutes")
    };

    let mut content = String::new();
    if let Some(link) = action_link {
        content.push_str(&format!(
            r#"<div style="text-align: center; margin: 30px 0;">
  <a href="{link}" class="button">Sign In</a>
</div>
"#
        ));
    }
    if let Some(code) = code {
        content.push_str(&format!(
            r#"<div class="code-box">
  <p style="margin: 0 0 8px 0; color: #6b7280; font-size: 14px;">Or use this verification code:</p>
  <div class="code">{code}</div>
</div>
"#
        ));
    }

    let html = format!(
        r#"<!DOCTYPE html>
<html>
  <head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <style>
      body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; margin: 0; padding: 0; background-color: #f5f5f5; }}
      .container {{ max-width: 600px; margin: 40px auto; background: white; border-radius: 8px; overflow: hidden; }}
      .content {{ padding: 40px 30px; }}
      .title {{ color: #1f2937; font-size: 24px; margin: 0 0 20px 0; }}
      .text {{ color: #6b7280; font-size: 16px; line-height: 1.6; margin: 0 0 30px 0; }}
      .button {{ display: inline-block; background: #10b981; color: white; text-decoration: none; padding: 14px 32px; border-radius: 6px; font-weight: 600; font-size: 16px; }}
      .code-box {{ background: #f9fafb; border: 1px solid #e5e7eb; border-radius: 6px; padding: 16px; text-align: center; margin: 20px 0; }}
      .code {{ font-family: monospace; font-size: 20px; font-weight: bold; color: #10b981; letter-spacing: 2px; }}
      .footer {{ background: #f9fafb; padding: 30px; text-align: center; color: #9ca3af; font-size: 14px; }}
    </style>
  </head>
  <body>
    <div class="container">
      <div class="content">
        <h2 class="title">Sign in to Investor Access</h2>
        <p class="text">Use the option below to securely sign in to the investor portal. Valid for {validity}.</p>
{content}
        <p class="text" style="font-size: 14px; margin-top: 30px;">If you didn't request this email, you can safely ignore it.</p>
      </div>
      <div class="footer">
        <p style="margin: 0;">Private investor pitch &bull; Invite-only access</p>
      </div>
    </div>
  </body>
</html>
"#
    );

    RenderedEmail {
        subject: "Sign in to Investor Access".to_string(),
        html,
    }
}

#[derive(Clone, Copy, Debug)]
pub struct EmailWorkerConfig {
    poll_interval: Duration,
    batch_size: usize,
    max_attempts: u32,
    backoff_base: Duration,
    backoff_max: Duration,
}

impl EmailWorkerConfig {
    /// Default worker config: 5s poll interval, 10 messages per batch,
    /// 5 max attempts, and 5s->5m exponential backoff with jitter.
    #[must_use]
    pub fn new() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            batch_size: 10,
            max_attempts: 5,
            backoff_base: Duration::from_secs(5),
            backoff_max: Duration::from_secs(300),
        }
    }

    #[must_use]
    pub fn with_poll_interval_seconds(mut self, seconds: u64) -> Self {
        self.poll_interval = Duration::from_secs(seconds);
        self
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    #[must_use]
    pub fn with_backoff_base_seconds(mut self, seconds: u64) -> Self {
        self.backoff_base = Duration::from_secs(seconds);
        self
    }

    #[must_use]
    pub fn with_backoff_max_seconds(mut self, seconds: u64) -> Self {
        self.backoff_max = Duration::from_secs(seconds);
        self
    }

    #[must_use]
    pub fn normalize(self) -> Self {
        let poll_interval = if self.poll_interval.is_zero() {
            Duration::from_secs(1)
        } else {
            self.poll_interval
        };
        let batch_size = if self.batch_size == 0 {
            1
        } else {
            self.batch_size
        };
        let max_attempts = self.max_attempts.max(1);
        let backoff_base = if self.backoff_base.is_zero() {
            Duration::from_secs(1)
        } else {
            self.backoff_base
        };
        let backoff_max = if self.backoff_max < backoff_base {
            backoff_base
        } else {
            self.backoff_max
        };
        Self {
            poll_interval,
            batch_size,
            max_attempts,
            backoff_base,
            backoff_max,
        }
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    #[must_use]
    pub fn backoff_base(&self) -> Duration {
        self.backoff_base
    }

    #[must_use]
    pub fn backoff_max(&self) -> Duration {
        self.backoff_max
    }
}

impl Default for EmailWorkerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawn a background task that polls and processes the email outbox.
pub fn spawn_outbox_worker(
    pool: PgPool,
    sender: Arc<dyn EmailSender>,
    config: EmailWorkerConfig,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let config = config.normalize();
        let poll_interval = config.poll_interval();

        loop {
            // Poll the outbox table on a fixed cadence; sender handles delivery or logging.
            let batch_result = process_outbox_batch(&pool, sender.as_ref(), &config).await;
            if let Err(err) = batch_result {
                error!("email outbox batch failed: {err}");
            }

            sleep(poll_interval).await;
        }
    })
}

async fn process_outbox_batch(
    pool: &PgPool,
    sender: &dyn EmailSender,
    config: &EmailWorkerConfig,
) -> Result<usize> {
    let mut tx = pool
        .begin()
        .await
        .context("failed to start email outbox transaction")?;

    // Grab a locked batch so multiple workers can run without double-sending.
    let query = r"
        SELECT id, to_email, template, payload_json::text AS payload_json, attempts
        FROM email_outbox
        WHERE status = 'pending'
          AND next_attempt_at <= NOW()
        ORDER BY next_attempt_at ASC, created_at ASC
        LIMIT $1
        FOR UPDATE SKIP LOCKED
    ";
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let rows = sqlx::query(query)
        .bind(i64::try_from(config.batch_size()).unwrap_or(0))
        .fetch_all(&mut *tx)
        .instrument(span)
        .await
        .context("failed to load email outbox batch")?;

    if rows.is_empty() {
        // Commit even on empty to release locks and keep poll loop consistent.
        tx.commit()
            .await
            .context("failed to commit empty outbox batch")?;
        return Ok(0);
    }

    let row_count = rows.len();
    for row in rows {
        let id: Uuid = row.get("id");
        let attempts: i32 = row.get("attempts");
        let attempts = u32::try_from(attempts).unwrap_or(0);
        let message = EmailMessage {
            to_email: row.get("to_email"),
            template: row.get("template"),
            payload_json: row.get("payload_json"),
        };

        let send_result = sender.send(&message).await;
        update_outbox_status(&mut tx, id, attempts, send_result, config).await?;
    }

    tx.commit()
        .await
        .context("failed to commit email outbox batch")?;

    Ok(row_count)
}

async fn update_outbox_status(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    id: Uuid,
    attempts: u32,
    send_result: Result<()>,
    config: &EmailWorkerConfig,
) -> Result<()> {
    // Retry failures with exponential backoff and jitter until max_attempts.
    let next_attempt = attempts.saturating_add(1);
    let next_attempts_i32 = i32::try_from(next_attempt).unwrap_or(i32::MAX);
    match send_result {
        Ok(()) => {
            let query = r"
                UPDATE email_outbox
                SET status = 'sent',
                    attempts = $2,
                    last_error = NULL,
                    sent_at = NOW(),
                    next_attempt_at = NOW()
                WHERE id = $1
            ";
            let span = info_span!(
                "db.query",
                db.system = "postgresql",
                db.operation = "UPDATE",
                db.statement = query
            );
            sqlx::query(query)
                .bind(id)
                .bind(next_attempts_i32)
                .execute(&mut **tx)
                .instrument(span)
                .await
                .context("failed to update outbox status to sent")?;
        }
        Err(err) => {
            let max_attempts = config.max_attempts();
            if next_attempt >= max_attempts {
                let query = r"
                    UPDATE email_outbox
                    SET status = 'failed',
                        attempts = $2,
                        last_error = $3,
                        next_attempt_at = NOW()
                    WHERE id = $1
                ";
                let span = info_span!(
                    "db.query",
                    db.system = "postgresql",
                    db.operation = "UPDATE",
                    db.statement = query
                );
                sqlx::query(query)
                    .bind(id)
                    .bind(next_attempts_i32)
                    .bind(err.to_string())
                    .execute(&mut **tx)
                    .instrument(span)
                    .await
                    .context("failed to update outbox status to failed")?;
            } else {
                let delay =
                    backoff_delay(next_attempt, config.backoff_base(), config.backoff_max());
                let delay_ms = i64::try_from(delay.as_millis()).unwrap_or(i64::MAX);
                let query = r"
                    UPDATE email_outbox
                    SET status = 'pending',
                        attempts = $2,
                        last_error = $3,
                        next_attempt_at = NOW() + ($4 * INTERVAL '1 millisecond')
                    WHERE id = $1
                ";
                let span = info_span!(
                    "db.query",
                    db.system = "postgresql",
                    db.operation = "UPDATE",
                    db.statement = query
                );
                sqlx::query(query)
                    .bind(id)
                    .bind(next_attempts_i32)
                    .bind(err.to_string())
                    .bind(delay_ms)
                    .execute(&mut **tx)
                    .instrument(span)
                    .await
                    .context("failed to update outbox retry schedule")?;
            }
        }
    }

    Ok(())
}

fn backoff_delay(attempt: u32, base: Duration, max: Duration) -> Duration {
    let shift = attempt.saturating_sub(1).min(31);
    let factor = 1u32 << shift;
    let delay = base.checked_mul(factor).unwrap_or(max);
    let capped = if delay > max { max } else { delay };
    jitter_delay(capped)
}

fn jitter_delay(delay: Duration) -> Duration {
    let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
    if delay_ms < 2 {
        return delay;
    }
    let half = delay_ms / 2;
    let jitter = rand::thread_rng().gen_range(0..=half);
    Duration::from_millis(half + jitter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn log_sender_always_succeeds() {
        let message = EmailMessage {
            to_email: "investor@example.com".to_string(),
            template: "magic_link".to_string(),
            payload_json: "{}".to_string(),
        };
        assert!(LogSender.send(&message).await.is_ok());
    }

    #[test]
    fn render_rejects_unknown_template() {
        assert!(render_template("password_reset", "{}").is_err());
    }

    #[test]
    fn render_rejects_malformed_payload() {
        assert!(render_template("magic_link", "not-json").is_err());
    }

    #[test]
    fn render_includes_link_and_code_when_present() {
        let payload = serde_json::json!({
            "email": "investor@example.com",
            "action_link": "https://invest.vitrino.dev/#type=magiclink&token_hash=abc&email=investor@example.com",
            "code": "123456",
            "valid_minutes": 1440,
        })
        .to_string();
        let rendered = render_template("magic_link", &payload).expect("rendered");
        assert!(rendered.html.contains("token_hash=abc"));
        assert!(rendered.html.contains("123456"));
        assert!(rendered.html.contains("24 hours"));
        assert_eq!(rendered.subject, "Sign in to Investor Access");
    }

    #[test]
    fn render_code_only_variant_has_no_button() {
        let payload = serde_json::json!({
            "email": "investor@example.com",
            "code": "654321",
            "valid_minutes": 60,
        })
        .to_string();
        let rendered = render_template("magic_link", &payload).expect("rendered");
        assert!(!rendered.html.contains("class=\"button\""));
        assert!(rendered.html.contains("654321"));
        assert!(rendered.html.contains("1 hour"));
    }

    #[test]
    fn worker_config_normalizes_zeroes() {
        let config = EmailWorkerConfig::new()
            .with_poll_interval_seconds(0)
            .with_batch_size(0)
            .with_max_attempts(0)
            .with_backoff_base_seconds(0)
            .with_backoff_max_seconds(0)
            .normalize();
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.batch_size(), 1);
        assert_eq!(config.max_attempts(), 1);
        assert!(config.backoff_max() >= config.backoff_base());
    }

    #[test]
    fn backoff_grows_and_caps() {
        let base = Duration::from_secs(5);
        let max = Duration::from_secs(300);
        let first = backoff_delay(1, base, max);
        let late = backoff_delay(30, base, max);
        assert!(first >= Duration::from_secs(2));
        assert!(first <= base);
        assert!(late <= max);
        assert!(late >= max / 2);
    }
}
