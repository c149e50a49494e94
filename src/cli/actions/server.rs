use crate::api::{
    self,
    email::{EmailSender, EmailWorkerConfig, LogSender, ResendSender},
    handlers::{auth::AuthConfig, auth::MagicLinkDelivery, leads::LeadsConfig},
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::sync::Arc;
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub frontend_base_url: String,
    pub magic_link_ttl_seconds: i64,
    pub magic_link_delivery: String,
    pub issue_cooldown_seconds: i64,
    pub session_ttl_seconds: i64,
    pub scheduling_url: Option<String>,
    pub email_from: String,
    pub resend_api_key: Option<SecretString>,
    pub email_outbox_poll_seconds: u64,
    pub email_outbox_batch_size: usize,
    pub email_outbox_max_attempts: u32,
    pub email_outbox_backoff_base_seconds: u64,
    pub email_outbox_backoff_max_seconds: u64,
}

/// Execute the server action.
///
/// # Errors
/// Returns an error if configuration is invalid or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let delivery: MagicLinkDelivery = args
        .magic_link_delivery
        .parse()
        .map_err(anyhow::Error::msg)
        .context("invalid --magic-link-delivery")?;

    let auth_config = AuthConfig::new(args.frontend_base_url)
        .with_magic_link_ttl_seconds(args.magic_link_ttl_seconds)
        .with_issue_cooldown_seconds(args.issue_cooldown_seconds)
        .with_session_ttl_seconds(args.session_ttl_seconds)
        .with_delivery(delivery);

    let email_config = EmailWorkerConfig::new()
        .with_poll_interval_seconds(args.email_outbox_poll_seconds)
        .with_batch_size(args.email_outbox_batch_size)
        .with_max_attempts(args.email_outbox_max_attempts)
        .with_backoff_base_seconds(args.email_outbox_backoff_base_seconds)
        .with_backoff_max_seconds(args.email_outbox_backoff_max_seconds);

    let sender: Arc<dyn EmailSender> = match args.resend_api_key {
        Some(api_key) => Arc::new(
            ResendSender::new(args.email_from, api_key)
                .context("failed to build email sender")?,
        ),
        None => {
            info!("no email API key configured, sign-in emails will be logged");
            Arc::new(LogSender)
        }
    };

    let leads_config = LeadsConfig::new(args.scheduling_url);

    api::new(
        args.port,
        args.dsn,
        auth_config,
        email_config,
        sender,
        leads_config,
    )
    .await
}
