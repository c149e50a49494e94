use anyhow::{Context, Result};
use clap::{Arg, Command};
use secrecy::SecretString;

pub const ARG_EMAIL_FROM: &str = "email-from";
pub const ARG_RESEND_API_KEY: &str = "resend-api-key";

pub fn with_args(command: Command) -> Command {
    let command = command
        .arg(
            Arg::new(ARG_EMAIL_FROM)
                .long(ARG_EMAIL_FROM)
                .help("From header for outbound sign-in emails")
                .env("VITRINO_EMAIL_FROM")
                .default_value("Vitrino <no-reply@vitrino.dev>"),
        )
        .arg(
            Arg::new(ARG_RESEND_API_KEY)
                .long(ARG_RESEND_API_KEY)
                .help("Resend API key; when absent, emails are logged instead of sent")
                .env("VITRINO_RESEND_API_KEY"),
        );
    with_outbox_args(command)
}

fn with_outbox_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("email-outbox-poll-seconds")
                .long("email-outbox-poll-seconds")
                .help("Email outbox poll interval in seconds")
                .env("VITRINO_EMAIL_OUTBOX_POLL_SECONDS")
                .default_value("5")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("email-outbox-batch-size")
                .long("email-outbox-batch-size")
                .help("Email outbox batch size per poll")
                .env("VITRINO_EMAIL_OUTBOX_BATCH_SIZE")
                .default_value("10")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("email-outbox-max-attempts")
                .long("email-outbox-max-attempts")
                .help("Max attempts before marking an email as failed")
                .env("VITRINO_EMAIL_OUTBOX_MAX_ATTEMPTS")
                .default_value("5")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new("email-outbox-backoff-base-seconds")
                .long("email-outbox-backoff-base-seconds")
                .help("Base delay for email outbox retry backoff")
                .env("VITRINO_EMAIL_OUTBOX_BACKOFF_BASE_SECONDS")
                .default_value("5")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("email-outbox-backoff-max-seconds")
                .long("email-outbox-backoff-max-seconds")
                .help("Max delay for email outbox retry backoff")
                .env("VITRINO_EMAIL_OUTBOX_BACKOFF_MAX_SECONDS")
                .default_value("300")
                .value_parser(clap::value_parser!(u64)),
        )
}

#[derive(Debug)]
pub struct Options {
    pub from: String,
    pub resend_api_key: Option<SecretString>,
    pub outbox_poll_seconds: u64,
    pub outbox_batch_size: usize,
    pub outbox_max_attempts: u32,
    pub outbox_backoff_base_seconds: u64,
    pub outbox_backoff_max_seconds: u64,
}

impl Options {
    /// Collect email options from parsed matches.
    ///
    /// # Errors
    /// Returns an error if a defaulted argument is somehow missing.
    pub fn parse(matches: &clap::ArgMatches) -> Result<Self> {
        Ok(Self {
            from: matches
                .get_one::<String>(ARG_EMAIL_FROM)
                .cloned()
                .context("missing required argument: --email-from")?,
            resend_api_key: matches
                .get_one::<String>(ARG_RESEND_API_KEY)
                .map(|key| SecretString::from(key.clone())),
            outbox_poll_seconds: matches
                .get_one::<u64>("email-outbox-poll-seconds")
                .copied()
                .context("missing required argument: --email-outbox-poll-seconds")?,
            outbox_batch_size: matches
                .get_one::<usize>("email-outbox-batch-size")
                .copied()
                .context("missing required argument: --email-outbox-batch-size")?,
            outbox_max_attempts: matches
                .get_one::<u32>("email-outbox-max-attempts")
                .copied()
                .context("missing required argument: --email-outbox-max-attempts")?,
            outbox_backoff_base_seconds: matches
                .get_one::<u64>("email-outbox-backoff-base-seconds")
                .copied()
                .context("missing required argument: --email-outbox-backoff-base-seconds")?,
            outbox_backoff_max_seconds: matches
                .get_one::<u64>("email-outbox-backoff-max-seconds")
                .copied()
                .context("missing required argument: --email-outbox-backoff-max-seconds")?,
        })
    }
}
