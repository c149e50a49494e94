//! Command-line argument dispatch and server initialization.
//!
//! This module maps validated CLI arguments to the appropriate action, such
//! as starting the API server with its full configuration state.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{auth, email};
use anyhow::{Context, Result};

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;

    let auth_opts = auth::Options::parse(matches)?;
    let email_opts = email::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn,
        frontend_base_url: auth_opts.frontend_base_url,
        magic_link_ttl_seconds: auth_opts.magic_link_ttl_seconds,
        magic_link_delivery: auth_opts.magic_link_delivery,
        issue_cooldown_seconds: auth_opts.issue_cooldown_seconds,
        session_ttl_seconds: auth_opts.session_ttl_seconds,
        scheduling_url: auth_opts.scheduling_url,
        email_from: email_opts.from,
        resend_api_key: email_opts.resend_api_key,
        email_outbox_poll_seconds: email_opts.outbox_poll_seconds,
        email_outbox_batch_size: email_opts.outbox_batch_size,
        email_outbox_max_attempts: email_opts.outbox_max_attempts,
        email_outbox_backoff_base_seconds: email_opts.outbox_backoff_base_seconds,
        email_outbox_backoff_max_seconds: email_opts.outbox_backoff_max_seconds,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::actions::Action;

    #[test]
    fn server_action_carries_cli_values() {
        temp_env::with_vars(
            [
                ("VITRINO_DSN", None::<&str>),
                ("VITRINO_MAGIC_LINK_DELIVERY", None),
            ],
            || {
                let matches = crate::cli::commands::new().get_matches_from(vec![
                    "vitrino",
                    "--dsn",
                    "postgres://localhost/vitrino",
                    "--port",
                    "9000",
                    "--magic-link-delivery",
                    "code",
                ]);
                let action = handler(&matches).expect("action");
                let Action::Server(args) = action;
                assert_eq!(args.port, 9000);
                assert_eq!(args.dsn, "postgres://localhost/vitrino");
                assert_eq!(args.magic_link_delivery, "code");
            },
        );
    }
}
