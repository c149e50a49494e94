use anyhow::{Context, Result};
use clap::{builder::PossibleValuesParser, Arg, Command};

pub const ARG_FRONTEND_BASE_URL: &str = "frontend-base-url";
pub const ARG_MAGIC_LINK_TTL: &str = "magic-link-ttl-seconds";
pub const ARG_MAGIC_LINK_DELIVERY: &str = "magic-link-delivery";
pub const ARG_ISSUE_COOLDOWN: &str = "issue-cooldown-seconds";
pub const ARG_SESSION_TTL: &str = "session-ttl-seconds";
pub const ARG_SCHEDULING_URL: &str = "meeting-scheduling-url";

pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_FRONTEND_BASE_URL)
                .long(ARG_FRONTEND_BASE_URL)
                .help("Frontend base URL used for sign-in links and CORS")
                .env("VITRINO_FRONTEND_BASE_URL")
                .default_value("https://invest.vitrino.dev"),
        )
        .arg(
            Arg::new(ARG_MAGIC_LINK_TTL)
                .long(ARG_MAGIC_LINK_TTL)
                .help("Login artifact TTL in seconds")
                .env("VITRINO_MAGIC_LINK_TTL_SECONDS")
                .default_value("86400")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new(ARG_MAGIC_LINK_DELIVERY)
                .long(ARG_MAGIC_LINK_DELIVERY)
                .help("Sign-in email content: link, code, or both")
                .env("VITRINO_MAGIC_LINK_DELIVERY")
                .default_value("both")
                .value_parser(PossibleValuesParser::new(["both", "link", "code"])),
        )
        .arg(
            Arg::new(ARG_ISSUE_COOLDOWN)
                .long(ARG_ISSUE_COOLDOWN)
                .help("Cooldown before reissuing a sign-in email to the same address")
                .env("VITRINO_ISSUE_COOLDOWN_SECONDS")
                .default_value("60")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL)
                .long(ARG_SESSION_TTL)
                .help("Session cookie TTL in seconds")
                .env("VITRINO_SESSION_TTL_SECONDS")
                .default_value("43200")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new(ARG_SCHEDULING_URL)
                .long(ARG_SCHEDULING_URL)
                .help("External scheduling page returned with meeting requests")
                .env("VITRINO_MEETING_SCHEDULING_URL"),
        )
}

#[derive(Debug)]
pub struct Options {
    pub frontend_base_url: String,
    pub magic_link_ttl_seconds: i64,
    pub magic_link_delivery: String,
    pub issue_cooldown_seconds: i64,
    pub session_ttl_seconds: i64,
    pub scheduling_url: Option<String>,
}

impl Options {
    /// Collect auth options from parsed matches.
    ///
    /// # Errors
    /// Returns an error if a defaulted argument is somehow missing.
    pub fn parse(matches: &clap::ArgMatches) -> Result<Self> {
        Ok(Self {
            frontend_base_url: matches
                .get_one::<String>(ARG_FRONTEND_BASE_URL)
                .cloned()
                .context("missing required argument: --frontend-base-url")?,
            magic_link_ttl_seconds: matches
                .get_one::<i64>(ARG_MAGIC_LINK_TTL)
                .copied()
                .context("missing required argument: --magic-link-ttl-seconds")?,
            magic_link_delivery: matches
                .get_one::<String>(ARG_MAGIC_LINK_DELIVERY)
                .cloned()
                .context("missing required argument: --magic-link-delivery")?,
            issue_cooldown_seconds: matches
                .get_one::<i64>(ARG_ISSUE_COOLDOWN)
                .copied()
                .context("missing required argument: --issue-cooldown-seconds")?,
            session_ttl_seconds: matches
                .get_one::<i64>(ARG_SESSION_TTL)
                .copied()
                .context("missing required argument: --session-ttl-seconds")?,
            scheduling_url: matches.get_one::<String>(ARG_SCHEDULING_URL).cloned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches_for(args: &[&str]) -> clap::ArgMatches {
        let mut argv = vec!["vitrino", "--dsn", "postgres://localhost/vitrino"];
        argv.extend_from_slice(args);
        crate::cli::commands::new().get_matches_from(argv)
    }

    #[test]
    fn defaults_are_applied() {
        temp_env::with_vars(
            [
                ("VITRINO_FRONTEND_BASE_URL", None::<&str>),
                ("VITRINO_MAGIC_LINK_TTL_SECONDS", None),
                ("VITRINO_MAGIC_LINK_DELIVERY", None),
                ("VITRINO_MEETING_SCHEDULING_URL", None),
            ],
            || {
                let options = Options::parse(&matches_for(&[])).expect("options");
                assert_eq!(options.frontend_base_url, "https://invest.vitrino.dev");
                assert_eq!(options.magic_link_ttl_seconds, 86_400);
                assert_eq!(options.magic_link_delivery, "both");
                assert_eq!(options.issue_cooldown_seconds, 60);
                assert_eq!(options.session_ttl_seconds, 43_200);
                assert_eq!(options.scheduling_url, None);
            },
        );
    }

    #[test]
    fn delivery_rejects_unknown_variant() {
        let result = crate::cli::commands::new().try_get_matches_from(vec![
            "vitrino",
            "--dsn",
            "postgres://localhost/vitrino",
            "--magic-link-delivery",
            "carrier-pigeon",
        ]);
        assert_eq!(
            result.map_err(|e| e.kind()),
            Err(clap::error::ErrorKind::InvalidValue)
        );
    }

    #[test]
    fn scheduling_url_is_optional() {
        let options = Options::parse(&matches_for(&[
            "--meeting-scheduling-url",
            "https://cal.example/vitrino",
        ]))
        .expect("options");
        assert_eq!(
            options.scheduling_url.as_deref(),
            Some("https://cal.example/vitrino")
        );
    }
}
