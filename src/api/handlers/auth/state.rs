//! Auth state and configuration.

use std::str::FromStr;
use std::sync::Arc;

use super::rate_limit::RateLimiter;

const DEFAULT_MAGIC_LINK_TTL_SECONDS: i64 = 24 * 60 * 60;
const DEFAULT_ISSUE_COOLDOWN_SECONDS: i64 = 60;
const DEFAULT_SESSION_TTL_SECONDS: i64 = 12 * 60 * 60;

/// What the sign-in email carries. Historical revisions of the portal
/// shipped link-only, code-only, and combined emails; the variant is a
/// deployment choice, `Both` being the documented default.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MagicLinkDelivery {
    Both,
    LinkOnly,
    CodeOnly,
}

impl MagicLinkDelivery {
    #[must_use]
    pub fn includes_link(self) -> bool {
        matches!(self, Self::Both | Self::LinkOnly)
    }

    #[must_use]
    pub fn includes_code(self) -> bool {
        matches!(self, Self::Both | Self::CodeOnly)
    }
}

impl FromStr for MagicLinkDelivery {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "both" => Ok(Self::Both),
            "link" => Ok(Self::LinkOnly),
            "code" => Ok(Self::CodeOnly),
            other => Err(format!("invalid magic link delivery: {other}")),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AuthConfig {
    frontend_base_url: String,
    magic_link_ttl_seconds: i64,
    issue_cooldown_seconds: i64,
    session_ttl_seconds: i64,
    delivery: MagicLinkDelivery,
}

impl AuthConfig {
    #[must_use]
    pub fn new(frontend_base_url: String) -> Self {
        Self {
            frontend_base_url,
            magic_link_ttl_seconds: DEFAULT_MAGIC_LINK_TTL_SECONDS,
            issue_cooldown_seconds: DEFAULT_ISSUE_COOLDOWN_SECONDS,
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            delivery: MagicLinkDelivery::Both,
        }
    }

    #[must_use]
    pub fn with_magic_link_ttl_seconds(mut self, seconds: i64) -> Self {
        self.magic_link_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_issue_cooldown_seconds(mut self, seconds: i64) -> Self {
        self.issue_cooldown_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_delivery(mut self, delivery: MagicLinkDelivery) -> Self {
        self.delivery = delivery;
        self
    }

    pub(crate) fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    pub(super) fn magic_link_ttl_seconds(&self) -> i64 {
        self.magic_link_ttl_seconds
    }

    pub(super) fn issue_cooldown_seconds(&self) -> i64 {
        self.issue_cooldown_seconds
    }

    pub(super) fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }

    pub(super) fn delivery(&self) -> MagicLinkDelivery {
        self.delivery
    }

    pub(super) fn session_cookie_secure(&self) -> bool {
        self.frontend_base_url.starts_with("https://")
    }
}

pub struct AuthState {
    config: AuthConfig,
    rate_limiter: Arc<dyn RateLimiter>,
}

impl AuthState {
    pub fn new(config: AuthConfig, rate_limiter: Arc<dyn RateLimiter>) -> Self {
        Self {
            config,
            rate_limiter,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub(super) fn rate_limiter(&self) -> &dyn RateLimiter {
        self.rate_limiter.as_ref()
    }
}
