//! # Vitrino (Investor Portal Access & Engagement API)
//!
//! `vitrino` is the backend for an invite-only investor portal. It owns the
//! passwordless sign-in flow, viewing-session analytics, and lead capture.
//!
//! ## Authentication (magic link / one-time code)
//!
//! There are no passwords. `POST /v1/auth/magic-link` mints a single-use
//! login artifact (an emailed sign-in link plus a 6-digit code) and delivers
//! it through a transactional email outbox. The artifact can be redeemed
//! either by submitting the code (`/v1/auth/verify-otp`) or by following the
//! link (`/v1/auth/verify-token`); both paths end in the same place, a
//! cookie-backed session. Raw tokens and codes never touch the database,
//! only their SHA-256 hashes. Issuing a new artifact supersedes any live one
//! for the same email, and redemption is single-use.
//!
//! ## Engagement recording
//!
//! Authenticated visits open a viewer session; section views and
//! call-to-action clicks append to it. Event writes are best-effort: a
//! storage failure is logged and never blocks the visitor. Unauthenticated
//! visits record nothing.
//!
//! ## Lead capture
//!
//! Meeting requests and data-room access requests are independent creates,
//! validated before any database work. Data-room requests require an
//! explicit NDA acknowledgement; without it the request is rejected outright.

pub mod api;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
