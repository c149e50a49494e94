//! API handlers and shared utilities.
//!
//! This module organizes the service's route handlers: passwordless auth,
//! engagement recording, and lead capture, plus `/` and `/health`.

pub mod auth;
pub mod engagement;
pub mod health;
pub mod leads;
pub mod root;

use regex::Regex;

/// Normalize an email for lookup/uniqueness checks.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Lightweight email sanity check used before persisting data.
pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}
