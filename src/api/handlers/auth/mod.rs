//! Passwordless auth handlers and supporting modules.
//!
//! Sign-in is a two-step handshake: `/v1/auth/magic-link` mints a single-use
//! login artifact (emailed link + 6-digit code), and either
//! `/v1/auth/verify-otp` or `/v1/auth/verify-token` redeems it for a
//! cookie-backed session.
//!
//! ## Artifact invariants
//!
//! - Only SHA-256 hashes of tokens and codes are stored; raw values exist
//!   solely inside the delivered email.
//! - Issuing a new artifact supersedes any live one for the same email.
//! - Redemption is single-use: the consuming `UPDATE` filters on
//!   `consumed_at IS NULL`, so a second presentation of the same code or
//!   link fails.
//!
//! The first successful verification creates the user identity (role
//! `viewer`). Sign-out deletes the auth session and closes any open viewer
//! sessions for the user.

pub mod magic_link;
mod rate_limit;
pub mod session;
mod state;
mod storage;
pub(crate) mod types;
mod utils;
pub mod verify;

pub use rate_limit::NoopRateLimiter;
pub use state::{AuthConfig, AuthState, MagicLinkDelivery};
