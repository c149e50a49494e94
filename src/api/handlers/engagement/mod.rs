//! Engagement recording: viewer sessions and append-only events.
//!
//! A viewer session is opened once per authenticated visit and referenced by
//! every event the visit produces; the session id is explicit request state,
//! never ambient. All endpoints require an auth session, which is what
//! guarantees an unauthenticated visit writes nothing.
//!
//! Event writes are best-effort by contract: a failed insert is logged and
//! the endpoint still answers success, because recording must never block
//! navigation or rendering for the visitor.

pub mod events;
pub mod sessions;
pub(crate) mod storage;
pub(crate) mod types;
