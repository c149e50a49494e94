//! Request/response types for engagement endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Deck sections the completion rate is measured against.
pub(super) const SECTION_SLUGS: [&str; 12] = [
    "market",
    "global-comparison",
    "how-it-works",
    "products",
    "tokenomics",
    "investment",
    "growth",
    "competitive",
    "roadmap",
    "team",
    "risks",
    "closing",
];

/// What a call-to-action does, as a closed set.
///
/// The label on the button is free text for reporting; navigation is driven
/// by this variant so renaming a button never changes behavior.
#[derive(ToSchema, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    ScheduleMeeting,
    RequestDataRoom,
    OpenFinancials,
    Other,
}

impl ActionKind {
    /// Client-side route the action navigates to, when it navigates at all.
    #[must_use]
    pub fn redirect(self) -> Option<&'static str> {
        match self {
            Self::ScheduleMeeting => Some("/meeting"),
            Self::RequestDataRoom => Some("/request-access"),
            Self::OpenFinancials => Some("/financials"),
            Self::Other => None,
        }
    }

    pub(super) fn as_str(self) -> &'static str {
        match self {
            Self::ScheduleMeeting => "schedule_meeting",
            Self::RequestDataRoom => "request_data_room",
            Self::OpenFinancials => "open_financials",
            Self::Other => "other",
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct CreateSessionResponse {
    pub id: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SectionViewRequest {
    pub session_id: String,
    pub section_slug: String,
    pub dwell_time_ms: Option<i64>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct CtaClickRequest {
    pub session_id: String,
    pub label: String,
    pub action: ActionKind,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct CtaClickResponse {
    pub redirect: Option<String>,
}
