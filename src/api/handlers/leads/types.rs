//! Request/response types and field validation for lead endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::handlers::valid_email;

const MAX_FIELD_LENGTH: usize = 200;
const MAX_MESSAGE_LENGTH: usize = 2000;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct MeetingRequestPayload {
    pub company: String,
    pub email: String,
    pub aum: Option<String>,
    pub mandate_type: Option<String>,
    pub cheque_size: Option<String>,
    pub timing: Option<String>,
    pub message: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct DataRoomRequestPayload {
    pub company: String,
    pub role: String,
    pub email: String,
    pub message: Option<String>,
    pub nda_accepted: bool,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LeadCreatedResponse {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduling_url: Option<String>,
}

fn required(field: &str, value: &str) -> Result<(), String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(format!("{field} is required"));
    }
    if trimmed.len() > MAX_FIELD_LENGTH {
        return Err(format!("{field} is too long"));
    }
    Ok(())
}

fn bounded(field: &str, value: Option<&str>, max: usize) -> Result<(), String> {
    match value {
        Some(value) if value.len() > max => Err(format!("{field} is too long")),
        _ => Ok(()),
    }
}

impl MeetingRequestPayload {
    /// Shape validation; the first failure is what the caller sees.
    pub(super) fn validate(&self) -> Result<(), String> {
        required("company", &self.company)?;
        required("email", &self.email)?;
        if !valid_email(self.email.trim()) {
            return Err("email is invalid".to_string());
        }
        bounded("aum", self.aum.as_deref(), MAX_FIELD_LENGTH)?;
        bounded("mandate_type", self.mandate_type.as_deref(), MAX_FIELD_LENGTH)?;
        bounded("cheque_size", self.cheque_size.as_deref(), MAX_FIELD_LENGTH)?;
        bounded("timing", self.timing.as_deref(), MAX_FIELD_LENGTH)?;
        bounded("message", self.message.as_deref(), MAX_MESSAGE_LENGTH)?;
        Ok(())
    }
}

impl DataRoomRequestPayload {
    /// Shape validation; the NDA acknowledgement is a hard requirement, not
    /// a warning.
    pub(super) fn validate(&self) -> Result<(), String> {
        if !self.nda_accepted {
            return Err("NDA acknowledgement is required".to_string());
        }
        required("company", &self.company)?;
        required("role", &self.role)?;
        required("email", &self.email)?;
        if !valid_email(self.email.trim()) {
            return Err("email is invalid".to_string());
        }
        bounded("message", self.message.as_deref(), MAX_MESSAGE_LENGTH)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meeting() -> MeetingRequestPayload {
        MeetingRequestPayload {
            company: "Emerging Markets Fund".to_string(),
            email: "partner@fund.example".to_string(),
            aum: Some("$50M-$250M".to_string()),
            mandate_type: Some("Fintech".to_string()),
            cheque_size: Some("$500K-$2M".to_string()),
            timing: Some("3-6months".to_string()),
            message: None,
        }
    }

    fn data_room() -> DataRoomRequestPayload {
        DataRoomRequestPayload {
            company: "Emerging Markets Fund".to_string(),
            role: "Managing Partner".to_string(),
            email: "partner@fund.example".to_string(),
            message: Some("Standard diligence".to_string()),
            nda_accepted: true,
        }
    }

    #[test]
    fn meeting_request_valid() {
        assert_eq!(meeting().validate(), Ok(()));
    }

    #[test]
    fn meeting_request_requires_company() {
        let mut payload = meeting();
        payload.company = "  ".to_string();
        assert_eq!(payload.validate(), Err("company is required".to_string()));
    }

    #[test]
    fn meeting_request_rejects_bad_email() {
        let mut payload = meeting();
        payload.email = "not-an-email".to_string();
        assert_eq!(payload.validate(), Err("email is invalid".to_string()));
    }

    #[test]
    fn meeting_request_bounds_message() {
        let mut payload = meeting();
        payload.message = Some("x".repeat(2001));
        assert_eq!(payload.validate(), Err("message is too long".to_string()));
    }

    #[test]
    fn data_room_request_valid() {
        assert_eq!(data_room().validate(), Ok(()));
    }

    #[test]
    fn data_room_request_blocks_without_nda() {
        let mut payload = data_room();
        payload.nda_accepted = false;
        assert_eq!(
            payload.validate(),
            Err("NDA acknowledgement is required".to_string())
        );
    }

    #[test]
    fn data_room_request_requires_role() {
        let mut payload = data_room();
        payload.role = String::new();
        assert_eq!(payload.validate(), Err("role is required".to_string()));
    }

    #[test]
    fn lead_created_response_omits_missing_scheduling_url() {
        let response = LeadCreatedResponse {
            id: "00000000-0000-0000-0000-000000000000".to_string(),
            scheduling_url: None,
        };
        let value = serde_json::to_value(&response).expect("json");
        assert!(value.get("scheduling_url").is_none());
    }
}
