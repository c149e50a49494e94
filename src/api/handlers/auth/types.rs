//! Request/response types for auth endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct MagicLinkRequest {
    pub email: String,
    /// Where the emailed link lands; defaults to the frontend base URL.
    pub redirect_to: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct MagicLinkResponse {
    pub ok: bool,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct VerifyOtpRequest {
    pub email: String,
    pub code: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct VerifyTokenRequest {
    /// Base64url token hash lifted from the link fragment.
    pub token_hash: String,
    /// Type discriminator from the link fragment; must be `magiclink`.
    #[serde(rename = "type")]
    pub kind: String,
    pub email: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SessionResponse {
    pub user_id: String,
    pub email: String,
    pub role: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result};

    #[test]
    fn magic_link_request_round_trips() -> Result<()> {
        let request = MagicLinkRequest {
            email: "investor@example.com".to_string(),
            redirect_to: None,
        };
        let value = serde_json::to_value(&request)?;
        let email = value
            .get("email")
            .and_then(serde_json::Value::as_str)
            .context("missing email")?;
        assert_eq!(email, "investor@example.com");
        let decoded: MagicLinkRequest = serde_json::from_value(value)?;
        assert_eq!(decoded.redirect_to, None);
        Ok(())
    }

    #[test]
    fn verify_token_request_uses_type_field() -> Result<()> {
        let decoded: VerifyTokenRequest = serde_json::from_value(serde_json::json!({
            "token_hash": "abc",
            "type": "magiclink",
            "email": "investor@example.com",
        }))?;
        assert_eq!(decoded.kind, "magiclink");
        assert_eq!(decoded.token_hash, "abc");
        Ok(())
    }

    #[test]
    fn session_response_round_trips() -> Result<()> {
        let response = SessionResponse {
            user_id: "00000000-0000-0000-0000-000000000000".to_string(),
            email: "investor@example.com".to_string(),
            role: "viewer".to_string(),
        };
        let value = serde_json::to_value(&response)?;
        let decoded: SessionResponse = serde_json::from_value(value)?;
        assert_eq!(decoded.role, "viewer");
        Ok(())
    }
}
