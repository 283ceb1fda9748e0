//! Sign-up, sign-in and OTP bodies.

use serde::{Deserialize, Serialize};

use crate::types::{OtpPurpose, UserId, UserRole};

/// `POST /api/auth/signup`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    /// `customer` (default) or `admin`.
    #[serde(default)]
    pub role: Option<String>,
}

/// `POST /api/auth/signin`
///
/// `loginId` may be a username, an email address or a phone number.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(alias = "username")]
    pub login_id: String,
    pub password: String,
}

/// `POST /api/auth/refresh`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Issued on successful sign-in, OTP verification or refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JwtResponse {
    #[serde(alias = "token")]
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(rename = "type", default = "bearer")]
    pub token_type: String,
    pub id: UserId,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

fn bearer() -> String {
    "Bearer".to_owned()
}

impl JwtResponse {
    /// Whether the signed-in user holds `ROLE_ADMIN`.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.roles
            .iter()
            .any(|r| r == UserRole::Admin.authority())
    }
}

/// `POST /api/auth/otp/send`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpSendRequest {
    pub phone_number: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(rename = "type", default)]
    pub purpose: Option<OtpPurpose>,
}

/// `POST /api/auth/otp/verify`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpVerifyRequest {
    pub phone_number: String,
    #[serde(default)]
    pub email: Option<String>,
    pub otp: String,
}

/// `POST /api/auth/otp/resend`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpResendRequest {
    pub phone_number: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Result of sending an OTP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpResponse {
    pub success: bool,
    pub message: String,
    #[serde(default)]
    pub masked_phone: Option<String>,
    #[serde(default)]
    pub masked_email: Option<String>,
    #[serde(default)]
    pub expires_in_seconds: Option<i64>,
}

/// Public view of a user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    pub role: UserRole,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_jwt_response_wire_names() {
        let json = r#"{
            "token": "abc",
            "type": "Bearer",
            "id": 4,
            "username": "user_9876543210",
            "email": "user@example.com",
            "roles": ["ROLE_ADMIN"]
        }"#;
        let parsed: JwtResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.access_token, "abc");
        assert!(parsed.refresh_token.is_none());
        assert!(parsed.is_admin());

        let out = serde_json::to_value(&parsed).unwrap();
        assert_eq!(out["accessToken"], "abc");
        assert_eq!(out["type"], "Bearer");
    }

    #[test]
    fn test_login_accepts_username_alias() {
        let parsed: LoginRequest =
            serde_json::from_str(r#"{"username":"asha","password":"pw"}"#).unwrap();
        assert_eq!(parsed.login_id, "asha");
    }

    #[test]
    fn test_otp_send_type_field() {
        let parsed: OtpSendRequest =
            serde_json::from_str(r#"{"phoneNumber":"+919876543210","type":"CHECKOUT"}"#).unwrap();
        assert_eq!(parsed.purpose, Some(OtpPurpose::Checkout));
        assert!(parsed.email.is_none());
    }
}
