//! One-time password records.

use chrono::{DateTime, Utc};

use dream_collections_core::{OtpId, OtpPurpose, UserId};

/// A hashed OTP issued to a phone number.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OtpVerification {
    pub id: OtpId,
    pub phone_number: String,
    pub email: Option<String>,
    /// Argon2 PHC string; the code itself is never stored.
    pub otp_hash: String,
    pub attempts: i32,
    pub max_attempts: i32,
    pub purpose: OtpPurpose,
    pub verified: bool,
    pub user_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl OtpVerification {
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    #[must_use]
    pub const fn attempts_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn otp(attempts: i32) -> OtpVerification {
        let now = Utc::now();
        OtpVerification {
            id: OtpId::new(1),
            phone_number: "+919876543210".to_owned(),
            email: None,
            otp_hash: String::new(),
            attempts,
            max_attempts: 5,
            purpose: OtpPurpose::Login,
            verified: false,
            user_id: None,
            created_at: now,
            expires_at: now + Duration::minutes(5),
        }
    }

    #[test]
    fn test_expiry_boundary() {
        let record = otp(0);
        assert!(!record.is_expired(record.expires_at));
        assert!(record.is_expired(record.expires_at + Duration::seconds(1)));
    }

    #[test]
    fn test_attempts_exhausted() {
        assert!(!otp(4).attempts_exhausted());
        assert!(otp(5).attempts_exhausted());
    }
}
