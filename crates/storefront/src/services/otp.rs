//! Phone/OTP sign-in.
//!
//! Codes are six random digits, stored as Argon2 hashes, valid for five
//! minutes and five attempts. A phone number may request at most five codes
//! per fifteen minutes. Delivery goes through [`OtpSender`]; the bundled
//! [`LoggingOtpSender`] only writes the code to the log.

use chrono::{Duration, Utc};
use rand::Rng;
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use dream_collections_core::api::{JwtResponse, OtpResponse, OtpSendRequest, OtpVerifyRequest};
use dream_collections_core::{
    Email, EmailError, OtpCode, OtpCodeError, OtpPurpose, PhoneNumber, PhoneNumberError, UserRole,
};

use crate::db::otp::NewOtp;
use crate::db::users::NewUser;
use crate::db::{OtpRepository, RepositoryError, UserRepository};
use crate::models::User;
use crate::services::auth::{self, AuthError, TokenService};

/// How long a code stays valid.
pub const OTP_TTL_SECS: i64 = 300;
/// Wrong guesses allowed per code.
pub const MAX_ATTEMPTS: i32 = 5;
/// Codes a phone number may request per window.
pub const MAX_SENDS_PER_WINDOW: i64 = 5;
/// Length of the send rate-limit window.
pub const SEND_WINDOW_MINUTES: i64 = 15;

/// Domain for the placeholder email of accounts created from a phone number alone.
const GENERATED_EMAIL_DOMAIN: &str = "phone.dreamcollections.in";

#[derive(Debug, Error)]
pub enum OtpError {
    #[error("invalid phone number: {0}")]
    InvalidPhone(#[from] PhoneNumberError),

    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("Invalid OTP")]
    InvalidFormat(#[from] OtpCodeError),

    #[error("Too many OTP requests. Please try again later.")]
    RateLimited,

    #[error("No active OTP found or OTP has expired")]
    NoActiveOtp,

    #[error("Maximum verification attempts exceeded")]
    AttemptsExceeded,

    #[error("OTP has expired")]
    Expired,

    #[error("Invalid OTP")]
    Mismatch,

    #[error("OTP delivery failed: {0}")]
    Delivery(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Delivers a code to the customer.
pub trait OtpSender: Send + Sync {
    /// # Errors
    ///
    /// Returns `OtpError::Delivery` if the code could not be sent.
    fn send(&self, phone: &PhoneNumber, email: Option<&Email>, code: &OtpCode)
    -> Result<(), OtpError>;
}

/// Writes codes to the log instead of sending SMS or email.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingOtpSender;

impl OtpSender for LoggingOtpSender {
    fn send(
        &self,
        phone: &PhoneNumber,
        email: Option<&Email>,
        code: &OtpCode,
    ) -> Result<(), OtpError> {
        tracing::info!(phone = %phone.masked(), otp = code.as_str(), "SMS OTP sent");
        if let Some(email) = email {
            tracing::info!(email = %email.masked(), otp = code.as_str(), "Email OTP sent");
        }
        Ok(())
    }
}

pub struct OtpService<'a> {
    otps: OtpRepository<'a>,
    users: UserRepository<'a>,
    tokens: &'a TokenService,
    sender: &'a dyn OtpSender,
}

impl<'a> OtpService<'a> {
    #[must_use]
    pub fn new(pool: &'a PgPool, tokens: &'a TokenService, sender: &'a dyn OtpSender) -> Self {
        Self {
            otps: OtpRepository::new(pool),
            users: UserRepository::new(pool),
            tokens,
            sender,
        }
    }

    /// Issue and deliver a new code, retiring any code still active.
    ///
    /// # Errors
    ///
    /// Returns `OtpError::RateLimited` after too many sends in the window,
    /// or a validation, delivery or database error.
    #[instrument(skip(self, req), fields(phone = %mask_raw(&req.phone_number)))]
    pub async fn send(&self, req: &OtpSendRequest) -> Result<OtpResponse, OtpError> {
        let phone = PhoneNumber::parse(&req.phone_number)?;
        let email = parse_optional_email(req.email.as_deref())?;
        self.issue(&phone, email.as_ref(), req.purpose.unwrap_or_default())
            .await
    }

    /// Send a fresh code for the same purpose as the active one.
    ///
    /// # Errors
    ///
    /// Same as [`OtpService::send`].
    #[instrument(skip(self, phone_number, email), fields(phone = %mask_raw(phone_number)))]
    pub async fn resend(
        &self,
        phone_number: &str,
        email: Option<&str>,
    ) -> Result<OtpResponse, OtpError> {
        let phone = PhoneNumber::parse(phone_number)?;
        let email = parse_optional_email(email)?;
        let purpose = self
            .otps
            .find_active(&phone, email.as_ref().map(Email::as_str), Utc::now())
            .await?
            .map_or(OtpPurpose::Login, |otp| otp.purpose);
        self.issue(&phone, email.as_ref(), purpose).await
    }

    /// Check a code and sign the customer in, creating the account on first use.
    ///
    /// Every check counts as an attempt, right or wrong.
    ///
    /// # Errors
    ///
    /// Returns `OtpError::NoActiveOtp`, `AttemptsExceeded`, `Expired` or
    /// `Mismatch` when the code is not accepted.
    #[instrument(skip(self, req), fields(phone = %mask_raw(&req.phone_number)))]
    pub async fn verify(&self, req: &OtpVerifyRequest) -> Result<JwtResponse, OtpError> {
        let phone = PhoneNumber::parse(&req.phone_number)?;
        let email = parse_optional_email(req.email.as_deref())?;
        let code = OtpCode::parse(&req.otp)?;
        let now = Utc::now();

        let otp = self
            .otps
            .find_active(&phone, email.as_ref().map(Email::as_str), now)
            .await?
            .ok_or(OtpError::NoActiveOtp)?;

        if otp.attempts_exhausted() {
            return Err(OtpError::AttemptsExceeded);
        }
        if otp.is_expired(now) {
            return Err(OtpError::Expired);
        }

        self.otps.increment_attempts(otp.id).await?;
        if auth::verify_password(code.as_str(), &otp.otp_hash).is_err() {
            tracing::debug!(attempt = otp.attempts + 1, "OTP mismatch");
            return Err(OtpError::Mismatch);
        }
        self.otps.mark_verified(otp.id).await?;

        let user = self.find_or_create_user(&phone, email.as_ref()).await?;
        self.otps.link_user(otp.id, user.id).await?;

        tracing::info!(user_id = %user.id, "OTP sign-in");
        Ok(auth::issue_tokens(self.tokens, &user)?)
    }

    /// Delete expired codes. Returns the number removed.
    ///
    /// # Errors
    ///
    /// Returns `OtpError::Repository` if the delete fails.
    pub async fn purge_expired(&self) -> Result<u64, OtpError> {
        let removed = self.otps.delete_expired(Utc::now()).await?;
        tracing::info!(removed, "Cleaned up expired OTPs");
        Ok(removed)
    }

    async fn issue(
        &self,
        phone: &PhoneNumber,
        email: Option<&Email>,
        purpose: OtpPurpose,
    ) -> Result<OtpResponse, OtpError> {
        let now = Utc::now();
        let recent = self
            .otps
            .count_issued_since(phone, now - Duration::minutes(SEND_WINDOW_MINUTES))
            .await?;
        if recent >= MAX_SENDS_PER_WINDOW {
            return Err(OtpError::RateLimited);
        }

        if let Some(active) = self
            .otps
            .find_active(phone, email.map(Email::as_str), now)
            .await?
        {
            self.otps.mark_verified(active.id).await?;
        }

        let code = generate_code()?;
        let otp_hash = auth::hash_password(code.as_str())?;
        self.otps
            .create(&NewOtp {
                phone_number: phone,
                email: email.map(Email::as_str),
                otp_hash: &otp_hash,
                purpose,
                max_attempts: MAX_ATTEMPTS,
                expires_at: now + Duration::seconds(OTP_TTL_SECS),
            })
            .await?;

        self.sender.send(phone, email, &code)?;

        let masked_phone = phone.masked();
        let masked_email = email.map(Email::masked);
        Ok(OtpResponse {
            success: true,
            message: sent_message(&masked_phone, masked_email.as_deref()),
            masked_phone: Some(masked_phone),
            masked_email,
            expires_in_seconds: Some(OTP_TTL_SECS),
        })
    }

    async fn find_or_create_user(
        &self,
        phone: &PhoneNumber,
        email: Option<&Email>,
    ) -> Result<User, OtpError> {
        if let Some(user) = self.users.get_by_phone(phone).await? {
            return Ok(user);
        }
        if let Some(email) = email
            && let Some(user) = self.users.get_by_email(email).await?
        {
            if user.phone_number.is_none() {
                return Ok(self.users.set_phone_number(user.id, phone).await?);
            }
            return Ok(user);
        }

        let username = format!("user_{}", phone.last_ten_digits());
        let email = match email {
            Some(email) => email.clone(),
            None => Email::parse(&format!("{username}@{GENERATED_EMAIL_DOMAIN}"))?,
        };
        let user = self
            .users
            .create(&NewUser {
                username: &username,
                email: &email,
                phone_number: Some(phone),
                first_name: "Customer",
                last_name: "",
                password_hash: None,
                role: UserRole::Customer,
            })
            .await?;
        tracing::info!(user_id = %user.id, "Account created from OTP sign-in");
        Ok(user)
    }
}

fn generate_code() -> Result<OtpCode, OtpError> {
    let n: u32 = rand::rng().random_range(100_000..=999_999);
    Ok(OtpCode::from_number(n)?)
}

fn parse_optional_email(raw: Option<&str>) -> Result<Option<Email>, OtpError> {
    Ok(raw
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(Email::parse)
        .transpose()?)
}

fn sent_message(masked_phone: &str, masked_email: Option<&str>) -> String {
    let mut message = format!("OTP sent successfully to {masked_phone}");
    if let Some(email) = masked_email {
        message.push_str(" and ");
        message.push_str(email);
    }
    message
}

/// Mask unvalidated input for log fields.
fn mask_raw(raw: &str) -> String {
    PhoneNumber::parse(raw).map_or_else(|_| "<invalid>".to_owned(), |p| p.masked())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_codes_are_six_digits() {
        for _ in 0..50 {
            let code = generate_code().unwrap();
            assert_eq!(code.as_str().len(), 6);
            assert!(!code.as_str().starts_with('0'));
        }
    }

    #[test]
    fn test_sent_message() {
        assert_eq!(
            sent_message("+9198765••••", None),
            "OTP sent successfully to +9198765••••"
        );
        assert_eq!(
            sent_message("+9198765••••", Some("pr•••@example.com")),
            "OTP sent successfully to +9198765•••• and pr•••@example.com"
        );
    }

    #[test]
    fn test_blank_email_is_ignored() {
        assert!(parse_optional_email(Some("  ")).unwrap().is_none());
        assert!(parse_optional_email(None).unwrap().is_none());
        assert!(parse_optional_email(Some("not-an-email")).is_err());
    }

    #[test]
    fn test_generated_email_is_valid() {
        let phone = PhoneNumber::parse("+919876543210").unwrap();
        let username = format!("user_{}", phone.last_ten_digits());
        assert_eq!(username, "user_9876543210");
        assert!(Email::parse(&format!("{username}@{GENERATED_EMAIL_DOMAIN}")).is_ok());
    }

    #[test]
    fn test_logging_sender_never_fails() {
        let phone = PhoneNumber::parse("+919876543210").unwrap();
        let code = OtpCode::parse("123456").unwrap();
        assert!(LoggingOtpSender.send(&phone, None, &code).is_ok());
    }

    #[test]
    fn test_mask_raw() {
        assert_eq!(mask_raw("garbage"), "<invalid>");
        assert!(mask_raw("+919876543210").ends_with("••••"));
    }
}
