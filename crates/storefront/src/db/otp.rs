//! One-time password repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use dream_collections_core::{OtpId, OtpPurpose, PhoneNumber, UserId};

use super::RepositoryError;
use crate::models::OtpVerification;

const OTP_COLUMNS: &str = "id, phone_number, email, otp_hash, attempts, max_attempts, purpose, \
                           verified, user_id, created_at, expires_at";

/// Fields for a freshly issued OTP.
#[derive(Debug)]
pub struct NewOtp<'a> {
    pub phone_number: &'a PhoneNumber,
    pub email: Option<&'a str>,
    pub otp_hash: &'a str,
    pub purpose: OtpPurpose,
    pub max_attempts: i32,
    pub expires_at: DateTime<Utc>,
}

/// Repository for OTP records.
pub struct OtpRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OtpRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Number of OTPs issued to `phone` since `since`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_issued_since(
        &self,
        phone: &PhoneNumber,
        since: DateTime<Utc>,
    ) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM otp_verifications WHERE phone_number = $1 AND created_at >= $2",
        )
        .bind(phone.as_str())
        .bind(since)
        .fetch_one(self.pool)
        .await?;
        Ok(count)
    }

    /// The newest unverified, unexpired OTP for a phone number or email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_active(
        &self,
        phone: &PhoneNumber,
        email: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Option<OtpVerification>, RepositoryError> {
        let sql = format!(
            "SELECT {OTP_COLUMNS} FROM otp_verifications \
             WHERE verified = FALSE \
               AND expires_at > $3 \
               AND (phone_number = $1 OR ($2::TEXT IS NOT NULL AND lower(email) = lower($2))) \
             ORDER BY created_at DESC \
             LIMIT 1"
        );
        let otp = sqlx::query_as::<_, OtpVerification>(&sql)
            .bind(phone.as_str())
            .bind(email)
            .bind(now)
            .fetch_optional(self.pool)
            .await?;
        Ok(otp)
    }

    /// Store a new OTP.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, new_otp: &NewOtp<'_>) -> Result<OtpVerification, RepositoryError> {
        let sql = format!(
            "INSERT INTO otp_verifications \
                 (phone_number, email, otp_hash, purpose, max_attempts, expires_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {OTP_COLUMNS}"
        );
        let otp = sqlx::query_as::<_, OtpVerification>(&sql)
            .bind(new_otp.phone_number.as_str())
            .bind(new_otp.email)
            .bind(new_otp.otp_hash)
            .bind(new_otp.purpose)
            .bind(new_otp.max_attempts)
            .bind(new_otp.expires_at)
            .fetch_one(self.pool)
            .await?;
        Ok(otp)
    }

    /// Count one verification attempt.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn increment_attempts(&self, id: OtpId) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE otp_verifications SET attempts = attempts + 1 WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Mark an OTP as used. Also how superseded OTPs are retired.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn mark_verified(&self, id: OtpId) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE otp_verifications SET verified = TRUE WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Record which account an OTP signed in.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn link_user(&self, id: OtpId, user_id: UserId) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE otp_verifications SET user_id = $2 WHERE id = $1")
            .bind(id)
            .bind(user_id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Delete every OTP that expired before `now`. Returns the number removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM otp_verifications WHERE expires_at < $1")
            .bind(now)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
