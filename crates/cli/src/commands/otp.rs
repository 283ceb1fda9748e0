//! OTP housekeeping.

use chrono::Utc;

use dream_collections_storefront::db;
use dream_collections_storefront::db::otp::OtpRepository;

use super::database_url;

/// Delete expired one-time passwords.
///
/// # Errors
///
/// Returns error if the database is unreachable or the delete fails.
pub async fn purge() -> Result<u64, Box<dyn std::error::Error>> {
    let database_url = database_url()?;
    let pool = db::create_pool(&database_url).await?;

    let removed = OtpRepository::new(&pool).delete_expired(Utc::now()).await?;
    tracing::info!(removed, "Expired OTPs purged");

    pool.close().await;
    Ok(removed)
}
