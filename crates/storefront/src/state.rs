//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::services::auth::TokenService;
use crate::services::catalog::CategoryCache;
use crate::services::otp::{LoggingOtpSender, OtpSender};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    tokens: TokenService,
    categories: CategoryCache,
    otp_sender: Arc<dyn OtpSender>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// OTP codes go to the log until a real sender is supplied with
    /// [`AppState::with_otp_sender`].
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `pool` - `PostgreSQL` connection pool
    #[must_use]
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Self {
        Self::with_otp_sender(config, pool, Arc::new(LoggingOtpSender))
    }

    /// Create application state with a specific OTP delivery channel.
    #[must_use]
    pub fn with_otp_sender(
        config: StorefrontConfig,
        pool: PgPool,
        otp_sender: Arc<dyn OtpSender>,
    ) -> Self {
        let tokens = TokenService::new(&config.jwt);
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                tokens,
                categories: CategoryCache::new(),
                otp_sender,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// JWT issuing and verification.
    #[must_use]
    pub fn tokens(&self) -> &TokenService {
        &self.inner.tokens
    }

    /// Cached category list.
    #[must_use]
    pub fn categories(&self) -> &CategoryCache {
        &self.inner.categories
    }

    #[must_use]
    pub fn otp_sender(&self) -> &dyn OtpSender {
        self.inner.otp_sender.as_ref()
    }
}
