//! HTTP middleware stack for the storefront API.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (hub per request, capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Security headers
//! 5. CORS (only when `STOREFRONT_CORS_ORIGIN` is set)
//! 6. Rate limiting (governor), per route group
//!
//! Authentication is not a layer: handlers take a [`RequireAuth`],
//! [`RequireAdmin`] or [`OptionalAuth`] extractor.

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;

pub use auth::{OptionalAuth, RequireAdmin, RequireAuth};
pub use rate_limit::{api_rate_limiter, auth_rate_limiter};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
