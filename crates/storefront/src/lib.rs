//! DreamCollections storefront library.
//!
//! The REST API behind the jewelry storefront: accounts (password and phone
//! OTP), the category tree and products, server-side carts, and orders with
//! an admin workflow. Exposed as a library so the binary, the CLI and tests
//! share one router.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::{
    Router,
    body::Body,
    http::{HeaderValue, Method, Request, header},
    middleware::from_fn,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the application router with its middleware stack.
///
/// Sentry layers are added by the binary so tests run without a hub.
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(state.config().cors_origin.as_deref());

    let router = routes::routes()
        .layer(from_fn(middleware::security_headers_middleware))
        .layer(from_fn(middleware::request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = tracing::field::Empty,
                user_id = tracing::field::Empty,
            )
        }))
        .with_state(state);

    match cors {
        Some(cors) => router.layer(cors),
        None => router,
    }
}

/// CORS for the browser client, if an origin is configured.
fn cors_layer(origin: Option<&str>) -> Option<CorsLayer> {
    let origin = origin?;
    let Ok(origin) = HeaderValue::from_str(origin) else {
        tracing::warn!(origin, "Ignoring invalid CORS origin");
        return None;
    };
    Some(
        CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cors_layer_only_with_valid_origin() {
        assert!(cors_layer(None).is_none());
        assert!(cors_layer(Some("bad\norigin")).is_none());
        assert!(cors_layer(Some("http://localhost:3000")).is_some());
    }
}
