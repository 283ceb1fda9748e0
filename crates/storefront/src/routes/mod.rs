//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                                 - Liveness
//! GET  /health/ready                           - Database readiness
//!
//! # Auth (strict rate limit)
//! POST /api/auth/signup                        - Register with a password
//! POST /api/auth/signin                        - Sign in by username, email or phone
//! POST /api/auth/refresh                       - Trade a refresh token
//! POST /api/auth/otp/send                      - Send a sign-in code
//! POST /api/auth/otp/verify                    - Verify a code (find-or-create account)
//! POST /api/auth/otp/resend                    - Send a fresh code
//!
//! # Users
//! GET  /api/users/me                           - Own profile
//! GET  /api/users/{id}                         - Any profile (admin)
//!
//! # Categories (writes: admin)
//! GET  /api/categories                         - Top-level tree
//! GET  /api/categories/toplevel                - Same
//! GET  /api/categories/{id}                    - One category with its subtree
//! GET  /api/categories/name/{name}             - Lookup by name
//! GET  /api/categories/{id}/subcategories      - Children
//! POST /api/categories                         - Create
//! PUT  /api/categories/{id}                    - Update
//! DELETE /api/categories/{id}                  - Delete (409 while products remain)
//!
//! # Products (writes: admin)
//! GET  /api/products                           - Paged listing with filters
//! GET  /api/products/{id}                      - Detail
//! GET  /api/products/category/{categoryId}     - Listing for a category subtree
//! GET  /api/products/search?name=              - Listing by name
//! POST /api/products                           - Create with variants
//! PUT  /api/products/{id}                      - Replace, variants included
//! DELETE /api/products/{id}                    - Delete
//! POST /api/products/variants                  - Add a variant
//! GET  /api/products/variants/{id}             - Variant detail
//! POST /api/products/variants/findByIds        - Variant details in bulk
//! PUT  /api/products/variants/{id}/stock       - Set stock
//!
//! # Cart (auth)
//! GET  /api/carts/mine                         - Get or create
//! POST /api/carts/mine/items                   - Add units
//! PUT  /api/carts/mine/items/{variantId}       - Set quantity (0 removes)
//! DELETE /api/carts/mine/items/{variantId}     - Remove line
//! DELETE /api/carts/mine                       - Empty the cart
//! GET  /api/carts/user/{userId}                - Any cart (admin)
//!
//! # Orders (auth)
//! POST /api/orders                             - Place from cart
//! GET  /api/orders/my-orders                   - Own orders, paged
//! GET  /api/orders/stats                       - Own totals
//! GET  /api/orders/{id}                        - Detail (owner or admin)
//! PUT  /api/orders/{id}/cancel                 - Cancel while unpaid
//!
//! # Admin orders
//! GET  /api/admin/orders                       - Filtered listing
//! GET  /api/admin/orders/{id}                  - Detail with status history
//! PUT  /api/admin/orders/{id}/status           - Transition status
//! POST /api/admin/orders/{id}/notes            - Append a note
//! ```

pub mod admin_orders;
pub mod auth;
pub mod carts;
pub mod categories;
pub mod health;
pub mod orders;
pub mod products;
pub mod users;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::middleware::{api_rate_limiter, auth_rate_limiter};
use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(auth::signup))
        .route("/signin", post(auth::signin))
        .route("/refresh", post(auth::refresh))
        .route("/otp/send", post(auth::send_otp))
        .route("/otp/verify", post(auth::verify_otp))
        .route("/otp/resend", post(auth::resend_otp))
}

/// Create the user routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(users::me))
        .route("/{id}", get(users::show))
}

/// Create the category routes router.
pub fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(categories::tree).post(categories::create))
        .route("/toplevel", get(categories::tree))
        .route("/name/{name}", get(categories::by_name))
        .route(
            "/{id}",
            get(categories::show)
                .put(categories::update)
                .delete(categories::delete),
        )
        .route("/{id}/subcategories", get(categories::subcategories))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index).post(products::create))
        .route("/search", get(products::search))
        .route("/category/{category_id}", get(products::by_category))
        .route("/variants", post(products::add_variant))
        .route("/variants/findByIds", post(products::variants_by_ids))
        .route("/variants/{id}", get(products::variant))
        .route("/variants/{id}/stock", put(products::set_stock))
        .route(
            "/{id}",
            get(products::show)
                .put(products::replace)
                .delete(products::delete),
        )
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/mine", get(carts::mine).delete(carts::clear))
        .route("/mine/items", post(carts::add_item))
        .route(
            "/mine/items/{variant_id}",
            put(carts::update_item).delete(carts::remove_item),
        )
        .route("/user/{user_id}", get(carts::for_user))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(orders::place))
        .route("/my-orders", get(orders::my_orders))
        .route("/stats", get(orders::stats))
        .route("/{id}", get(orders::show))
        .route("/{id}/cancel", put(orders::cancel))
}

/// Create the admin order routes router.
pub fn admin_order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(admin_orders::index))
        .route("/{id}", get(admin_orders::show))
        .route("/{id}/status", put(admin_orders::update_status))
        .route("/{id}/notes", post(admin_orders::add_note))
}

/// Everything under `/api`.
///
/// Auth routes get the strict limiter; the rest share the relaxed one.
pub fn api_routes() -> Router<AppState> {
    let resources = Router::new()
        .nest("/users", user_routes())
        .nest("/categories", category_routes())
        .nest("/products", product_routes())
        .nest("/carts", cart_routes())
        .nest("/orders", order_routes())
        .nest("/admin/orders", admin_order_routes())
        .layer(api_rate_limiter());

    Router::new()
        .nest("/auth", auth_routes().layer(auth_rate_limiter()))
        .merge(resources)
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/api", api_routes())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use secrecy::SecretString;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use dream_collections_core::api::MessageResponse;
    use dream_collections_core::{UserId, UserRole};

    use crate::config::{JwtConfig, StorefrontConfig};
    use crate::models::AuthenticatedUser;
    use crate::services::auth::TokenService;
    use crate::state::AppState;

    fn config() -> StorefrontConfig {
        StorefrontConfig {
            database_url: SecretString::from("postgres://localhost/dream_collections_test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 8080,
            jwt: JwtConfig {
                secret: SecretString::from("k8#Qz1!vN4@pR7$wT2^yB5&cF9*hJ3(m"),
                issuer: "dreamcollections".to_string(),
                expiration_secs: 3_600,
                refresh_expiration_secs: 86_400,
            },
            cors_origin: None,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        }
    }

    /// Router over a pool that never connects; only routes that fail before
    /// touching the database can be exercised.
    fn app() -> axum::Router {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/dream_collections_test")
            .unwrap();
        crate::app(AppState::new(config(), pool))
    }

    fn token_for(role: UserRole) -> String {
        TokenService::new(&config().jwt)
            .issue_access(&AuthenticatedUser {
                id: UserId::new(7),
                username: "asha".to_string(),
                role,
            })
            .unwrap()
    }

    async fn send(request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
        let response = app().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, body.to_vec())
    }

    fn get(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (status, headers, body) = send(get("/health", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"ok");
        assert!(headers.contains_key("x-request-id"));
        assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    }

    #[tokio::test]
    async fn test_cart_requires_token() {
        let (status, _, body) = send(get("/api/carts/mine", None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let message: MessageResponse = serde_json::from_slice(&body).unwrap();
        assert!(!message.success);
    }

    #[tokio::test]
    async fn test_garbage_token_rejected() {
        let (status, _, _) = send(get("/api/orders/my-orders", Some("not-a-jwt"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_admin_routes_forbid_customers() {
        let token = token_for(UserRole::Customer);
        let (status, _, _) = send(get("/api/admin/orders", Some(&token))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _, _) = send(get("/api/users/3", Some(&token))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_category_write_needs_admin() {
        let token = token_for(UserRole::Customer);
        let request = Request::builder()
            .method("POST")
            .uri("/api/categories")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"name":"Anklets"}"#))
            .unwrap();
        let (status, _, _) = send(request).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_bad_sort_is_rejected_before_the_database() {
        let (status, _, body) = send(get("/api/products?sort=weight", None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let message: MessageResponse = serde_json::from_slice(&body).unwrap();
        assert!(message.message.contains("weight"));
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let (status, _, _) = send(get("/api/wishlist", None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
