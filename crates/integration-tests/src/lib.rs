//! Integration tests for DreamCollections.
//!
//! # Running Tests
//!
//! ```bash
//! # Database, migrations and the API server
//! dc-cli migrate
//! cargo run -p dream-collections-storefront
//!
//! # Seed a catalog with an admin account
//! dc-cli admin create -u admin -e admin@dreamcollections.com -p 'long-password'
//! dc-cli seed catalog --login admin --password 'long-password'
//!
//! # Run the ignored tests against it
//! DREAM_TEST_ADMIN_LOGIN=admin DREAM_TEST_ADMIN_PASSWORD='long-password' \
//!     cargo test -p dream-collections-integration-tests -- --ignored
//! ```
//!
//! # Environment Variables
//!
//! - `DREAM_API_URL` - API base URL (default `http://localhost:8080/api`)
//! - `DREAM_TEST_ADMIN_LOGIN` / `DREAM_TEST_ADMIN_PASSWORD` - admin account for admin tests

use reqwest::{Client, StatusCode};
use serde_json::json;

use dream_collections_core::api::{JwtResponse, Page, ProductResponse};
use dream_collections_core::VariantId;

/// API base URL, e.g. `http://localhost:8080/api`.
#[must_use]
pub fn api_url() -> String {
    std::env::var("DREAM_API_URL")
        .unwrap_or_else(|_| "http://localhost:8080/api".to_string())
        .trim_end_matches('/')
        .to_string()
}

/// Server root, where `/health` lives.
#[must_use]
pub fn server_url() -> String {
    let api = api_url();
    api.strip_suffix("/api").unwrap_or(&api).to_string()
}

/// Short random suffix for unique usernames and emails.
#[must_use]
pub fn unique_suffix() -> String {
    uuid::Uuid::new_v4().simple().to_string().chars().take(10).collect()
}

/// Admin credentials, if configured.
#[must_use]
pub fn admin_credentials() -> Option<(String, String)> {
    let login = std::env::var("DREAM_TEST_ADMIN_LOGIN").ok()?;
    let password = std::env::var("DREAM_TEST_ADMIN_PASSWORD").ok()?;
    Some((login, password))
}

/// A freshly registered customer.
#[derive(Debug)]
pub struct TestCustomer {
    pub username: String,
    pub email: String,
    pub password: String,
    pub jwt: JwtResponse,
}

/// Register a customer with a unique username and sign in.
///
/// # Panics
///
/// Panics if the server rejects sign-up or sign-in.
pub async fn register_customer(client: &Client) -> TestCustomer {
    let suffix = unique_suffix();
    let username = format!("it_{suffix}");
    let email = format!("it_{suffix}@example.com");
    let password = "integration-pass".to_string();

    let resp = client
        .post(format!("{}/auth/signup", api_url()))
        .json(&json!({
            "username": username,
            "email": email,
            "password": password,
            "firstName": "Integration",
            "lastName": "Test",
        }))
        .send()
        .await
        .expect("Failed to sign up");
    assert_eq!(resp.status(), StatusCode::OK, "sign-up rejected");

    let jwt = sign_in(client, &username, &password).await;
    TestCustomer {
        username,
        email,
        password,
        jwt,
    }
}

/// Sign in and return the issued tokens.
///
/// # Panics
///
/// Panics if the server rejects the credentials.
pub async fn sign_in(client: &Client, login_id: &str, password: &str) -> JwtResponse {
    let resp = client
        .post(format!("{}/auth/signin", api_url()))
        .json(&json!({ "loginId": login_id, "password": password }))
        .send()
        .await
        .expect("Failed to sign in");
    assert_eq!(resp.status(), StatusCode::OK, "sign-in rejected");
    resp.json().await.expect("Failed to parse sign-in response")
}

/// A variant with stock from the seeded catalog.
///
/// # Panics
///
/// Panics if the catalog cannot be listed.
pub async fn variant_in_stock(client: &Client) -> Option<VariantId> {
    let page: Page<ProductResponse> = client
        .get(format!("{}/products?size=100", api_url()))
        .send()
        .await
        .expect("Failed to list products")
        .json()
        .await
        .expect("Failed to parse products");

    page.content
        .iter()
        .flat_map(|product| product.variants.iter())
        .find(|variant| variant.stock_quantity >= 5)
        .map(|variant| variant.id)
}
