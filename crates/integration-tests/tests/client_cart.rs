//! Guest cart to server cart through the API client.
//!
//! Run with: `cargo test -p dream-collections-integration-tests -- --ignored`

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use reqwest::Client;

use rust_decimal::Decimal;

use dream_collections_client::orders::GuestOrderItem;
use dream_collections_client::{
    ApiClient, AuthSession, CartService, CartSnapshot, CheckoutDetails, MemoryStorage,
    OrderRecord, OrderService,
};
use dream_collections_core::VariantId;
use dream_collections_integration_tests::{api_url, register_customer, variant_in_stock};

fn api() -> ApiClient {
    ApiClient::new(api_url(), Arc::new(MemoryStorage::new()))
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_guest_cart_moves_to_server_on_login() {
    let http = Client::new();
    let customer = register_customer(&http).await;
    let Some(variant) = variant_in_stock(&http).await else {
        return;
    };

    let api = api();
    let cart = CartService::for_api(api.clone());
    let session = AuthSession::new(api);

    let snapshot = cart.add_item(variant, 2).await.unwrap();
    assert!(!snapshot.is_remote());
    assert_eq!(snapshot.quantity_of(variant), Some(2));

    session
        .login(&customer.username, &customer.password)
        .await
        .unwrap();
    assert_eq!(cart.sync_guest_cart().await, 1);
    assert!(cart.guest_cart().is_empty());

    let CartSnapshot::Remote(view) = cart.get_cart().await else {
        panic!("expected the server cart after sign-in");
    };
    assert_eq!(view.quantity_of(variant), Some(2));
    assert_eq!(cart.item_count().await, 2);

    // Signing out drops back to an empty guest cart
    session.logout().unwrap();
    assert!(cart.get_cart().await.is_empty());
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_checkout_through_client() {
    let http = Client::new();
    let customer = register_customer(&http).await;
    let Some(variant) = variant_in_stock(&http).await else {
        return;
    };

    let api = api();
    let session = AuthSession::new(api.clone());
    session
        .login(&customer.username, &customer.password)
        .await
        .unwrap();
    let cart = CartService::for_api(api.clone());
    cart.add_item(variant, 1).await.unwrap();

    let orders = OrderService::new(api);
    let details = CheckoutDetails {
        customer_name: "Integration Test".to_string(),
        customer_phone: "9876543210".to_string(),
        customer_email: Some(customer.email.clone()),
        address: "12 MG Road".to_string(),
        city: "Bengaluru".to_string(),
        state: "Karnataka".to_string(),
        postal_code: "560001".to_string(),
        payment_method: "COD".to_string(),
        items: vec![GuestOrderItem {
            product_variant_id: variant,
            product_name: None,
            quantity: 1,
            price: None,
        }],
        total_amount: Decimal::ZERO,
    };

    let OrderRecord::Remote(order) = orders.create_order(&details).await.unwrap() else {
        panic!("expected the server to take the order");
    };
    assert_eq!(order.items.len(), 1);
    assert!(orders.guest_orders().is_empty());

    let found = orders.order_by_id(&order.id.to_string()).await.unwrap();
    assert!(matches!(found, OrderRecord::Remote(o) if o.id == order.id));
}

#[tokio::test]
async fn test_unreachable_server_keeps_cart_locally() {
    let api = ApiClient::new("http://127.0.0.1:1/api", Arc::new(MemoryStorage::new()));
    let cart = CartService::for_api(api);

    let variant = VariantId::new(42);
    let snapshot = cart.add_item(variant, 3).await.unwrap();
    assert!(!snapshot.is_remote());
    assert_eq!(cart.item_count().await, 3);
    assert_eq!(cart.sync_guest_cart().await, 0);
}
