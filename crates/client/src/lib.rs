//! DreamCollections API client.
//!
//! Talks to the storefront API and keeps the shopper's local state (session,
//! guest cart, orders placed while the server was unreachable) in a
//! [`Storage`]. Cart and order calls fall back to local state when the
//! server fails.
//!
//! # Modules
//!
//! - [`api`] - HTTP plumbing, bearer tokens and error bodies
//! - [`auth`] - Password and OTP sign-in, stored session
//! - [`cart`] - Guest/server cart reconciliation
//! - [`orders`] - Checkout and order history with local fallback
//! - [`catalog`] - Categories and products
//! - [`storage`] - Key/value storage backends

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod error;
pub mod orders;
pub mod storage;

pub use api::ApiClient;
pub use auth::AuthSession;
pub use cart::{CartService, CartSnapshot, CartState, RemoteCart};
pub use catalog::{CatalogClient, ProductQuery};
pub use error::ClientError;
pub use orders::{CheckoutDetails, GuestOrder, OrderHistory, OrderRecord, OrderService};
pub use storage::{FileStorage, MemoryStorage, Storage};
