//! DreamCollections Core - Shared types library.
//!
//! This crate provides common types used across all DreamCollections components:
//! - `storefront` - The REST API backing the shop
//! - `client` - API client with guest cart fallback
//! - `cli` - Command-line tools for migrations, seeding and shopping
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails, phones and statuses
//! - [`cart`] - Guest cart held in local storage
//! - [`api`] - JSON request and response bodies shared by server and client

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod types;

pub use cart::{GuestCart, GuestCartItem};
pub use types::*;
