//! Domain models for the storefront database.
//!
//! `User` is a validated domain type built from a database row; the other
//! models map straight onto their tables.

pub mod cart;
pub mod catalog;
pub mod order;
pub mod otp;
pub mod user;

pub use cart::CartItem;
pub use catalog::{Category, Product, Variant};
pub use order::{Order, OrderItem, OrderStatusLog};
pub use otp::OtpVerification;
pub use user::{AuthenticatedUser, User};
