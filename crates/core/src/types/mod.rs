//! Core types for DreamCollections.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod otp;
pub mod phone;
pub mod price;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use otp::{OtpCode, OtpCodeError};
pub use phone::{PhoneNumber, PhoneNumberError};
pub use price::{CurrencyCode, Price};
pub use status::*;
