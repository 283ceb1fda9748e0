//! JSON bodies exchanged over the `/api` surface.
//!
//! Both the storefront (which serializes responses) and the client (which
//! deserializes them) use these types, so every type derives both directions.
//! Field names are camelCase on the wire. Money is a [`rust_decimal::Decimal`]
//! and travels as a decimal string, e.g. `"24999.00"`; numbers are accepted
//! on input.

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod order;
pub mod page;

use serde::{Deserialize, Serialize};

pub use auth::*;
pub use cart::*;
pub use catalog::*;
pub use order::*;
pub use page::Page;

/// Plain acknowledgement or error body: `{"message": "...", "success": true}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
    #[serde(default = "default_success")]
    pub success: bool,
}

const fn default_success() -> bool {
    true
}

impl MessageResponse {
    /// A successful acknowledgement.
    #[must_use]
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            success: true,
        }
    }

    /// An error body.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            success: false,
        }
    }
}
