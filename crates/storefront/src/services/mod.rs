//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Password sign-up/sign-in and JWT issuing
//! - `otp` - Phone OTP sign-in with a pluggable sender
//! - `catalog` - Category tree (cached) and products
//! - `cart` - Server-side cart with stock checks
//! - `orders` - Checkout, order history and admin workflow
//!
//! Services borrow the pool and whatever shared state they need from
//! `AppState` for the duration of one request.

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod orders;
pub mod otp;

use serde::Deserialize;

/// Default page size for listings.
pub const DEFAULT_PAGE_SIZE: u32 = 20;
/// Largest page size a caller may ask for.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Zero-based `page` and `size` query parameters.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageRequest {
    #[serde(default)]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub size: u32,
}

const fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 0,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    /// The requested size clamped to `1..=MAX_PAGE_SIZE`.
    #[must_use]
    pub fn size(self) -> u32 {
        self.size.clamp(1, MAX_PAGE_SIZE)
    }

    #[must_use]
    pub fn limit(self) -> i64 {
        i64::from(self.size())
    }

    #[must_use]
    pub fn offset(self) -> i64 {
        i64::from(self.page) * self.limit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_clamps_size() {
        let page = PageRequest { page: 2, size: 500 };
        assert_eq!(page.size(), MAX_PAGE_SIZE);
        assert_eq!(page.offset(), 200);

        let page = PageRequest { page: 0, size: 0 };
        assert_eq!(page.limit(), 1);
    }
}
