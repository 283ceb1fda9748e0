//! Typed primary keys.
//!
//! Every table uses a `SERIAL` key. Wrapping each one in its own type keeps a
//! `VariantId` from being passed where a `ProductId` is expected, which
//! matters in cart and order code that handles both side by side.

/// Declare an `i32` key newtype.
///
/// The type serializes as a bare number, parses from a (trimmed) decimal
/// string so it can be used in paths and CLI arguments, and maps to
/// `INTEGER` columns when the `postgres` feature is on.
///
/// ```rust
/// # use dream_collections_core::define_id;
/// define_id!(RingSizeId);
///
/// let id: RingSizeId = " 14 ".parse().unwrap();
/// assert_eq!(id, RingSizeId::new(14));
/// assert_eq!(serde_json::to_string(&id).unwrap(), "14");
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        #[cfg_attr(feature = "postgres", derive(::sqlx::Type), sqlx(transparent))]
        pub struct $name(i32);

        impl $name {
            #[must_use]
            pub const fn new(id: i32) -> Self {
                Self(id)
            }

            #[must_use]
            pub const fn as_i32(&self) -> i32 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                ::core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = ::core::num::ParseIntError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                s.trim().parse().map(Self)
            }
        }

        impl From<i32> for $name {
            fn from(id: i32) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(UserId);
define_id!(OtpId);
define_id!(CategoryId);
define_id!(ProductId);
define_id!(VariantId);
define_id!(CartId);
define_id!(CartItemId);
define_id!(OrderId);
define_id!(OrderItemId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_id_is_a_bare_number_on_the_wire() {
        let id = VariantId::new(42);
        assert_eq!(serde_json::to_string(&id).unwrap(), "42");
        assert_eq!(serde_json::from_str::<VariantId>("42").unwrap(), id);
        assert!(serde_json::from_str::<VariantId>("\"42\"").is_err());
    }

    #[test]
    fn test_id_conversions() {
        let id = CategoryId::from(3);
        assert_eq!(id.to_string(), "3");
        assert_eq!(i32::from(id), 3);
        assert_eq!(" 12 ".parse::<OrderId>().unwrap(), OrderId::new(12));
        assert!("twelve".parse::<OrderId>().is_err());
    }

    #[test]
    fn test_ids_order_numerically() {
        let mut ids = vec![ProductId::new(10), ProductId::new(2), ProductId::new(7)];
        ids.sort();
        assert_eq!(ids, vec![ProductId::new(2), ProductId::new(7), ProductId::new(10)]);
    }
}
