//! Status enums for various entities.

use serde::{Deserialize, Serialize};

/// Order lifecycle status.
///
/// `Confirmed` is only ever assigned to orders kept locally by the client
/// when the server could not be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "order_status", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    PendingPayment,
    AwaitingPaymentConfirmation,
    Paid,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    RefundPending,
    Refunded,
    Failed,
    Confirmed,
}

impl OrderStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 11] = [
        Self::PendingPayment,
        Self::AwaitingPaymentConfirmation,
        Self::Paid,
        Self::Processing,
        Self::Shipped,
        Self::Delivered,
        Self::Cancelled,
        Self::RefundPending,
        Self::Refunded,
        Self::Failed,
        Self::Confirmed,
    ];

    /// Statuses an administrator may move an order to from `self`.
    #[must_use]
    pub const fn allowed_transitions(self) -> &'static [Self] {
        match self {
            Self::PendingPayment => &[
                Self::AwaitingPaymentConfirmation,
                Self::Paid,
                Self::Cancelled,
                Self::Failed,
            ],
            Self::AwaitingPaymentConfirmation => &[Self::Paid, Self::Failed, Self::Cancelled],
            Self::Paid => &[Self::Processing, Self::RefundPending, Self::Cancelled],
            Self::Processing => &[Self::Shipped, Self::Cancelled, Self::RefundPending],
            Self::Shipped => &[Self::Delivered, Self::RefundPending],
            Self::Delivered => &[Self::RefundPending],
            Self::RefundPending => &[Self::Refunded, Self::Failed],
            Self::Failed => &[Self::Cancelled, Self::PendingPayment],
            Self::Cancelled | Self::Refunded | Self::Confirmed => &[],
        }
    }

    /// Whether an administrator may move an order from `self` to `next`.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.allowed_transitions().contains(&next)
    }

    /// Whether the customer who placed the order may still cancel it.
    #[must_use]
    pub const fn is_customer_cancellable(self) -> bool {
        matches!(self, Self::PendingPayment | Self::AwaitingPaymentConfirmation)
    }

    /// Wire name, e.g. `PENDING_PAYMENT`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PendingPayment => "PENDING_PAYMENT",
            Self::AwaitingPaymentConfirmation => "AWAITING_PAYMENT_CONFIRMATION",
            Self::Paid => "PAID",
            Self::Processing => "PROCESSING",
            Self::Shipped => "SHIPPED",
            Self::Delivered => "DELIVERED",
            Self::Cancelled => "CANCELLED",
            Self::RefundPending => "REFUND_PENDING",
            Self::Refunded => "REFUNDED",
            Self::Failed => "FAILED",
            Self::Confirmed => "CONFIRMED",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == wanted)
            .ok_or_else(|| format!("invalid order status: {s}"))
    }
}

/// Payment status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "payment_status", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    RefundPending,
    Refunded,
    PartiallyRefunded,
}

/// Role of a storefront user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "user_role", rename_all = "snake_case")
)]
pub enum UserRole {
    #[default]
    #[serde(rename = "ROLE_CUSTOMER")]
    Customer,
    #[serde(rename = "ROLE_ADMIN")]
    Admin,
}

impl UserRole {
    /// Authority name carried in tokens, e.g. `ROLE_ADMIN`.
    #[must_use]
    pub const fn authority(self) -> &'static str {
        match self {
            Self::Customer => "ROLE_CUSTOMER",
            Self::Admin => "ROLE_ADMIN",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Customer => write!(f, "customer"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "customer" | "user" | "role_customer" => Ok(Self::Customer),
            "admin" | "role_admin" => Ok(Self::Admin),
            _ => Err(format!("invalid role: {s}")),
        }
    }
}

/// What a one-time password was requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "otp_purpose", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OtpPurpose {
    #[default]
    Login,
    Checkout,
    Registration,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_payment_transitions() {
        let from = OrderStatus::PendingPayment;
        assert!(from.can_transition_to(OrderStatus::Paid));
        assert!(from.can_transition_to(OrderStatus::AwaitingPaymentConfirmation));
        assert!(from.can_transition_to(OrderStatus::Cancelled));
        assert!(from.can_transition_to(OrderStatus::Failed));
        assert!(!from.can_transition_to(OrderStatus::Shipped));
        assert!(!from.can_transition_to(OrderStatus::Delivered));
    }

    #[test]
    fn test_fulfilment_path() {
        assert!(OrderStatus::Paid.can_transition_to(OrderStatus::Processing));
        assert!(OrderStatus::Processing.can_transition_to(OrderStatus::Shipped));
        assert!(OrderStatus::Shipped.can_transition_to(OrderStatus::Delivered));
        assert!(OrderStatus::Delivered.can_transition_to(OrderStatus::RefundPending));
        assert!(OrderStatus::RefundPending.can_transition_to(OrderStatus::Refunded));
        assert!(!OrderStatus::Shipped.can_transition_to(OrderStatus::Cancelled));
    }

    #[test]
    fn test_failed_can_retry_payment() {
        assert!(OrderStatus::Failed.can_transition_to(OrderStatus::PendingPayment));
        assert!(OrderStatus::Failed.can_transition_to(OrderStatus::Cancelled));
    }

    #[test]
    fn test_terminal_statuses() {
        for status in [
            OrderStatus::Cancelled,
            OrderStatus::Refunded,
            OrderStatus::Confirmed,
        ] {
            assert!(status.allowed_transitions().is_empty());
            for next in OrderStatus::ALL {
                assert!(!status.can_transition_to(next));
            }
        }
    }

    #[test]
    fn test_customer_cancellable() {
        assert!(OrderStatus::PendingPayment.is_customer_cancellable());
        assert!(OrderStatus::AwaitingPaymentConfirmation.is_customer_cancellable());
        assert!(!OrderStatus::Paid.is_customer_cancellable());
        assert!(!OrderStatus::Shipped.is_customer_cancellable());
    }

    #[test]
    fn test_order_status_wire_format() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::AwaitingPaymentConfirmation).unwrap(),
            "\"AWAITING_PAYMENT_CONFIRMATION\""
        );
        for status in OrderStatus::ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{status}\""));
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
        assert_eq!(
            "shipped".parse::<OrderStatus>().unwrap(),
            OrderStatus::Shipped
        );
        assert!("LOST".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_user_role_parsing() {
        assert_eq!("admin".parse::<UserRole>().unwrap(), UserRole::Admin);
        assert_eq!("ROLE_ADMIN".parse::<UserRole>().unwrap(), UserRole::Admin);
        assert_eq!("Customer".parse::<UserRole>().unwrap(), UserRole::Customer);
        assert!("superuser".parse::<UserRole>().is_err());
        assert_eq!(
            serde_json::to_string(&UserRole::Customer).unwrap(),
            "\"ROLE_CUSTOMER\""
        );
    }

    #[test]
    fn test_payment_status_and_purpose_wire_format() {
        assert_eq!(
            serde_json::to_string(&PaymentStatus::PartiallyRefunded).unwrap(),
            "\"PARTIALLY_REFUNDED\""
        );
        let purpose: OtpPurpose = serde_json::from_str("\"CHECKOUT\"").unwrap();
        assert_eq!(purpose, OtpPurpose::Checkout);
    }
}
