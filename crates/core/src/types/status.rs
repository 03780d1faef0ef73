//! Closed enumerations used across the domain.
//!
//! Every enum has a single canonical wire spelling, used both in JSON and in
//! the database. `FromStr` accepts exactly that spelling and `Display` writes
//! it back.

use serde::{Deserialize, Serialize};

/// Error returned when a string is not one of an enum's wire values.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind}: {value:?}")]
pub struct UnknownVariant {
    /// Name of the enum being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

/// Generates `as_str`, `Display`, `FromStr` and `ALL` for a wire enum.
macro_rules! wire_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $wire:literal),+ $(,)? }) => {
        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The canonical wire spelling.
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $wire),+
                }
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok(Self::$variant),)+
                    _ => Err(UnknownVariant {
                        kind: $kind,
                        value: s.to_owned(),
                    }),
                }
            }
        }
    };
}

/// Fulfillment-like order status axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Paid,
    Delivered,
    Cancelled,
    Completed,
}

wire_enum!(OrderStatus, "order status", {
    Pending => "pending",
    Paid => "paid",
    Delivered => "delivered",
    Cancelled => "cancelled",
    Completed => "completed",
});

impl OrderStatus {
    /// Whether no transition leaves this status.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Completed)
    }
}

/// Payment-like order status axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Paid,
}

wire_enum!(PaymentStatus, "payment status", {
    Unpaid => "unpaid",
    Paid => "paid",
});

/// How an order is shipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ShippingMethod {
    #[default]
    Standard,
    Express,
    Pickup,
}

wire_enum!(ShippingMethod, "shipping method", {
    Standard => "Standard",
    Express => "Express",
    Pickup => "Pickup",
});

/// Payment method chosen at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentMethod {
    Card,
    #[serde(rename = "Mobile Money")]
    MobileMoney,
    PayPal,
    #[serde(rename = "Cash on Delivery")]
    CashOnDelivery,
}

wire_enum!(PaymentMethod, "payment method", {
    Card => "Card",
    MobileMoney => "Mobile Money",
    PayPal => "PayPal",
    CashOnDelivery => "Cash on Delivery",
});

/// Catalog category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Smartphones,
    Laptops,
    Tablets,
    Accessories,
    Others,
}

wire_enum!(Category, "category", {
    Smartphones => "smartphones",
    Laptops => "laptops",
    Tablets => "tablets",
    Accessories => "accessories",
    Others => "others",
});

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    User,
}

wire_enum!(Role, "role", {
    Admin => "admin",
    User => "user",
});

impl Role {
    /// Whether this role may use the back-office endpoints.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

/// How an account authenticates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    /// Email + password stored locally.
    #[default]
    Local,
    /// Google OAuth; no local password.
    Google,
}

wire_enum!(AuthProvider, "auth provider", {
    Local => "local",
    Google => "google",
});
