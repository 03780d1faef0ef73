//! JSON contract of the REST API.
//!
//! Server handlers serialize these types and the client deserializes them, so
//! each endpoint has exactly one response shape. Success bodies carry
//! `"success": true` plus one payload key; error bodies are [`ApiMessage`]
//! with `"success": false`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::order::Order;
use crate::product::{Product, ProductSummary};
use crate::types::{AccountId, AuthProvider, Category, Email, ProductId, Role};

/// Public view of an account. Never includes the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub id: AccountId,
    pub username: String,
    pub email: Email,
    #[serde(default)]
    pub phone_number: Option<String>,
    pub role: Role,
    pub provider: AuthProvider,
    pub created_at: DateTime<Utc>,
}

/// `POST /api/account/register`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
}

/// `POST /api/account/login`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// `PUT /api/account/update`. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAccountRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

/// `{"success": true, "message": ..., "account": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub account: AccountView,
}

/// `GET /api/dashboard`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardResponse {
    pub success: bool,
    pub message: String,
    pub account: AccountView,
}

/// Query string of `GET /api/products`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub featured: Option<bool>,
}

impl ProductQuery {
    /// Whether `product` passes every filter that is set.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        self.category.is_none_or(|c| c == product.category)
            && self.featured.is_none_or(|f| f == product.featured)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductsResponse {
    pub success: bool,
    pub products: Vec<Product>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub product: Product,
}

/// `POST /api/cart`: a signed quantity change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartAdjustRequest {
    pub product_id: ProductId,
    #[serde(default = "one")]
    pub quantity: i64,
}

const fn one() -> i64 {
    1
}

/// A cart line joined with its product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItemView {
    pub product: ProductSummary,
    pub quantity: u32,
}

/// The caller's cart with derived totals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub item_count: u64,
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
}

impl CartView {
    /// Build a view from joined lines, deriving count and subtotal.
    #[must_use]
    pub fn from_items(items: Vec<CartItemView>) -> Self {
        let item_count = items.iter().map(|i| u64::from(i.quantity)).sum();
        let subtotal = items
            .iter()
            .map(|i| i.product.price.times(i.quantity))
            .sum();
        Self {
            items,
            item_count,
            subtotal,
        }
    }

    /// Quantity of a product in this view, zero when absent.
    #[must_use]
    pub fn quantity_of(&self, product_id: ProductId) -> u32 {
        self.items
            .iter()
            .find(|i| i.product.id == product_id)
            .map_or(0, |i| i.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub cart: CartView,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrdersResponse {
    pub success: bool,
    pub orders: Vec<Order>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub order: Order,
}

/// Body with only a message: every error, and payload-free successes such as
/// logout or product deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiMessage {
    pub success: bool,
    pub message: String,
}

impl ApiMessage {
    #[must_use]
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::product::fixtures::product;

    #[test]
    fn test_cart_view_derives_totals() {
        let view = CartView::from_items(vec![
            CartItemView {
                product: product(1, "10.50").summary(),
                quantity: 2,
            },
            CartItemView {
                product: product(2, "3.25").summary(),
                quantity: 1,
            },
        ]);
        assert_eq!(view.item_count, 3);
        assert_eq!(view.subtotal, Decimal::new(2425, 2));
        assert_eq!(view.quantity_of(ProductId::new(2)), 1);
        assert_eq!(view.quantity_of(ProductId::new(3)), 0);

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["itemCount"], 3);
        assert_eq!(json["subtotal"], 24.25);
    }

    #[test]
    fn test_cart_adjust_defaults_to_one() {
        let req: CartAdjustRequest = serde_json::from_value(json!({"productId": 5})).unwrap();
        assert_eq!(req.quantity, 1);
        assert!(serde_json::from_value::<CartAdjustRequest>(json!({"quantity": 2})).is_err());
    }

    #[test]
    fn test_product_query_matches() {
        let mut p = product(1, "10");
        p.featured = true;
        assert!(ProductQuery::default().matches(&p));
        let query = ProductQuery {
            category: Some(Category::Laptops),
            featured: None,
        };
        assert!(!query.matches(&p));
        let query = ProductQuery {
            category: Some(Category::Smartphones),
            featured: Some(true),
        };
        assert!(query.matches(&p));
    }

    #[test]
    fn test_error_envelope() {
        let json = serde_json::to_value(ApiMessage::error("Order not found")).unwrap();
        assert_eq!(json, json!({"success": false, "message": "Order not found"}));
    }
}
