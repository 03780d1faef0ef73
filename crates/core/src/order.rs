//! Order aggregate: line snapshots, pricing and status transitions.
//!
//! An order is written once at checkout. Afterwards only its two status axes
//! change, and only through [`Order::cancel`] and [`Order::mark_paid`].

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{
    AccountId, OrderId, OrderStatus, PaymentMethod, PaymentStatus, Price, ProductId, Role,
    ShippingMethod, round_money,
};

/// Subtotal at or above which shipping is free.
pub const FREE_SHIPPING_THRESHOLD: Decimal = Decimal::from_parts(100, 0, 0, false, 0);
/// Flat standard shipping fee (9.99).
pub const STANDARD_SHIPPING: Decimal = Decimal::from_parts(999, 0, 0, false, 2);
/// Flat express shipping fee (19.99).
pub const EXPRESS_SHIPPING: Decimal = Decimal::from_parts(1999, 0, 0, false, 2);
/// Sales tax applied to the subtotal (8%).
pub const TAX_RATE: Decimal = Decimal::from_parts(8, 0, 0, false, 2);
/// Exclusive upper bound on an order total (10^10), the width of the stored
/// money columns.
pub const ORDER_TOTAL_LIMIT: Decimal = Decimal::from_parts(1_410_065_408, 2, 0, false, 0);

/// Country used when a shipping address omits one.
pub const DEFAULT_COUNTRY: &str = "Rwanda";

/// Immutable snapshot of one purchased product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product_id: ProductId,
    /// Product name at purchase time.
    pub name: String,
    pub quantity: u32,
    /// Unit price at purchase time.
    #[serde(rename = "price")]
    pub unit_price: Price,
}

impl LineItem {
    /// Unit price × quantity.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price.times(self.quantity)
    }
}

/// Where an order ships.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub full_name: String,
    pub phone: String,
    #[serde(default = "default_country")]
    pub country: String,
    pub district: String,
    pub city: String,
}

fn default_country() -> String {
    DEFAULT_COUNTRY.to_owned()
}

/// Monetary breakdown of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTotals {
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub shipping: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub tax: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
}

impl OrderTotals {
    /// Whether every amount is below [`ORDER_TOTAL_LIMIT`].
    #[must_use]
    pub fn within_limit(&self) -> bool {
        self.total < ORDER_TOTAL_LIMIT
    }
}

/// Shipping fee for a subtotal.
#[must_use]
pub fn shipping_cost(subtotal: Decimal, method: ShippingMethod) -> Decimal {
    if subtotal >= FREE_SHIPPING_THRESHOLD {
        return Decimal::ZERO;
    }
    match method {
        ShippingMethod::Express => EXPRESS_SHIPPING,
        ShippingMethod::Standard => STANDARD_SHIPPING,
        ShippingMethod::Pickup => Decimal::ZERO,
    }
}

/// Price a set of lines for the given shipping method.
///
/// ```
/// use techmart_core::{LineItem, Price, ProductId, ShippingMethod, price_order};
///
/// let lines = [LineItem {
///     product_id: ProductId::new(1),
///     name: "Cable".to_owned(),
///     quantity: 2,
///     unit_price: Price::parse("22.75").unwrap(),
/// }];
/// let totals = price_order(&lines, ShippingMethod::Standard);
/// assert_eq!(totals.subtotal.to_string(), "45.50");
/// assert_eq!(totals.total.to_string(), "59.13");
/// ```
#[must_use]
pub fn price_order(lines: &[LineItem], method: ShippingMethod) -> OrderTotals {
    let subtotal = round_money(lines.iter().map(LineItem::line_total).sum());
    let shipping = shipping_cost(subtotal, method);
    let tax = round_money(subtotal * TAX_RATE);
    OrderTotals {
        subtotal,
        shipping,
        tax,
        total: round_money(subtotal + shipping + tax),
    }
}

/// Rejected status transitions.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Only pending orders can be cancelled")]
    NotPending,
    #[error("Order already paid")]
    AlreadyPaid,
    #[error("Only pending orders can be paid")]
    Closed,
}

/// Both status axes at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderState {
    pub order_status: OrderStatus,
    pub payment_status: PaymentStatus,
}

/// A transition that was applied in memory and must now be persisted.
///
/// Storage writes `to` only if the stored order is still at `from`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub from: OrderState,
    pub to: OrderState,
}

/// Everything needed to persist a new order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub account_id: AccountId,
    pub products: Vec<LineItem>,
    pub totals: OrderTotals,
    pub shipping_address: ShippingAddress,
    pub shipping_method: ShippingMethod,
    pub payment_method: PaymentMethod,
}

/// A persisted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub account_id: AccountId,
    pub products: Vec<LineItem>,
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub shipping_cost: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub tax: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    pub shipping_address: ShippingAddress,
    pub shipping_method: ShippingMethod,
    pub payment_method: PaymentMethod,
    pub order_status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Materialize a freshly stored order: `pending` and `unpaid`.
    #[must_use]
    pub fn from_new(id: OrderId, new: NewOrder, now: DateTime<Utc>) -> Self {
        Self {
            id,
            account_id: new.account_id,
            products: new.products,
            subtotal: new.totals.subtotal,
            shipping_cost: new.totals.shipping,
            tax: new.totals.tax,
            total_amount: new.totals.total,
            shipping_address: new.shipping_address,
            shipping_method: new.shipping_method,
            payment_method: new.payment_method,
            order_status: OrderStatus::Pending,
            payment_status: PaymentStatus::Unpaid,
            created_at: now,
            updated_at: now,
        }
    }

    /// The monetary breakdown.
    #[must_use]
    pub const fn totals(&self) -> OrderTotals {
        OrderTotals {
            subtotal: self.subtotal,
            shipping: self.shipping_cost,
            tax: self.tax,
            total: self.total_amount,
        }
    }

    /// Current position on both status axes.
    #[must_use]
    pub const fn state(&self) -> OrderState {
        OrderState {
            order_status: self.order_status,
            payment_status: self.payment_status,
        }
    }

    /// Whether `account` placed this order.
    #[must_use]
    pub fn is_owned_by(&self, account: AccountId) -> bool {
        self.account_id == account
    }

    /// Read access: the owner, or any admin.
    #[must_use]
    pub fn can_be_viewed_by(&self, account: AccountId, role: Role) -> bool {
        self.is_owned_by(account) || role.is_admin()
    }

    /// Move a pending order to `cancelled`.
    ///
    /// # Errors
    ///
    /// Returns `TransitionError::NotPending` for any other order status; the
    /// order is left untouched.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<StatusChange, TransitionError> {
        if self.order_status != OrderStatus::Pending {
            return Err(TransitionError::NotPending);
        }
        Ok(self.apply(
            OrderState {
                order_status: OrderStatus::Cancelled,
                payment_status: self.payment_status,
            },
            now,
        ))
    }

    /// Mark the order paid on both axes.
    ///
    /// # Errors
    ///
    /// Returns `TransitionError::AlreadyPaid` when the payment status is
    /// already `paid`, and `TransitionError::Closed` when the order was
    /// cancelled or completed. The order is left untouched.
    pub fn mark_paid(&mut self, now: DateTime<Utc>) -> Result<StatusChange, TransitionError> {
        if self.payment_status == PaymentStatus::Paid {
            return Err(TransitionError::AlreadyPaid);
        }
        if self.order_status.is_terminal() {
            return Err(TransitionError::Closed);
        }
        Ok(self.apply(
            OrderState {
                order_status: OrderStatus::Paid,
                payment_status: PaymentStatus::Paid,
            },
            now,
        ))
    }

    fn apply(&mut self, to: OrderState, now: DateTime<Utc>) -> StatusChange {
        let from = self.state();
        self.order_status = to.order_status;
        self.payment_status = to.payment_status;
        self.updated_at = now;
        StatusChange { from, to }
    }
}


#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::fixtures::{line, order};
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_price_order_standard() {
        let totals = price_order(&[line(1, 1, "30.00"), line(2, 1, "15.50")], ShippingMethod::Standard);
        assert_eq!(totals.subtotal, dec("45.50"));
        assert_eq!(totals.shipping, dec("9.99"));
        assert_eq!(totals.tax, dec("3.64"));
        assert_eq!(totals.total, dec("59.13"));
    }

    #[test]
    fn test_price_order_free_shipping_threshold() {
        let lines = [line(1, 2, "50")];
        let totals = price_order(&lines, ShippingMethod::Express);
        assert_eq!(totals.shipping, Decimal::ZERO);
        assert_eq!(totals.total, dec("108.00"));

        let totals = price_order(&[line(1, 1, "99.99")], ShippingMethod::Express);
        assert_eq!(totals.shipping, dec("19.99"));
    }

    #[test]
    fn test_total_limit() {
        assert_eq!(ORDER_TOTAL_LIMIT, Decimal::new(10_000_000_000, 0));
        assert!(price_order(&[line(1, 2, "45.50")], ShippingMethod::Standard).within_limit());

        // 1,000,000 units at the price ceiling
        let huge = price_order(&[line(1, 1_000_000, "1000000")], ShippingMethod::Standard);
        assert!(!huge.within_limit());
    }

    #[test]
    fn test_pickup_ships_free() {
        let totals = price_order(&[line(1, 1, "10")], ShippingMethod::Pickup);
        assert_eq!(totals.shipping, Decimal::ZERO);
        assert_eq!(totals.tax, dec("0.80"));
    }

    #[test]
    fn test_new_order_is_pending_unpaid() {
        let order = order(7);
        assert_eq!(order.order_status, OrderStatus::Pending);
        assert_eq!(order.payment_status, PaymentStatus::Unpaid);
        assert_eq!(order.totals().subtotal, dec("45.50"));
    }

    #[test]
    fn test_cancel_only_from_pending() {
        for status in OrderStatus::ALL {
            let mut order = order(1);
            order.order_status = *status;
            let before = order.clone();
            let result = order.cancel(Utc::now());
            if *status == OrderStatus::Pending {
                let change = result.unwrap();
                assert_eq!(change.from.order_status, OrderStatus::Pending);
                assert_eq!(order.order_status, OrderStatus::Cancelled);
                assert_eq!(order.payment_status, before.payment_status);
            } else {
                assert_eq!(result, Err(TransitionError::NotPending));
                assert_eq!(order, before);
            }
        }
    }

    #[test]
    fn test_pay_sets_both_axes_and_rejects_repeat() {
        let mut order = order(1);
        let change = order.mark_paid(Utc::now()).unwrap();
        assert_eq!(change.from.payment_status, PaymentStatus::Unpaid);
        assert_eq!(order.order_status, OrderStatus::Paid);
        assert_eq!(order.payment_status, PaymentStatus::Paid);

        let before = order.clone();
        assert_eq!(order.mark_paid(Utc::now()), Err(TransitionError::AlreadyPaid));
        assert_eq!(order, before);
    }

    #[test]
    fn test_cancel_after_pay_rejected() {
        let mut order = order(1);
        order.mark_paid(Utc::now()).unwrap();
        assert_eq!(order.cancel(Utc::now()), Err(TransitionError::NotPending));
    }

    #[test]
    fn test_pay_after_cancel_rejected() {
        let mut order = order(1);
        order.cancel(Utc::now()).unwrap();
        let before = order.clone();

        assert_eq!(order.mark_paid(Utc::now()), Err(TransitionError::Closed));
        assert_eq!(order, before);
        assert_eq!(order.order_status, OrderStatus::Cancelled);
        assert_eq!(order.payment_status, PaymentStatus::Unpaid);
    }

    #[test]
    fn test_pay_allowed_until_closed() {
        for status in OrderStatus::ALL {
            let mut order = order(1);
            order.order_status = *status;
            let result = order.mark_paid(Utc::now());
            if status.is_terminal() {
                assert_eq!(result, Err(TransitionError::Closed));
            } else {
                assert!(result.is_ok(), "{status:?} should accept payment");
            }
        }
    }

    #[test]
    fn test_visibility() {
        let order = order(3);
        assert!(order.can_be_viewed_by(AccountId::new(3), Role::User));
        assert!(order.can_be_viewed_by(AccountId::new(9), Role::Admin));
        assert!(!order.can_be_viewed_by(AccountId::new(9), Role::User));
    }

    #[test]
    fn test_address_country_defaults() {
        let address: ShippingAddress = serde_json::from_str(
            r#"{"fullName":"A","phone":"1","district":"D","city":"C"}"#,
        )
        .unwrap();
        assert_eq!(address.country, "Rwanda");
    }

    #[test]
    fn test_order_json_shape() {
        let json = serde_json::to_value(order(1)).unwrap();
        assert_eq!(json["orderStatus"], "pending");
        assert_eq!(json["paymentStatus"], "unpaid");
        assert_eq!(json["totalAmount"], 59.13);
        assert_eq!(json["products"][0]["price"], 30.0);
        assert_eq!(json["shippingMethod"], "Standard");
    }
}
