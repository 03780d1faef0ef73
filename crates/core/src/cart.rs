//! Cart aggregate and the merge-on-login plan.
//!
//! A cart is an ordered list of `(product, quantity)` lines with at most one
//! line per product and every quantity at least 1. Totals and item counts
//! are always derived from the lines, never stored. No line exceeds
//! [`MAX_QUANTITY`].

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{Price, ProductId};

/// Largest quantity a single cart or order line, or a product's stock, may
/// hold.
pub const MAX_QUANTITY: u32 = 1_000_000;

/// Errors from cart mutations.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CartError {
    /// A quantity delta of zero changes nothing and is rejected.
    #[error("quantity must not be zero")]
    ZeroDelta,
    /// A negative delta was applied to a product that is not in the cart.
    #[error("product {0} is not in the cart")]
    NotInCart(ProductId),
    /// The resulting quantity does not fit a cart line.
    #[error("quantity for product {0} is too large")]
    QuantityOverflow(ProductId),
}

/// One cart line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl CartLine {
    /// Create a line.
    #[must_use]
    pub const fn new(product_id: ProductId, quantity: u32) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

/// A shopper's cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<CartLine>", into = "Vec<CartLine>")]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Build a cart from possibly messy lines: duplicate products are summed
    /// and zero-quantity lines dropped, keeping first-seen order.
    #[must_use]
    pub fn from_lines(lines: impl IntoIterator<Item = CartLine>) -> Self {
        let mut cart = Self::new();
        for line in lines {
            cart.add(line.product_id, line.quantity);
        }
        cart
    }

    /// The lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Quantity of a product, zero when absent.
    #[must_use]
    pub fn quantity_of(&self, product_id: ProductId) -> u32 {
        self.position(product_id)
            .and_then(|idx| self.lines.get(idx))
            .map_or(0, |line| line.quantity)
    }

    /// Increment an existing line or append a new one, capped at
    /// [`MAX_QUANTITY`]. Adding zero is a no-op.
    pub fn add(&mut self, product_id: ProductId, quantity: u32) {
        if quantity == 0 {
            return;
        }
        match self.position(product_id).and_then(|idx| self.lines.get_mut(idx)) {
            Some(line) => {
                line.quantity = line.quantity.saturating_add(quantity).min(MAX_QUANTITY);
            }
            None => self
                .lines
                .push(CartLine::new(product_id, quantity.min(MAX_QUANTITY))),
        }
    }

    /// Apply a signed quantity change, returning the new quantity.
    ///
    /// A result of zero or less removes the line.
    ///
    /// # Errors
    ///
    /// - `CartError::ZeroDelta` when `delta == 0`
    /// - `CartError::NotInCart` when decrementing an absent product
    /// - `CartError::QuantityOverflow` when the result exceeds [`MAX_QUANTITY`];
    ///   the cart is left untouched
    pub fn apply_delta(&mut self, product_id: ProductId, delta: i64) -> Result<u32, CartError> {
        if delta == 0 {
            return Err(CartError::ZeroDelta);
        }
        let current = self.quantity_of(product_id);
        if current == 0 && delta < 0 {
            return Err(CartError::NotInCart(product_id));
        }

        let next = i64::from(current).saturating_add(delta);
        if next <= 0 {
            self.remove(product_id);
            return Ok(0);
        }
        let next = u32::try_from(next)
            .ok()
            .filter(|q| *q <= MAX_QUANTITY)
            .ok_or(CartError::QuantityOverflow(product_id))?;
        self.set_quantity(product_id, i64::from(next));
        Ok(next)
    }

    /// Delete a line. Returns whether a line was removed.
    pub fn remove(&mut self, product_id: ProductId) -> bool {
        let before = self.lines.len();
        self.lines.retain(|line| line.product_id != product_id);
        self.lines.len() != before
    }

    /// Overwrite a line's quantity; zero or less removes it. Quantities above
    /// [`MAX_QUANTITY`] are clamped.
    pub fn set_quantity(&mut self, product_id: ProductId, quantity: i64) {
        if quantity <= 0 {
            self.remove(product_id);
            return;
        }
        let quantity = u32::try_from(quantity)
            .unwrap_or(MAX_QUANTITY)
            .min(MAX_QUANTITY);
        match self.position(product_id).and_then(|idx| self.lines.get_mut(idx)) {
            Some(line) => line.quantity = quantity,
            None => self.lines.push(CartLine::new(product_id, quantity)),
        }
    }

    /// Remove every line.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Sum of quantities.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.quantity)).sum()
    }

    /// Sum of price × quantity. Lines whose price is unknown count as zero.
    #[must_use]
    pub fn total<F>(&self, price_of: F) -> Decimal
    where
        F: Fn(ProductId) -> Option<Price>,
    {
        self.lines
            .iter()
            .filter_map(|line| price_of(line.product_id).map(|price| price.times(line.quantity)))
            .sum()
    }

    fn position(&self, product_id: ProductId) -> Option<usize> {
        self.lines
            .iter()
            .position(|line| line.product_id == product_id)
    }
}

impl From<Vec<CartLine>> for Cart {
    fn from(lines: Vec<CartLine>) -> Self {
        Self::from_lines(lines)
    }
}

impl From<Cart> for Vec<CartLine> {
    fn from(cart: Cart) -> Self {
        cart.lines
    }
}

/// One increment the merge issues against the server cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeStep {
    pub product_id: ProductId,
    pub delta: u32,
}

/// Compute the increments that reconcile a locally held cart into the
/// server cart.
///
/// For every local product, `delta = local - server`; only positive deltas
/// produce a step, so applying the plan never lowers a server quantity and
/// leaves each product at `max(server, local)`.
#[must_use]
pub fn merge_plan(local: &Cart, server: &Cart) -> Vec<MergeStep> {
    local
        .lines()
        .iter()
        .filter_map(|line| {
            let server_qty = server.quantity_of(line.product_id);
            line.quantity
                .checked_sub(server_qty)
                .filter(|delta| *delta > 0)
                .map(|delta| MergeStep {
                    product_id: line.product_id,
                    delta,
                })
        })
        .collect()
}
