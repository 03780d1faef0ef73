//! Order placement, reads and status transitions.
//!
//! Totals are always priced from the catalog at placement time. The total a
//! client submits is only compared and logged.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::instrument;

use techmart_core::{
    AccountId, CheckoutError, CheckoutRequest, LineItem, NewOrder, Order, OrderId, ProductId,
    Role, StatusChange, TransitionError, price_order,
};

use crate::db::{OrderRepository, ProductRepository, RepositoryError};

/// Largest tolerated gap between the client's total and the server's.
const TOTAL_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Errors from order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    #[error("Unknown product: {0}")]
    UnknownProduct(ProductId),

    #[error("Order total is too large")]
    TotalTooLarge,

    #[error("Invalid order id")]
    InvalidId,

    #[error("Order not found")]
    NotFound,

    #[error("Not authorized")]
    Forbidden,

    #[error(transparent)]
    Transition(#[from] TransitionError),

    /// Another request changed the order status first.
    #[error("Order status changed, please reload")]
    Conflict,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Parse a path segment into an order id.
///
/// # Errors
///
/// Returns `OrderError::InvalidId` unless the segment is a positive integer.
pub fn parse_order_id(raw: &str) -> Result<OrderId, OrderError> {
    raw.parse().map_err(|_| OrderError::InvalidId)
}

/// Order operations.
#[derive(Clone)]
pub struct OrderService {
    orders: Arc<dyn OrderRepository>,
    products: Arc<dyn ProductRepository>,
}

impl OrderService {
    /// Create an order service.
    #[must_use]
    pub fn new(orders: Arc<dyn OrderRepository>, products: Arc<dyn ProductRepository>) -> Self {
        Self { orders, products }
    }

    /// Validate a checkout and persist it as a `pending`/`unpaid` order.
    ///
    /// # Errors
    ///
    /// - `OrderError::Checkout` for the first invalid field
    /// - `OrderError::UnknownProduct` when a line names no catalog product
    /// - `OrderError::TotalTooLarge` when the priced total cannot be stored
    #[instrument(skip(self, request))]
    pub async fn place(
        &self,
        account: AccountId,
        request: &CheckoutRequest,
    ) -> Result<Order, OrderError> {
        let draft = request.validate()?;

        let ids: Vec<ProductId> = draft.lines.iter().map(|(id, _)| *id).collect();
        let catalog: HashMap<ProductId, _> = self
            .products
            .get_many(&ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let products = draft
            .lines
            .iter()
            .map(|&(product_id, quantity)| {
                let product = catalog
                    .get(&product_id)
                    .ok_or(OrderError::UnknownProduct(product_id))?;
                Ok(LineItem {
                    product_id,
                    name: product.name.clone(),
                    quantity,
                    unit_price: product.price,
                })
            })
            .collect::<Result<Vec<_>, OrderError>>()?;

        let totals = price_order(&products, draft.shipping_method);
        if !totals.within_limit() {
            return Err(OrderError::TotalTooLarge);
        }
        let off_by = totals
            .total
            .checked_sub(draft.client_total)
            .map(|diff| diff.abs());
        if off_by.is_none_or(|diff| diff > TOTAL_TOLERANCE) {
            tracing::warn!(
                client_total = %draft.client_total,
                server_total = %totals.total,
                "Client total differs from catalog pricing; using server total"
            );
        }

        let order = self
            .orders
            .create(NewOrder {
                account_id: account,
                products,
                totals,
                shipping_address: draft.shipping_address,
                shipping_method: draft.shipping_method,
                payment_method: draft.payment_method,
            })
            .await?;
        tracing::info!(order_id = %order.id, total = %order.total_amount, "Order placed");
        Ok(order)
    }

    /// The caller's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub async fn list_mine(&self, account: AccountId) -> Result<Vec<Order>, OrderError> {
        Ok(self.orders.list_for_account(account).await?)
    }

    /// Every order, newest first. Callers must already be admins.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub async fn list_all(&self) -> Result<Vec<Order>, OrderError> {
        Ok(self.orders.list_all().await?)
    }

    /// One order, visible to its owner and to admins.
    ///
    /// # Errors
    ///
    /// `OrderError::NotFound` or `OrderError::Forbidden`.
    #[instrument(skip(self))]
    pub async fn get(
        &self,
        id: OrderId,
        viewer: AccountId,
        role: Role,
    ) -> Result<Order, OrderError> {
        let order = self.orders.get(id).await?.ok_or(OrderError::NotFound)?;
        if !order.can_be_viewed_by(viewer, role) {
            return Err(OrderError::Forbidden);
        }
        Ok(order)
    }

    /// Cancel a pending order. Owner only.
    ///
    /// # Errors
    ///
    /// - `OrderError::Transition` unless the order is pending
    /// - `OrderError::Conflict` when a concurrent transition won
    #[instrument(skip(self))]
    pub async fn cancel(&self, id: OrderId, owner: AccountId) -> Result<Order, OrderError> {
        self.transition(id, owner, Order::cancel).await
    }

    /// Mark an unpaid order as paid. Owner only.
    ///
    /// # Errors
    ///
    /// - `OrderError::Transition` when already paid, cancelled or completed
    /// - `OrderError::Conflict` when a concurrent transition won
    #[instrument(skip(self))]
    pub async fn pay(&self, id: OrderId, owner: AccountId) -> Result<Order, OrderError> {
        self.transition(id, owner, Order::mark_paid).await
    }

    async fn transition<F>(
        &self,
        id: OrderId,
        owner: AccountId,
        apply: F,
    ) -> Result<Order, OrderError>
    where
        F: FnOnce(&mut Order, DateTime<Utc>) -> Result<StatusChange, TransitionError>,
    {
        let mut order = self.orders.get(id).await?.ok_or(OrderError::NotFound)?;
        if !order.is_owned_by(owner) {
            return Err(OrderError::Forbidden);
        }

        let now = Utc::now();
        let change = apply(&mut order, now)?;
        let updated = self
            .orders
            .update_status(id, change, now)
            .await?
            .ok_or(OrderError::Conflict)?;
        tracing::info!(
            order_id = %id,
            order_status = %updated.order_status,
            payment_status = %updated.payment_status,
            "Order status changed"
        );
        Ok(updated)
    }
}
