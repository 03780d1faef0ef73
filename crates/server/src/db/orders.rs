//! Order repository backed by `PostgreSQL`.
//!
//! Line items and the shipping address are immutable snapshots, so they are
//! stored as JSONB. Status updates are compare-and-set on both status columns.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::types::Json;

use techmart_core::{
    AccountId, LineItem, NewOrder, Order, OrderId, ShippingAddress, StatusChange,
};

use super::{OrderRepository, RepositoryError};

const ORDER_COLUMNS: &str = "id, account_id, products, subtotal, shipping_cost, tax, total_amount, \
                             shipping_address, shipping_method, payment_method, order_status, \
                             payment_status, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: i32,
    account_id: i32,
    products: Json<Vec<LineItem>>,
    subtotal: Decimal,
    shipping_cost: Decimal,
    tax: Decimal,
    total_amount: Decimal,
    shipping_address: Json<ShippingAddress>,
    shipping_method: String,
    payment_method: String,
    order_status: String,
    payment_status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: OrderId::new(row.id),
            account_id: AccountId::new(row.account_id),
            products: row.products.0,
            subtotal: row.subtotal,
            shipping_cost: row.shipping_cost,
            tax: row.tax,
            total_amount: row.total_amount,
            shipping_address: row.shipping_address.0,
            shipping_method: row
                .shipping_method
                .parse()
                .map_err(|e| RepositoryError::corrupt("shipping_method", e))?,
            payment_method: row
                .payment_method
                .parse()
                .map_err(|e| RepositoryError::corrupt("payment_method", e))?,
            order_status: row
                .order_status
                .parse()
                .map_err(|e| RepositoryError::corrupt("order_status", e))?,
            payment_status: row
                .payment_status
                .parse()
                .map_err(|e| RepositoryError::corrupt("payment_status", e))?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_orders(rows: Vec<OrderRow>) -> Result<Vec<Order>, RepositoryError> {
    rows.into_iter().map(Order::try_from).collect()
}

/// Repository for order database operations.
pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn create(&self, order: NewOrder) -> Result<Order, RepositoryError> {
        let sql = format!(
            "INSERT INTO orders \
                 (account_id, products, subtotal, shipping_cost, tax, total_amount, \
                  shipping_address, shipping_method, payment_method) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {ORDER_COLUMNS}"
        );
        sqlx::query_as::<_, OrderRow>(&sql)
            .bind(order.account_id)
            .bind(Json(&order.products))
            .bind(order.totals.subtotal)
            .bind(order.totals.shipping)
            .bind(order.totals.tax)
            .bind(order.totals.total)
            .bind(Json(&order.shipping_address))
            .bind(order.shipping_method.as_str())
            .bind(order.payment_method.as_str())
            .fetch_one(&self.pool)
            .await?
            .try_into()
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Order::try_from)
            .transpose()
    }

    async fn list_for_account(&self, account: AccountId) -> Result<Vec<Order>, RepositoryError> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE account_id = $1 \
             ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(account)
            .fetch_all(&self.pool)
            .await?;
        into_orders(rows)
    }

    async fn list_all(&self) -> Result<Vec<Order>, RepositoryError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC, id DESC");
        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        into_orders(rows)
    }

    async fn update_status(
        &self,
        id: OrderId,
        change: StatusChange,
        now: DateTime<Utc>,
    ) -> Result<Option<Order>, RepositoryError> {
        let sql = format!(
            "UPDATE orders SET order_status = $4, payment_status = $5, updated_at = $6 \
             WHERE id = $1 AND order_status = $2 AND payment_status = $3 \
             RETURNING {ORDER_COLUMNS}"
        );
        sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id)
            .bind(change.from.order_status.as_str())
            .bind(change.from.payment_status.as_str())
            .bind(change.to.order_status.as_str())
            .bind(change.to.payment_status.as_str())
            .bind(now)
            .fetch_optional(&self.pool)
            .await?
            .map(Order::try_from)
            .transpose()
    }
}
