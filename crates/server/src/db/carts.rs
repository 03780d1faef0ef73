//! Cart repository backed by `PostgreSQL`.
//!
//! A cart is stored as one `cart_items` row per line. Saving replaces every
//! row of the account inside a transaction.

use async_trait::async_trait;
use sqlx::PgPool;

use techmart_core::{AccountId, Cart, CartLine, ProductId};

use super::{CartRepository, RepositoryError};

#[derive(sqlx::FromRow)]
struct CartItemRow {
    product_id: i32,
    quantity: i32,
}

/// Repository for cart database operations.
pub struct PgCartRepository {
    pool: PgPool,
}

impl PgCartRepository {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CartRepository for PgCartRepository {
    async fn load(&self, account: AccountId) -> Result<Cart, RepositoryError> {
        let rows = sqlx::query_as::<_, CartItemRow>(
            "SELECT product_id, quantity FROM cart_items \
             WHERE account_id = $1 ORDER BY position",
        )
        .bind(account)
        .fetch_all(&self.pool)
        .await?;

        let lines = rows
            .into_iter()
            .map(|row| {
                let quantity = u32::try_from(row.quantity)
                    .map_err(|e| RepositoryError::corrupt("cart quantity", e))?;
                Ok(CartLine::new(ProductId::new(row.product_id), quantity))
            })
            .collect::<Result<Vec<_>, RepositoryError>>()?;
        Ok(Cart::from_lines(lines))
    }

    async fn save(&self, account: AccountId, cart: &Cart) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM cart_items WHERE account_id = $1")
            .bind(account)
            .execute(&mut *tx)
            .await?;

        for (position, line) in cart.lines().iter().enumerate() {
            let quantity = i32::try_from(line.quantity)
                .map_err(|_| RepositoryError::Conflict("cart quantity too large".to_owned()))?;
            let position = i32::try_from(position)
                .map_err(|_| RepositoryError::Conflict("cart has too many lines".to_owned()))?;
            sqlx::query(
                "INSERT INTO cart_items (account_id, product_id, quantity, position) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(account)
            .bind(line.product_id)
            .bind(quantity)
            .bind(position)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
