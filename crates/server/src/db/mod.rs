//! Persistence for accounts, catalog, carts and orders.
//!
//! Each aggregate has a repository trait with two implementations: a
//! `PostgreSQL` one used in production and an in-memory one used by tests and
//! `--in-memory` development runs. Handlers only ever see the traits.
//!
//! # Tables
//!
//! - `accounts` - Registered users and administrators
//! - `products` - Catalog entries (specs stored as JSONB)
//! - `cart_items` - One row per (account, product) line
//! - `orders` - Order snapshots (line items and address stored as JSONB)
//! - `tower_sessions.session` - Session storage (created by the session store)
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p techmart-cli -- migrate
//! ```

pub mod accounts;
pub mod carts;
pub mod memory;
pub mod orders;
pub mod products;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use techmart_core::{
    AccountId, Cart, Email, NewOrder, Order, OrderId, Product, ProductId, StatusChange,
};

use crate::models::{Account, NewAccount, ProductDraft, ProfileUpdate};

pub use accounts::PgAccountRepository;
pub use carts::PgCartRepository;
pub use orders::PgOrderRepository;
pub use products::PgProductRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map a unique-violation into `Conflict`, everything else into `Database`.
    pub(crate) fn from_insert(err: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && db_err.is_unique_violation()
        {
            return Self::Conflict(format!("{what} already exists"));
        }
        Self::Database(err)
    }

    pub(crate) fn corrupt(field: &str, err: impl std::fmt::Display) -> Self {
        Self::DataCorruption(format!("invalid {field} in database: {err}"))
    }
}

/// Account storage.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Look up an account by normalized email.
    async fn find_by_email(&self, email: &Email) -> Result<Option<Account>, RepositoryError>;

    /// Look up an account by id.
    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, RepositoryError>;

    /// Insert an account. Fails with `Conflict` when the email is taken.
    async fn create(&self, account: NewAccount) -> Result<Account, RepositoryError>;

    /// Apply a partial profile update. Fails with `NotFound` or `Conflict`.
    async fn update_profile(
        &self,
        id: AccountId,
        update: ProfileUpdate,
    ) -> Result<Account, RepositoryError>;
}

/// Catalog storage.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Every product, newest first.
    async fn list(&self) -> Result<Vec<Product>, RepositoryError>;

    async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// The subset of `ids` that exist, in no particular order.
    async fn get_many(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError>;

    async fn create(&self, draft: ProductDraft) -> Result<Product, RepositoryError>;

    /// Replace every editable field. Fails with `NotFound`.
    async fn update(&self, id: ProductId, draft: ProductDraft) -> Result<Product, RepositoryError>;

    /// Delete a product, returning whether it existed.
    async fn delete(&self, id: ProductId) -> Result<bool, RepositoryError>;
}

/// Per-account cart storage.
#[async_trait]
pub trait CartRepository: Send + Sync {
    /// The account's cart; empty when none was saved.
    async fn load(&self, account: AccountId) -> Result<Cart, RepositoryError>;

    /// Replace the account's cart with `cart`.
    async fn save(&self, account: AccountId, cart: &Cart) -> Result<(), RepositoryError>;
}

/// Order storage.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Persist a new `pending`/`unpaid` order.
    async fn create(&self, order: NewOrder) -> Result<Order, RepositoryError>;

    async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// Orders placed by `account`, newest first.
    async fn list_for_account(&self, account: AccountId) -> Result<Vec<Order>, RepositoryError>;

    /// Every order, newest first.
    async fn list_all(&self) -> Result<Vec<Order>, RepositoryError>;

    /// Write `change.to` if the stored order is still at `change.from`.
    ///
    /// Returns `None` when the order moved in the meantime (or vanished).
    async fn update_status(
        &self,
        id: OrderId,
        change: StatusChange,
        now: DateTime<Utc>,
    ) -> Result<Option<Order>, RepositoryError>;
}

/// The full set of repositories the server runs against.
#[derive(Clone)]
pub struct Repositories {
    pub accounts: Arc<dyn AccountRepository>,
    pub products: Arc<dyn ProductRepository>,
    pub carts: Arc<dyn CartRepository>,
    pub orders: Arc<dyn OrderRepository>,
}

impl Repositories {
    /// `PostgreSQL`-backed repositories sharing one pool.
    #[must_use]
    pub fn postgres(pool: &PgPool) -> Self {
        Self {
            accounts: Arc::new(PgAccountRepository::new(pool.clone())),
            products: Arc::new(PgProductRepository::new(pool.clone())),
            carts: Arc::new(PgCartRepository::new(pool.clone())),
            orders: Arc::new(PgOrderRepository::new(pool.clone())),
        }
    }

    /// Process-local repositories; nothing survives a restart.
    #[must_use]
    pub fn in_memory() -> Self {
        let store = memory::InMemoryStore::default();
        Self {
            accounts: Arc::new(store.clone()),
            products: Arc::new(store.clone()),
            carts: Arc::new(store.clone()),
            orders: Arc::new(store),
        }
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
