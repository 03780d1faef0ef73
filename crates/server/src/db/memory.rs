//! In-memory implementations of every repository.
//!
//! Used by the test suites and by `techmart-server --in-memory`. Semantics
//! match the `PostgreSQL` repositories, including unique emails, cascading
//! product deletion out of carts and compare-and-set status updates.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use techmart_core::{
    AccountId, Cart, Email, NewOrder, Order, OrderId, Product, ProductId, StatusChange,
};

use super::{
    AccountRepository, CartRepository, OrderRepository, ProductRepository, RepositoryError,
};
use crate::models::{Account, NewAccount, ProductDraft, ProfileUpdate};

#[derive(Default)]
struct Tables {
    accounts: Vec<Account>,
    products: Vec<Product>,
    carts: HashMap<AccountId, Cart>,
    orders: Vec<Order>,
    next_account: i32,
    next_product: i32,
    next_order: i32,
}

fn next_id(counter: &mut i32) -> i32 {
    *counter += 1;
    *counter
}

/// Shared in-memory storage. Clones see the same data.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

fn newest_first<T>(items: &mut [T], key: impl Fn(&T) -> (DateTime<Utc>, i32)) {
    items.sort_by_key(|item| std::cmp::Reverse(key(item)));
}

#[async_trait]
impl AccountRepository for InMemoryStore {
    async fn find_by_email(&self, email: &Email) -> Result<Option<Account>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.accounts.iter().find(|a| &a.email == email).cloned())
    }

    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.accounts.iter().find(|a| a.id == id).cloned())
    }

    async fn create(&self, account: NewAccount) -> Result<Account, RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables.accounts.iter().any(|a| a.email == account.email) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }
        let now = Utc::now();
        let account = Account {
            id: AccountId::new(next_id(&mut tables.next_account)),
            username: account.username,
            email: account.email,
            password_hash: account.password_hash,
            phone_number: account.phone_number,
            role: account.role,
            provider: account.provider,
            created_at: now,
            updated_at: now,
        };
        tables.accounts.push(account.clone());
        Ok(account)
    }

    async fn update_profile(
        &self,
        id: AccountId,
        update: ProfileUpdate,
    ) -> Result<Account, RepositoryError> {
        let mut tables = self.tables.write().await;
        if let Some(email) = &update.email
            && tables.accounts.iter().any(|a| &a.email == email && a.id != id)
        {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }
        let account = tables
            .accounts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(RepositoryError::NotFound)?;
        if let Some(username) = update.username {
            account.username = username;
        }
        if let Some(email) = update.email {
            account.email = email;
        }
        if let Some(phone) = update.phone_number {
            account.phone_number = Some(phone);
        }
        account.updated_at = Utc::now();
        Ok(account.clone())
    }
}

fn build_product(id: ProductId, draft: ProductDraft, created_at: DateTime<Utc>) -> Product {
    Product {
        id,
        name: draft.name,
        description: draft.description,
        price: draft.price,
        original_price: draft.original_price,
        category: draft.category,
        brand: draft.brand,
        image_url: draft.image_url,
        images: draft.images,
        quantity: draft.quantity,
        featured: draft.featured,
        specs: draft.specs,
        created_at,
        updated_at: Utc::now(),
    }
}

#[async_trait]
impl ProductRepository for InMemoryStore {
    async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        let mut products = self.tables.read().await.products.clone();
        newest_first(&mut products, |p| (p.created_at, p.id.as_i32()));
        Ok(products)
    }

    async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.products.iter().find(|p| p.id == id).cloned())
    }

    async fn get_many(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .products
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect())
    }

    async fn create(&self, draft: ProductDraft) -> Result<Product, RepositoryError> {
        let mut tables = self.tables.write().await;
        let id = ProductId::new(next_id(&mut tables.next_product));
        let product = build_product(id, draft, Utc::now());
        tables.products.push(product.clone());
        Ok(product)
    }

    async fn update(&self, id: ProductId, draft: ProductDraft) -> Result<Product, RepositoryError> {
        let mut tables = self.tables.write().await;
        let slot = tables
            .products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(RepositoryError::NotFound)?;
        *slot = build_product(id, draft, slot.created_at);
        Ok(slot.clone())
    }

    async fn delete(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let mut tables = self.tables.write().await;
        let before = tables.products.len();
        tables.products.retain(|p| p.id != id);
        let removed = tables.products.len() != before;
        if removed {
            for cart in tables.carts.values_mut() {
                cart.remove(id);
            }
        }
        Ok(removed)
    }
}

#[async_trait]
impl CartRepository for InMemoryStore {
    async fn load(&self, account: AccountId) -> Result<Cart, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.carts.get(&account).cloned().unwrap_or_default())
    }

    async fn save(&self, account: AccountId, cart: &Cart) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        tables.carts.insert(account, cart.clone());
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for InMemoryStore {
    async fn create(&self, order: NewOrder) -> Result<Order, RepositoryError> {
        let mut tables = self.tables.write().await;
        let id = OrderId::new(next_id(&mut tables.next_order));
        let order = Order::from_new(id, order, Utc::now());
        tables.orders.push(order.clone());
        Ok(order)
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.orders.iter().find(|o| o.id == id).cloned())
    }

    async fn list_for_account(&self, account: AccountId) -> Result<Vec<Order>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut orders: Vec<Order> = tables
            .orders
            .iter()
            .filter(|o| o.is_owned_by(account))
            .cloned()
            .collect();
        newest_first(&mut orders, |o| (o.created_at, o.id.as_i32()));
        Ok(orders)
    }

    async fn list_all(&self) -> Result<Vec<Order>, RepositoryError> {
        let mut orders = self.tables.read().await.orders.clone();
        newest_first(&mut orders, |o| (o.created_at, o.id.as_i32()));
        Ok(orders)
    }

    async fn update_status(
        &self,
        id: OrderId,
        change: StatusChange,
        now: DateTime<Utc>,
    ) -> Result<Option<Order>, RepositoryError> {
        let mut tables = self.tables.write().await;
        let Some(order) = tables
            .orders
            .iter_mut()
            .find(|o| o.id == id && o.state() == change.from)
        else {
            return Ok(None);
        };
        order.order_status = change.to.order_status;
        order.payment_status = change.to.payment_status;
        order.updated_at = now;
        Ok(Some(order.clone()))
    }
}
