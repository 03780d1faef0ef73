//! Server-side carts of authenticated accounts.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::instrument;

use techmart_core::api::{CartAdjustRequest, CartItemView, CartView};
use techmart_core::{AccountId, Cart, ProductId};

use crate::db::{CartRepository, ProductRepository, RepositoryError};

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    #[error("quantity must be a non-zero integer")]
    ZeroQuantity,

    #[error("Product not found")]
    ProductNotFound,

    #[error("Product not in cart")]
    NotInCart,

    #[error("quantity is too large")]
    QuantityOverflow,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<techmart_core::CartError> for CartError {
    fn from(err: techmart_core::CartError) -> Self {
        match err {
            techmart_core::CartError::ZeroDelta => Self::ZeroQuantity,
            techmart_core::CartError::NotInCart(_) => Self::NotInCart,
            techmart_core::CartError::QuantityOverflow(_) => Self::QuantityOverflow,
        }
    }
}

/// Cart operations for one account at a time.
#[derive(Clone)]
pub struct CartService {
    carts: Arc<dyn CartRepository>,
    products: Arc<dyn ProductRepository>,
}

impl CartService {
    /// Create a cart service.
    #[must_use]
    pub fn new(carts: Arc<dyn CartRepository>, products: Arc<dyn ProductRepository>) -> Self {
        Self { carts, products }
    }

    /// The account's cart joined with current product data.
    ///
    /// # Errors
    ///
    /// Returns an error if a repository fails.
    #[instrument(skip(self))]
    pub async fn view(&self, account: AccountId) -> Result<CartView, CartError> {
        let cart = self.carts.load(account).await?;
        self.render(&cart).await
    }

    /// Apply a signed quantity change to one product line.
    ///
    /// # Errors
    ///
    /// - `CartError::ZeroQuantity` for a zero delta
    /// - `CartError::ProductNotFound` for an unknown product
    #[instrument(skip(self))]
    pub async fn adjust(
        &self,
        account: AccountId,
        request: CartAdjustRequest,
    ) -> Result<CartView, CartError> {
        if request.quantity == 0 {
            return Err(CartError::ZeroQuantity);
        }
        if self.products.get(request.product_id).await?.is_none() {
            return Err(CartError::ProductNotFound);
        }

        let mut cart = self.carts.load(account).await?;
        let quantity = cart.apply_delta(request.product_id, request.quantity)?;
        self.carts.save(account, &cart).await?;
        tracing::debug!(product_id = %request.product_id, quantity, "Cart line adjusted");
        self.render(&cart).await
    }

    /// Remove a product line entirely.
    ///
    /// # Errors
    ///
    /// Returns `CartError::NotInCart` when the product has no line.
    #[instrument(skip(self))]
    pub async fn remove(
        &self,
        account: AccountId,
        product_id: ProductId,
    ) -> Result<CartView, CartError> {
        let mut cart = self.carts.load(account).await?;
        if !cart.remove(product_id) {
            return Err(CartError::NotInCart);
        }
        self.carts.save(account, &cart).await?;
        self.render(&cart).await
    }

    /// Lines whose product has since disappeared are left out.
    async fn render(&self, cart: &Cart) -> Result<CartView, CartError> {
        let ids: Vec<ProductId> = cart.lines().iter().map(|l| l.product_id).collect();
        let products: HashMap<ProductId, _> = self
            .products
            .get_many(&ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let items = cart
            .lines()
            .iter()
            .filter_map(|line| {
                products.get(&line.product_id).map(|p| CartItemView {
                    product: p.summary(),
                    quantity: line.quantity,
                })
            })
            .collect();
        Ok(CartView::from_items(items))
    }
}
