//! Client-side cart store.
//!
//! The store is the shopper's view of the cart. Every change is written to
//! storage at once. While an [`ApiClient`] is attached (the shopper is signed
//! in) each change is also sent to the server; a failed mirror call is
//! logged and otherwise ignored, the local change stands.

use rust_decimal::Decimal;
use techmart_core::api::CartItemView;
use techmart_core::{Cart, CartLine, MAX_QUANTITY, ProductId, ProductSummary, merge_plan};

use crate::api::ApiClient;
use crate::storage::Storage;

/// Storage key of the persisted cart.
pub const CART_KEY: &str = "cart";

/// What a merge-on-login did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Increments the server accepted.
    pub applied: usize,
    /// Increments that failed and were skipped.
    pub failed: usize,
    /// Whether the local cart was replaced by the server cart.
    pub replaced: bool,
}

/// The shopper's cart, persisted through `S`.
pub struct CartStore<S: Storage> {
    items: Vec<CartItemView>,
    storage: S,
    remote: Option<ApiClient>,
}

impl<S: Storage> CartStore<S> {
    /// Restore the cart saved in `storage`.
    ///
    /// Missing or unreadable data yields an empty cart.
    pub fn load(storage: S) -> Self {
        let items = match storage.get(CART_KEY) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Discarding unreadable saved cart");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read saved cart");
                Vec::new()
            }
        };
        Self {
            items,
            storage,
            remote: None,
        }
    }

    #[must_use]
    pub fn items(&self) -> &[CartItemView] {
        &self.items
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Quantity of a product, zero when absent.
    #[must_use]
    pub fn quantity_of(&self, product_id: ProductId) -> u32 {
        self.position(product_id)
            .and_then(|idx| self.items.get(idx))
            .map_or(0, |item| item.quantity)
    }

    /// Sum of price × quantity.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.items
            .iter()
            .map(|item| item.product.price.times(item.quantity))
            .sum()
    }

    /// Sum of quantities.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    /// The backing storage.
    #[must_use]
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    /// Mirror later changes to the server through `client`.
    pub fn attach(&mut self, client: ApiClient) {
        self.remote = Some(client);
    }

    /// Stop mirroring, e.g. after logout. The local cart is kept.
    pub fn detach(&mut self) {
        self.remote = None;
    }

    #[must_use]
    pub const fn is_attached(&self) -> bool {
        self.remote.is_some()
    }

    /// Add `quantity` units of a product, appending a line if needed. A
    /// line never exceeds [`MAX_QUANTITY`].
    pub async fn add(&mut self, product: ProductSummary, quantity: u32) {
        let quantity = quantity.min(MAX_QUANTITY);
        if quantity == 0 {
            return;
        }
        let product_id = product.id;
        match self.position(product_id).and_then(|idx| self.items.get_mut(idx)) {
            Some(item) => {
                item.quantity = item.quantity.saturating_add(quantity).min(MAX_QUANTITY);
                item.product = product;
            }
            None => self.items.push(CartItemView { product, quantity }),
        }
        self.persist();

        if let Some(client) = &self.remote
            && let Err(e) = client.adjust_cart(product_id, i64::from(quantity)).await
        {
            tracing::warn!(error = %e, %product_id, "Failed to mirror cart add");
        }
    }

    /// Delete a product line.
    pub async fn remove(&mut self, product_id: ProductId) {
        let before = self.items.len();
        self.items.retain(|item| item.product.id != product_id);
        if self.items.len() == before {
            return;
        }
        self.persist();

        if let Some(client) = &self.remote
            && let Err(e) = client.remove_from_cart(product_id).await
        {
            tracing::warn!(error = %e, %product_id, "Failed to mirror cart removal");
        }
    }

    /// Overwrite a line's quantity; zero or less removes the line. Products
    /// not in the cart are ignored.
    pub async fn set_quantity(&mut self, product_id: ProductId, quantity: i64) {
        if quantity <= 0 {
            self.remove(product_id).await;
            return;
        }
        let quantity = u32::try_from(quantity)
            .unwrap_or(MAX_QUANTITY)
            .min(MAX_QUANTITY);
        let Some(item) = self
            .position(product_id)
            .and_then(|idx| self.items.get_mut(idx))
        else {
            return;
        };
        let delta = i64::from(quantity) - i64::from(item.quantity);
        if delta == 0 {
            return;
        }
        item.quantity = quantity;
        self.persist();

        if let Some(client) = &self.remote
            && let Err(e) = client.adjust_cart(product_id, delta).await
        {
            tracing::warn!(error = %e, %product_id, "Failed to mirror cart quantity");
        }
    }

    /// Empty the local cart. The server cart is left alone.
    pub fn clear(&mut self) {
        self.items.clear();
        self.persist();
    }

    /// Reconcile the local cart into the server cart after sign-in.
    ///
    /// Every local line above its server quantity is topped up on the
    /// server; server quantities never go down. The server cart then
    /// replaces the local one. A failed increment is logged and skipped. If
    /// the server cart cannot be fetched the local cart is left untouched.
    /// Either way `client` is attached for later changes.
    pub async fn merge_on_login(&mut self, client: ApiClient) -> MergeReport {
        let mut report = MergeReport::default();
        self.remote = Some(client.clone());

        let server = match client.cart().await {
            Ok(server) => server,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch server cart; keeping local cart");
                return report;
            }
        };

        let local = Cart::from_lines(self.lines());
        let server_cart = Cart::from_lines(
            server
                .items
                .iter()
                .map(|item| CartLine::new(item.product.id, item.quantity)),
        );

        for step in merge_plan(&local, &server_cart) {
            match client
                .adjust_cart(step.product_id, i64::from(step.delta))
                .await
            {
                Ok(_) => report.applied += 1,
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        product_id = %step.product_id,
                        "Failed to merge cart line; skipping"
                    );
                    report.failed += 1;
                }
            }
        }

        match client.cart().await {
            Ok(merged) => {
                self.items = merged.items;
                self.persist();
                report.replaced = true;
            }
            Err(e) => tracing::warn!(error = %e, "Failed to reload merged cart"),
        }

        tracing::info!(
            applied = report.applied,
            failed = report.failed,
            "Cart merged on login"
        );
        report
    }

    fn lines(&self) -> Vec<CartLine> {
        self.items
            .iter()
            .map(|item| CartLine::new(item.product.id, item.quantity))
            .collect()
    }

    fn position(&self, product_id: ProductId) -> Option<usize> {
        self.items
            .iter()
            .position(|item| item.product.id == product_id)
    }

    fn persist(&mut self) {
        let result = serde_json::to_string(&self.items)
            .map_err(|e| e.to_string())
            .and_then(|raw| {
                self.storage
                    .set(CART_KEY, &raw)
                    .map_err(|e| e.to_string())
            });
        if let Err(error) = result {
            tracing::warn!(%error, "Failed to persist cart");
        }
    }
}
