//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ServerConfig;
use crate::db::Repositories;
use crate::services::auth::AuthService;
use crate::services::cart::CartService;
use crate::services::catalog::CatalogService;
use crate::services::images::{CloudinaryClient, DisabledImageHost, ImageHost};
use crate::services::orders::OrderService;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// configuration and the services built on top of the repositories.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    pool: Option<PgPool>,
    auth: AuthService,
    catalog: CatalogService,
    carts: CartService,
    orders: OrderService,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Server configuration
    /// * `repos` - Storage the services run against
    /// * `images` - Product image host
    /// * `pool` - `PostgreSQL` pool, probed by the readiness check when present
    #[must_use]
    pub fn new(
        config: ServerConfig,
        repos: Repositories,
        images: Arc<dyn ImageHost>,
        pool: Option<PgPool>,
    ) -> Self {
        let auth = AuthService::new(Arc::clone(&repos.accounts));
        let catalog = CatalogService::new(Arc::clone(&repos.products), images);
        let carts = CartService::new(Arc::clone(&repos.carts), Arc::clone(&repos.products));
        let orders = OrderService::new(Arc::clone(&repos.orders), Arc::clone(&repos.products));

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                auth,
                catalog,
                carts,
                orders,
            }),
        }
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get the database pool, if running against `PostgreSQL`.
    #[must_use]
    pub fn pool(&self) -> Option<&PgPool> {
        self.inner.pool.as_ref()
    }

    #[must_use]
    pub fn auth(&self) -> &AuthService {
        &self.inner.auth
    }

    #[must_use]
    pub fn catalog(&self) -> &CatalogService {
        &self.inner.catalog
    }

    #[must_use]
    pub fn carts(&self) -> &CartService {
        &self.inner.carts
    }

    #[must_use]
    pub fn orders(&self) -> &OrderService {
        &self.inner.orders
    }
}

/// The image host for this configuration: Cloudinary when configured,
/// otherwise one that rejects every upload.
#[must_use]
pub fn image_host(config: &ServerConfig) -> Arc<dyn ImageHost> {
    match &config.cloudinary {
        Some(cloudinary) => Arc::new(CloudinaryClient::new(cloudinary)),
        None => {
            tracing::warn!("Cloudinary is not configured; product image uploads are disabled");
            Arc::new(DisabledImageHost)
        }
    }
}
