//! Integration test harness for TechMart.
//!
//! [`TestServer`] runs the real router on an ephemeral local port with
//! in-memory repositories and sessions, so tests exercise HTTP, cookies and
//! JSON exactly as a deployed client would, without a database.
//!
//! ```rust,ignore
//! let server = TestServer::start().await?;
//! let client = server.client()?;
//! assert!(client.health().await?);
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use secrecy::SecretString;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_sessions::MemoryStore;

use techmart_client::{ApiClient, ClientError};
use techmart_core::api::RegisterRequest;
use techmart_core::{Category, Price, PriceError, Product, ProductSpecs, Role};
use techmart_server::db::RepositoryError;
use techmart_server::models::ProductDraft;
use techmart_server::services::auth::AuthError;
use techmart_server::services::catalog::CatalogError;
use techmart_server::services::images::DisabledImageHost;
use techmart_server::{AppState, Repositories, ServerConfig, router};

/// Password given to every account the harness creates.
pub const PASSWORD: &str = "password123";

/// A running server bound to `127.0.0.1:<ephemeral>`.
///
/// The server task is aborted on drop.
pub struct TestServer {
    base_url: String,
    repos: Repositories,
    state: AppState,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Start a server with empty in-memory storage.
    ///
    /// # Errors
    ///
    /// Returns an error if no local port can be bound.
    pub async fn start() -> std::io::Result<Self> {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await?;
        let addr = listener.local_addr()?;
        let base_url = format!("http://{addr}");

        let config = ServerConfig {
            database_url: None,
            host: addr.ip(),
            port: addr.port(),
            base_url: base_url.clone(),
            frontend_url: "http://localhost:3000".to_owned(),
            session_secret: SecretString::from("kQ8#vN2$wX5!pL9@mR4^tY7&zB3*cF6%"),
            rate_limit: false,
            cloudinary: None,
            sentry_dsn: None,
            sentry_environment: None,
        };

        let repos = Repositories::in_memory();
        let state = AppState::new(config, repos.clone(), Arc::new(DisabledImageHost), None);
        let app = router(state.clone(), MemoryStore::default());

        let handle = tokio::spawn(async move {
            let service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, service).await {
                tracing::error!(error = %e, "Test server stopped");
            }
        });

        Ok(Self {
            base_url,
            repos,
            state,
            handle,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// A fresh client with its own cookie jar.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be built.
    pub fn client(&self) -> Result<ApiClient, ClientError> {
        ApiClient::new(&self.base_url)
    }

    /// Register a shopper and return a client signed in as them.
    ///
    /// # Errors
    ///
    /// Returns an error if registration or login fails.
    pub async fn shopper(&self, username: &str) -> Result<ApiClient, ClientError> {
        let client = self.client()?;
        let email = format!("{username}@example.com");
        client
            .register(&RegisterRequest {
                username: Some(username.to_owned()),
                email: Some(email.clone()),
                password: Some(PASSWORD.to_owned()),
                phone_number: Some("0788123456".to_owned()),
            })
            .await?;
        client.login(&email, PASSWORD).await?;
        Ok(client)
    }

    /// Create an admin account directly and return a signed-in client.
    ///
    /// # Errors
    ///
    /// Returns an error if the account cannot be created or login fails.
    pub async fn admin(&self) -> Result<ApiClient, HarnessError> {
        let email = "admin@techmart.test";
        self.state
            .auth()
            .register_with_role(
                &RegisterRequest {
                    username: Some("admin".to_owned()),
                    email: Some(email.to_owned()),
                    password: Some(PASSWORD.to_owned()),
                    phone_number: Some("0788000000".to_owned()),
                },
                Role::Admin,
            )
            .await?;
        let client = self.client()?;
        client.login(email, PASSWORD).await?;
        Ok(client)
    }

    /// Insert a catalog product directly.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository rejects the draft or `price` is
    /// not a positive amount.
    pub async fn seed_product(&self, name: &str, price: &str) -> Result<Product, HarnessError> {
        let price = Price::parse(price)?;
        let product = self
            .repos
            .products
            .create(ProductDraft {
                name: name.to_owned(),
                description: format!("{name} description"),
                price,
                original_price: None,
                category: Category::Smartphones,
                brand: "Acme".to_owned(),
                image_url: format!("https://img.test/{}.jpg", name.replace(' ', "-")),
                images: Vec::new(),
                quantity: 25,
                featured: false,
                specs: ProductSpecs::default(),
            })
            .await?;
        Ok(product)
    }

    /// Delete a catalog product directly.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub async fn delete_product(&self, product: &Product) -> Result<(), HarnessError> {
        Ok(self.state.catalog().delete(product.id).await?)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Failures of harness setup steps.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Price(#[from] PriceError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
