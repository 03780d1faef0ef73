//! HTTP client for the TechMart REST API.
//!
//! Every call returns the payload of the success body. Error bodies
//! (`{"success": false, "message"}`) become [`ClientError::Api`] carrying the
//! HTTP status and the server's message.

use std::sync::Arc;

use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::instrument;
use url::Url;

use techmart_core::api::{
    AccountResponse, AccountView, ApiMessage, CartAdjustRequest, CartResponse, CartView,
    DashboardResponse, LoginRequest, OrderResponse, OrdersResponse, ProductQuery,
    ProductResponse, ProductsResponse, RegisterRequest, UpdateAccountRequest,
};
use techmart_core::{
    Category, CheckoutRequest, Order, OrderId, Price, Product, ProductId, ProductSpecs,
};

use crate::error::ClientError;

/// Longest slice of an unparseable error body kept in the error message.
const ERROR_BODY_PREVIEW: usize = 200;

/// An image file to upload with a product form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Fields of the admin product form.
///
/// On update, `existing_image` and `existing_additional_images` name the
/// already-hosted images to keep; new files are appended after them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductUpload {
    pub name: String,
    pub description: String,
    pub price: Price,
    pub original_price: Option<Price>,
    pub quantity: u32,
    pub category: Category,
    pub brand: String,
    pub featured: bool,
    pub specs: ProductSpecs,
    pub image: Option<ImageFile>,
    pub additional_images: Vec<ImageFile>,
    pub existing_image: Option<String>,
    pub existing_additional_images: Vec<String>,
}

impl ProductUpload {
    fn into_form(self) -> Result<Form, ClientError> {
        let mut form = Form::new()
            .text("name", self.name)
            .text("description", self.description)
            .text("price", self.price.to_string())
            .text("quantity", self.quantity.to_string())
            .text("category", self.category.as_str())
            .text("brand", self.brand)
            .text("featured", self.featured.to_string())
            .text("specs", serde_json::to_string(&self.specs)?);
        if let Some(original) = self.original_price {
            form = form.text("originalPrice", original.to_string());
        }
        if let Some(existing) = self.existing_image {
            form = form.text("existingImage", existing);
        }
        for url in self.existing_additional_images {
            form = form.text("existingAdditionalImages", url);
        }
        if let Some(image) = self.image {
            form = form.part("image", image.into_part()?);
        }
        for image in self.additional_images {
            form = form.part("additionalImages", image.into_part()?);
        }
        Ok(form)
    }
}

impl ImageFile {
    fn into_part(self) -> Result<Part, ClientError> {
        Ok(Part::bytes(self.bytes)
            .file_name(self.file_name)
            .mime_str(&self.content_type)?)
    }
}

/// Client for the TechMart REST API.
///
/// Cheap to clone; clones share one connection pool and one cookie jar, so
/// a login through any clone authenticates all of them.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    http: reqwest::Client,
    base: Url,
}

impl ApiClient {
    /// Create a client for the server at `base_url`, e.g.
    /// `http://localhost:3001`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is malformed or the HTTP client cannot be
    /// built.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let mut base = Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let http = reqwest::Client::builder().cookie_store(true).build()?;
        Ok(Self {
            inner: Arc::new(ApiClientInner { http, base }),
        })
    }

    /// The server's base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base
    }

    fn url(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.inner.base.join(path)?)
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ClientError> {
        Ok(self.inner.http.request(method, self.url(path)?))
    }

    /// Send a request and decode the success body.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiMessage>(&body).map_or_else(
                |_| body.chars().take(ERROR_BODY_PREVIEW).collect(),
                |m| m.message,
            );
            tracing::debug!(status = status.as_u16(), %message, "API call rejected");
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(ERROR_BODY_PREVIEW).collect::<String>(),
                "Failed to parse API response"
            );
            ClientError::Json(e)
        })
    }

    // =========================================================================
    // Health
    // =========================================================================

    /// Whether the server answers its liveness probe.
    ///
    /// # Errors
    ///
    /// Returns an error if the server cannot be reached.
    pub async fn health(&self) -> Result<bool, ClientError> {
        let response = self.request(Method::GET, "health")?.send().await?;
        Ok(response.status().is_success())
    }

    // =========================================================================
    // Account
    // =========================================================================

    /// Create an account. Does not sign in.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` with 400 for invalid fields or 409 when the
    /// email is taken.
    #[instrument(skip(self, request))]
    pub async fn register(&self, request: &RegisterRequest) -> Result<AccountView, ClientError> {
        let body: AccountResponse = self
            .send(self.request(Method::POST, "api/account/register")?.json(request))
            .await?;
        Ok(body.account)
    }

    /// Sign in; the session cookie is kept for later calls.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` with 404 for an unknown email or 401 for a
    /// wrong password.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<AccountView, ClientError> {
        let request = LoginRequest {
            email: Some(email.to_owned()),
            password: Some(password.to_owned()),
        };
        let body: AccountResponse = self
            .send(self.request(Method::POST, "api/account/login")?.json(&request))
            .await?;
        Ok(body.account)
    }

    /// End the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let _: ApiMessage = self
            .send(self.request(Method::GET, "api/account/logout")?)
            .await?;
        Ok(())
    }

    /// Update the signed-in profile.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` with 401 when signed out or 400 for invalid
    /// fields.
    pub async fn update_account(
        &self,
        request: &UpdateAccountRequest,
    ) -> Result<AccountView, ClientError> {
        let body: AccountResponse = self
            .send(self.request(Method::PUT, "api/account/update")?.json(request))
            .await?;
        Ok(body.account)
    }

    /// The signed-in account.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` with 401 when signed out.
    pub async fn dashboard(&self) -> Result<AccountView, ClientError> {
        let body: DashboardResponse = self
            .send(self.request(Method::GET, "api/dashboard")?)
            .await?;
        Ok(body.account)
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// Products matching `query`, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub async fn products(&self, query: &ProductQuery) -> Result<Vec<Product>, ClientError> {
        let mut url = self.url("api/products")?;
        if query.category.is_some() || query.featured.is_some() {
            let mut pairs = url.query_pairs_mut();
            if let Some(category) = query.category {
                pairs.append_pair("category", category.as_str());
            }
            if let Some(featured) = query.featured {
                pairs.append_pair("featured", if featured { "true" } else { "false" });
            }
        }
        let body: ProductsResponse = self
            .send(self.inner.http.request(Method::GET, url))
            .await?;
        Ok(body.products)
    }

    /// One product.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` with 404 when the product does not exist.
    pub async fn product(&self, id: ProductId) -> Result<Product, ClientError> {
        let body: ProductResponse = self
            .send(self.request(Method::GET, &format!("api/products/{id}"))?)
            .await?;
        Ok(body.product)
    }

    /// Create a product. Admin only.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` with 400 for invalid fields or 403 for a
    /// non-admin session.
    pub async fn create_product(&self, upload: ProductUpload) -> Result<Product, ClientError> {
        let form = upload.into_form()?;
        let body: ProductResponse = self
            .send(self.request(Method::POST, "api/products/add")?.multipart(form))
            .await?;
        Ok(body.product)
    }

    /// Replace a product's fields. Admin only.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` with 404 for an unknown product.
    pub async fn update_product(
        &self,
        id: ProductId,
        upload: ProductUpload,
    ) -> Result<Product, ClientError> {
        let form = upload.into_form()?;
        let body: ProductResponse = self
            .send(
                self.request(Method::PUT, &format!("api/products/{id}"))?
                    .multipart(form),
            )
            .await?;
        Ok(body.product)
    }

    /// Delete a product. Admin only.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` with 404 for an unknown product.
    pub async fn delete_product(&self, id: ProductId) -> Result<(), ClientError> {
        let _: ApiMessage = self
            .send(self.request(Method::DELETE, &format!("api/products/{id}"))?)
            .await?;
        Ok(())
    }

    // =========================================================================
    // Cart
    // =========================================================================

    /// The signed-in account's cart.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` with 401 when signed out.
    pub async fn cart(&self) -> Result<CartView, ClientError> {
        let body: CartResponse = self.send(self.request(Method::GET, "api/cart")?).await?;
        Ok(body.cart)
    }

    /// Apply a signed quantity change to one cart line.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` with 400 for a zero change or 404 for an
    /// unknown product.
    #[instrument(skip(self))]
    pub async fn adjust_cart(
        &self,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<CartView, ClientError> {
        let request = CartAdjustRequest {
            product_id,
            quantity,
        };
        let body: CartResponse = self
            .send(self.request(Method::POST, "api/cart")?.json(&request))
            .await?;
        Ok(body.cart)
    }

    /// Remove a product line from the cart.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` with 404 when the product is not in the
    /// cart.
    #[instrument(skip(self))]
    pub async fn remove_from_cart(&self, product_id: ProductId) -> Result<CartView, ClientError> {
        let body: CartResponse = self
            .send(self.request(Method::DELETE, &format!("api/cart/{product_id}"))?)
            .await?;
        Ok(body.cart)
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// Place an order.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` with 400 and the validation message for an
    /// invalid submission.
    #[instrument(skip(self, request))]
    pub async fn create_order(&self, request: &CheckoutRequest) -> Result<Order, ClientError> {
        let body: OrderResponse = self
            .send(self.request(Method::POST, "api/orders")?.json(request))
            .await?;
        Ok(body.order)
    }

    /// The signed-in account's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` with 401 when signed out.
    pub async fn my_orders(&self) -> Result<Vec<Order>, ClientError> {
        let body: OrdersResponse = self.send(self.request(Method::GET, "api/orders")?).await?;
        Ok(body.orders)
    }

    /// Every order. Admin only.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` with 403 for a non-admin session.
    pub async fn all_orders(&self) -> Result<Vec<Order>, ClientError> {
        let body: OrdersResponse = self
            .send(self.request(Method::GET, "api/orders/all")?)
            .await?;
        Ok(body.orders)
    }

    /// One order, visible to its owner and to admins.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` with 403 for someone else's order or 404
    /// when it does not exist.
    pub async fn order(&self, id: OrderId) -> Result<Order, ClientError> {
        let body: OrderResponse = self
            .send(self.request(Method::GET, &format!("api/orders/{id}"))?)
            .await?;
        Ok(body.order)
    }

    /// Cancel a pending order.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` with 400 when the order is no longer
    /// pending.
    #[instrument(skip(self))]
    pub async fn cancel_order(&self, id: OrderId) -> Result<Order, ClientError> {
        let body: OrderResponse = self
            .send(self.request(Method::PUT, &format!("api/orders/{id}/cancel"))?)
            .await?;
        Ok(body.order)
    }

    /// Mark an order as paid.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` with 400 when the order is already paid.
    #[instrument(skip(self))]
    pub async fn pay_order(&self, id: OrderId) -> Result<Order, ClientError> {
        let body: OrderResponse = self
            .send(self.request(Method::POST, &format!("api/orders/{id}/pay"))?)
            .await?;
        Ok(body.order)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let client = ApiClient::new("http://localhost:3001/shop").unwrap();
        assert_eq!(client.base_url().as_str(), "http://localhost:3001/shop/");
        assert_eq!(
            client.url("api/cart").unwrap().as_str(),
            "http://localhost:3001/shop/api/cart"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            ApiClient::new("not a url"),
            Err(ClientError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_clones_share_state() {
        let client = ApiClient::new("http://localhost:3001").unwrap();
        let clone = client.clone();
        assert!(Arc::ptr_eq(&client.inner, &clone.inner));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_http_error() {
        // Port 9 (discard) is closed on test machines.
        let client = ApiClient::new("http://127.0.0.1:9").unwrap();
        assert!(matches!(client.cart().await, Err(ClientError::Http(_))));
    }
}
