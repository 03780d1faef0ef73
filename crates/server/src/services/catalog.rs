//! Product catalog.
//!
//! Reads go through a `moka` cache (5-minute TTL). Every admin write
//! invalidates the whole cache, so a listing never outlives a change made
//! through this service.

use std::sync::Arc;
use std::time::Duration;

use futures::future::try_join_all;
use moka::future::Cache;
use thiserror::Error;
use tracing::{debug, instrument};

use techmart_core::api::ProductQuery;
use techmart_core::{Category, MAX_QUANTITY, Price, Product, ProductId, ProductSpecs};

use super::images::{ImageHost, ImageHostError, ImageUpload, PRODUCT_FOLDER};
use crate::db::{ProductRepository, RepositoryError};
use crate::models::ProductDraft;

/// Most additional images accepted in one request.
pub const MAX_ADDITIONAL_IMAGES: usize = 3;

/// Errors from catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Form input rejected.
    #[error("{0}")]
    Validation(String),

    #[error("Product not found")]
    NotFound,

    #[error(transparent)]
    Image(#[from] ImageHostError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl CatalogError {
    fn invalid(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

/// Cache key for catalog reads.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
enum CacheKey {
    Products,
    Product(ProductId),
}

/// Cached value types.
#[derive(Debug, Clone)]
enum CacheValue {
    Products(Arc<Vec<Product>>),
    Product(Box<Product>),
}

/// A product create/update form, as received from the admin back-office.
///
/// Text fields are kept raw so validation messages match the form field
/// that failed.
#[derive(Debug, Clone, Default)]
pub struct ProductForm {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<String>,
    pub original_price: Option<String>,
    pub quantity: Option<String>,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub featured: Option<String>,
    pub specs: Option<String>,
    pub image: Option<ImageUpload>,
    pub additional_images: Vec<ImageUpload>,
    pub existing_image: Option<String>,
    pub existing_additional_images: Vec<String>,
}

/// Validated text fields of a [`ProductForm`].
struct ProductFields {
    name: String,
    description: String,
    price: Price,
    original_price: Option<Price>,
    category: Category,
    brand: String,
    quantity: u32,
    featured: bool,
    specs: ProductSpecs,
}

fn filled(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

impl ProductForm {
    fn fields(&self) -> Result<ProductFields, CatalogError> {
        let (Some(name), Some(description), Some(price), Some(category), Some(brand)) = (
            filled(self.name.as_ref()),
            filled(self.description.as_ref()),
            filled(self.price.as_ref()),
            filled(self.category.as_ref()),
            filled(self.brand.as_ref()),
        ) else {
            return Err(CatalogError::invalid("Missing required fields"));
        };

        let price = Price::parse(price).map_err(|_| CatalogError::invalid("Invalid price"))?;
        let original_price = filled(self.original_price.as_ref())
            .map(Price::parse)
            .transpose()
            .map_err(|_| CatalogError::invalid("Invalid originalPrice"))?;
        let category: Category = category
            .parse()
            .map_err(|_| CatalogError::invalid("Invalid category"))?;
        let quantity = match filled(self.quantity.as_ref()) {
            None => 0,
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|q| *q <= MAX_QUANTITY)
                .ok_or_else(|| CatalogError::invalid("Invalid quantity"))?,
        };
        let featured = filled(self.featured.as_ref()).is_some_and(|v| v == "true");
        let specs = filled(self.specs.as_ref())
            .map(serde_json::from_str::<ProductSpecs>)
            .transpose()
            .map_err(|_| CatalogError::invalid("Invalid specs format"))?
            .unwrap_or_default();

        Ok(ProductFields {
            name: name.to_owned(),
            description: description.to_owned(),
            price,
            original_price,
            category,
            brand: brand.to_owned(),
            quantity,
            featured,
            specs,
        })
    }

    fn check_additional_images(&self) -> Result<(), CatalogError> {
        if self.additional_images.len() > MAX_ADDITIONAL_IMAGES {
            return Err(CatalogError::invalid(format!(
                "At most {MAX_ADDITIONAL_IMAGES} additional images are allowed"
            )));
        }
        Ok(())
    }
}

impl ProductFields {
    fn into_draft(self, image_url: String, images: Vec<String>) -> ProductDraft {
        ProductDraft {
            name: self.name,
            description: self.description,
            price: self.price,
            original_price: self.original_price,
            category: self.category,
            brand: self.brand,
            image_url,
            images,
            quantity: self.quantity,
            featured: self.featured,
            specs: self.specs,
        }
    }
}

/// Catalog reads and admin writes.
#[derive(Clone)]
pub struct CatalogService {
    products: Arc<dyn ProductRepository>,
    images: Arc<dyn ImageHost>,
    cache: Cache<CacheKey, CacheValue>,
}

impl CatalogService {
    /// Create a catalog service.
    #[must_use]
    pub fn new(products: Arc<dyn ProductRepository>, images: Arc<dyn ImageHost>) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();
        Self {
            products,
            images,
            cache,
        }
    }

    /// Products matching the query, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    #[instrument(skip(self))]
    pub async fn list(&self, query: &ProductQuery) -> Result<Vec<Product>, CatalogError> {
        let all = self.all().await?;
        Ok(all.iter().filter(|p| query.matches(p)).cloned().collect())
    }

    async fn all(&self) -> Result<Arc<Vec<Product>>, CatalogError> {
        if let Some(CacheValue::Products(products)) = self.cache.get(&CacheKey::Products).await {
            debug!("Cache hit for products");
            return Ok(products);
        }
        let products = Arc::new(self.products.list().await?);
        self.cache
            .insert(CacheKey::Products, CacheValue::Products(Arc::clone(&products)))
            .await;
        Ok(products)
    }

    /// A single product.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` for an unknown id.
    #[instrument(skip(self))]
    pub async fn get(&self, id: ProductId) -> Result<Product, CatalogError> {
        let key = CacheKey::Product(id);
        if let Some(CacheValue::Product(product)) = self.cache.get(&key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }
        let product = self.products.get(id).await?.ok_or(CatalogError::NotFound)?;
        self.cache
            .insert(key, CacheValue::Product(Box::new(product.clone())))
            .await;
        Ok(product)
    }

    /// Create a product from an admin form. The primary image is required.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` for bad input and
    /// `CatalogError::Image` when an upload fails.
    #[instrument(skip(self, form))]
    pub async fn create(&self, form: ProductForm) -> Result<Product, CatalogError> {
        let fields = form.fields()?;
        form.check_additional_images()?;
        let Some(image) = form.image else {
            return Err(CatalogError::invalid("Product image is required"));
        };

        let (image_url, images) = self.upload(Some(image), form.additional_images).await?;
        let image_url = image_url.ok_or_else(|| CatalogError::invalid("Product image is required"))?;

        let product = self
            .products
            .create(fields.into_draft(image_url, images))
            .await?;
        self.invalidate_all().await;
        tracing::info!(product_id = %product.id, "Product created");
        Ok(product)
    }

    /// Replace a product's fields. Existing images listed in the form are
    /// kept ahead of new uploads; without any primary image the current one
    /// stays.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` for an unknown id, otherwise as
    /// [`CatalogService::create`].
    #[instrument(skip(self, form))]
    pub async fn update(&self, id: ProductId, form: ProductForm) -> Result<Product, CatalogError> {
        let current = self.products.get(id).await?.ok_or(CatalogError::NotFound)?;
        let fields = form.fields()?;
        form.check_additional_images()?;

        let (uploaded, new_images) = self.upload(form.image, form.additional_images).await?;
        let image_url = uploaded
            .or_else(|| filled(form.existing_image.as_ref()).map(str::to_owned))
            .unwrap_or(current.image_url);
        let mut images: Vec<String> = form
            .existing_additional_images
            .into_iter()
            .filter(|url| !url.trim().is_empty())
            .collect();
        images.extend(new_images);

        let product = self
            .products
            .update(id, fields.into_draft(image_url, images))
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => CatalogError::NotFound,
                other => CatalogError::Repository(other),
            })?;
        self.invalidate_all().await;
        tracing::info!(product_id = %product.id, "Product updated");
        Ok(product)
    }

    /// Delete a product. Cart lines referencing it go with it.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` for an unknown id.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: ProductId) -> Result<(), CatalogError> {
        if !self.products.delete(id).await? {
            return Err(CatalogError::NotFound);
        }
        self.invalidate_all().await;
        tracing::info!(product_id = %id, "Product deleted");
        Ok(())
    }

    /// Upload the primary and additional images concurrently.
    async fn upload(
        &self,
        image: Option<ImageUpload>,
        additional: Vec<ImageUpload>,
    ) -> Result<(Option<String>, Vec<String>), CatalogError> {
        let has_primary = image.is_some();
        let uploads = image
            .into_iter()
            .chain(additional)
            .map(|upload| self.images.upload(upload, PRODUCT_FOLDER));
        let mut urls = try_join_all(uploads).await?;

        let primary = if has_primary && !urls.is_empty() {
            Some(urls.remove(0))
        } else {
            None
        };
        Ok((primary, urls))
    }

    /// Drop every cached read.
    pub async fn invalidate_all(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::db::memory::InMemoryStore;
    use crate::services::images::DisabledImageHost;

    /// Image host that hands out sequential fake URLs.
    #[derive(Default)]
    pub(crate) struct FakeImageHost {
        uploads: AtomicUsize,
    }

    #[async_trait]
    impl ImageHost for FakeImageHost {
        async fn upload(&self, image: ImageUpload, folder: &str) -> Result<String, ImageHostError> {
            let n = self.uploads.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(format!("https://img.test/{folder}/{n}-{}", image.file_name))
        }
    }

    pub(crate) fn upload(name: &str) -> ImageUpload {
        ImageUpload {
            file_name: name.to_owned(),
            content_type: Some("image/jpeg".to_owned()),
            bytes: vec![0xFF, 0xD8, 0xFF],
        }
    }

    pub(crate) fn form(name: &str, price: &str, category: &str) -> ProductForm {
        ProductForm {
            name: Some(name.to_owned()),
            description: Some(format!("{name} description")),
            price: Some(price.to_owned()),
            category: Some(category.to_owned()),
            brand: Some("Acme".to_owned()),
            quantity: Some("5".to_owned()),
            image: Some(upload("main.jpg")),
            ..ProductForm::default()
        }
    }

    fn service() -> CatalogService {
        CatalogService::new(
            Arc::new(InMemoryStore::default()),
            Arc::new(FakeImageHost::default()),
        )
    }

    #[tokio::test]
    async fn test_create_uploads_images() {
        let catalog = service();
        let mut f = form("Phone", "299.99", "smartphones");
        f.additional_images = vec![upload("a.jpg"), upload("b.jpg")];
        f.specs = Some(r#"{"Display":"6.1in","Battery":"4000mAh"}"#.to_owned());
        f.featured = Some("true".to_owned());

        let product = catalog.create(f).await.unwrap();
        assert!(product.image_url.ends_with("main.jpg"));
        assert_eq!(product.images.len(), 2);
        assert_eq!(product.specs.display, "6.1in");
        assert_eq!(product.specs.camera, "");
        assert!(product.featured);
        assert_eq!(product.quantity, 5);
    }

    #[tokio::test]
    async fn test_create_validation() {
        let catalog = service();

        let mut f = form("Phone", "10", "smartphones");
        f.brand = None;
        let err = catalog.create(f).await.unwrap_err();
        assert_eq!(err.to_string(), "Missing required fields");

        let err = catalog.create(form("Phone", "-1", "smartphones")).await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid price");

        let err = catalog.create(form("Phone", "abc", "smartphones")).await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid price");

        let err = catalog
            .create(form("Phone", "10000000000", "smartphones"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid price");

        let mut f = form("Phone", "10", "smartphones");
        f.quantity = Some("3000000000".to_owned());
        let err = catalog.create(f).await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid quantity");

        let mut f = form("Phone", "10", "smartphones");
        f.quantity = Some(MAX_QUANTITY.to_string());
        assert_eq!(catalog.create(f).await.unwrap().quantity, MAX_QUANTITY);

        let mut f = form("Phone", "10", "smartphones");
        f.specs = Some("{not json".to_owned());
        let err = catalog.create(f).await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid specs format");

        let mut f = form("Phone", "10", "smartphones");
        f.image = None;
        assert!(matches!(catalog.create(f).await, Err(CatalogError::Validation(_))));

        let mut f = form("Phone", "10", "smartphones");
        f.additional_images = (0..4).map(|i| upload(&format!("{i}.jpg"))).collect();
        assert!(matches!(catalog.create(f).await, Err(CatalogError::Validation(_))));
    }

    #[tokio::test]
    async fn test_list_filters_and_sees_writes() {
        let catalog = service();
        let phone = catalog.create(form("Phone", "100", "smartphones")).await.unwrap();
        assert_eq!(catalog.list(&ProductQuery::default()).await.unwrap().len(), 1);

        let mut f = form("Laptop", "900", "laptops");
        f.featured = Some("true".to_owned());
        catalog.create(f).await.unwrap();

        let all = catalog.list(&ProductQuery::default()).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name, "Laptop");

        let laptops = catalog
            .list(&ProductQuery {
                category: Some(Category::Laptops),
                featured: None,
            })
            .await
            .unwrap();
        assert_eq!(laptops.len(), 1);

        catalog.delete(phone.id).await.unwrap();
        assert_eq!(catalog.list(&ProductQuery::default()).await.unwrap().len(), 1);
        assert!(matches!(catalog.get(phone.id).await, Err(CatalogError::NotFound)));
        assert!(matches!(catalog.delete(phone.id).await, Err(CatalogError::NotFound)));
    }

    #[tokio::test]
    async fn test_update_keeps_existing_images_first() {
        let catalog = service();
        let mut f = form("Phone", "100", "smartphones");
        f.additional_images = vec![upload("a.jpg")];
        let product = catalog.create(f).await.unwrap();
        // Warm the single-product cache.
        catalog.get(product.id).await.unwrap();

        let mut f = form("Phone 2", "120", "smartphones");
        f.image = None;
        f.existing_additional_images = product.images.clone();
        f.additional_images = vec![upload("c.jpg")];
        let updated = catalog.update(product.id, f).await.unwrap();

        assert_eq!(updated.image_url, product.image_url);
        assert_eq!(updated.images.len(), 2);
        assert_eq!(updated.images[0], product.images[0]);
        assert!(updated.images[1].ends_with("c.jpg"));
        assert_eq!(updated.created_at, product.created_at);
        assert_eq!(catalog.get(product.id).await.unwrap().name, "Phone 2");
    }

    #[tokio::test]
    async fn test_update_unknown_product() {
        let catalog = service();
        let err = catalog
            .update(ProductId::new(99), form("X", "1", "others"))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::NotFound));
    }

    #[tokio::test]
    async fn test_create_without_image_host() {
        let catalog = CatalogService::new(
            Arc::new(InMemoryStore::default()),
            Arc::new(DisabledImageHost),
        );
        let err = catalog.create(form("Phone", "10", "smartphones")).await.unwrap_err();
        assert!(matches!(err, CatalogError::Image(ImageHostError::NotConfigured)));
    }
}
