//! Catalog repository backed by `PostgreSQL`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::types::Json;

use techmart_core::{Price, Product, ProductId, ProductSpecs};

use super::{ProductRepository, RepositoryError};
use crate::models::ProductDraft;

const PRODUCT_COLUMNS: &str = "id, name, description, price, original_price, category, brand, \
                               image_url, images, quantity, featured, specs, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: i32,
    name: String,
    description: String,
    price: Decimal,
    original_price: Option<Decimal>,
    category: String,
    brand: String,
    image_url: String,
    images: Vec<String>,
    quantity: i32,
    featured: bool,
    specs: Json<ProductSpecs>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ProductId::new(row.id),
            name: row.name,
            description: row.description,
            price: Price::new(row.price).map_err(|e| RepositoryError::corrupt("price", e))?,
            original_price: row
                .original_price
                .map(Price::new)
                .transpose()
                .map_err(|e| RepositoryError::corrupt("original_price", e))?,
            category: row
                .category
                .parse()
                .map_err(|e| RepositoryError::corrupt("category", e))?,
            brand: row.brand,
            image_url: row.image_url,
            images: row.images,
            quantity: u32::try_from(row.quantity)
                .map_err(|e| RepositoryError::corrupt("quantity", e))?,
            featured: row.featured,
            specs: row.specs.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn quantity_param(draft: &ProductDraft) -> Result<i32, RepositoryError> {
    i32::try_from(draft.quantity)
        .map_err(|_| RepositoryError::Conflict("quantity exceeds storage range".to_owned()))
}

/// Repository for catalog database operations.
pub struct PgProductRepository {
    pool: PgPool,
}

impl PgProductRepository {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductRepository for PgProductRepository {
    async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY created_at DESC, id DESC");
        sqlx::query_as::<_, ProductRow>(&sql)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Product::try_from)
            .collect()
    }

    async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1");
        sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Product::try_from)
            .transpose()
    }

    async fn get_many(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let raw: Vec<i32> = ids.iter().map(ProductId::as_i32).collect();
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1)");
        sqlx::query_as::<_, ProductRow>(&sql)
            .bind(&raw)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Product::try_from)
            .collect()
    }

    async fn create(&self, draft: ProductDraft) -> Result<Product, RepositoryError> {
        let quantity = quantity_param(&draft)?;
        let sql = format!(
            "INSERT INTO products \
                 (name, description, price, original_price, category, brand, image_url, images, \
                  quantity, featured, specs) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {PRODUCT_COLUMNS}"
        );
        sqlx::query_as::<_, ProductRow>(&sql)
            .bind(&draft.name)
            .bind(&draft.description)
            .bind(draft.price.amount())
            .bind(draft.original_price.map(|p| p.amount()))
            .bind(draft.category.as_str())
            .bind(&draft.brand)
            .bind(&draft.image_url)
            .bind(&draft.images)
            .bind(quantity)
            .bind(draft.featured)
            .bind(Json(&draft.specs))
            .fetch_one(&self.pool)
            .await?
            .try_into()
    }

    async fn update(&self, id: ProductId, draft: ProductDraft) -> Result<Product, RepositoryError> {
        let quantity = quantity_param(&draft)?;
        let sql = format!(
            "UPDATE products SET \
                 name = $2, description = $3, price = $4, original_price = $5, category = $6, \
                 brand = $7, image_url = $8, images = $9, quantity = $10, featured = $11, \
                 specs = $12, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {PRODUCT_COLUMNS}"
        );
        sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .bind(&draft.name)
            .bind(&draft.description)
            .bind(draft.price.amount())
            .bind(draft.original_price.map(|p| p.amount()))
            .bind(draft.category.as_str())
            .bind(&draft.brand)
            .bind(&draft.image_url)
            .bind(&draft.images)
            .bind(quantity)
            .bind(draft.featured)
            .bind(Json(&draft.specs))
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)?
            .try_into()
    }

    async fn delete(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
