//! Seed the catalog from a YAML file.
//!
//! Images must already be hosted; entries carry their URLs.
//!
//! ```yaml
//! products:
//!   - name: Pixel 9
//!     description: Google's flagship phone
//!     price: 799.00
//!     originalPrice: 899.00
//!     quantity: 12
//!     category: smartphones
//!     brand: Google
//!     imageUrl: https://res.cloudinary.com/demo/image/upload/pixel9.jpg
//!     featured: true
//!     specs:
//!       Camera: 50MP
//! ```

use std::path::Path;

use serde::Deserialize;

use techmart_core::{Category, MAX_QUANTITY, Price, ProductSpecs};
use techmart_server::db::{ProductRepository, Repositories};
use techmart_server::models::ProductDraft;

use super::{CommandError, connect};

#[derive(Debug, Deserialize)]
struct CatalogFile {
    products: Vec<SeedProduct>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeedProduct {
    name: String,
    description: String,
    price: Price,
    #[serde(default)]
    original_price: Option<Price>,
    #[serde(default)]
    quantity: u32,
    category: Category,
    brand: String,
    image_url: String,
    #[serde(default)]
    images: Vec<String>,
    #[serde(default)]
    featured: bool,
    #[serde(default)]
    specs: ProductSpecs,
}

/// Parse and check a catalog file, in file order.
fn parse_catalog(content: &str) -> Result<Vec<ProductDraft>, CommandError> {
    let file: CatalogFile = serde_yaml::from_str(content)?;

    file.products
        .into_iter()
        .enumerate()
        .map(|(index, p)| {
            let invalid = |reason: &str| CommandError::InvalidProduct {
                index,
                name: p.name.clone(),
                reason: reason.to_owned(),
            };
            if p.name.trim().is_empty() || p.brand.trim().is_empty() {
                return Err(invalid("name and brand are required"));
            }
            if p.image_url.trim().is_empty() {
                return Err(invalid("imageUrl is required"));
            }
            if p.images.len() > 3 {
                return Err(invalid("at most 3 additional images are allowed"));
            }
            if p.quantity > MAX_QUANTITY {
                return Err(invalid("quantity is too large"));
            }
            Ok(ProductDraft {
                name: p.name.trim().to_owned(),
                description: p.description,
                price: p.price,
                original_price: p.original_price,
                category: p.category,
                brand: p.brand.trim().to_owned(),
                image_url: p.image_url,
                images: p.images,
                quantity: p.quantity,
                featured: p.featured,
                specs: p.specs,
            })
        })
        .collect()
}

async fn insert_all(
    products: &dyn ProductRepository,
    drafts: Vec<ProductDraft>,
) -> Result<usize, CommandError> {
    let mut inserted = 0;
    for draft in drafts {
        let product = products.create(draft).await?;
        tracing::info!(id = %product.id, name = %product.name, "Product created");
        inserted += 1;
    }
    Ok(inserted)
}

/// Load every product in `file_path` into the configured database.
pub async fn run(file_path: &str) -> Result<(), CommandError> {
    let path = Path::new(file_path);
    tracing::info!(path = %file_path, "Loading catalog from file");

    // Validate before touching the database.
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| CommandError::Read(file_path.to_owned(), e))?;
    let drafts = parse_catalog(&content)?;
    tracing::info!(products = drafts.len(), "Parsed catalog");

    let pool = connect().await?;
    let repos = Repositories::postgres(&pool);
    let inserted = insert_all(repos.products.as_ref(), drafts).await?;

    tracing::info!("Seeding complete! Products inserted: {inserted}");
    Ok(())
}
