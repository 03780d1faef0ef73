//! Catalog write model.

use techmart_core::{Category, Price, ProductSpecs};

/// Every editable product field, as validated from an admin form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDraft {
    pub name: String,
    pub description: String,
    pub price: Price,
    pub original_price: Option<Price>,
    pub category: Category,
    pub brand: String,
    pub image_url: String,
    pub images: Vec<String>,
    pub quantity: u32,
    pub featured: bool,
    pub specs: ProductSpecs,
}
