//! Catalog product records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Category, Price, ProductId};

/// Free-form technical specs shown on the product page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSpecs {
    #[serde(rename = "Display", default)]
    pub display: String,
    #[serde(rename = "Camera", default)]
    pub camera: String,
    #[serde(rename = "Storage", default)]
    pub storage: String,
    #[serde(rename = "Battery", default)]
    pub battery: String,
}

/// A purchasable catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Price,
    /// Pre-discount price, shown struck through when above `price`.
    #[serde(default)]
    pub original_price: Option<Price>,
    pub category: Category,
    pub brand: String,
    pub image_url: String,
    #[serde(default)]
    pub images: Vec<String>,
    /// Units on hand.
    pub quantity: u32,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub specs: ProductSpecs,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Whether at least one unit is on hand.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.quantity > 0
    }

    /// Whole-percent discount against `original_price`, if any.
    #[must_use]
    pub fn discount_percent(&self) -> Option<u32> {
        use rust_decimal::prelude::ToPrimitive;

        let original = self.original_price?.amount();
        let current = self.price.amount();
        if original <= current {
            return None;
        }
        let percent = (original - current) / original * rust_decimal::Decimal::ONE_HUNDRED;
        percent.round().to_u32()
    }

    /// The subset of fields carried by cart lines.
    #[must_use]
    pub fn summary(&self) -> ProductSummary {
        ProductSummary {
            id: self.id,
            name: self.name.clone(),
            price: self.price,
            image_url: self.image_url.clone(),
            category: self.category,
            brand: self.brand.clone(),
        }
    }
}

/// Compact product view embedded in carts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    pub image_url: String,
    pub category: Category,
    pub brand: String,
}
