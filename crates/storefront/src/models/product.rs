//! Product domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use bazaar_core::{Price, ProductId, TagList, UserId};

/// A product listed by a seller.
#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub id: ProductId,
    /// Owning seller.
    pub profile_id: UserId,
    pub title: String,
    /// Markdown description.
    pub description: String,
    pub tags: TagList,
    /// Units in stock, never negative.
    pub stock: i32,
    pub price: Price,
    /// Object path of the product image inside the storage bucket.
    pub image_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated input for creating a product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub title: String,
    pub description: String,
    pub tags: TagList,
    pub stock: i32,
    pub price: Price,
    pub image_path: Option<String>,
}

/// Validated changes to an existing product. The image is left untouched,
/// as are `description` and `tags` when `None`.
#[derive(Debug, Clone)]
pub struct ProductChanges {
    pub title: String,
    pub description: Option<String>,
    pub tags: Option<TagList>,
    pub stock: i32,
    pub price: Price,
}
