//! Seller catalog management.
//!
//! Products are created, changed and deleted only by their owner. Image
//! handling is best-effort around the row mutation: an orphaned upload or a
//! failed removal is logged, never surfaced.

use tracing::{info, warn};

use bazaar_core::{Price, ProductId, TagList, UserId};

use crate::db::ProductStore;
use crate::error::AppError;
use crate::models::{NewProduct, Product, ProductChanges};
use crate::services::storage::{ImageStorage, object_path};

/// Longest accepted product title, in characters.
pub const MAX_TITLE_CHARS: usize = 200;
/// Longest accepted description, in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 20_000;

/// Unvalidated product fields, from a form or a JSON body.
#[derive(Debug, Clone, Default)]
pub struct ProductDraft {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Option<TagList>,
    pub stock: Option<i64>,
    pub price: Option<Price>,
}

impl ProductDraft {
    /// Check required fields and bounds.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` naming the first invalid field.
    pub fn validate(self) -> Result<ProductChanges, AppError> {
        let title = self
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::Validation("title is required".to_string()))?
            .to_owned();
        if title.chars().count() > MAX_TITLE_CHARS {
            return Err(AppError::Validation(format!(
                "title must be at most {MAX_TITLE_CHARS} characters"
            )));
        }

        let description = self.description.map(|d| d.trim().to_owned());
        if description
            .as_ref()
            .is_some_and(|d| d.chars().count() > MAX_DESCRIPTION_CHARS)
        {
            return Err(AppError::Validation(format!(
                "description must be at most {MAX_DESCRIPTION_CHARS} characters"
            )));
        }

        let stock = self
            .stock
            .ok_or_else(|| AppError::Validation("stock is required".to_string()))?;
        let stock = i32::try_from(stock)
            .ok()
            .filter(|s| *s >= 0)
            .ok_or_else(|| AppError::Validation("stock must be a non-negative integer".to_string()))?;

        let price = self
            .price
            .ok_or_else(|| AppError::Validation("price is required".to_string()))?;

        Ok(ProductChanges {
            title,
            description,
            tags: self.tags,
            stock,
            price,
        })
    }
}

/// An image received with a create request.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: Option<String>,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    /// Accept an uploaded file if it is an image.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` if the content type is not `image/*`.
    pub fn new(
        file_name: Option<String>,
        content_type: Option<String>,
        bytes: Vec<u8>,
    ) -> Result<Self, AppError> {
        let content_type = content_type
            .filter(|ct| ct.starts_with("image/"))
            .ok_or_else(|| AppError::Validation("image must be an image file".to_string()))?;
        Ok(Self {
            file_name,
            content_type,
            bytes,
        })
    }
}

/// Catalog operations for one request.
pub struct CatalogService<'a> {
    products: &'a dyn ProductStore,
    storage: &'a dyn ImageStorage,
}

impl<'a> CatalogService<'a> {
    /// Create a new catalog service.
    #[must_use]
    pub const fn new(products: &'a dyn ProductStore, storage: &'a dyn ImageStorage) -> Self {
        Self { products, storage }
    }

    /// Create a product, uploading its image first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Storage` if the upload fails and `AppError::Store`
    /// if the insert fails. An image uploaded before a failed insert is
    /// removed best-effort.
    pub async fn create(
        &self,
        owner: UserId,
        changes: ProductChanges,
        image: Option<ImageUpload>,
    ) -> Result<Product, AppError> {
        let image_path = match image {
            Some(image) => {
                let path = object_path(image.file_name.as_deref(), &image.content_type);
                Some(
                    self.storage
                        .upload(&path, &image.content_type, image.bytes)
                        .await?,
                )
            }
            None => None,
        };

        let new_product = NewProduct {
            title: changes.title,
            description: changes.description.unwrap_or_default(),
            tags: changes.tags.unwrap_or_default(),
            stock: changes.stock,
            price: changes.price,
            image_path,
        };

        match self.products.create(owner, &new_product).await {
            Ok(product) => {
                info!(product_id = %product.id, "Created product");
                Ok(product)
            }
            Err(e) => {
                if let Some(path) = &new_product.image_path {
                    self.remove_image(path).await;
                }
                Err(e.into())
            }
        }
    }

    /// Apply changes to one of the seller's products.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the product is absent or not owned by
    /// `owner`, and `AppError::Store` if the store fails.
    pub async fn update(
        &self,
        id: ProductId,
        owner: UserId,
        changes: &ProductChanges,
    ) -> Result<Product, AppError> {
        self.products
            .update(id, owner, changes)
            .await?
            .ok_or_else(product_not_found)
    }

    /// Delete one of the seller's products, then remove its image.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the product is absent or not owned by
    /// `owner`, and `AppError::Store` if the store fails. Image removal
    /// failures are logged only.
    pub async fn delete(&self, id: ProductId, owner: UserId) -> Result<Product, AppError> {
        let product = self
            .products
            .delete(id, owner)
            .await?
            .ok_or_else(product_not_found)?;

        info!(product_id = %product.id, "Deleted product");
        if let Some(path) = &product.image_path {
            self.remove_image(path).await;
        }
        Ok(product)
    }

    /// One of the seller's products, for editing.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the product is absent or not owned by
    /// `owner`.
    pub async fn owned(&self, id: ProductId, owner: UserId) -> Result<Product, AppError> {
        self.products
            .get(id)
            .await?
            .filter(|p| p.profile_id == owner)
            .ok_or_else(product_not_found)
    }

    async fn remove_image(&self, path: &str) {
        if let Err(e) = self.storage.remove(path).await {
            warn!(image_path = %path, error = %e, "Failed to remove product image");
        }
    }
}

fn product_not_found() -> AppError {
    AppError::NotFound("Product not found".to_string())
}
