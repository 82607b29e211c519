//! Product API.
//!
//! ```text
//! POST   /api/products       multipart: image?, title, description, tags, stock, price
//! PUT    /api/products/{id}  JSON: {title, description?, tags?, stock, price}
//!                            (absent `description` or `tags` keep their stored value)
//! DELETE /api/products/{id}
//! ```
//!
//! Only the owning seller may change or delete a product; anyone else gets
//! the same 404 as for a product that does not exist.

use axum::{
    Json,
    extract::{Multipart, Path, State, multipart::MultipartError, rejection::JsonRejection},
    http::StatusCode,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use bazaar_core::{Price, ProductId, TagList};

use crate::error::AppError;
use crate::middleware::RequireUser;
use crate::models::Product;
use crate::services::catalog::{CatalogService, ImageUpload, ProductDraft};
use crate::state::AppState;

/// A product as returned by the API, with its public image URL.
#[derive(Debug, Serialize)]
pub struct ProductResponse {
    #[serde(flatten)]
    pub product: Product,
    pub image_url: Option<String>,
}

impl ProductResponse {
    fn new(state: &AppState, product: Product) -> Self {
        let image_url = product
            .image_path
            .as_deref()
            .map(|path| state.storage().public_url(path));
        Self { product, image_url }
    }
}

/// Tags given either as a list or as a comma-separated string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum TagsField {
    List(Vec<String>),
    Csv(String),
}

impl From<TagsField> for TagList {
    fn from(tags: TagsField) -> Self {
        match tags {
            TagsField::List(list) => Self::new(list),
            TagsField::Csv(csv) => Self::parse_csv(&csv),
        }
    }
}

/// Body of `PUT /api/products/{id}`.
#[derive(Debug, Deserialize)]
pub struct UpdateProductRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Option<TagsField>,
    pub stock: Option<i64>,
    pub price: Option<Decimal>,
}

impl UpdateProductRequest {
    fn into_draft(self) -> Result<ProductDraft, AppError> {
        let price = self
            .price
            .map(Price::new)
            .transpose()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        Ok(ProductDraft {
            title: self.title,
            description: self.description,
            tags: self.tags.map(TagList::from),
            stock: self.stock,
            price,
        })
    }
}

/// Message returned after a successful delete.
#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub message: &'static str,
}

fn parse_product_id(raw: &str) -> Result<ProductId, AppError> {
    raw.parse()
        .map_err(|_| AppError::NotFound("Product not found".to_string()))
}

fn multipart_error(e: &MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return AppError::Validation("upload is too large".to_string());
    }
    AppError::Validation(e.body_text())
}

fn parse_stock(raw: &str) -> Result<Option<i64>, AppError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse()
        .map(Some)
        .map_err(|_| AppError::Validation("stock must be a whole number".to_string()))
}

fn parse_price(raw: &str) -> Result<Option<Price>, AppError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    Price::parse(raw)
        .map(Some)
        .map_err(|e| AppError::Validation(e.to_string()))
}

/// Read the create form. Unknown fields are ignored.
async fn read_form(
    mut multipart: Multipart,
    max_upload_bytes: usize,
) -> Result<(ProductDraft, Option<ImageUpload>), AppError> {
    let mut draft = ProductDraft::default();
    let mut image = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| multipart_error(&e))? {
        let name = field.name().unwrap_or_default().to_owned();

        if name == "image" {
            let file_name = field.file_name().map(str::to_owned);
            let content_type = field.content_type().map(str::to_owned);
            let bytes = field.bytes().await.map_err(|e| multipart_error(&e))?;
            // Browsers send an empty part when no file was chosen
            if bytes.is_empty() {
                continue;
            }
            if bytes.len() > max_upload_bytes {
                return Err(AppError::Validation(format!(
                    "image must be at most {max_upload_bytes} bytes"
                )));
            }
            image = Some(ImageUpload::new(file_name, content_type, bytes.to_vec())?);
            continue;
        }

        let value = field.text().await.map_err(|e| multipart_error(&e))?;
        match name.as_str() {
            "title" => draft.title = Some(value),
            "description" => draft.description = Some(value),
            "tags" => draft.tags = Some(TagList::parse_csv(&value)),
            "stock" => draft.stock = parse_stock(&value)?,
            "price" => draft.price = parse_price(&value)?,
            _ => {}
        }
    }

    Ok((draft, image))
}

/// Create a product for the signed-in seller.
#[instrument(skip(state, user, multipart), fields(user_id = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ProductResponse>), AppError> {
    let (draft, image) = read_form(multipart, state.config().max_upload_bytes).await?;
    let changes = draft.validate()?;

    let catalog = CatalogService::new(state.products(), state.storage());
    let product = catalog.create(user.id, changes, image).await?;

    Ok((
        StatusCode::CREATED,
        Json(ProductResponse::new(&state, product)),
    ))
}

/// Update one of the signed-in seller's products.
#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<String>,
    body: Result<Json<UpdateProductRequest>, JsonRejection>,
) -> Result<Json<ProductResponse>, AppError> {
    let id = parse_product_id(&id)?;
    let Json(request) = body?;
    let changes = request.into_draft()?.validate()?;

    let catalog = CatalogService::new(state.products(), state.storage());
    let product = catalog.update(id, user.id, &changes).await?;

    Ok(Json(ProductResponse::new(&state, product)))
}

/// Delete one of the signed-in seller's products.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<String>,
) -> Result<Json<DeletedResponse>, AppError> {
    let id = parse_product_id(&id)?;

    let catalog = CatalogService::new(state.products(), state.storage());
    catalog.delete(id, user.id).await?;

    Ok(Json(DeletedResponse {
        message: "Product deleted successfully",
    }))
}
