//! Product repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use bazaar_core::{Price, ProductId, TagList, UserId};

use super::{ProductStore, RepositoryError};
use crate::models::{NewProduct, Product, ProductChanges};

const PRODUCT_COLUMNS: &str = "id, profile_id, title, description, tags, stock, price, \
                               image_path, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    profile_id: Uuid,
    title: String,
    description: String,
    tags: Vec<String>,
    stock: i32,
    price: Decimal,
    image_path: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let price = Price::new(row.price).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid price in database: {e}"))
        })?;

        Ok(Self {
            id: ProductId::new(row.id),
            profile_id: UserId::new(row.profile_id),
            title: row.title,
            description: row.description,
            tags: TagList::new(row.tags),
            stock: row.stock,
            price,
            image_path: row.image_path,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// `PostgreSQL` product repository.
pub struct ProductRepository {
    pool: PgPool,
}

impl ProductRepository {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductStore for ProductRepository {
    async fn create(&self, owner: UserId, product: &NewProduct) -> Result<Product, RepositoryError> {
        let row: ProductRow = sqlx::query_as(&format!(
            r"
            INSERT INTO bazaar.product
                (id, profile_id, title, description, tags, stock, price, image_path)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(ProductId::generate())
        .bind(owner)
        .bind(&product.title)
        .bind(&product.description)
        .bind(product.tags.as_slice())
        .bind(product.stock)
        .bind(product.price)
        .bind(product.image_path.as_deref())
        .fetch_one(&self.pool)
        .await?;

        Product::try_from(row)
    }

    async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM bazaar.product WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Product::try_from).transpose()
    }

    async fn list_by_owner(&self, owner: UserId) -> Result<Vec<Product>, RepositoryError> {
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM bazaar.product \
             WHERE profile_id = $1 ORDER BY created_at DESC, id"
        ))
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Product::try_from).collect()
    }

    async fn update(
        &self,
        id: ProductId,
        owner: UserId,
        changes: &ProductChanges,
    ) -> Result<Option<Product>, RepositoryError> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            r"
            UPDATE bazaar.product
            SET title = $3,
                description = COALESCE($4, description),
                tags = COALESCE($5, tags),
                stock = $6,
                price = $7,
                updated_at = now()
            WHERE id = $1 AND profile_id = $2
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(id)
        .bind(owner)
        .bind(&changes.title)
        .bind(changes.description.as_deref())
        .bind(changes.tags.as_ref().map(TagList::as_slice))
        .bind(changes.stock)
        .bind(changes.price)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Product::try_from).transpose()
    }

    async fn delete(&self, id: ProductId, owner: UserId) -> Result<Option<Product>, RepositoryError> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            "DELETE FROM bazaar.product WHERE id = $1 AND profile_id = $2 \
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Product::try_from).transpose()
    }
}
