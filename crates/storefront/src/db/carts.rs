//! Cart repository.
//!
//! A cart row carries exactly one of `user_id` and `session_id`; both columns
//! are unique, which is what makes "one cart per identity" hold under
//! concurrent first writes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use bazaar_core::{CartId, CartItemId, Price, ProductId, UserId};

use super::{CartStore, RepositoryError};
use crate::models::{
    Cart, CartItemRecord, CartLine, CartOwner, CartRecord, GuestToken, OwnedCartItem,
    ProductSnapshot,
};

#[derive(sqlx::FromRow)]
struct CartRow {
    id: Uuid,
    user_id: Option<Uuid>,
    session_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CartRow> for CartRecord {
    type Error = RepositoryError;

    fn try_from(row: CartRow) -> Result<Self, Self::Error> {
        let owner = owner_from_columns(row.user_id, row.session_id.as_deref())?;
        Ok(Self {
            id: CartId::new(row.id),
            owner,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CartItemRow {
    id: Uuid,
    cart_id: Uuid,
    product_id: Uuid,
    quantity: i32,
}

impl From<CartItemRow> for CartItemRecord {
    fn from(row: CartItemRow) -> Self {
        Self {
            id: CartItemId::new(row.id),
            cart_id: CartId::new(row.cart_id),
            product_id: ProductId::new(row.product_id),
            quantity: row.quantity,
        }
    }
}

#[derive(sqlx::FromRow)]
struct OwnedItemRow {
    id: Uuid,
    cart_id: Uuid,
    product_id: Uuid,
    quantity: i32,
    user_id: Option<Uuid>,
    session_id: Option<String>,
}

#[derive(sqlx::FromRow)]
struct CartLineRow {
    id: Uuid,
    product_id: Uuid,
    quantity: i32,
    title: String,
    price: Decimal,
    stock: i32,
    image_path: Option<String>,
}

impl TryFrom<CartLineRow> for CartLine {
    type Error = RepositoryError;

    fn try_from(row: CartLineRow) -> Result<Self, Self::Error> {
        let price = Price::new(row.price).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid price in database: {e}"))
        })?;
        let product_id = ProductId::new(row.product_id);

        Ok(Self {
            id: CartItemId::new(row.id),
            product_id,
            quantity: row.quantity,
            product: ProductSnapshot {
                id: product_id,
                title: row.title,
                price,
                stock: row.stock,
                image_path: row.image_path,
            },
        })
    }
}

fn owner_from_columns(
    user_id: Option<Uuid>,
    session_id: Option<&str>,
) -> Result<CartOwner, RepositoryError> {
    match (user_id, session_id) {
        (Some(id), None) => Ok(CartOwner::User(UserId::new(id))),
        (None, Some(token)) => GuestToken::parse(token)
            .map(CartOwner::Guest)
            .ok_or_else(|| RepositoryError::DataCorruption("invalid cart session id".to_owned())),
        _ => Err(RepositoryError::DataCorruption(
            "cart must have exactly one owner".to_owned(),
        )),
    }
}

/// `PostgreSQL` cart repository.
pub struct CartRepository {
    pool: PgPool,
}

impl CartRepository {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn cart_by_id(&self, cart: CartId) -> Result<Option<CartRecord>, RepositoryError> {
        let row: Option<CartRow> = sqlx::query_as(
            "SELECT id, user_id, session_id, created_at, updated_at FROM bazaar.cart WHERE id = $1",
        )
        .bind(cart)
        .fetch_optional(&self.pool)
        .await?;

        row.map(CartRecord::try_from).transpose()
    }
}

#[async_trait]
impl CartStore for CartRepository {
    async fn find_cart(&self, owner: &CartOwner) -> Result<Option<CartRecord>, RepositoryError> {
        let query = match owner {
            CartOwner::User(id) => sqlx::query_as::<sqlx::Postgres, CartRow>(
                "SELECT id, user_id, session_id, created_at, updated_at \
                 FROM bazaar.cart WHERE user_id = $1",
            )
            .bind(id.as_uuid()),
            CartOwner::Guest(token) => sqlx::query_as::<sqlx::Postgres, CartRow>(
                "SELECT id, user_id, session_id, created_at, updated_at \
                 FROM bazaar.cart WHERE session_id = $1",
            )
            .bind(token.as_str()),
        };

        let row = query.fetch_optional(&self.pool).await?;
        row.map(CartRecord::try_from).transpose()
    }

    async fn create_cart(&self, owner: &CartOwner) -> Result<CartRecord, RepositoryError> {
        let (user_id, session_id) = match owner {
            CartOwner::User(id) => (Some(id.as_uuid()), None),
            CartOwner::Guest(token) => (None, Some(token.as_str())),
        };

        let row: CartRow = sqlx::query_as(
            r"
            INSERT INTO bazaar.cart (id, user_id, session_id)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, session_id, created_at, updated_at
            ",
        )
        .bind(CartId::generate())
        .bind(user_id)
        .bind(session_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_insert(e, "cart"))?;

        CartRecord::try_from(row)
    }

    async fn find_item(
        &self,
        cart: CartId,
        product: ProductId,
    ) -> Result<Option<CartItemRecord>, RepositoryError> {
        let row: Option<CartItemRow> = sqlx::query_as(
            "SELECT id, cart_id, product_id, quantity FROM bazaar.cart_item \
             WHERE cart_id = $1 AND product_id = $2",
        )
        .bind(cart)
        .bind(product)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(CartItemRecord::from))
    }

    async fn insert_item(
        &self,
        cart: CartId,
        product: ProductId,
        quantity: i32,
    ) -> Result<CartItemRecord, RepositoryError> {
        let row: CartItemRow = sqlx::query_as(
            r"
            INSERT INTO bazaar.cart_item (id, cart_id, product_id, quantity)
            VALUES ($1, $2, $3, $4)
            RETURNING id, cart_id, product_id, quantity
            ",
        )
        .bind(CartItemId::generate())
        .bind(cart)
        .bind(product)
        .bind(quantity)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_insert(e, "cart item"))?;

        sqlx::query("UPDATE bazaar.cart SET updated_at = now() WHERE id = $1")
            .bind(cart)
            .execute(&self.pool)
            .await?;

        Ok(CartItemRecord::from(row))
    }

    async fn set_item_quantity(
        &self,
        item: CartItemId,
        quantity: i32,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE bazaar.cart_item SET quantity = $2, updated_at = now() WHERE id = $1",
        )
        .bind(item)
        .bind(quantity)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete_item(&self, item: CartItemId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM bazaar.cart_item WHERE id = $1")
            .bind(item)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn item_with_owner(
        &self,
        item: CartItemId,
    ) -> Result<Option<OwnedCartItem>, RepositoryError> {
        let row: Option<OwnedItemRow> = sqlx::query_as(
            r"
            SELECT ci.id, ci.cart_id, ci.product_id, ci.quantity, c.user_id, c.session_id
            FROM bazaar.cart_item ci
            JOIN bazaar.cart c ON c.id = ci.cart_id
            WHERE ci.id = $1
            ",
        )
        .bind(item)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| {
            let owner = owner_from_columns(r.user_id, r.session_id.as_deref())?;
            Ok(OwnedCartItem {
                item: CartItemRecord {
                    id: CartItemId::new(r.id),
                    cart_id: CartId::new(r.cart_id),
                    product_id: ProductId::new(r.product_id),
                    quantity: r.quantity,
                },
                owner,
            })
        })
        .transpose()
    }

    async fn load_cart(&self, cart: CartId) -> Result<Option<Cart>, RepositoryError> {
        let Some(record) = self.cart_by_id(cart).await? else {
            return Ok(None);
        };

        let rows: Vec<CartLineRow> = sqlx::query_as(
            r"
            SELECT ci.id, ci.product_id, ci.quantity,
                   p.title, p.price, p.stock, p.image_path
            FROM bazaar.cart_item ci
            JOIN bazaar.product p ON p.id = ci.product_id
            WHERE ci.cart_id = $1
            ORDER BY ci.created_at, ci.id
            ",
        )
        .bind(cart)
        .fetch_all(&self.pool)
        .await?;

        let lines = rows
            .into_iter()
            .map(CartLine::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(Cart::new(&record, lines)))
    }
}
