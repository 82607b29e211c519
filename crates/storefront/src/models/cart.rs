//! Cart domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use bazaar_core::{CartId, CartItemId, Price, ProductId, UserId};

use super::identity::GuestToken;

/// The identity a cart belongs to: a user or a guest session, never both.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CartOwner {
    User(UserId),
    Guest(GuestToken),
}

/// A cart row without its items.
#[derive(Debug, Clone)]
pub struct CartRecord {
    pub id: CartId,
    pub owner: CartOwner,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A cart item row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartItemRecord {
    pub id: CartItemId,
    pub cart_id: CartId,
    pub product_id: ProductId,
    pub quantity: i32,
}

/// A cart item together with the owner of the cart that holds it.
#[derive(Debug, Clone)]
pub struct OwnedCartItem {
    pub item: CartItemRecord,
    pub owner: CartOwner,
}

/// The product fields shown alongside a cart line.
#[derive(Debug, Clone, Serialize)]
pub struct ProductSnapshot {
    pub id: ProductId,
    pub title: String,
    pub price: Price,
    pub stock: i32,
    pub image_path: Option<String>,
}

/// One line of a materialized cart.
#[derive(Debug, Clone, Serialize)]
pub struct CartLine {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub quantity: i32,
    pub product: ProductSnapshot,
}

impl CartLine {
    /// Price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.product.price.amount() * Decimal::from(self.quantity)
    }
}

/// A cart with its items and product snapshots, as returned by the cart API.
#[derive(Debug, Clone, Serialize)]
pub struct Cart {
    pub id: CartId,
    pub items: Vec<CartLine>,
    /// Sum of item quantities.
    pub item_count: i64,
    /// Sum of line totals.
    pub subtotal: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    /// Materialize a cart from its row and lines, computing the totals.
    #[must_use]
    pub fn new(record: &CartRecord, items: Vec<CartLine>) -> Self {
        let item_count = items.iter().map(|line| i64::from(line.quantity)).sum();
        let subtotal = items.iter().map(CartLine::line_total).sum();
        Self {
            id: record.id,
            items,
            item_count,
            subtotal,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }

    /// Quantity of the given product in this cart, zero if absent.
    #[must_use]
    pub fn quantity_of(&self, product_id: ProductId) -> i32 {
        self.items
            .iter()
            .find(|line| line.product_id == product_id)
            .map_or(0, |line| line.quantity)
    }
}
