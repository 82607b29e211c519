//! Database operations for the storefront `PostgreSQL`.
//!
//! # Schema: `bazaar`
//!
//! ## Tables
//!
//! - `profile` - One row per seller, keyed by the auth provider's user id
//! - `product` - Seller catalog
//! - `cart` - One per identity (user id or guest session token)
//! - `cart_item` - At most one row per (cart, product)
//!
//! Uniqueness of carts and cart items is enforced by constraints, never by
//! in-process locks. A violated constraint surfaces as
//! [`RepositoryError::Conflict`] and callers resolve it by re-reading.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p bazaar-cli -- migrate
//! ```
//!
//! # Store seams
//!
//! Handlers and services only see the [`ProfileStore`], [`ProductStore`] and
//! [`CartStore`] traits, bundled in [`Stores`].

pub mod carts;
pub mod products;
pub mod profiles;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use bazaar_core::{CartId, CartItemId, ProductId, StoreSlug, UserId};

use crate::models::{
    Cart, CartItemRecord, CartOwner, CartRecord, NewProduct, OwnedCartItem, Product,
    ProductChanges, Profile,
};

pub use carts::CartRepository;
pub use products::ProductRepository;
pub use profiles::ProfileRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., slug already taken).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map a sqlx error, turning unique violations into `Conflict`.
    pub(crate) fn from_insert(e: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            return Self::Conflict(format!("{what} already exists"));
        }
        Self::Database(e)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Seller profiles.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Check that the store is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;

    /// Onboarding state of a user's profile: `None` if no profile row exists.
    async fn setup_state(&self, user: UserId) -> Result<Option<bool>, RepositoryError>;

    async fn get(&self, user: UserId) -> Result<Option<Profile>, RepositoryError>;

    /// A completed storefront by slug.
    async fn get_storefront(&self, slug: &StoreSlug) -> Result<Option<Profile>, RepositoryError>;

    /// Create an empty profile row for a user if none exists.
    async fn ensure(&self, user: UserId) -> Result<(), RepositoryError>;

    /// Set the store name and slug and mark onboarding complete.
    ///
    /// Returns `Conflict` if the slug belongs to another profile.
    async fn complete_setup(
        &self,
        user: UserId,
        store_name: &str,
        slug: &StoreSlug,
    ) -> Result<Profile, RepositoryError>;

    /// All completed storefronts, newest first.
    async fn list_storefronts(&self) -> Result<Vec<Profile>, RepositoryError>;
}

/// Seller catalogs. Mutations are scoped to the owning profile.
#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn create(&self, owner: UserId, product: &NewProduct) -> Result<Product, RepositoryError>;

    async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// A seller's products, newest first.
    async fn list_by_owner(&self, owner: UserId) -> Result<Vec<Product>, RepositoryError>;

    /// Apply changes if `owner` owns the product. `None` if absent or foreign.
    async fn update(
        &self,
        id: ProductId,
        owner: UserId,
        changes: &ProductChanges,
    ) -> Result<Option<Product>, RepositoryError>;

    /// Delete if `owner` owns the product, returning the deleted row.
    async fn delete(&self, id: ProductId, owner: UserId) -> Result<Option<Product>, RepositoryError>;
}

/// Carts and cart items.
#[async_trait]
pub trait CartStore: Send + Sync {
    async fn find_cart(&self, owner: &CartOwner) -> Result<Option<CartRecord>, RepositoryError>;

    /// Insert a cart. Returns `Conflict` if the owner already has one.
    async fn create_cart(&self, owner: &CartOwner) -> Result<CartRecord, RepositoryError>;

    async fn find_item(
        &self,
        cart: CartId,
        product: ProductId,
    ) -> Result<Option<CartItemRecord>, RepositoryError>;

    /// Insert a cart item. Returns `Conflict` if the product is already in the cart.
    async fn insert_item(
        &self,
        cart: CartId,
        product: ProductId,
        quantity: i32,
    ) -> Result<CartItemRecord, RepositoryError>;

    async fn set_item_quantity(&self, item: CartItemId, quantity: i32)
    -> Result<(), RepositoryError>;

    async fn delete_item(&self, item: CartItemId) -> Result<(), RepositoryError>;

    /// A cart item with the owner of its cart.
    async fn item_with_owner(&self, item: CartItemId)
    -> Result<Option<OwnedCartItem>, RepositoryError>;

    /// The cart with its items and product snapshots.
    async fn load_cart(&self, cart: CartId) -> Result<Option<Cart>, RepositoryError>;
}

/// The store handles shared by every request.
#[derive(Clone)]
pub struct Stores {
    pub profiles: Arc<dyn ProfileStore>,
    pub products: Arc<dyn ProductStore>,
    pub carts: Arc<dyn CartStore>,
}

impl Stores {
    /// `PostgreSQL`-backed stores sharing one pool.
    #[must_use]
    pub fn postgres(pool: &PgPool) -> Self {
        Self {
            profiles: Arc::new(ProfileRepository::new(pool.clone())),
            products: Arc::new(ProductRepository::new(pool.clone())),
            carts: Arc::new(CartRepository::new(pool.clone())),
        }
    }
}
