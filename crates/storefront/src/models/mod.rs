//! Domain models for the storefront.
//!
//! These types represent validated domain objects, separate from the database
//! row types in [`crate::db`].

pub mod cart;
pub mod identity;
pub mod product;
pub mod profile;

pub use cart::{Cart, CartItemRecord, CartLine, CartOwner, CartRecord, OwnedCartItem, ProductSnapshot};
pub use identity::{AuthUser, GuestToken, Identity};
pub use product::{NewProduct, Product, ProductChanges};
pub use profile::Profile;
