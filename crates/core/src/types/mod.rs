//! Core types for Bazaar.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod price;
pub mod slug;
pub mod tags;

pub use id::*;
pub use price::{Price, PriceError};
pub use slug::{SlugError, StoreSlug};
pub use tags::TagList;
