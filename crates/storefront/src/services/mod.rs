//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Hosted auth provider client, PKCE and token verification
//! - `cart` - Session/cart resolver and line-item mutations
//! - `catalog` - Product create/update/delete with image handling
//! - `onboarding` - Store name and slug setup
//! - `storage` - Product image object storage

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod onboarding;
pub mod storage;
