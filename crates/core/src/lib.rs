//! Bazaar Core - Shared domain types.
//!
//! This crate provides the types shared by the Bazaar components:
//! - `storefront` - Seller dashboards, public storefronts and the cart API
//! - `cli` - Migrations and seeding
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no database
//! access, no HTTP clients. The optional `postgres` feature adds `sqlx`
//! encode/decode impls so the types can be bound directly in queries.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, store slugs, prices and tags

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
