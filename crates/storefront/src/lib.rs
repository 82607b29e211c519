//! Bazaar storefront library.
//!
//! Sellers sign in, open a store under their own slug and list products;
//! shoppers browse stores and keep a cart, signed in or not. The crate is a
//! library so the router can be driven in tests against in-memory stores.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod cookies;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
