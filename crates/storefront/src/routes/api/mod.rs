//! JSON API handlers.
//!
//! Every handler answers errors as `{"error": "<message>"}` via
//! [`crate::error::AppError`].

pub mod cart;
pub mod products;
pub mod profile;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post, put},
};

use crate::state::AppState;

/// Extra room for the non-file multipart fields of a product upload.
const FORM_FIELDS_ALLOWANCE: usize = 64 * 1024;

/// Create the API routes router.
pub fn routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/cart",
            get(cart::get_cart)
                .post(cart::add_item)
                .put(cart::update_item)
                .delete(cart::remove_item),
        )
        .route(
            "/products",
            post(products::create).layer(DefaultBodyLimit::max(
                max_upload_bytes.saturating_add(FORM_FIELDS_ALLOWANCE),
            )),
        )
        .route(
            "/products/{id}",
            put(products::update).delete(products::delete),
        )
        .route("/profile/setup", post(profile::setup))
}
