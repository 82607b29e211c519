//! Cart API.
//!
//! ```text
//! GET    /api/cart  -> cart or null
//! POST   /api/cart  {product_id, quantity}     -> cart
//! PUT    /api/cart  {cart_item_id, quantity}   -> cart or null
//! DELETE /api/cart  {cart_item_id}             -> cart or null
//! ```
//!
//! Every response carries the cookies staged while handling it, so a guest's
//! first add sets the guest session cookie even though the cart body is the
//! only thing the client asked for.
//!
//! PUT and DELETE are not limited to signed-in users. A guest holding a
//! session cookie may change or remove items in their own cart, which the
//! guest checkout flow relies on. Only a request with no identity at all gets
//! 401, and an item in another identity's cart is 404.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::Deserialize;
use tracing::instrument;

use bazaar_core::{CartItemId, ProductId};

use crate::cookies::StagedCookies;
use crate::error::{AppError, add_breadcrumb};
use crate::models::{Cart, Identity};
use crate::services::cart::CartService;
use crate::state::AppState;

/// Body of `POST /api/cart`.
#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: Option<ProductId>,
    pub quantity: Option<i64>,
}

/// Body of `PUT /api/cart`.
#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub cart_item_id: Option<CartItemId>,
    pub quantity: Option<i64>,
}

/// Body of `DELETE /api/cart`.
#[derive(Debug, Deserialize)]
pub struct RemoveItemRequest {
    pub cart_item_id: Option<CartItemId>,
}

fn quantity(value: i64) -> Result<i32, AppError> {
    i32::try_from(value).map_err(|_| AppError::Validation("quantity is out of range".to_string()))
}

/// Get the caller's cart.
#[instrument(skip(state, identity))]
pub async fn get_cart(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<Option<Cart>>, AppError> {
    let service = CartService::new(state.carts(), state.products());
    Ok(Json(service.get(&identity).await?))
}

/// Add a product to the caller's cart.
#[instrument(skip(state, identity, cookies, body))]
pub async fn add_item(
    State(state): State<AppState>,
    identity: Identity,
    mut cookies: StagedCookies,
    body: Result<Json<AddItemRequest>, JsonRejection>,
) -> (StagedCookies, Result<Json<Cart>, AppError>) {
    let result = add(&state, &identity, &mut cookies, body).await;
    (cookies, result)
}

async fn add(
    state: &AppState,
    identity: &Identity,
    cookies: &mut StagedCookies,
    body: Result<Json<AddItemRequest>, JsonRejection>,
) -> Result<Json<Cart>, AppError> {
    let Json(request) = body?;
    let (Some(product_id), Some(requested)) = (request.product_id, request.quantity) else {
        return Err(AppError::Validation(
            "Product ID and quantity are required".to_string(),
        ));
    };
    let requested = quantity(requested)?;

    let service = CartService::new(state.carts(), state.products());
    let cart = service
        .add_item(
            identity,
            cookies,
            state.secure_cookies(),
            product_id,
            requested,
        )
        .await?;

    let product_id = product_id.to_string();
    add_breadcrumb("cart", "Added item", Some(&[("product_id", product_id.as_str())]));
    Ok(Json(cart))
}

/// Set the quantity of a cart item. Zero removes it.
#[instrument(skip(state, identity, body))]
pub async fn update_item(
    State(state): State<AppState>,
    identity: Identity,
    body: Result<Json<UpdateItemRequest>, JsonRejection>,
) -> Result<Json<Option<Cart>>, AppError> {
    let Json(request) = body?;
    let (Some(item_id), Some(requested)) = (request.cart_item_id, request.quantity) else {
        return Err(AppError::Validation(
            "Cart item ID and quantity are required".to_string(),
        ));
    };
    let requested = quantity(requested)?;

    let service = CartService::new(state.carts(), state.products());
    Ok(Json(
        service.set_quantity(&identity, item_id, requested).await?,
    ))
}

/// Remove a cart item.
#[instrument(skip(state, identity, body))]
pub async fn remove_item(
    State(state): State<AppState>,
    identity: Identity,
    body: Result<Json<RemoveItemRequest>, JsonRejection>,
) -> Result<Json<Option<Cart>>, AppError> {
    let Json(request) = body?;
    let Some(item_id) = request.cart_item_id else {
        return Err(AppError::Validation("Cart item ID is required".to_string()));
    };

    let service = CartService::new(state.carts(), state.products());
    Ok(Json(service.remove_item(&identity, item_id).await?))
}
