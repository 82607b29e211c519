//! Cart page. Changes go through the cart API from inline scripts.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tracing::instrument;

use crate::error::AppError;
use crate::models::{Cart, CartLine, Identity};
use crate::services::cart::CartService;
use crate::state::AppState;

/// Cart line display data for templates.
#[derive(Clone)]
pub struct CartLineView {
    pub id: String,
    pub title: String,
    pub price: String,
    pub quantity: i32,
    pub line_total: String,
    pub image_url: Option<String>,
}

impl CartLineView {
    fn new(state: &AppState, line: &CartLine) -> Self {
        Self {
            id: line.id.to_string(),
            title: line.product.title.clone(),
            price: line.product.price.to_string(),
            quantity: line.quantity,
            line_total: format!("${:.2}", line.line_total()),
            image_url: line
                .product
                .image_path
                .as_deref()
                .map(|path| state.storage().public_url(path)),
        }
    }
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartTemplate {
    pub lines: Vec<CartLineView>,
    pub item_count: i64,
    pub subtotal: String,
}

impl CartTemplate {
    fn new(state: &AppState, cart: Option<&Cart>) -> Self {
        let Some(cart) = cart else {
            return Self {
                lines: Vec::new(),
                item_count: 0,
                subtotal: "$0.00".to_string(),
            };
        };
        Self {
            lines: cart
                .items
                .iter()
                .map(|line| CartLineView::new(state, line))
                .collect(),
            item_count: cart.item_count,
            subtotal: format!("${:.2}", cart.subtotal),
        }
    }
}

/// Display the current identity's cart.
#[instrument(skip(state, identity))]
pub async fn show(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<impl IntoResponse, AppError> {
    let cart = CartService::new(state.carts(), state.products())
        .get(&identity)
        .await?;
    Ok(CartTemplate::new(&state, cart.as_ref()))
}
