//! Seller dashboard pages.
//!
//! All of these sit behind the access gate, so the seller is signed in and
//! onboarded by the time a handler runs. Product writes go through the
//! product API from inline scripts.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use tracing::instrument;

use bazaar_core::ProductId;

use crate::error::AppError;
use crate::middleware::RequireUser;
use crate::models::{AuthUser, Product};
use crate::routes::not_found;
use crate::routes::store::{ProductCard, StoreView};
use crate::services::catalog::CatalogService;
use crate::state::AppState;

/// Dashboard overview template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard/index.html")]
pub struct DashboardTemplate {
    pub store: Option<StoreView>,
    pub email: Option<String>,
    pub product_count: usize,
    pub units_in_stock: i64,
}

/// Product list template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard/products.html")]
pub struct ProductsTemplate {
    pub store: Option<StoreView>,
    pub products: Vec<ProductCard>,
}

/// Editable product fields for the form template.
#[derive(Clone, Default)]
pub struct ProductFormView {
    pub id: Option<String>,
    pub title: String,
    pub description: String,
    pub tags: String,
    pub stock: i32,
    pub price: String,
    pub image_url: Option<String>,
}

impl ProductFormView {
    fn new(state: &AppState, product: &Product) -> Self {
        Self {
            id: Some(product.id.to_string()),
            title: product.title.clone(),
            description: product.description.clone(),
            tags: product.tags.as_slice().join(", "),
            stock: product.stock,
            price: product.price.amount().to_string(),
            image_url: product
                .image_path
                .as_deref()
                .map(|path| state.storage().public_url(path)),
        }
    }
}

/// Create/edit product form template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard/product_form.html")]
pub struct ProductFormTemplate {
    pub product: ProductFormView,
}

async fn store_of(state: &AppState, user: &AuthUser) -> Result<Option<StoreView>, AppError> {
    let profile = state.profiles().get(user.id).await?;
    Ok(profile.as_ref().and_then(StoreView::from_profile))
}

/// Display the dashboard overview.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<impl IntoResponse, AppError> {
    let store = store_of(&state, &user).await?;
    let products = state.products().list_by_owner(user.id).await?;

    Ok(DashboardTemplate {
        store,
        email: user.email,
        product_count: products.len(),
        units_in_stock: products.iter().map(|p| i64::from(p.stock)).sum(),
    })
}

/// Display the seller's products.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn products(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<impl IntoResponse, AppError> {
    let store = store_of(&state, &user).await?;
    let products = state
        .products()
        .list_by_owner(user.id)
        .await?
        .iter()
        .map(|product| ProductCard::new(&state, product))
        .collect();

    Ok(ProductsTemplate { store, products })
}

/// Display an empty product form.
pub async fn new_product(RequireUser(_user): RequireUser) -> impl IntoResponse {
    ProductFormTemplate {
        product: ProductFormView::default(),
    }
}

/// Display the form for one of the seller's products.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn edit_product(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let Ok(id) = id.parse::<ProductId>() else {
        return Ok(not_found());
    };

    let catalog = CatalogService::new(state.products(), state.storage());
    match catalog.owned(id, user.id).await {
        Ok(product) => Ok(ProductFormTemplate {
            product: ProductFormView::new(&state, &product),
        }
        .into_response()),
        Err(AppError::NotFound(_)) => Ok(not_found()),
        Err(e) => Err(e),
    }
}
