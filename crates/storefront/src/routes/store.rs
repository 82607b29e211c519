//! Public storefront pages.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use comrak::{Options, markdown_to_html};
use tracing::instrument;

use bazaar_core::{ProductId, StoreSlug};

use crate::error::AppError;
use crate::models::{Identity, Product, Profile};
use crate::routes::not_found;
use crate::services::cart::CartService;
use crate::state::AppState;

/// Product display data for templates.
#[derive(Clone)]
pub struct ProductCard {
    pub id: String,
    pub title: String,
    pub price: String,
    pub stock: i32,
    pub tags: Vec<String>,
    pub image_url: Option<String>,
}

impl ProductCard {
    pub fn new(state: &AppState, product: &Product) -> Self {
        Self {
            id: product.id.to_string(),
            title: product.title.clone(),
            price: product.price.to_string(),
            stock: product.stock,
            tags: product.tags.as_slice().to_vec(),
            image_url: product
                .image_path
                .as_deref()
                .map(|path| state.storage().public_url(path)),
        }
    }
}

/// Store header data for templates.
#[derive(Clone)]
pub struct StoreView {
    pub name: String,
    pub slug: String,
}

impl StoreView {
    /// The store header for a profile that finished onboarding.
    pub fn from_profile(profile: &Profile) -> Option<Self> {
        profile.storefront().map(|(name, slug)| Self {
            name: name.to_string(),
            slug: slug.to_string(),
        })
    }
}

/// Storefront product grid template.
#[derive(Template, WebTemplate)]
#[template(path = "store/show.html")]
pub struct StoreTemplate {
    pub store: StoreView,
    pub products: Vec<ProductCard>,
}

/// Storefront product detail template.
#[derive(Template, WebTemplate)]
#[template(path = "store/product.html")]
pub struct StoreProductTemplate {
    pub store: StoreView,
    pub product: ProductCard,
    /// Rendered Markdown description.
    pub description_html: String,
    /// Units of this product already in the visitor's cart.
    pub in_cart: i32,
}

/// Render a product description. Raw HTML in the source is omitted.
pub fn render_description(markdown: &str) -> String {
    let mut options = Options::default();
    options.extension.strikethrough = true;
    options.extension.table = true;
    options.extension.autolink = true;
    markdown_to_html(markdown, &options)
}

async fn find_store(state: &AppState, slug: &str) -> Result<Option<(Profile, StoreView)>, AppError> {
    let Ok(slug) = StoreSlug::parse(slug) else {
        return Ok(None);
    };
    let Some(profile) = state.profiles().get_storefront(&slug).await? else {
        return Ok(None);
    };
    Ok(StoreView::from_profile(&profile).map(|view| (profile, view)))
}

/// Display a seller's storefront.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Response, AppError> {
    let Some((profile, store)) = find_store(&state, &slug).await? else {
        return Ok(not_found());
    };

    let products = state
        .products()
        .list_by_owner(profile.id)
        .await?
        .iter()
        .map(|product| ProductCard::new(&state, product))
        .collect();

    Ok(StoreTemplate { store, products }.into_response())
}

/// Display one product of a storefront.
#[instrument(skip(state, identity))]
pub async fn product(
    State(state): State<AppState>,
    identity: Identity,
    Path((slug, product_id)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let Some((profile, store)) = find_store(&state, &slug).await? else {
        return Ok(not_found());
    };
    let Ok(product_id) = product_id.parse::<ProductId>() else {
        return Ok(not_found());
    };
    let Some(product) = state
        .products()
        .get(product_id)
        .await?
        .filter(|p| p.profile_id == profile.id)
    else {
        return Ok(not_found());
    };

    let in_cart = CartService::new(state.carts(), state.products())
        .get(&identity)
        .await?
        .map_or(0, |cart| cart.quantity_of(product.id));

    Ok(StoreProductTemplate {
        store,
        description_html: render_description(&product.description),
        product: ProductCard::new(&state, &product),
        in_cart,
    }
    .into_response())
}
