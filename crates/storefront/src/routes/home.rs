//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tracing::instrument;

use crate::models::Identity;
use crate::routes::store::StoreView;
use crate::state::AppState;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    /// Every storefront that finished onboarding.
    pub stores: Vec<StoreView>,
    pub signed_in: bool,
}

/// Display the home page.
#[instrument(skip(state, identity))]
pub async fn home(State(state): State<AppState>, identity: Identity) -> impl IntoResponse {
    let stores = state.profiles().list_storefronts().await.map_or_else(
        |e| {
            tracing::error!("Failed to list storefronts: {e}");
            Vec::new()
        },
        |profiles| profiles.iter().filter_map(StoreView::from_profile).collect(),
    );

    HomeTemplate {
        stores,
        signed_in: identity.user.is_some(),
    }
}
