//! Onboarding page. The form posts to `/api/profile/setup`.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tracing::instrument;

use crate::error::AppError;
use crate::middleware::RequireUser;
use crate::state::AppState;

/// Onboarding form template.
#[derive(Template, WebTemplate)]
#[template(path = "welcome.html")]
pub struct WelcomeTemplate {
    pub email: Option<String>,
    /// Prefilled when the seller revisits the form.
    pub store_name: String,
    pub store_slug: String,
}

/// Display the onboarding form.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<impl IntoResponse, AppError> {
    let profile = state.profiles().get(user.id).await?;

    let (store_name, store_slug) = profile
        .map(|p| {
            (
                p.store_name.unwrap_or_default(),
                p.store_slug.map(|s| s.into_inner()).unwrap_or_default(),
            )
        })
        .unwrap_or_default();

    Ok(WelcomeTemplate {
        email: user.email,
        store_name,
        store_slug,
    })
}
