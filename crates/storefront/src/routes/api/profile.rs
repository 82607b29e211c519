//! Profile onboarding API.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::Deserialize;
use tracing::instrument;

use crate::error::AppError;
use crate::middleware::RequireUser;
use crate::models::Profile;
use crate::services::onboarding;
use crate::state::AppState;

/// Body of `POST /api/profile/setup`.
#[derive(Debug, Deserialize)]
pub struct SetupRequest {
    pub store_name: Option<String>,
    pub store_slug: Option<String>,
}

/// Set the store name and slug and complete onboarding.
#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn setup(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    body: Result<Json<SetupRequest>, JsonRejection>,
) -> Result<Json<Profile>, AppError> {
    let Json(request) = body?;
    let profile = onboarding::complete_setup(
        state.profiles(),
        user.id,
        request.store_name.as_deref(),
        request.store_slug.as_deref(),
    )
    .await?;
    Ok(Json(profile))
}
