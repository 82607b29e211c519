//! Seller onboarding: store name and URL slug.

use tracing::info;

use bazaar_core::{StoreSlug, UserId};

use crate::db::{ProfileStore, RepositoryError};
use crate::error::AppError;
use crate::models::Profile;

/// Longest accepted store name, in characters.
pub const MAX_STORE_NAME_CHARS: usize = 80;

/// Message returned when a slug belongs to another profile.
pub const SLUG_TAKEN: &str = "This store URL is already taken.";

/// Validate a store name: trimmed, 1 to [`MAX_STORE_NAME_CHARS`] characters.
///
/// # Errors
///
/// Returns `AppError::Validation` if the name is missing, blank or too long.
pub fn validate_store_name(name: Option<&str>) -> Result<String, AppError> {
    let name = name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| AppError::Validation("Store name is required".to_string()))?;
    if name.chars().count() > MAX_STORE_NAME_CHARS {
        return Err(AppError::Validation(format!(
            "Store name must be at most {MAX_STORE_NAME_CHARS} characters"
        )));
    }
    Ok(name.to_owned())
}

/// Validate a store slug.
///
/// # Errors
///
/// Returns `AppError::Validation` if the slug is missing or malformed.
pub fn validate_slug(slug: Option<&str>) -> Result<StoreSlug, AppError> {
    let slug = slug
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::Validation("Store URL is required".to_string()))?;
    StoreSlug::parse(slug).map_err(|e| AppError::Validation(e.to_string()))
}

/// Complete a seller's onboarding.
///
/// # Errors
///
/// Returns `AppError::Validation` for invalid input, `AppError::Conflict` if
/// the slug is taken and `AppError::Store` if the store fails.
pub async fn complete_setup(
    profiles: &dyn ProfileStore,
    user: UserId,
    store_name: Option<&str>,
    store_slug: Option<&str>,
) -> Result<Profile, AppError> {
    let name = validate_store_name(store_name)?;
    let slug = validate_slug(store_slug)?;

    match profiles.complete_setup(user, &name, &slug).await {
        Ok(profile) => {
            info!(user_id = %user, slug = %slug, "Completed onboarding");
            Ok(profile)
        }
        Err(RepositoryError::Conflict(_)) => Err(AppError::Conflict(SLUG_TAKEN.to_string())),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_store_name() {
        assert_eq!(validate_store_name(Some("  Clay & Kiln ")).unwrap(), "Clay & Kiln");
        assert!(validate_store_name(None).is_err());
        assert!(validate_store_name(Some("   ")).is_err());
        assert!(validate_store_name(Some(&"x".repeat(81))).is_err());
        assert!(validate_store_name(Some(&"x".repeat(80))).is_ok());
    }

    #[test]
    fn test_slug() {
        assert_eq!(validate_slug(Some(" clay-kiln ")).unwrap().as_str(), "clay-kiln");
        assert!(validate_slug(None).is_err());
        assert!(validate_slug(Some("Clay Kiln")).is_err());
        assert!(validate_slug(Some("dashboard")).is_err());
    }
}
