//! Seller profile domain type.

use chrono::{DateTime, Utc};
use serde::Serialize;

use bazaar_core::{StoreSlug, UserId};

/// A seller's profile. One per authenticated user; the id is the user id.
#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    /// Profile id, equal to the auth provider's user id.
    pub id: UserId,
    /// Display name of the store, set during onboarding.
    pub store_name: Option<String>,
    /// URL slug of the store, set during onboarding.
    pub store_slug: Option<StoreSlug>,
    /// Whether onboarding has been completed.
    pub is_setup_complete: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Name and slug of the storefront, if onboarding is complete.
    #[must_use]
    pub fn storefront(&self) -> Option<(&str, &StoreSlug)> {
        if !self.is_setup_complete {
            return None;
        }
        Some((self.store_name.as_deref()?, self.store_slug.as_ref()?))
    }
}
