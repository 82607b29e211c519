//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::StorefrontConfig;
use crate::db::{CartStore, ProductStore, ProfileStore, Stores};
use crate::services::auth::{AuthProvider, TokenVerifier};
use crate::services::storage::ImageStorage;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the stores, external clients and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    stores: Stores,
    auth: Arc<dyn AuthProvider>,
    tokens: TokenVerifier,
    storage: Arc<dyn ImageStorage>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `stores` - Profile, product and cart stores
    /// * `auth` - Hosted auth provider client
    /// * `storage` - Product image storage client
    #[must_use]
    pub fn new(
        config: StorefrontConfig,
        stores: Stores,
        auth: Arc<dyn AuthProvider>,
        storage: Arc<dyn ImageStorage>,
    ) -> Self {
        let tokens = TokenVerifier::new(&config.auth.jwt_secret, &config.auth.audience);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                stores,
                auth,
                tokens,
                storage,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn profiles(&self) -> &dyn ProfileStore {
        self.inner.stores.profiles.as_ref()
    }

    #[must_use]
    pub fn products(&self) -> &dyn ProductStore {
        self.inner.stores.products.as_ref()
    }

    #[must_use]
    pub fn carts(&self) -> &dyn CartStore {
        self.inner.stores.carts.as_ref()
    }

    /// Get a reference to the auth provider client.
    #[must_use]
    pub fn auth(&self) -> &dyn AuthProvider {
        self.inner.auth.as_ref()
    }

    /// Get a reference to the access token verifier.
    #[must_use]
    pub fn tokens(&self) -> &TokenVerifier {
        &self.inner.tokens
    }

    /// Get a reference to the image storage client.
    #[must_use]
    pub fn storage(&self) -> &dyn ImageStorage {
        self.inner.storage.as_ref()
    }

    /// Whether cookies should carry the `Secure` attribute.
    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.inner.config.secure_cookies()
    }
}
