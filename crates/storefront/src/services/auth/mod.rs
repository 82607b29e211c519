//! Authentication against the hosted auth provider.
//!
//! The provider owns user accounts and OAuth. This service only:
//! - builds the PKCE authorize redirect ([`pkce`])
//! - exchanges and refreshes sessions through [`AuthProvider`]
//! - verifies access tokens locally ([`TokenVerifier`])

mod client;
mod error;
pub mod pkce;
mod token;

pub use client::HttpAuthClient;
pub use error::{AuthProviderError, TokenError};
pub use token::{AccessClaims, TokenVerifier};

use async_trait::async_trait;
use serde::Deserialize;

/// Tokens returned by the provider for a signed-in user.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    #[serde(default)]
    pub expires_in: Option<i64>,
}

/// The hosted auth provider.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// URL to send the browser to for sign-in.
    fn authorize_url(&self, code_challenge: &str, redirect_to: &str) -> String;

    /// Exchange an authorization code and its PKCE verifier for a session.
    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<AuthSession, AuthProviderError>;

    /// Trade a refresh token for a new session.
    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, AuthProviderError>;

    /// Revoke the session the access token belongs to.
    async fn sign_out(&self, access_token: &str) -> Result<(), AuthProviderError>;
}
