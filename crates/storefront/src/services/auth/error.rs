//! Authentication error types.

use thiserror::Error;

/// Errors from the hosted auth provider.
#[derive(Debug, Error)]
pub enum AuthProviderError {
    /// HTTP request failed before a response was received.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with an error status (e.g. a revoked refresh token).
    #[error("provider rejected request: {status} - {message}")]
    Rejected { status: u16, message: String },

    /// Failed to parse the provider's response.
    #[error("parse error: {0}")]
    Parse(String),

    /// Client could not be configured.
    #[error("configuration error: {0}")]
    Config(String),
}

impl AuthProviderError {
    /// Whether the provider itself refused the request, as opposed to the
    /// request never completing.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

/// Errors verifying an access token.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Signature, expiry, audience or format check failed.
    #[error("invalid token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),

    /// The `sub` claim is not a user id.
    #[error("invalid subject claim")]
    InvalidSubject,
}
