//! Local access token verification.

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use bazaar_core::UserId;

use super::TokenError;
use crate::models::AuthUser;

/// Claims carried by the provider's access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// User id.
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    pub exp: u64,
    pub aud: String,
}

/// Verifies HS256 access tokens signed with the provider's JWT secret.
pub struct TokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    /// Create a verifier for the given secret and expected audience.
    #[must_use]
    pub fn new(secret: &SecretString, audience: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[audience]);
        validation.set_required_spec_claims(&["exp", "sub", "aud"]);

        Self {
            decoding_key: DecodingKey::from_secret(secret.expose_secret().as_bytes()),
            validation,
        }
    }

    /// Verify a token and return the user it identifies.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Invalid` if the signature, expiry or audience check
    /// fails, and `TokenError::InvalidSubject` if `sub` is not a UUID.
    pub fn verify(&self, token: &str) -> Result<AuthUser, TokenError> {
        let data = decode::<AccessClaims>(token, &self.decoding_key, &self.validation)?;
        let id: UserId = data
            .claims
            .sub
            .parse()
            .map_err(|_| TokenError::InvalidSubject)?;

        Ok(AuthUser {
            id,
            email: data.claims.email,
        })
    }
}
