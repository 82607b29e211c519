//! REST client for the hosted auth provider.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use url::Url;

use super::{AuthProvider, AuthProviderError, AuthSession};
use crate::config::AuthProviderConfig;

/// Auth provider client speaking the provider's token endpoint protocol.
#[derive(Clone)]
pub struct HttpAuthClient {
    client: reqwest::Client,
    base: Url,
    oauth_provider: String,
}

impl HttpAuthClient {
    /// Create a new auth provider client.
    ///
    /// # Errors
    ///
    /// Returns error if the API key is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &AuthProviderConfig) -> Result<Self, AuthProviderError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(&config.anon_key)
                .map_err(|e| AuthProviderError::Config(format!("Invalid API key format: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base: config.url.clone(),
            oauth_provider: config.oauth_provider.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, AuthProviderError> {
        self.base
            .join(path)
            .map_err(|e| AuthProviderError::Config(format!("Invalid auth URL: {e}")))
    }

    async fn token_grant<B: serde::Serialize + Sync>(
        &self,
        grant_type: &str,
        body: &B,
    ) -> Result<AuthSession, AuthProviderError> {
        let mut url = self.endpoint("token")?;
        url.query_pairs_mut().append_pair("grant_type", grant_type);

        let response = self.client.post(url).json(body).send().await?;
        parse_json(response).await
    }
}

async fn parse_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, AuthProviderError> {
    let status = response.status();

    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(AuthProviderError::Rejected {
            status: status.as_u16(),
            message,
        });
    }

    response
        .json()
        .await
        .map_err(|e| AuthProviderError::Parse(e.to_string()))
}

#[async_trait]
impl AuthProvider for HttpAuthClient {
    fn authorize_url(&self, code_challenge: &str, redirect_to: &str) -> String {
        let mut url = self
            .endpoint("authorize")
            .unwrap_or_else(|_| self.base.clone());
        url.query_pairs_mut()
            .append_pair("provider", &self.oauth_provider)
            .append_pair("redirect_to", redirect_to)
            .append_pair("code_challenge", code_challenge)
            .append_pair("code_challenge_method", "s256");
        url.to_string()
    }

    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<AuthSession, AuthProviderError> {
        self.token_grant(
            "pkce",
            &serde_json::json!({
                "auth_code": code,
                "code_verifier": code_verifier,
            }),
        )
        .await
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, AuthProviderError> {
        self.token_grant(
            "refresh_token",
            &serde_json::json!({ "refresh_token": refresh_token }),
        )
        .await
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthProviderError> {
        let url = self.endpoint("logout")?;
        let response = self
            .client
            .post(url)
            .header(AUTHORIZATION, format!("Bearer {access_token}"))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AuthProviderError::Rejected {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }
}
