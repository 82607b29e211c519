//! Product image storage.
//!
//! Images live in a bucket of a hosted object storage service. The
//! [`ImageStorage`] trait is the seam handlers use; [`HttpStorageClient`]
//! talks to the service's REST API.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use thiserror::Error;
use url::Url;

use crate::config::StorageConfig;

/// Errors that can occur when interacting with object storage.
#[derive(Debug, Error)]
pub enum StorageError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Client could not be configured, or a URL could not be built.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Object storage for product images.
#[async_trait]
pub trait ImageStorage: Send + Sync {
    /// Store an object at `path` inside the bucket. Returns the stored path.
    async fn upload(
        &self,
        path: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, StorageError>;

    /// Remove the object at `path`.
    async fn remove(&self, path: &str) -> Result<(), StorageError>;

    /// Public URL at which the object is served.
    fn public_url(&self, path: &str) -> String;
}

/// Build the object path for a new upload: `{uuid}.{ext}`.
///
/// The extension comes from the original filename, falling back to the
/// content subtype (`image/png` gives `png`).
#[must_use]
pub fn object_path(file_name: Option<&str>, content_type: &str) -> String {
    let from_name = file_name
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.len() <= 8 && ext.bytes().all(|b| b.is_ascii_alphanumeric()));

    let ext = from_name.unwrap_or_else(|| {
        content_type
            .split_once('/')
            .map(|(_, sub)| sub.split(['+', ';']).next().unwrap_or(sub).trim().to_ascii_lowercase())
            .filter(|sub| !sub.is_empty())
            .unwrap_or_else(|| "bin".to_string())
    });

    format!("{}.{ext}", uuid::Uuid::new_v4())
}

/// REST client for the hosted storage service.
#[derive(Clone)]
pub struct HttpStorageClient {
    client: reqwest::Client,
    base: Url,
    bucket: String,
}

impl HttpStorageClient {
    /// Create a new storage client.
    ///
    /// # Errors
    ///
    /// Returns error if the service key is not a valid header value or the
    /// HTTP client fails to build.
    pub fn new(config: &StorageConfig) -> Result<Self, StorageError> {
        let mut headers = HeaderMap::new();
        let key = config.service_key.expose_secret();

        let bearer = HeaderValue::from_str(&format!("Bearer {key}"))
            .map_err(|e| StorageError::Config(format!("Invalid service key format: {e}")))?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(
            "apikey",
            HeaderValue::from_str(key)
                .map_err(|e| StorageError::Config(format!("Invalid service key format: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base: config.url.clone(),
            bucket: config.bucket.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, StorageError> {
        self.base
            .join(path)
            .map_err(|e| StorageError::Config(format!("Invalid storage URL: {e}")))
    }
}

async fn check(response: reqwest::Response) -> Result<reqwest::Response, StorageError> {
    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(StorageError::Api {
            status: status.as_u16(),
            message,
        });
    }
    Ok(response)
}

#[async_trait]
impl ImageStorage for HttpStorageClient {
    async fn upload(
        &self,
        path: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, StorageError> {
        let url = self.endpoint(&format!("object/{}/{path}", self.bucket))?;

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, content_type)
            .header("cache-control", "max-age=3600")
            .body(bytes)
            .send()
            .await?;
        check(response).await?;

        Ok(path.to_owned())
    }

    async fn remove(&self, path: &str) -> Result<(), StorageError> {
        let url = self.endpoint(&format!("object/{}", self.bucket))?;

        let response = self
            .client
            .delete(url)
            .json(&serde_json::json!({ "prefixes": [path] }))
            .send()
            .await?;
        check(response).await?;

        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!(
            "{}object/public/{}/{}",
            self.base,
            self.bucket,
            urlencoding::encode(path)
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use secrecy::SecretString;

    fn client() -> HttpStorageClient {
        HttpStorageClient::new(&StorageConfig {
            url: Url::parse("https://project.example.co/storage/v1/").unwrap(),
            service_key: SecretString::from("k3y-V4lue-9xQ"),
            bucket: "product_images".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn test_public_url() {
        assert_eq!(
            client().public_url("abc.png"),
            "https://project.example.co/storage/v1/object/public/product_images/abc.png"
        );
    }

    #[test]
    fn test_object_path_uses_file_extension() {
        let path = object_path(Some("Photo.JPG"), "image/jpeg");
        assert!(path.ends_with(".jpg"));
        let (stem, _) = path.rsplit_once('.').unwrap();
        assert!(uuid::Uuid::parse_str(stem).is_ok());
    }

    #[test]
    fn test_object_path_falls_back_to_content_type() {
        assert!(object_path(None, "image/png").ends_with(".png"));
        assert!(object_path(Some("noext"), "image/svg+xml").ends_with(".svg"));
        assert!(object_path(Some("bad.ex/t"), "image/webp").ends_with(".webp"));
    }
}
