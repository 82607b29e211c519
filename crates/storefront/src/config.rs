//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `BAZAAR_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `BAZAAR_BASE_URL` - Public URL of the site (used for OAuth redirects and cookie security)
//! - `BAZAAR_AUTH_URL` - Hosted auth provider endpoint (e.g. `https://<project>.example.co/auth/v1`)
//! - `BAZAAR_AUTH_ANON_KEY` - Public API key sent to the auth provider
//! - `BAZAAR_AUTH_JWT_SECRET` - Secret the provider signs access tokens with (HS256)
//! - `BAZAAR_STORAGE_URL` - Hosted object storage endpoint (e.g. `https://<project>.example.co/storage/v1`)
//! - `BAZAAR_STORAGE_SERVICE_KEY` - Server-side key for uploads and removals
//!
//! ## Optional
//! - `BAZAAR_HOST` - Bind address (default: 127.0.0.1)
//! - `BAZAAR_PORT` - Listen port (default: 3000)
//! - `BAZAAR_AUTH_PROVIDER` - OAuth provider name passed to the authorize endpoint (default: google)
//! - `BAZAAR_AUTH_AUDIENCE` - Expected `aud` claim (default: authenticated)
//! - `BAZAAR_STORAGE_BUCKET` - Bucket holding product images (default: `product_images`)
//! - `BAZAAR_MAX_UPLOAD_BYTES` - Upload size cap for product images (default: 10 MiB)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error event sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.0)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL of the site, without a trailing slash
    pub base_url: String,
    /// Hosted auth provider configuration
    pub auth: AuthProviderConfig,
    /// Hosted object storage configuration
    pub storage: StorageConfig,
    /// Paths guarded by the access gate
    pub gate: GatePolicy,
    /// Upload size cap for product images, in bytes
    pub max_upload_bytes: usize,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g. production, staging)
    pub sentry_environment: Option<String>,
    /// Fraction of error events sent to Sentry
    pub sentry_sample_rate: f32,
    /// Fraction of transactions sent to Sentry
    pub sentry_traces_sample_rate: f32,
}

/// Hosted auth provider configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct AuthProviderConfig {
    /// Base URL of the provider's auth API
    pub url: Url,
    /// Public API key (safe to expose in the browser)
    pub anon_key: String,
    /// HS256 secret used to verify access tokens
    pub jwt_secret: SecretString,
    /// Expected `aud` claim on access tokens
    pub audience: String,
    /// OAuth provider name (e.g. google)
    pub oauth_provider: String,
}

impl std::fmt::Debug for AuthProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthProviderConfig")
            .field("url", &self.url.as_str())
            .field("anon_key", &self.anon_key)
            .field("jwt_secret", &"[REDACTED]")
            .field("audience", &self.audience)
            .field("oauth_provider", &self.oauth_provider)
            .finish()
    }
}

/// Hosted object storage configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct StorageConfig {
    /// Base URL of the storage API
    pub url: Url,
    /// Server-side key authorizing uploads and removals
    pub service_key: SecretString,
    /// Bucket holding product images
    pub bucket: String,
}

impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("url", &self.url.as_str())
            .field("service_key", &"[REDACTED]")
            .field("bucket", &self.bucket)
            .finish()
    }
}

/// Paths the access gate protects and the fixed redirect targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatePolicy {
    /// Path prefixes that require a signed-in seller
    pub protected_prefixes: Vec<String>,
    /// Where unauthenticated requests are sent
    pub login_path: String,
    /// Where sellers with an incomplete profile are sent
    pub onboarding_path: String,
}

impl Default for GatePolicy {
    fn default() -> Self {
        Self {
            protected_prefixes: vec!["/dashboard".to_string(), "/welcome".to_string()],
            login_path: "/login".to_string(),
            onboarding_path: "/welcome".to_string(),
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("BAZAAR_DATABASE_URL")?;
        let host = parse_env("BAZAAR_HOST", "127.0.0.1")?;
        let port = parse_env("BAZAAR_PORT", "3000")?;
        let base_url = get_required_env("BAZAAR_BASE_URL")?
            .trim_end_matches('/')
            .to_string();
        Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("BAZAAR_BASE_URL".to_string(), e.to_string())
        })?;

        let auth = AuthProviderConfig::from_env()?;
        let storage = StorageConfig::from_env()?;
        let max_upload_bytes = parse_env(
            "BAZAAR_MAX_UPLOAD_BYTES",
            &DEFAULT_MAX_UPLOAD_BYTES.to_string(),
        )?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            auth,
            storage,
            gate: GatePolicy::default(),
            max_upload_bytes,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_env("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_env("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` attribute.
    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl AuthProviderConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            url: get_url("BAZAAR_AUTH_URL")?,
            anon_key: get_required_env("BAZAAR_AUTH_ANON_KEY")?,
            jwt_secret: get_validated_secret("BAZAAR_AUTH_JWT_SECRET")?,
            audience: get_env_or_default("BAZAAR_AUTH_AUDIENCE", "authenticated"),
            oauth_provider: get_env_or_default("BAZAAR_AUTH_PROVIDER", "google"),
        })
    }
}

impl StorageConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            url: get_url("BAZAAR_STORAGE_URL")?,
            service_key: get_validated_secret("BAZAAR_STORAGE_SERVICE_KEY")?,
            bucket: get_env_or_default("BAZAAR_STORAGE_BUCKET", "product_images"),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable (or its default) with `FromStr`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Get a required environment variable as a URL.
///
/// A trailing slash is ensured so that `Url::join` appends to the path
/// instead of replacing its last segment.
fn get_url(key: &str) -> Result<Url, ConfigError> {
    let raw = get_required_env(key)?;
    let normalized = if raw.ends_with('/') {
        raw
    } else {
        format!("{raw}/")
    };
    Url::parse(&normalized).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
