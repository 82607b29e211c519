//! Store URL slug type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Path segments served by the application itself. A store slug equal to one
/// of these would be shadowed by the static route.
const RESERVED: &[&str] = &[
    "api",
    "auth",
    "cart",
    "dashboard",
    "health",
    "login",
    "static",
    "welcome",
];

/// Errors that can occur when parsing a [`StoreSlug`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SlugError {
    /// The slug is shorter than the minimum length.
    #[error("store URL must be at least {min} characters")]
    TooShort {
        /// Minimum allowed length.
        min: usize,
    },
    /// The slug is longer than the maximum length.
    #[error("store URL must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The slug contains a character outside `[a-z0-9-]`.
    #[error("store URL may only contain lowercase letters, digits and hyphens")]
    InvalidCharacter,
    /// The slug starts or ends with a hyphen, or has two in a row.
    #[error("store URL cannot start or end with a hyphen or contain '--'")]
    MisplacedHyphen,
    /// The slug collides with an application route.
    #[error("store URL '{0}' is reserved")]
    Reserved(String),
}

/// The unique path segment identifying a storefront, as in `/{slug}`.
///
/// ## Constraints
///
/// - Length: 3-48 characters
/// - Lowercase ASCII letters, digits and hyphens only
/// - No leading, trailing or doubled hyphens
/// - Not one of the application's own top-level routes
///
/// ## Examples
///
/// ```
/// use bazaar_core::StoreSlug;
///
/// assert!(StoreSlug::parse("clay-and-kiln").is_ok());
/// assert!(StoreSlug::parse("Clay").is_err());      // uppercase
/// assert!(StoreSlug::parse("-clay").is_err());     // leading hyphen
/// assert!(StoreSlug::parse("dashboard").is_err()); // reserved
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct StoreSlug(String);

impl StoreSlug {
    /// Minimum slug length.
    pub const MIN_LENGTH: usize = 3;
    /// Maximum slug length.
    pub const MAX_LENGTH: usize = 48;

    /// Parse a `StoreSlug` from a string.
    ///
    /// # Errors
    ///
    /// Returns a [`SlugError`] describing the first violated constraint.
    pub fn parse(s: &str) -> Result<Self, SlugError> {
        if s.len() < Self::MIN_LENGTH {
            return Err(SlugError::TooShort {
                min: Self::MIN_LENGTH,
            });
        }

        if s.len() > Self::MAX_LENGTH {
            return Err(SlugError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        if !s
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
        {
            return Err(SlugError::InvalidCharacter);
        }

        if s.starts_with('-') || s.ends_with('-') || s.contains("--") {
            return Err(SlugError::MisplacedHyphen);
        }

        if RESERVED.contains(&s) {
            return Err(SlugError::Reserved(s.to_owned()));
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the slug as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `StoreSlug` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for StoreSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for StoreSlug {
    type Err = SlugError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for StoreSlug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for StoreSlug {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for StoreSlug {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        // Database values are assumed valid
        Ok(Self(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for StoreSlug {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}
