//! Request identity: who is making the request, as far as carts and the
//! access gate are concerned.

use bazaar_core::UserId;

use super::cart::CartOwner;

/// A user authenticated by a verified access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: UserId,
    pub email: Option<String>,
}

/// Opaque guest session token carried in the guest session cookie.
///
/// Tokens are minted as UUID v4 text, but any non-empty value of visible
/// ASCII up to [`GuestToken::MAX_LEN`] bytes is accepted so that a
/// client-held token is never reinterpreted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GuestToken(String);

impl GuestToken {
    /// Longest accepted token, in bytes.
    pub const MAX_LEN: usize = 128;

    /// Mint a fresh random token.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Accept a token read from a cookie. Returns `None` if it is malformed.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let valid = !s.is_empty()
            && s.len() <= Self::MAX_LEN
            && s.bytes().all(|b| b.is_ascii_graphic());
        valid.then(|| Self(s.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The resolved identity of a request.
///
/// Inserted into request extensions by the identity middleware. Either part
/// may be absent; both absent means an anonymous first-time visitor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub user: Option<AuthUser>,
    pub guest: Option<GuestToken>,
}

impl Identity {
    /// The cart owner for this request: the user if signed in, else the guest.
    #[must_use]
    pub fn cart_owner(&self) -> Option<CartOwner> {
        if let Some(user) = &self.user {
            return Some(CartOwner::User(user.id));
        }
        self.guest.clone().map(CartOwner::Guest)
    }

    /// The authenticated user id, if any.
    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        self.user.as_ref().map(|u| u.id)
    }
}
