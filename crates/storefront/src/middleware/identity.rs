//! Request identity resolution and extractors.
//!
//! [`identity_middleware`] runs on every request. It resolves the signed-in
//! user from the token cookies (refreshing once through the auth provider if
//! the access token is no longer valid), reads the guest session cookie, and
//! inserts the resulting [`Identity`] into request extensions. Cookie changes
//! made while resolving (refreshed or cleared tokens) are written onto the
//! response, including error responses and gate redirects.

use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use tracing::{Span, debug, info, warn};

use crate::cookies::{
    ACCESS_TOKEN_COOKIE, GUEST_SESSION_COOKIE, REFRESH_TOKEN_COOKIE, StagedCookies,
    stage_token_removal, stage_tokens,
};
use crate::error::{AppError, set_sentry_user};
use crate::models::{AuthUser, GuestToken, Identity};
use crate::services::auth::{AuthProvider, TokenVerifier};
use crate::state::AppState;

/// Resolve the signed-in user from the token cookies.
///
/// Order:
/// 1. A valid access token identifies the user.
/// 2. Otherwise a refresh token is traded for a new session once. Success
///    stages both new token cookies. A rejection by the provider stages
///    removal of both; a transport failure leaves them untouched.
///
/// Every failure resolves to `None`.
pub async fn resolve_user(
    auth: &dyn AuthProvider,
    tokens: &TokenVerifier,
    cookies: &mut StagedCookies,
    secure_cookies: bool,
) -> Option<AuthUser> {
    if let Some(access_token) = cookies.get(ACCESS_TOKEN_COOKIE) {
        match tokens.verify(access_token) {
            Ok(user) => return Some(user),
            Err(e) => debug!(error = %e, "Access token not valid"),
        }
    }

    let refresh_token = cookies.get(REFRESH_TOKEN_COOKIE)?.to_owned();

    match auth.refresh_session(&refresh_token).await {
        Ok(session) => match tokens.verify(&session.access_token) {
            Ok(user) => {
                debug!(user_id = %user.id, "Refreshed session");
                stage_tokens(
                    cookies,
                    session.access_token,
                    session.refresh_token,
                    secure_cookies,
                );
                Some(user)
            }
            Err(e) => {
                warn!(error = %e, "Provider issued an access token that does not verify");
                None
            }
        },
        Err(e) if e.is_rejection() => {
            info!(error = %e, "Refresh token rejected, clearing session");
            stage_token_removal(cookies);
            None
        }
        Err(e) => {
            warn!(error = %e, "Session refresh failed");
            None
        }
    }
}

/// Middleware that resolves the request [`Identity`].
pub async fn identity_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let mut cookies = StagedCookies::from_headers(request.headers());

    let user = resolve_user(
        state.auth(),
        state.tokens(),
        &mut cookies,
        state.secure_cookies(),
    )
    .await;
    let guest = cookies.get(GUEST_SESSION_COOKIE).and_then(GuestToken::parse);

    if let Some(user) = &user {
        Span::current().record("user_id", tracing::field::display(user.id));
        set_sentry_user(&user.id, user.email.as_deref());
    }

    request.extensions_mut().insert(Identity { user, guest });

    let mut response = next.run(request).await;
    cookies.apply(response.headers_mut());
    response
}

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<Self>()
            .cloned()
            .unwrap_or_default())
    }
}

/// Extractor that requires a signed-in user.
///
/// Rejects with `401 {"error": "Unauthorized"}`. Pages behind the access
/// gate never see the rejection because the gate redirects first.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireUser(user): RequireUser) -> impl IntoResponse {
///     format!("Hello, {}!", user.id)
/// }
/// ```
pub struct RequireUser(pub AuthUser);

impl<S> FromRequestParts<S> for RequireUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .and_then(|identity| identity.user.clone())
            .map(Self)
            .ok_or(AppError::Unauthorized)
    }
}
