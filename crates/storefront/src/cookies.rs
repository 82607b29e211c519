//! Response cookie accumulator.
//!
//! [`StagedCookies`] wraps a cookie jar seeded from the request's `Cookie`
//! header. Code that needs to set or clear cookies stages the change on the
//! jar; the delta is written as `Set-Cookie` headers onto whatever response
//! is finally produced, whether that is a success, an error or a redirect.
//!
//! Two accumulators may contribute to one response: the identity middleware
//! (token refresh) and a handler (guest session, sign-in, sign-out). When
//! both touch the same cookie, the one applied first wins; handlers apply
//! first because their response parts are built before the middleware
//! resumes.

use std::collections::HashSet;
use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue};
use axum::response::{IntoResponseParts, ResponseParts};
use tower_sessions::cookie::time::Duration;
use tower_sessions::cookie::{Cookie, CookieJar, SameSite};

/// Access token cookie.
pub const ACCESS_TOKEN_COOKIE: &str = "bz-access-token";
/// Refresh token cookie.
pub const REFRESH_TOKEN_COOKIE: &str = "bz-refresh-token";
/// PKCE code verifier cookie, scoped to the auth routes.
pub const CODE_VERIFIER_COOKIE: &str = "bz-code-verifier";
/// Guest session cookie keying anonymous carts.
pub const GUEST_SESSION_COOKIE: &str = "bz-guest-session";

/// Path the code verifier cookie is scoped to.
pub const AUTH_COOKIE_PATH: &str = "/auth";

/// Lifetime of the code verifier cookie.
const CODE_VERIFIER_MAX_AGE_MINUTES: i64 = 10;

/// Cookie changes staged during a request.
#[derive(Debug, Clone, Default)]
pub struct StagedCookies {
    jar: CookieJar,
}

impl StagedCookies {
    /// Seed a jar from the request's `Cookie` headers.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut jar = CookieJar::new();
        for value in headers.get_all(COOKIE) {
            let Ok(value) = value.to_str() else {
                continue;
            };
            for cookie in Cookie::split_parse(value.to_owned()).flatten() {
                jar.add_original(cookie);
            }
        }
        Self { jar }
    }

    /// Current value of a cookie, reflecting staged changes. Empty values
    /// read as absent.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.jar
            .get(name)
            .map(Cookie::value)
            .filter(|value| !value.is_empty())
    }

    /// Stage a cookie to be set.
    pub fn stage(&mut self, cookie: Cookie<'static>) {
        self.jar.add(cookie);
    }

    /// Stage removal of a cookie previously set at `path`.
    ///
    /// The removal is sent even if the request did not carry the cookie.
    pub fn stage_removal(&mut self, name: &'static str, path: &'static str) {
        let mut cookie = Cookie::build((name, "")).path(path).build();
        cookie.make_removal();
        self.jar.add(cookie);
    }

    /// Whether any change has been staged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.jar.delta().next().is_none()
    }

    /// Append the staged delta to `headers` as `Set-Cookie`.
    ///
    /// Cookies the response already sets are left alone.
    pub fn apply(&self, headers: &mut HeaderMap) {
        let already_set: HashSet<String> = headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|v| Cookie::parse(v.to_owned()).ok())
            .map(|c| c.name().to_owned())
            .collect();

        for cookie in self.jar.delta() {
            if already_set.contains(cookie.name()) {
                continue;
            }
            match HeaderValue::from_str(&cookie.to_string()) {
                Ok(value) => {
                    headers.append(SET_COOKIE, value);
                }
                Err(e) => {
                    tracing::warn!(cookie = cookie.name(), error = %e, "Skipping unencodable cookie");
                }
            }
        }
    }
}

impl<S> FromRequestParts<S> for StagedCookies
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}

impl IntoResponseParts for StagedCookies {
    type Error = Infallible;

    fn into_response_parts(self, mut res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        self.apply(res.headers_mut());
        Ok(res)
    }
}

/// An `HttpOnly`, `SameSite=Lax` session cookie on `/` with no expiry.
#[must_use]
pub fn session_cookie(name: &'static str, value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

/// The PKCE verifier cookie, scoped to the auth routes for ten minutes.
#[must_use]
pub fn code_verifier_cookie(verifier: String, secure: bool) -> Cookie<'static> {
    Cookie::build((CODE_VERIFIER_COOKIE, verifier))
        .path(AUTH_COOKIE_PATH)
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(Duration::minutes(CODE_VERIFIER_MAX_AGE_MINUTES))
        .build()
}

/// Stage both auth token cookies.
pub fn stage_tokens(
    cookies: &mut StagedCookies,
    access_token: String,
    refresh_token: String,
    secure: bool,
) {
    cookies.stage(session_cookie(ACCESS_TOKEN_COOKIE, access_token, secure));
    cookies.stage(session_cookie(REFRESH_TOKEN_COOKIE, refresh_token, secure));
}

/// Stage removal of both auth token cookies.
pub fn stage_token_removal(cookies: &mut StagedCookies) {
    cookies.stage_removal(ACCESS_TOKEN_COOKIE, "/");
    cookies.stage_removal(REFRESH_TOKEN_COOKIE, "/");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn request_headers(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(cookie).unwrap());
        headers
    }

    fn set_cookies(headers: &HeaderMap) -> Vec<String> {
        headers
            .get_all(SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_reads_request_cookies() {
        let cookies = StagedCookies::from_headers(&request_headers(
            "bz-guest-session=abc; bz-access-token=tok",
        ));
        assert_eq!(cookies.get(GUEST_SESSION_COOKIE), Some("abc"));
        assert_eq!(cookies.get(ACCESS_TOKEN_COOKIE), Some("tok"));
        assert!(cookies.is_empty());
    }

    #[test]
    fn test_unchanged_cookies_are_not_echoed() {
        let cookies = StagedCookies::from_headers(&request_headers("bz-guest-session=abc"));
        let mut headers = HeaderMap::new();
        cookies.apply(&mut headers);
        assert!(set_cookies(&headers).is_empty());
    }

    #[test]
    fn test_staged_cookie_is_applied() {
        let mut cookies = StagedCookies::default();
        cookies.stage(session_cookie(GUEST_SESSION_COOKIE, "new".to_string(), false));
        assert_eq!(cookies.get(GUEST_SESSION_COOKIE), Some("new"));

        let mut headers = HeaderMap::new();
        cookies.apply(&mut headers);
        let set = set_cookies(&headers);
        assert_eq!(set.len(), 1);
        let cookie = set.first().unwrap();
        assert!(cookie.starts_with("bz-guest-session=new"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("HttpOnly"));
        assert!(!cookie.contains("Max-Age"));
        assert!(!cookie.contains("Expires"));
    }

    #[test]
    fn test_removal_expires_cookie() {
        let mut cookies = StagedCookies::from_headers(&request_headers(
            "bz-access-token=a; bz-refresh-token=r",
        ));
        stage_token_removal(&mut cookies);
        assert_eq!(cookies.get(ACCESS_TOKEN_COOKIE), None);

        let mut headers = HeaderMap::new();
        cookies.apply(&mut headers);
        let set = set_cookies(&headers);
        assert_eq!(set.len(), 2);
        assert!(set.iter().all(|c| c.contains("Max-Age=0")));
    }

    #[test]
    fn test_apply_keeps_cookies_already_on_response() {
        let mut first = StagedCookies::default();
        stage_tokens(&mut first, "handler".to_string(), "handler".to_string(), false);
        let mut second = StagedCookies::default();
        stage_tokens(&mut second, "middleware".to_string(), "middleware".to_string(), false);

        let mut headers = HeaderMap::new();
        first.apply(&mut headers);
        second.apply(&mut headers);

        let set = set_cookies(&headers);
        assert_eq!(set.len(), 2);
        assert!(set.iter().all(|c| c.contains("=handler")));
    }

    #[test]
    fn test_removal_without_request_cookie() {
        let mut cookies = StagedCookies::default();
        cookies.stage_removal(CODE_VERIFIER_COOKIE, AUTH_COOKIE_PATH);

        let mut headers = HeaderMap::new();
        cookies.apply(&mut headers);
        let set = set_cookies(&headers);
        assert_eq!(set.len(), 1);
        let cookie = set.first().unwrap();
        assert!(cookie.starts_with("bz-code-verifier="));
        assert!(cookie.contains("Path=/auth"));
        assert!(cookie.contains("Max-Age=0"));
    }

    #[test]
    fn test_code_verifier_cookie_scope() {
        let cookie = code_verifier_cookie("v".to_string(), true).to_string();
        assert!(cookie.contains("Path=/auth"));
        assert!(cookie.contains("Max-Age=600"));
        assert!(cookie.contains("Secure"));
    }
}
