//! Sign-in through the hosted auth provider (OAuth with PKCE).
//!
//! ```text
//! GET  /login          - Sign-in page
//! GET  /auth/login     - Redirect to the provider
//! GET  /auth/callback  - Exchange the code, set token cookies
//! POST /auth/logout    - Revoke the session, clear token cookies
//! ```

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect},
};
use serde::Deserialize;
use tracing::{instrument, warn};

use crate::cookies::{
    ACCESS_TOKEN_COOKIE, AUTH_COOKIE_PATH, CODE_VERIFIER_COOKIE, StagedCookies,
    code_verifier_cookie, stage_token_removal, stage_tokens,
};
use crate::error::clear_sentry_user;
use crate::services::auth::pkce;
use crate::state::AppState;

/// Where a successful sign-in lands.
const AFTER_SIGN_IN: &str = "/dashboard";
/// Where a failed sign-in lands.
const SIGN_IN_FAILED: &str = "/login?error=Could%20not%20authenticate%20user";

/// Query parameters for the sign-in page.
#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub error: Option<String>,
}

/// Query parameters the provider redirects back with.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
}

/// Sign-in page template.
#[derive(Template, WebTemplate)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub error: Option<String>,
}

/// Display the sign-in page.
pub async fn login_page(Query(query): Query<LoginQuery>) -> impl IntoResponse {
    LoginTemplate { error: query.error }
}

/// Start the OAuth flow.
///
/// Stores a fresh PKCE verifier in a short-lived cookie scoped to `/auth`
/// and redirects to the provider with its S256 challenge.
#[instrument(skip(state, cookies))]
pub async fn start_login(
    State(state): State<AppState>,
    mut cookies: StagedCookies,
) -> (StagedCookies, Redirect) {
    let verifier = pkce::generate_verifier();
    let challenge = pkce::challenge(&verifier);
    let redirect_to = format!("{}/auth/callback", state.config().base_url);

    let url = state.auth().authorize_url(&challenge, &redirect_to);
    cookies.stage(code_verifier_cookie(verifier, state.secure_cookies()));

    (cookies, Redirect::to(&url))
}

/// Finish the OAuth flow.
///
/// Exchanges the code for a session, sets the token cookies, makes sure the
/// seller has a profile row and sends them to the dashboard (the access gate
/// takes it from there).
#[instrument(skip(state, cookies, query))]
pub async fn callback(
    State(state): State<AppState>,
    mut cookies: StagedCookies,
    Query(query): Query<CallbackQuery>,
) -> (StagedCookies, Redirect) {
    let Some(code) = query.code.filter(|c| !c.is_empty()) else {
        return (cookies, Redirect::to(AFTER_SIGN_IN));
    };

    let verifier = cookies.get(CODE_VERIFIER_COOKIE).map(str::to_owned);
    cookies.stage_removal(CODE_VERIFIER_COOKIE, AUTH_COOKIE_PATH);

    let Some(verifier) = verifier else {
        warn!("OAuth callback without a code verifier");
        return (cookies, Redirect::to(SIGN_IN_FAILED));
    };

    let session = match state.auth().exchange_code(&code, &verifier).await {
        Ok(session) => session,
        Err(e) => {
            warn!(error = %e, "Code exchange failed");
            return (cookies, Redirect::to(SIGN_IN_FAILED));
        }
    };

    let user = match state.tokens().verify(&session.access_token) {
        Ok(user) => user,
        Err(e) => {
            warn!(error = %e, "Provider issued an access token that does not verify");
            return (cookies, Redirect::to(SIGN_IN_FAILED));
        }
    };

    if let Err(e) = state.profiles().ensure(user.id).await {
        warn!(user_id = %user.id, error = %e, "Failed to create profile row");
    }

    stage_tokens(
        &mut cookies,
        session.access_token,
        session.refresh_token,
        state.secure_cookies(),
    );
    tracing::info!(user_id = %user.id, "Signed in");

    (cookies, Redirect::to(AFTER_SIGN_IN))
}

/// Sign out.
///
/// Revocation at the provider is best-effort; the token cookies are cleared
/// regardless.
#[instrument(skip(state, cookies))]
pub async fn logout(
    State(state): State<AppState>,
    mut cookies: StagedCookies,
) -> (StagedCookies, Redirect) {
    if let Some(access_token) = cookies.get(ACCESS_TOKEN_COOKIE).map(str::to_owned)
        && let Err(e) = state.auth().sign_out(&access_token).await
    {
        warn!(error = %e, "Provider sign-out failed");
    }

    stage_token_removal(&mut cookies);
    clear_sentry_user();

    (cookies, Redirect::to("/login"))
}
