//! Access gate for the seller area.
//!
//! Sellers must be signed in to reach the dashboard and onboarding pages, and
//! must have completed onboarding to reach anything but the onboarding page.
//! The decision is a pure function of the path, the authentication state and
//! the profile state; [`access_gate`] gathers those and acts on it.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tracing::{debug, warn};

use bazaar_core::UserId;

use crate::config::GatePolicy;
use crate::db::ProfileStore;
use crate::models::Identity;
use crate::state::AppState;

/// Onboarding state of the signed-in user's profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileState {
    Complete,
    Incomplete,
    /// No profile row, or the lookup failed.
    Unknown,
}

/// Authentication state as seen by the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateAuth {
    Anonymous,
    Authenticated(ProfileState),
}

/// What the gate does with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    RedirectLogin,
    RedirectOnboarding,
}

/// Whether `path` equals a protected prefix or lies beneath one.
#[must_use]
pub fn is_protected(policy: &GatePolicy, path: &str) -> bool {
    policy
        .protected_prefixes
        .iter()
        .any(|prefix| path_within(path, prefix))
}

fn path_within(path: &str, prefix: &str) -> bool {
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

/// Decide what to do with a request.
#[must_use]
pub fn decide(policy: &GatePolicy, path: &str, auth: GateAuth) -> GateDecision {
    if !is_protected(policy, path) {
        return GateDecision::Allow;
    }

    match auth {
        GateAuth::Anonymous => GateDecision::RedirectLogin,
        GateAuth::Authenticated(ProfileState::Complete) => GateDecision::Allow,
        GateAuth::Authenticated(_) if path_within(path, &policy.onboarding_path) => {
            GateDecision::Allow
        }
        GateAuth::Authenticated(ProfileState::Incomplete | ProfileState::Unknown) => {
            GateDecision::RedirectOnboarding
        }
    }
}

/// Look up a user's onboarding state. Store failures read as `Unknown`.
pub async fn profile_state(profiles: &dyn ProfileStore, user: UserId) -> ProfileState {
    match profiles.setup_state(user).await {
        Ok(Some(true)) => ProfileState::Complete,
        Ok(Some(false)) => ProfileState::Incomplete,
        Ok(None) => ProfileState::Unknown,
        Err(e) => {
            warn!(user_id = %user, error = %e, "Profile lookup failed");
            ProfileState::Unknown
        }
    }
}

/// Middleware enforcing the access gate. Runs after identity resolution.
pub async fn access_gate(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let policy = &state.config().gate;
    let path = request.uri().path().to_owned();

    if !is_protected(policy, &path) {
        return next.run(request).await;
    }

    let user = request
        .extensions()
        .get::<Identity>()
        .and_then(Identity::user_id);
    let auth = match user {
        Some(user) => GateAuth::Authenticated(profile_state(state.profiles(), user).await),
        None => GateAuth::Anonymous,
    };

    match decide(policy, &path, auth) {
        GateDecision::Allow => next.run(request).await,
        GateDecision::RedirectLogin => {
            debug!(path = %path, "Gate: sign-in required");
            Redirect::temporary(&policy.login_path).into_response()
        }
        GateDecision::RedirectOnboarding => {
            debug!(path = %path, "Gate: onboarding required");
            Redirect::temporary(&policy.onboarding_path).into_response()
        }
    }
}
