//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                                 - Storefront directory
//! GET  /health                           - Liveness
//! GET  /health/ready                     - Readiness (database ping)
//!
//! # Auth
//! GET  /login                            - Sign-in page
//! GET  /auth/login                       - Redirect to the auth provider
//! GET  /auth/callback                    - OAuth callback
//! POST /auth/logout                      - Sign out
//!
//! # Seller area (access gate)
//! GET  /welcome                          - Onboarding form
//! GET  /dashboard                        - Overview
//! GET  /dashboard/products               - Product list
//! GET  /dashboard/products/new           - New product form
//! GET  /dashboard/products/{id}/edit     - Edit product form
//!
//! # Shopping
//! GET  /cart                             - Cart page
//! GET  /{slug}                           - Storefront
//! GET  /{slug}/{product_id}              - Product detail
//!
//! # JSON API
//! GET|POST|PUT|DELETE /api/cart          - Cart
//! POST /api/products                     - Create product (multipart)
//! PUT|DELETE /api/products/{id}          - Update / delete product
//! POST /api/profile/setup                - Complete onboarding
//! ```

pub mod api;
pub mod auth;
pub mod cart;
pub mod dashboard;
pub mod home;
pub mod store;
pub mod welcome;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Router,
    extract::State,
    http::StatusCode,
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::{get, post},
};

use crate::middleware::{access_gate, identity_middleware};
use crate::state::AppState;

/// Page shown for unknown stores and products.
#[derive(Template, WebTemplate)]
#[template(path = "not_found.html")]
pub struct NotFoundTemplate;

/// A 404 page.
#[must_use]
pub fn not_found() -> Response {
    (StatusCode::NOT_FOUND, NotFoundTemplate).into_response()
}

async fn fallback() -> Response {
    not_found()
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::start_login))
        .route("/callback", get(auth::callback))
        .route("/logout", post(auth::logout))
}

/// Create the seller dashboard router.
pub fn dashboard_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard::index))
        .route("/products", get(dashboard::products))
        .route("/products/new", get(dashboard::new_product))
        .route("/products/{id}/edit", get(dashboard::edit_product))
}

/// Create all routes for the storefront.
pub fn routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .route("/login", get(auth::login_page))
        .nest("/auth", auth_routes())
        .route("/welcome", get(welcome::show))
        .nest("/dashboard", dashboard_routes())
        .route("/cart", get(cart::show))
        .nest("/api", api::routes(max_upload_bytes))
        // Storefronts last; static segments above take precedence
        .route("/{slug}", get(store::show))
        .route("/{slug}/{product_id}", get(store::product))
        .fallback(fallback)
}

/// The full application: routes, access gate and identity resolution.
///
/// The identity middleware is outermost so the gate sees the resolved
/// identity and any refreshed cookies land on gate redirects too.
pub fn app(state: AppState) -> Router {
    routes(state.config().max_upload_bytes)
        .layer(from_fn_with_state(state.clone(), access_gate))
        .layer(from_fn_with_state(state.clone(), identity_middleware))
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.profiles().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
