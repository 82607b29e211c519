//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request span)
//! 3. Request ID (record on span and Sentry scope)
//! 4. Identity (token cookies, refresh, guest session)
//! 5. Access gate (every request; only `/dashboard` and `/welcome` paths are checked)

pub mod gate;
pub mod identity;
pub mod request_id;

pub use gate::access_gate;
pub use identity::{RequireUser, identity_middleware};
pub use request_id::request_id_middleware;
