//! Live-server integration tests for Bazaar.
//!
//! # Running Tests
//!
//! ```bash
//! cargo run -p bazaar-cli -- migrate
//! cargo run -p bazaar-cli -- seed --file crates/cli/seed/stores.yaml
//! cargo run -p bazaar-storefront &
//!
//! cargo test -p bazaar-integration-tests -- --ignored
//! ```
//!
//! Tests expect the demo stores from `crates/cli/seed/stores.yaml`. The
//! server address comes from `BAZAAR_TEST_URL` (default
//! `http://localhost:3000`).

use reqwest::Client;
use reqwest::redirect::Policy;
use uuid::Uuid;

/// Base URL of the server under test.
#[must_use]
pub fn base_url() -> String {
    std::env::var("BAZAAR_TEST_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// A client that keeps cookies between requests, like a browser tab.
///
/// # Panics
///
/// Panics if the client cannot be built.
#[must_use]
#[allow(clippy::expect_used)]
pub fn browser() -> Client {
    Client::builder()
        .cookie_store(true)
        .redirect(Policy::none())
        .build()
        .expect("Failed to create HTTP client")
}

/// Product ids linked from a storefront page, in page order.
#[must_use]
pub fn product_links(html: &str, slug: &str) -> Vec<Uuid> {
    let prefix = format!("href=\"/{slug}/");
    html.match_indices(&prefix)
        .filter_map(|(start, _)| {
            let rest = html.get(start + prefix.len()..)?;
            let end = rest.find('"')?;
            rest.get(..end)?.parse().ok()
        })
        .collect()
}
