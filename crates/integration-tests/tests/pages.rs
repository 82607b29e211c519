//! Public pages and the access gate against a running storefront.
//!
//! Run with: cargo test -p bazaar-integration-tests -- --ignored

#![allow(clippy::unwrap_used)]

use reqwest::StatusCode;
use reqwest::header::LOCATION;

use bazaar_integration_tests::{base_url, browser};

#[tokio::test]
#[ignore = "Requires running storefront"]
async fn test_health() {
    let client = browser();
    for path in ["/health", "/health/ready"] {
        let resp = client.get(format!("{}{path}", base_url())).send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK, "{path}");
    }
}

#[tokio::test]
#[ignore = "Requires running storefront and seeded database"]
async fn test_storefronts() {
    let client = browser();

    let home = client.get(base_url()).send().await.unwrap().text().await.unwrap();
    assert!(home.contains("Clay Co"));

    let store = client
        .get(format!("{}/clay-co", base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(store.status(), StatusCode::OK);
    assert!(store.text().await.unwrap().contains("Tall vase"));

    let missing = client
        .get(format!("{}/no-such-store", base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires running storefront"]
async fn test_dashboard_requires_sign_in() {
    let client = browser();

    let resp = client
        .get(format!("{}/dashboard", base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(resp.headers().get(LOCATION).unwrap(), "/login");
}
