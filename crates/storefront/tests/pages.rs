//! Server-rendered page tests against the full router.

#![allow(clippy::unwrap_used)]

mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use bazaar_core::{ProductId, UserId};

use common::{TestApp, body_text, get, json, user_cookie};

#[tokio::test]
async fn test_health() {
    let app = TestApp::new();

    let live = app.send(get("/health", None)).await;
    assert_eq!(live.status(), StatusCode::OK);
    assert_eq!(body_text(live).await, "ok");

    assert_eq!(
        app.send(get("/health/ready", None)).await.status(),
        StatusCode::OK
    );

    app.store.set_unavailable(true);
    assert_eq!(
        app.send(get("/health/ready", None)).await.status(),
        StatusCode::SERVICE_UNAVAILABLE
    );
}

#[tokio::test]
async fn test_home_lists_completed_stores() {
    let app = TestApp::new();
    app.store
        .seed_profile(UserId::generate(), Some(("Clay Co", "clay-co")));
    app.store.seed_profile(UserId::generate(), None);

    let html = body_text(app.send(get("/", None)).await).await;
    assert!(html.contains("Clay Co"));
    assert!(html.contains("href=\"/clay-co\""));
}

#[tokio::test]
async fn test_storefront_lists_products() {
    let app = TestApp::new();
    let seller = UserId::generate();
    app.store.seed_profile(seller, Some(("Clay Co", "clay-co")));
    let vase = app.store.seed_product(seller, "Tall vase", "45", 2);
    app.store
        .seed_product(UserId::generate(), "Someone else's bowl", "10", 1);

    let response = app.send(get("/clay-co", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Tall vase"));
    assert!(html.contains("$45.00"));
    assert!(html.contains(&format!("/clay-co/{vase}")));
    assert!(!html.contains("Someone else"));
}

#[tokio::test]
async fn test_unknown_store_is_not_found() {
    let app = TestApp::new();
    let seller = UserId::generate();
    app.store.seed_profile(seller, None);

    assert_eq!(
        app.send(get("/no-such-store", None)).await.status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        app.send(get("/Not_A_Slug", None)).await.status(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_product_page_renders_markdown() {
    let app = TestApp::new();
    let seller = UserId::generate();
    app.store.seed_profile(seller, Some(("Clay Co", "clay-co")));
    let vase = app.store.seed_product(seller, "Tall vase", "45", 2);
    app.send(json(
        Method::PUT,
        &format!("/api/products/{vase}"),
        Some(&user_cookie(seller)),
        &json!({
            "title": "Tall vase",
            "description": "**Stoneware**\n\n<script>alert(1)</script>",
            "stock": 2,
            "price": "45"
        }),
    ))
    .await;

    let response = app.send(get(&format!("/clay-co/{vase}"), None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("<strong>Stoneware</strong>"));
    assert!(!html.contains("alert(1)</script>"));
}

#[tokio::test]
async fn test_product_page_checks_store() {
    let app = TestApp::new();
    let seller = UserId::generate();
    let other = UserId::generate();
    app.store.seed_profile(seller, Some(("Clay Co", "clay-co")));
    app.store.seed_profile(other, Some(("Glass Co", "glass-co")));
    let vase = app.store.seed_product(seller, "Tall vase", "45", 2);

    assert_eq!(
        app.send(get(&format!("/glass-co/{vase}"), None)).await.status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        app.send(get(&format!("/clay-co/{}", ProductId::generate()), None))
            .await
            .status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        app.send(get("/clay-co/not-a-uuid", None)).await.status(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_cart_page_shows_lines() {
    let app = TestApp::new();
    let vase = app.store.seed_product(UserId::generate(), "Tall vase", "45", 5);
    app.send(json(
        Method::POST,
        "/api/cart",
        Some("bz-guest-session=shopper"),
        &json!({"product_id": vase, "quantity": 2}),
    ))
    .await;

    let html = body_text(app.send(get("/cart", Some("bz-guest-session=shopper"))).await).await;
    assert!(html.contains("Tall vase"));
    assert!(html.contains("$90.00"));

    let empty = body_text(app.send(get("/cart", None)).await).await;
    assert!(empty.contains("Your cart is empty."));
}

#[tokio::test]
async fn test_edit_form_is_owner_only() {
    let app = TestApp::new();
    let seller = UserId::generate();
    let other = UserId::generate();
    app.store.seed_profile(seller, Some(("Clay Co", "clay-co")));
    app.store.seed_profile(other, Some(("Glass Co", "glass-co")));
    let vase = app.store.seed_product(seller, "Tall vase", "45", 2);
    let path = format!("/dashboard/products/{vase}/edit");

    let own = app.send(get(&path, Some(&user_cookie(seller)))).await;
    assert_eq!(own.status(), StatusCode::OK);
    assert!(body_text(own).await.contains("Tall vase"));

    let foreign = app.send(get(&path, Some(&user_cookie(other)))).await;
    assert_eq!(foreign.status(), StatusCode::NOT_FOUND);
}
