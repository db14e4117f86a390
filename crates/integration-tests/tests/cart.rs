//! Store, cart fragments and checkout.

use axum::http::StatusCode;
use celesta_integration_tests::{FakeBackend, FakeIdentity, PAYMENT_URL, TestContext};

const VISITOR: &str = "asha@example.com";

async fn signed_in() -> TestContext {
    let identity = FakeIdentity::default().with_account(VISITOR);
    let mut ctx = TestContext::with(identity, FakeBackend::default());
    ctx.sign_in(VISITOR).await;
    ctx
}

async fn badge(ctx: &mut TestContext) -> String {
    ctx.get("/cart/count").await.body
}

#[tokio::test]
async fn test_store_lists_catalog() {
    let mut ctx = signed_in().await;
    let page = ctx.get("/store").await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("Realms Tee"));
    assert!(page.body.contains("Festival Band"));
    assert!(page.body.contains("Rs.399"));
}

#[tokio::test]
async fn test_add_and_remove_update_badge() {
    let mut ctx = signed_in().await;

    let response = ctx.post("/cart/add", &[("product_id", "tee-01")]).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header("hx-trigger"), Some("cart-updated"));
    assert!(response.body.contains("data-quantity=\"1\""));

    ctx.post("/cart/add", &[("product_id", "tee-01")]).await;
    ctx.post("/cart/add", &[("product_id", "band-01")]).await;
    assert!(badge(&mut ctx).await.contains(">3<"));

    let response = ctx.post("/cart/remove", &[("product_id", "tee-01")]).await;
    assert!(response.body.contains("data-quantity=\"1\""));
    assert!(badge(&mut ctx).await.contains(">2<"));

    let page = ctx.get("/store").await;
    assert!(page.body.contains("data-quantity=\"1\""));
}

#[tokio::test]
async fn test_unknown_product_rejected() {
    let mut ctx = signed_in().await;
    let response = ctx.post("/cart/add", &[("product_id", "ghost")]).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert!(badge(&mut ctx).await.contains(">0<"));
}

#[tokio::test]
async fn test_zero_quantity_removes_line() {
    let mut ctx = signed_in().await;
    ctx.post("/cart/add", &[("product_id", "band-01")]).await;

    let response = ctx
        .post("/cart/update", &[("product_id", "band-01"), ("quantity", "0")])
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(!response.body.contains("Festival Band"));
    assert!(badge(&mut ctx).await.contains(">0<"));
}

#[tokio::test]
async fn test_cart_page_shows_totals() {
    let mut ctx = signed_in().await;
    ctx.post("/cart/add", &[("product_id", "tee-01")]).await;
    ctx.post("/cart/update", &[("product_id", "tee-01"), ("quantity", "3")])
        .await;

    let page = ctx.get("/cart").await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("Rs.1197"));
}

#[tokio::test]
async fn test_checkout_redirects_to_payment_and_clears_cart() {
    let mut ctx = signed_in().await;
    ctx.post("/cart/add", &[("product_id", "tee-01")]).await;
    ctx.post("/cart/add", &[("product_id", "band-01")]).await;

    let response = ctx.post("/checkout", &[]).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), PAYMENT_URL);

    let orders = ctx.backend.checkouts.lock().unwrap().clone();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].len(), 2);

    assert!(badge(&mut ctx).await.contains(">0<"));
}

#[tokio::test]
async fn test_empty_checkout_stays_on_cart() {
    let mut ctx = signed_in().await;
    let response = ctx.post("/checkout", &[]).await;
    assert_eq!(response.location(), "/cart");
    assert!(ctx.backend.checkouts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_checkout_requires_sign_in() {
    let mut ctx = TestContext::new();
    let response = ctx.post("/checkout", &[]).await;
    assert_eq!(response.location(), "/auth/register");
}
