//! Sign-in gates and role-based landing pages.

use axum::http::StatusCode;
use celesta_integration_tests::{ADMIN_EMAIL, FakeBackend, FakeIdentity, TestContext};

const VISITOR: &str = "asha@example.com";

fn context() -> TestContext {
    let identity = FakeIdentity::default()
        .with_account(VISITOR)
        .with_account(ADMIN_EMAIL);
    TestContext::with(identity, FakeBackend::default())
}

#[tokio::test]
async fn test_anonymous_visitors_are_sent_to_register() {
    let mut ctx = context();
    for path in ["/store", "/profile", "/admin", "/profile/qr.svg"] {
        let response = ctx.get(path).await;
        assert_eq!(response.status, StatusCode::SEE_OTHER, "{path}");
        assert_eq!(response.location(), "/auth/register", "{path}");
    }
}

#[tokio::test]
async fn test_public_pages_render() {
    let mut ctx = context();
    for path in ["/", "/events", "/workshops", "/contact", "/sponsors", "/auth/login"] {
        assert_eq!(ctx.get(path).await.status, StatusCode::OK, "{path}");
    }
}

#[tokio::test]
async fn test_unknown_event_is_not_found() {
    let mut ctx = context();
    assert_eq!(ctx.get("/events/nope").await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_user_lands_on_profile() {
    let mut ctx = context();
    let response = ctx.sign_in(VISITOR).await;
    assert_eq!(response.location(), "/profile");

    let profile = ctx.get("/profile").await;
    assert_eq!(profile.status, StatusCode::OK);
    assert!(profile.body.contains("Asha Verma"));
    assert!(profile.body.contains("CEL-0042"));
    assert!(profile.body.contains("/profile/qr.svg"));

    let admin = ctx.get("/admin").await;
    assert_eq!(admin.status, StatusCode::SEE_OTHER);
    assert_eq!(admin.location(), "/profile");
}

#[tokio::test]
async fn test_admin_lands_on_admin() {
    let mut ctx = context();
    let response = ctx.sign_in(ADMIN_EMAIL).await;
    assert_eq!(response.location(), "/admin");

    let admin = ctx.get("/admin").await;
    assert_eq!(admin.status, StatusCode::OK);
    assert!(admin.body.contains(ADMIN_EMAIL));
}

#[tokio::test]
async fn test_signed_in_visitor_skips_login_page() {
    let mut ctx = context();
    ctx.sign_in(VISITOR).await;
    let response = ctx.get("/auth/login").await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), "/profile");
}

#[tokio::test]
async fn test_wrong_password_shows_notice() {
    let mut ctx = context();
    let response = ctx
        .post("/auth/login", &[("email", VISITOR), ("password", "wrong-pass")])
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert!(response.location().starts_with("/auth/login?error="));

    let page = ctx.get(response.location()).await;
    assert!(page.body.contains("Login failed. Please check your credentials."));
}

#[tokio::test]
async fn test_qr_download_names_file_after_celesta_id() {
    let mut ctx = context();
    ctx.sign_in(VISITOR).await;

    let inline = ctx.get("/profile/qr.svg").await;
    assert_eq!(inline.status, StatusCode::OK);
    assert_eq!(inline.header("content-type"), Some("image/svg+xml"));
    assert!(inline.body.contains("<svg"));

    let download = ctx.get("/profile/qr.svg?download=true").await;
    assert_eq!(
        download.header("content-disposition"),
        Some("attachment; filename=\"CEL-0042_QR.svg\"")
    );
}

#[tokio::test]
async fn test_qr_failure_is_a_missing_pass() {
    let backend = FakeBackend {
        qr_down: true,
        ..FakeBackend::default()
    };
    let mut ctx = TestContext::with(FakeIdentity::default().with_account(VISITOR), backend);
    ctx.sign_in(VISITOR).await;

    let pass = ctx.get("/profile/qr.svg").await;
    assert_eq!(pass.status, StatusCode::NOT_FOUND);

    // The profile page itself still renders.
    assert_eq!(ctx.get("/profile").await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_logout_ends_session() {
    let mut ctx = context();
    ctx.sign_in(VISITOR).await;
    let response = ctx.post("/auth/logout", &[]).await;
    assert_eq!(response.location(), "/");

    let store = ctx.get("/store").await;
    assert_eq!(store.location(), "/auth/register");
}

#[tokio::test]
async fn test_contact_requires_every_field() {
    let mut ctx = context();
    let response = ctx.post("/contact", &[("name", "Asha")]).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);

    let page = ctx.get(response.location()).await;
    assert!(page.body.contains("All fields are required!"));
}
