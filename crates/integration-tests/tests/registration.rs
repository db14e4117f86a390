//! Registration with an emailed one-time code.

use axum::http::StatusCode;
use celesta_integration_tests::{
    FakeBackend, FakeIdentity, PASSWORD, TestContext, TestResponse, input_value,
};

const EMAIL: &str = "new.visitor@example.com";

async fn submit_form(ctx: &mut TestContext, email: &str) -> TestResponse {
    ctx.post(
        "/auth/register",
        &[
            ("name", "New Visitor"),
            ("email", email),
            ("password", PASSWORD),
            ("confirm_password", PASSWORD),
            ("dob_day", "7"),
            ("dob_month", "3"),
            ("dob_year", "2004"),
        ],
    )
    .await
}

/// Open the code step and return the outstanding challenge id.
async fn challenge_id(ctx: &mut TestContext) -> String {
    let page = ctx.get("/auth/register").await;
    assert_eq!(page.status, StatusCode::OK);
    input_value(&page.body, "challenge_id").unwrap().to_string()
}

fn wrong_code(code: &str) -> String {
    code.chars()
        .map(|c| if c == '9' { '0' } else { '9' })
        .collect()
}

#[tokio::test]
async fn test_code_sent_then_account_created() {
    let mut ctx = TestContext::new();

    let response = submit_form(&mut ctx, EMAIL).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert!(response.location().starts_with("/auth/register?success="));
    assert_eq!(ctx.mailer.sent_count(), 1);

    let id = challenge_id(&mut ctx).await;
    let code = ctx.mailer.last_code(EMAIL).unwrap();
    assert_eq!(code.len(), 6);

    let response = ctx
        .post(
            "/auth/register/verify",
            &[("challenge_id", id.as_str()), ("otp", code.as_str())],
        )
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert!(response.location().starts_with("/profile"));

    // Signed in straight away.
    assert_eq!(ctx.get("/profile").await.status, StatusCode::OK);

    // The account now exists with the identity provider.
    ctx.post("/auth/logout", &[]).await;
    assert_eq!(ctx.sign_in(EMAIL).await.location(), "/profile");
}

#[tokio::test]
async fn test_institute_address_gets_mail_hint() {
    let mut ctx = TestContext::new();
    submit_form(&mut ctx, "2301cs42@iitp.ac.in").await;
    let page = ctx.get("/auth/register").await;
    assert!(page.body.contains("Institute mail can take a few minutes"));

    let mut ctx = TestContext::new();
    submit_form(&mut ctx, EMAIL).await;
    let page = ctx.get("/auth/register").await;
    assert!(!page.body.contains("Institute mail can take a few minutes"));
}

#[tokio::test]
async fn test_wrong_code_keeps_code_step() {
    let mut ctx = TestContext::new();
    submit_form(&mut ctx, EMAIL).await;

    let id = challenge_id(&mut ctx).await;
    let code = ctx.mailer.last_code(EMAIL).unwrap();

    let response = ctx
        .post(
            "/auth/register/verify",
            &[("challenge_id", id.as_str()), ("otp", wrong_code(&code).as_str())],
        )
        .await;
    assert!(response.location().starts_with("/auth/register?error="));

    let page = ctx.get(response.location()).await;
    assert!(page.body.contains("Invalid OTP"));
    assert_eq!(input_value(&page.body, "challenge_id"), Some(id.as_str()));

    // The right code still works afterwards.
    let response = ctx
        .post(
            "/auth/register/verify",
            &[("challenge_id", id.as_str()), ("otp", code.as_str())],
        )
        .await;
    assert!(response.location().starts_with("/profile"));
}

#[tokio::test]
async fn test_mismatched_passwords_rejected_without_sending() {
    let mut ctx = TestContext::new();
    let page = ctx
        .post(
            "/auth/register",
            &[
                ("name", "New Visitor"),
                ("email", EMAIL),
                ("password", PASSWORD),
                ("confirm_password", "something-else"),
                ("dob_day", "7"),
                ("dob_month", "3"),
                ("dob_year", "2004"),
            ],
        )
        .await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("Passwords do not match!"));
    assert_eq!(input_value(&page.body, "email"), Some(EMAIL));
    assert_eq!(ctx.mailer.sent_count(), 0);
}

#[tokio::test]
async fn test_missing_fields_rejected() {
    let mut ctx = TestContext::new();
    let page = ctx.post("/auth/register", &[("email", EMAIL)]).await;
    assert!(page.body.contains("All fields are required!"));
    assert_eq!(ctx.mailer.sent_count(), 0);
}

#[tokio::test]
async fn test_resend_waits_for_countdown() {
    let mut ctx = TestContext::new();
    submit_form(&mut ctx, EMAIL).await;
    let id = challenge_id(&mut ctx).await;

    let response = ctx
        .post("/auth/register/resend", &[("challenge_id", id.as_str())])
        .await;
    assert!(response.location().starts_with("/auth/register?error="));
    assert_eq!(ctx.mailer.sent_count(), 1);
}

#[tokio::test]
async fn test_rejected_profile_deletes_identity_account() {
    let backend = FakeBackend {
        reject_profiles: true,
        ..FakeBackend::default()
    };
    let mut ctx = TestContext::with(FakeIdentity::default(), backend);
    submit_form(&mut ctx, EMAIL).await;

    let id = challenge_id(&mut ctx).await;
    let code = ctx.mailer.last_code(EMAIL).unwrap();
    let response = ctx
        .post(
            "/auth/register/verify",
            &[("challenge_id", id.as_str()), ("otp", code.as_str())],
        )
        .await;

    assert!(response.location().starts_with("/auth/register?error="));
    assert_eq!(
        ctx.identity.deleted.lock().unwrap().as_slice(),
        ["uid-new.visitor".to_string()]
    );
}

#[tokio::test]
async fn test_edit_returns_to_form_with_values() {
    let mut ctx = TestContext::new();
    submit_form(&mut ctx, EMAIL).await;

    let page = ctx.get("/auth/register?edit=true").await;
    assert_eq!(input_value(&page.body, "name"), Some("New Visitor"));
    assert!(input_value(&page.body, "challenge_id").is_none());
    assert!(page.body.contains("Back to code entry"));
}

#[tokio::test]
async fn test_edited_form_waits_for_resend_countdown() {
    let mut ctx = TestContext::new();
    submit_form(&mut ctx, EMAIL).await;
    let id = challenge_id(&mut ctx).await;

    let page = ctx.get("/auth/register?edit=true").await;
    assert_eq!(page.status, StatusCode::OK);

    let response = submit_form(&mut ctx, "other.visitor@example.com").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("You can resend the OTP in"));
    assert_eq!(ctx.mailer.sent_count(), 1);
    assert!(ctx.mailer.last_code("other.visitor@example.com").is_none());

    // The original code is still the one to enter.
    assert_eq!(challenge_id(&mut ctx).await, id);
}
