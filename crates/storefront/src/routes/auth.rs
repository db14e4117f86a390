//! Authentication route handlers.
//!
//! Login, logout and the two-step registration: the form sends a one-time
//! code to the visitor's email, and the account is created once the code is
//! confirmed. Registration progress is kept in the session; the code itself
//! never leaves the server.

use std::convert::Infallible;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{
        IntoResponse, Redirect, Response, Sse,
        sse::{Event, KeepAlive, KeepAliveStream},
    },
};
use chrono::Utc;
use futures::{StreamExt, stream::BoxStream};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;
use uuid::Uuid;

use celesta_core::registration::{
    DateOfBirth, RegistrationForm, RegistrationFlow, RegistrationState,
};

use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{CspNonce, OptionalAuth, clear_current_user, set_current_user};
use crate::models::{CurrentUser, load, session_keys};
use crate::routes::{Nav, with_notice};
use crate::services::auth::RegistrationFailure;
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Registration form data, as posted by the browser.
#[derive(Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
    #[serde(default)]
    pub dob_day: String,
    #[serde(default)]
    pub dob_month: String,
    #[serde(default)]
    pub dob_year: String,
}

impl From<RegisterForm> for RegistrationForm {
    fn from(form: RegisterForm) -> Self {
        Self {
            name: form.name,
            email: form.email,
            password: form.password,
            confirm_password: form.confirm_password,
            dob: DateOfBirth {
                day: form.dob_day,
                month: form.dob_month,
                year: form.dob_year,
            },
        }
    }
}

/// Code entry form data.
#[derive(Deserialize)]
pub struct VerifyForm {
    pub challenge_id: Uuid,
    #[serde(default)]
    pub otp: String,
}

/// Resend form data.
#[derive(Deserialize)]
pub struct ResendForm {
    pub challenge_id: Uuid,
}

/// Query parameters for error/success display.
#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
    pub success: Option<String>,
    /// Show the form again while a code is outstanding.
    #[serde(default)]
    pub edit: bool,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub nav: Nav,
    pub error: Option<String>,
    pub success: Option<String>,
    pub nonce: String,
}

/// Values echoed back into the registration form. Passwords are never echoed.
#[derive(Clone, Default)]
pub struct FormValues {
    pub name: String,
    pub email: String,
    pub dob_day: String,
    pub dob_month: String,
    pub dob_year: String,
}

impl From<&RegistrationForm> for FormValues {
    fn from(form: &RegistrationForm) -> Self {
        Self {
            name: form.name.clone(),
            email: form.email.clone(),
            dob_day: form.dob.day.clone(),
            dob_month: form.dob.month.clone(),
            dob_year: form.dob.year.clone(),
        }
    }
}

/// The code entry step.
#[derive(Clone)]
pub struct CodeStep {
    pub email: String,
    /// Institute mail is slow and spam-filtered; the page says so.
    pub institute: bool,
    pub challenge_id: String,
    /// Seconds until the code may be resent.
    pub time_left: u32,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub nav: Nav,
    pub values: FormValues,
    /// Set once a code has been sent, unless the visitor went back to edit.
    pub code_step: Option<CodeStep>,
    /// A code is outstanding (offers a way back to it while editing).
    pub pending: bool,
    pub error: Option<String>,
    pub success: Option<String>,
    pub nonce: String,
}

fn landing(user: &CurrentUser) -> Response {
    Redirect::to(user.role.landing_path()).into_response()
}

async fn get_flow(session: &Session) -> RegistrationFlow {
    load(session, session_keys::REGISTRATION).await
}

async fn save_flow(session: &Session, flow: &RegistrationFlow) -> Result<()> {
    session.insert(session_keys::REGISTRATION, flow).await?;
    Ok(())
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page. Signed-in visitors go to their landing page.
pub async fn login_page(
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<MessageQuery>,
    CspNonce(nonce): CspNonce,
) -> Response {
    if let Some(user) = user {
        return landing(&user);
    }

    LoginTemplate {
        nav: Nav::load(&session).await,
        error: query.error,
        success: query.success,
        nonce,
    }
    .into_response()
}

/// Handle login form submission.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    match state.auth().login(&form.email, &form.password).await {
        Ok(user) => {
            set_current_user(&session, &user).await?;
            set_sentry_user(&user.user, Some(user.email.as_str()));
            Ok(landing(&user))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Login failed");
            Ok(Redirect::to(&with_notice("/auth/login", "error", e.notice())).into_response())
        }
    }
}

/// Sign out and drop the session.
#[instrument(skip_all)]
pub async fn logout(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> Result<Response> {
    if let Some(user) = user {
        if let Err(e) = state.auth().logout(&user).await {
            tracing::warn!(error = %e, user = %user.user, "Identity sign-out failed");
        }
        tracing::info!(user = %user.user, "Signed out");
    }

    clear_current_user(&session).await?;
    clear_sentry_user();
    Ok(Redirect::to("/").into_response())
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration form, or the code entry step once a code is out.
pub async fn register_page(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<MessageQuery>,
    CspNonce(nonce): CspNonce,
) -> Response {
    if let Some(user) = user {
        return landing(&user);
    }

    let flow = get_flow(&session).await;
    let page = RegisterPage {
        values: flow.form().map(FormValues::from).unwrap_or_default(),
        edit: query.edit,
        error: query.error,
        success: query.success,
        nonce,
    };
    page.render(&state, &session, &flow).await
}

/// Validate the form and email a code.
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    CspNonce(nonce): CspNonce,
    Form(form): Form<RegisterForm>,
) -> Result<Response> {
    if let Some(user) = user {
        return Ok(landing(&user));
    }

    let form = RegistrationForm::from(form);
    let values = FormValues::from(&form);
    let mut flow = get_flow(&session).await;

    match state.auth().send_code(&mut flow, form, Utc::now()).await {
        Ok(_) => {
            save_flow(&session, &flow).await?;
            Ok(Redirect::to(&with_notice("/auth/register", "success", "OTP sent to email"))
                .into_response())
        }
        Err(e) => {
            let page = RegisterPage {
                values,
                edit: true,
                error: Some(e.notice()),
                success: None,
                nonce,
            };
            Ok(page.render(&state, &session, &flow).await)
        }
    }
}

/// Check the code and create the account.
///
/// On success the new account is signed in and sent to its landing page.
#[instrument(skip_all, fields(challenge = %form.challenge_id))]
pub async fn verify(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<VerifyForm>,
) -> Result<Response> {
    let mut flow = get_flow(&session).await;

    match state
        .auth()
        .verify(&mut flow, form.challenge_id, &form.otp)
        .await
    {
        Ok(user) => {
            session
                .remove::<RegistrationFlow>(session_keys::REGISTRATION)
                .await?;
            set_current_user(&session, &user).await?;
            set_sentry_user(&user.user, Some(user.email.as_str()));
            Ok(Redirect::to(&with_notice(
                user.role.landing_path(),
                "success",
                "Registered successfully!",
            ))
            .into_response())
        }
        Err(e) => {
            if !matches!(e, RegistrationFailure::Invalid(_)) {
                tracing::warn!(error = %e, "Verification failed");
            }
            Ok(Redirect::to(&with_notice("/auth/register", "error", &e.notice())).into_response())
        }
    }
}

/// Email a replacement code once the countdown has finished.
#[instrument(skip_all, fields(challenge = %form.challenge_id))]
pub async fn resend(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<ResendForm>,
) -> Result<Response> {
    let mut flow = get_flow(&session).await;

    match state
        .auth()
        .resend_code(&mut flow, form.challenge_id, Utc::now())
        .await
    {
        Ok(_) => {
            save_flow(&session, &flow).await?;
            Ok(Redirect::to(&with_notice("/auth/register", "success", "OTP resent")).into_response())
        }
        Err(e) => {
            let notice = match e {
                RegistrationFailure::Dispatch(_) => "Failed to resend OTP".to_string(),
                other => other.notice(),
            };
            Ok(Redirect::to(&with_notice("/auth/register", "error", &notice)).into_response())
        }
    }
}

/// Stream the resend countdown as server-sent events.
///
/// Each event carries the seconds left; the stream ends after `0`. Without an
/// outstanding code the stream is a single `0`.
pub async fn timer(
    State(state): State<AppState>,
    session: Session,
) -> Sse<KeepAliveStream<BoxStream<'static, std::result::Result<Event, Infallible>>>> {
    let flow = get_flow(&session).await;

    let seconds: BoxStream<'static, u32> = match flow.challenge() {
        Some(challenge) => state
            .timers()
            .get_or_resume(challenge.id, challenge.resend_deadline, Utc::now())
            .await
            .stream()
            .boxed(),
        None => futures::stream::once(async { 0 }).boxed(),
    };

    let events = seconds
        .map(|left| Ok(Event::default().event("tick").data(left.to_string())))
        .boxed();

    Sse::new(events).keep_alive(KeepAlive::default())
}

/// Everything needed to draw the registration page.
struct RegisterPage {
    values: FormValues,
    edit: bool,
    error: Option<String>,
    success: Option<String>,
    nonce: String,
}

impl RegisterPage {
    async fn render(self, state: &AppState, session: &Session, flow: &RegistrationFlow) -> Response {
        if let RegistrationState::Verified { .. } = flow.state() {
            return Redirect::to("/auth/login").into_response();
        }

        let pending = flow.challenge().is_some();
        let code_step = match (flow.state(), self.edit) {
            (RegistrationState::OtpSent { email, challenge, .. }, false) => {
                let timer = state
                    .timers()
                    .get_or_resume(challenge.id, challenge.resend_deadline, Utc::now())
                    .await;
                Some(CodeStep {
                    email: email.to_string(),
                    institute: email.is_institute(),
                    challenge_id: challenge.id.to_string(),
                    time_left: timer.time_left(),
                })
            }
            _ => None,
        };

        RegisterTemplate {
            nav: Nav::load(session).await,
            values: self.values,
            code_step,
            pending,
            error: self.error,
            success: self.success,
            nonce: self.nonce,
        }
        .into_response()
    }
}
