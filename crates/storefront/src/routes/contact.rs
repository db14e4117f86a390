//! Contact form route handlers.
//!
//! Messages are relayed to the organisers through Web3Forms. Without an
//! access key the form is shown but reports that it is unavailable.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::filters;
use crate::middleware::CspNonce;
use crate::routes::{Nav, with_notice};
use crate::services::contact::ContactMessage;
use crate::state::AppState;

/// Query parameters for error/success display.
#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Contact page template.
#[derive(Template, WebTemplate)]
#[template(path = "contact.html")]
pub struct ContactTemplate {
    pub nav: Nav,
    pub available: bool,
    pub error: Option<String>,
    pub success: Option<String>,
    pub nonce: String,
}

/// Display the contact form.
pub async fn page(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<MessageQuery>,
    CspNonce(nonce): CspNonce,
) -> impl IntoResponse {
    ContactTemplate {
        nav: Nav::load(&session).await,
        available: state.contact().is_some(),
        error: query.error,
        success: query.success,
        nonce,
    }
}

/// Relay a contact message.
#[instrument(skip_all)]
pub async fn submit(State(state): State<AppState>, Form(form): Form<ContactMessage>) -> Response {
    if !form.is_complete() {
        return Redirect::to(&with_notice("/contact", "error", "All fields are required!"))
            .into_response();
    }

    let Some(client) = state.contact() else {
        tracing::error!("Contact form submitted but no relay is configured");
        return Redirect::to(&with_notice(
            "/contact",
            "error",
            "The contact form is currently unavailable.",
        ))
        .into_response();
    };

    match client.send(&form).await {
        Ok(()) => {
            tracing::info!("Contact message relayed");
            Redirect::to(&with_notice(
                "/contact",
                "success",
                "Thank you! Your message has been sent.",
            ))
            .into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to relay contact message");
            Redirect::to(&with_notice(
                "/contact",
                "error",
                "Something went wrong. Please try again.",
            ))
            .into_response()
        }
    }
}
