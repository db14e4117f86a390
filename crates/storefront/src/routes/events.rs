//! Event and workshop pages, rendered from markdown content.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use tower_sessions::Session;
use tracing::instrument;

use crate::content::{Event, Workshop};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::CspNonce;
use crate::routes::Nav;
use crate::state::AppState;

/// Event listing template.
#[derive(Template, WebTemplate)]
#[template(path = "events/index.html")]
pub struct EventsTemplate {
    pub nav: Nav,
    pub events: Vec<Event>,
    pub nonce: String,
}

/// Event detail template.
#[derive(Template, WebTemplate)]
#[template(path = "events/show.html")]
pub struct EventTemplate {
    pub nav: Nav,
    pub event: Event,
    pub nonce: String,
}

/// Workshop listing template.
#[derive(Template, WebTemplate)]
#[template(path = "workshops.html")]
pub struct WorkshopsTemplate {
    pub nav: Nav,
    pub workshops: Vec<Workshop>,
    pub nonce: String,
}

/// Display all events.
#[instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    CspNonce(nonce): CspNonce,
) -> impl IntoResponse {
    EventsTemplate {
        nav: Nav::load(&session).await,
        events: state.content().events().to_vec(),
        nonce,
    }
}

/// Display one event.
#[instrument(skip(state, session, nonce))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    Path(slug): Path<String>,
    CspNonce(nonce): CspNonce,
) -> Result<impl IntoResponse> {
    let event = state
        .content()
        .event(&slug)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("Event {slug}")))?;

    Ok(EventTemplate {
        nav: Nav::load(&session).await,
        event,
        nonce,
    })
}

/// Display all workshops.
#[instrument(skip_all)]
pub async fn workshops(
    State(state): State<AppState>,
    session: Session,
    CspNonce(nonce): CspNonce,
) -> impl IntoResponse {
    WorkshopsTemplate {
        nav: Nav::load(&session).await,
        workshops: state.content().workshops().to_vec(),
        nonce,
    }
}
