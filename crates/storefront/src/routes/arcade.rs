//! Hidden arcade on the sponsor page.
//!
//! The overlay shows a short celebration, then the game. The game itself
//! runs server-side: each websocket connection owns one [`GameLoop`], the
//! browser sends key and click events and draws the frames it receives.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{
        Query,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use celesta_core::arcade::{Field, HighScore};
use celesta_core::carousel::{CELEBRATION_MS, OverlayPhase};
use chrono::Utc;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::Result;
use crate::models::{load, session_keys};
use crate::routes::sponsors::{get_wall, save_wall};
use crate::services::arcade::{ArcadeInput, GameLoop};

/// Celebration fragment template.
#[derive(Template, WebTemplate)]
#[template(path = "partials/arcade_celebration.html")]
pub struct CelebrationTemplate {
    /// Milliseconds until the game replaces the celebration.
    pub celebration_ms: i64,
}

/// Game fragment template.
#[derive(Template, WebTemplate)]
#[template(path = "partials/arcade_game.html")]
pub struct GameTemplate {
    pub high_score: u32,
}

/// Browser viewport, used to size the playfield.
#[derive(Debug, Deserialize)]
pub struct ViewportQuery {
    pub width: Option<f64>,
    pub height: Option<f64>,
}

impl ViewportQuery {
    fn field(&self) -> Field {
        match (self.width, self.height) {
            (Some(w), Some(h)) if w.is_finite() && h.is_finite() => Field::fit(w, h),
            _ => Field::default(),
        }
    }
}

/// Overlay fragment for the current phase. `204` when hidden.
#[instrument(skip(session))]
pub async fn overlay(session: Session) -> Response {
    let wall = get_wall(&session).await;

    match wall.egg.phase(Utc::now()) {
        OverlayPhase::Hidden => StatusCode::NO_CONTENT.into_response(),
        OverlayPhase::Celebrating => CelebrationTemplate {
            celebration_ms: CELEBRATION_MS,
        }
        .into_response(),
        OverlayPhase::Arcade => {
            let high: HighScore = load(&session, session_keys::HIGH_SCORE).await;
            GameTemplate { high_score: high.0 }.into_response()
        }
    }
}

/// Close the overlay.
#[instrument(skip(session))]
pub async fn close(session: Session) -> Result<StatusCode> {
    let mut wall = get_wall(&session).await;
    wall.egg.close();
    save_wall(&session, &wall).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Open the game websocket. Only available once the arcade is showing.
#[instrument(skip(session, ws))]
pub async fn socket(
    session: Session,
    Query(query): Query<ViewportQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    let wall = get_wall(&session).await;
    if wall.egg.phase(Utc::now()) != OverlayPhase::Arcade {
        return StatusCode::NOT_FOUND.into_response();
    }

    let high: HighScore = load(&session, session_keys::HIGH_SCORE).await;
    let field = query.field();
    ws.on_upgrade(move |socket| play(socket, session, field, high))
}

async fn play(mut socket: WebSocket, session: Session, field: Field, high: HighScore) {
    let game = GameLoop::new(field, rand::random(), high);
    let mut frames = game.frames();
    let mut saved = high;
    game.start();
    tracing::debug!(?field, "Arcade session started");

    loop {
        tokio::select! {
            changed = frames.changed() => {
                if changed.is_err() {
                    break;
                }
                let frame = frames.borrow_and_update().clone();
                if socket.send(Message::Text(frame.json.as_ref().into())).await.is_err() {
                    break;
                }
                if frame.game_over && frame.high_score > saved {
                    saved = frame.high_score;
                    persist_high_score(&session, saved).await;
                }
            }
            message = socket.recv() => {
                match message {
                    Some(Ok(Message::Text(text))) => match serde_json::from_str::<ArcadeInput>(text.as_str()) {
                        Ok(input) => game.apply(input),
                        Err(e) => tracing::debug!(error = %e, "Ignoring arcade message"),
                    },
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    game.stop();
    let best = game.high_score();
    if best > saved {
        persist_high_score(&session, best).await;
    }
    tracing::debug!(high_score = best.0, "Arcade session ended");
}

/// Store the best score in the session and save it immediately; the
/// upgrade response has already gone out, so the session layer won't.
async fn persist_high_score(session: &Session, high: HighScore) {
    if let Err(e) = session.insert(session_keys::HIGH_SCORE, high).await {
        tracing::warn!(error = %e, "Failed to record high score");
        return;
    }
    if let Err(e) = session.save().await {
        tracing::warn!(error = %e, "Failed to save session after game");
    }
}
