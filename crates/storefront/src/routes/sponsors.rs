//! Sponsor wall route handlers.
//!
//! Carousel state is kept per visitor in the session. Every handler takes
//! the current time once and passes it to the state machine, so timing rules
//! (autoplay period, wheel debounce, tap window, long press) are decided
//! server-side. The browser only reports events and swaps fragments.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::Query,
    http::StatusCode,
    response::{AppendHeaders, IntoResponse, Response},
};
use chrono::Utc;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use celesta_core::carousel::{Direction, SponsorWall, TapOutcome};
use celesta_core::sponsors::{SPONSORS, SponsorEntry};

use crate::error::Result;
use crate::filters;
use crate::middleware::CspNonce;
use crate::models::{load, session_keys};
use crate::routes::Nav;

/// One sponsor card for templates.
#[derive(Clone)]
pub struct SponsorCard {
    pub name: &'static str,
    pub logo: String,
    pub website_url: Option<&'static str>,
    pub light_plate: bool,
}

impl From<&SponsorEntry> for SponsorCard {
    fn from(entry: &SponsorEntry) -> Self {
        Self {
            name: entry.name,
            logo: entry.logo_path(),
            website_url: entry.has_website().then_some(entry.website_url),
            light_plate: entry.needs_light_plate,
        }
    }
}

/// The visible carousel page.
#[derive(Clone)]
pub struct CarouselView {
    pub cards: Vec<SponsorCard>,
    /// 1-based page number.
    pub page: usize,
    pub page_count: usize,
    pub columns: usize,
    pub enter_class: &'static str,
    pub paused: bool,
}

impl From<&SponsorWall> for CarouselView {
    fn from(wall: &SponsorWall) -> Self {
        let carousel = &wall.carousel;
        Self {
            cards: carousel
                .visible(&SPONSORS)
                .iter()
                .map(SponsorCard::from)
                .collect(),
            page: carousel.current_page(SPONSORS.len()) + 1,
            page_count: carousel.page_count(SPONSORS.len()),
            columns: carousel.columns(),
            enter_class: carousel.direction().enter_class(),
            paused: carousel.is_paused(),
        }
    }
}

/// Sponsor page template.
#[derive(Template, WebTemplate)]
#[template(path = "sponsors.html")]
pub struct SponsorsTemplate {
    pub nav: Nav,
    pub carousel: CarouselView,
    pub nonce: String,
}

/// Carousel page fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/sponsor_page.html")]
pub struct SponsorPageTemplate {
    pub carousel: CarouselView,
}

/// Viewport query or form.
#[derive(Debug, Deserialize)]
pub struct ViewportQuery {
    pub width: Option<u32>,
}

/// Arrow button form.
#[derive(Debug, Deserialize)]
pub struct PaginateForm {
    pub direction: Direction,
}

/// Wheel gesture form.
#[derive(Debug, Deserialize)]
pub struct WheelForm {
    pub delta_y: f64,
}

/// Hover form.
#[derive(Debug, Deserialize)]
pub struct HoverForm {
    pub paused: bool,
}

/// Long press phases reported by the browser.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PressAction {
    Start,
    Cancel,
    Poll,
}

/// Long press form.
#[derive(Debug, Deserialize)]
pub struct PressForm {
    pub action: PressAction,
}

pub(crate) async fn get_wall(session: &Session) -> SponsorWall {
    load(session, session_keys::CAROUSEL).await
}

pub(crate) async fn save_wall(session: &Session, wall: &SponsorWall) -> Result<()> {
    session.insert(session_keys::CAROUSEL, wall).await?;
    Ok(())
}

fn fragment(wall: &SponsorWall) -> Response {
    SponsorPageTemplate {
        carousel: CarouselView::from(wall),
    }
    .into_response()
}

fn launch() -> Response {
    (
        StatusCode::NO_CONTENT,
        AppendHeaders([("HX-Trigger", "arcade-launch")]),
    )
        .into_response()
}

/// Display the sponsor wall.
#[instrument(skip(session, nonce))]
pub async fn page(
    session: Session,
    Query(query): Query<ViewportQuery>,
    CspNonce(nonce): CspNonce,
) -> Result<impl IntoResponse> {
    let mut wall = get_wall(&session).await;
    if let Some(width) = query.width {
        wall.carousel.set_viewport_width(width);
        save_wall(&session, &wall).await?;
    }

    Ok(SponsorsTemplate {
        nav: Nav::load(&session).await,
        carousel: CarouselView::from(&wall),
        nonce,
    })
}

/// Autoplay tick. `204` when the page did not change.
#[instrument(skip(session))]
pub async fn tick(session: Session) -> Result<Response> {
    let mut wall = get_wall(&session).await;
    if !wall.carousel.auto_advance(Utc::now()) {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }
    save_wall(&session, &wall).await?;
    Ok(fragment(&wall))
}

/// Arrow buttons.
#[instrument(skip(session))]
pub async fn paginate(session: Session, Form(form): Form<PaginateForm>) -> Result<Response> {
    let mut wall = get_wall(&session).await;
    wall.carousel.paginate(form.direction, Utc::now());
    save_wall(&session, &wall).await?;
    Ok(fragment(&wall))
}

/// Wheel gesture. `204` when debounced or below threshold.
#[instrument(skip(session))]
pub async fn wheel(session: Session, Form(form): Form<WheelForm>) -> Result<Response> {
    let mut wall = get_wall(&session).await;
    if wall.carousel.wheel(form.delta_y, Utc::now()).is_none() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }
    save_wall(&session, &wall).await?;
    Ok(fragment(&wall))
}

/// Pointer entered or left the carousel.
#[instrument(skip(session))]
pub async fn hover(session: Session, Form(form): Form<HoverForm>) -> Result<StatusCode> {
    let mut wall = get_wall(&session).await;
    wall.carousel.set_paused(form.paused);
    save_wall(&session, &wall).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Viewport width changed; re-page for the new column count.
#[instrument(skip(session))]
pub async fn resize(session: Session, Form(form): Form<ViewportQuery>) -> Result<Response> {
    let mut wall = get_wall(&session).await;
    let Some(width) = form.width else {
        return Ok(fragment(&wall));
    };
    wall.carousel.set_viewport_width(width);
    save_wall(&session, &wall).await?;
    Ok(fragment(&wall))
}

/// Festival logo tapped: turn a page, or launch the arcade on the seventh tap.
#[instrument(skip(session))]
pub async fn logo_tap(session: Session) -> Result<Response> {
    let mut wall = get_wall(&session).await;
    let outcome = wall.tap_logo(Utc::now());
    save_wall(&session, &wall).await?;

    Ok(match outcome {
        TapOutcome::Advance { .. } => fragment(&wall),
        TapOutcome::Launch => {
            tracing::info!("Arcade unlocked by logo taps");
            launch()
        }
    })
}

/// Long press on the page. The browser polls while the pointer is down.
#[instrument(skip(session))]
pub async fn press(session: Session, Form(form): Form<PressForm>) -> Result<Response> {
    let mut wall = get_wall(&session).await;
    let now = Utc::now();

    let fired = match form.action {
        PressAction::Start => {
            wall.egg.press.start(now);
            false
        }
        PressAction::Cancel => {
            wall.egg.press.cancel();
            false
        }
        PressAction::Poll => wall.poll_press(now),
    };
    save_wall(&session, &wall).await?;

    if fired {
        tracing::info!("Arcade unlocked by long press");
        return Ok(launch());
    }
    Ok(StatusCode::NO_CONTENT.into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_first_page_desktop() {
        let wall = SponsorWall::default();
        let view = CarouselView::from(&wall);
        assert_eq!(view.columns, 4);
        assert_eq!(view.cards.len(), 12);
        assert_eq!(view.page, 1);
        assert_eq!(view.page_count, 4);
        assert_eq!(view.cards.first().map(|c| c.name), Some("Amalfi"));
    }

    #[test]
    fn test_view_wraps_backward_to_last_page() {
        let mut wall = SponsorWall::default();
        wall.carousel.paginate(Direction::Backward, Utc::now());
        let view = CarouselView::from(&wall);
        assert_eq!(view.page, 4);
        // 47 sponsors, 12 per page: the last page holds 11.
        assert_eq!(view.cards.len(), 11);
        assert_eq!(view.enter_class, "enter-from-left");
    }

    #[test]
    fn test_card_without_website() {
        let entry = SPONSORS.iter().find(|s| !s.has_website());
        if let Some(entry) = entry {
            assert!(SponsorCard::from(entry).website_url.is_none());
        }
    }
}
