//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Home page
//! GET  /health                 - Liveness check
//! GET  /health/ready           - Readiness check (catalog loaded)
//!
//! # Content
//! GET  /events                 - Event listing
//! GET  /events/{slug}          - Event detail
//! GET  /workshops              - Workshop listing
//! GET  /contact                - Contact form
//! POST /contact                - Send contact message
//!
//! # Sponsors (fragments)
//! GET  /sponsors               - Sponsor wall (?width= sets the viewport)
//! POST /sponsors/carousel/tick     - Auto-advance (204 when paused or too soon)
//! POST /sponsors/carousel/paginate - Arrow buttons
//! POST /sponsors/carousel/wheel    - Wheel gesture
//! POST /sponsors/carousel/hover    - Pause or resume autoplay
//! POST /sponsors/carousel/resize   - Viewport width changed
//! POST /sponsors/logo-tap      - Festival logo tapped
//! POST /sponsors/press         - Long press start/cancel/poll
//! GET  /sponsors/arcade        - Overlay fragment for the current phase
//! POST /sponsors/arcade/close  - Close the overlay
//! GET  /sponsors/arcade/ws     - Game websocket
//!
//! # Store and cart (requires auth for checkout)
//! GET  /store                  - Merchandise
//! GET  /cart                   - Cart page
//! POST /cart/add               - Add one unit (returns quantity control)
//! POST /cart/remove            - Remove one unit (returns quantity control)
//! POST /cart/update            - Set quantity (returns cart_items fragment)
//! GET  /cart/count             - Cart count badge (fragment)
//! POST /checkout               - Place order and redirect to payment
//!
//! # Auth
//! GET  /auth/login             - Login page
//! POST /auth/login             - Login action
//! GET  /auth/register          - Registration form or code entry
//! POST /auth/register          - Send verification code
//! POST /auth/register/verify   - Check code and create account
//! POST /auth/register/resend   - Send a replacement code
//! GET  /auth/register/timer    - Resend countdown (SSE)
//! POST /auth/logout            - Logout action
//!
//! # Account
//! GET  /profile                - Profile and entry pass
//! GET  /profile/qr.svg         - Entry pass image
//! GET  /admin                  - Admin landing (admins only)
//! ```

pub mod admin;
pub mod arcade;
pub mod auth;
pub mod cart;
pub mod contact;
pub mod events;
pub mod home;
pub mod profile;
pub mod sponsors;
pub mod store;

use axum::{
    Router,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use tower_sessions::Session;

use celesta_core::cart::Cart;

use crate::middleware::{api_rate_limiter, auth_rate_limiter, clear_current_user};
use crate::models::{CurrentUser, load, session_keys};
use crate::services::backend::Role;
use crate::services::identity::{BearerToken, IdentityError};
use crate::state::AppState;

/// Navigation state shared by every full page.
#[derive(Debug, Clone, Default)]
pub struct Nav {
    pub signed_in: bool,
    pub is_admin: bool,
    pub cart_count: u32,
}

impl Nav {
    /// Read the navigation state from the session.
    pub async fn load(session: &Session) -> Self {
        let user: Option<CurrentUser> = load(session, session_keys::CURRENT_USER).await;
        let cart: Cart = load(session, session_keys::CART).await;

        Self {
            signed_in: user.is_some(),
            is_admin: user.is_some_and(|u| u.role == Role::Admin),
            cart_count: cart.count(),
        }
    }
}

/// Mint a bearer token for `user`, signing the visitor out if the refresh
/// token no longer works.
pub(crate) async fn bearer_or_sign_in(
    state: &AppState,
    session: &Session,
    user: &CurrentUser,
) -> Result<BearerToken, Response> {
    match state.auth().bearer_for(user).await {
        Ok(token) => Ok(token),
        Err(IdentityError::SessionExpired) => {
            tracing::info!(user = %user.user, "Refresh token expired, signing out");
            if let Err(e) = clear_current_user(session).await {
                tracing::error!(error = %e, "Failed to clear session");
            }
            Err(Redirect::to(&with_notice(
                "/auth/login",
                "error",
                "Your session has expired. Please sign in again.",
            ))
            .into_response())
        }
        Err(e) => Err(crate::error::AppError::from(e).into_response()),
    }
}

/// Append a url-encoded notice to `path`.
pub(crate) fn with_notice(path: &str, key: &str, message: &str) -> String {
    format!("{path}?{key}={}", urlencoding::encode(message))
}

/// Create the content routes router.
pub fn content_routes() -> Router<AppState> {
    Router::new()
        .route("/events", get(events::index))
        .route("/events/{slug}", get(events::show))
        .route("/workshops", get(events::workshops))
}

/// Create the sponsor wall routes router.
pub fn sponsor_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(sponsors::page))
        .route("/carousel/tick", post(sponsors::tick))
        .route("/carousel/paginate", post(sponsors::paginate))
        .route("/carousel/wheel", post(sponsors::wheel))
        .route("/carousel/hover", post(sponsors::hover))
        .route("/carousel/resize", post(sponsors::resize))
        .route("/logo-tap", post(sponsors::logo_tap))
        .route("/press", post(sponsors::press))
        .route("/arcade", get(arcade::overlay))
        .route("/arcade/close", post(arcade::close))
        .route("/arcade/ws", get(arcade::socket))
        .route_layer(api_rate_limiter())
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/remove", post(cart::remove))
        .route("/update", post(cart::update))
        .route("/count", get(cart::count))
        .route_layer(api_rate_limiter())
}

/// Create the auth routes router.
///
/// Form submissions are rate limited per client address.
pub fn auth_routes() -> Router<AppState> {
    let limited = Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .route("/register/verify", post(auth::verify))
        .route("/register/resend", post(auth::resend))
        .route_layer(auth_rate_limiter());

    Router::new()
        .route("/login", get(auth::login_page))
        .route("/register", get(auth::register_page))
        .route("/register/timer", get(auth::timer))
        .route("/logout", post(auth::logout))
        .merge(limited)
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/profile", get(profile::show))
        .route("/profile/qr.svg", get(profile::qr))
        .route("/admin", get(admin::index))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    let contact_form = Router::new()
        .route("/contact", post(contact::submit))
        .route_layer(auth_rate_limiter());

    Router::new()
        // Home page
        .route("/", get(home::home))
        .merge(content_routes())
        .route("/contact", get(contact::page))
        .merge(contact_form)
        .nest("/sponsors", sponsor_routes())
        .route("/store", get(store::index))
        .nest("/cart", cart_routes())
        .route("/checkout", post(cart::checkout))
        .nest("/auth", auth_routes())
        .merge(account_routes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_notice_encodes() {
        assert_eq!(
            with_notice("/auth/login", "error", "All fields are required!"),
            "/auth/login?error=All%20fields%20are%20required%21"
        );
    }
}
