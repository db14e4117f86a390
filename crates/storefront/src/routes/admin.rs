//! Admin landing page.

use askama::Template;
use askama_web::WebTemplate;
use axum::response::IntoResponse;
use tower_sessions::Session;
use tracing::instrument;

use crate::filters;
use crate::middleware::{CspNonce, RequireAdmin};
use crate::routes::Nav;

/// Admin page template.
#[derive(Template, WebTemplate)]
#[template(path = "admin.html")]
pub struct AdminTemplate {
    pub nav: Nav,
    pub email: String,
    pub nonce: String,
}

/// Display the admin landing page.
#[instrument(skip_all, fields(user = %user.user))]
pub async fn index(
    session: Session,
    RequireAdmin(user): RequireAdmin,
    CspNonce(nonce): CspNonce,
) -> impl IntoResponse {
    AdminTemplate {
        nav: Nav::load(&session).await,
        email: user.email.to_string(),
        nonce,
    }
}
