//! Profile page and entry pass.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    http::{
        StatusCode,
        header::{CACHE_CONTROL, CONTENT_DISPOSITION, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{CspNonce, RequireAuth};
use crate::routes::{Nav, bearer_or_sign_in};
use crate::services::backend::Profile;
use crate::state::AppState;

/// Query parameters for the profile page.
#[derive(Debug, Deserialize)]
pub struct ProfileQuery {
    pub success: Option<String>,
}

/// Query parameters for the pass image.
#[derive(Debug, Deserialize)]
pub struct QrQuery {
    /// Serve as an attachment instead of inline.
    #[serde(default)]
    pub download: bool,
}

/// Profile page template.
#[derive(Template, WebTemplate)]
#[template(path = "profile.html")]
pub struct ProfileTemplate {
    pub nav: Nav,
    pub email: String,
    /// Empty when the backend has no profile or could not be reached.
    pub profile: Profile,
    pub show_pass: bool,
    pub success: Option<String>,
    pub nonce: String,
}

/// Display the visitor's profile.
#[instrument(skip_all, fields(user = %user.user))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Query(query): Query<ProfileQuery>,
    CspNonce(nonce): CspNonce,
) -> Response {
    let token = match bearer_or_sign_in(&state, &session, &user).await {
        Ok(token) => token,
        Err(response) => return response,
    };

    let profile = match state.backend().profile(&token).await {
        Ok(Some(profile)) => profile,
        Ok(None) => {
            tracing::warn!("Backend has no profile for signed-in user");
            Profile::default()
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to fetch profile");
            Profile::default()
        }
    };
    let show_pass = profile.qr_enabled && profile.celesta_id.is_some();

    ProfileTemplate {
        nav: Nav::load(&session).await,
        email: user.email.to_string(),
        profile,
        show_pass,
        success: query.success,
        nonce,
    }
    .into_response()
}

fn no_pass() -> AppError {
    AppError::NotFound("Entry pass".to_string())
}

/// Serve the entry pass as SVG, named `<celestaId>_QR.svg`.
///
/// Any failure to produce the pass is logged and answered with `404`, so the
/// profile page shows a missing image rather than an error.
#[instrument(skip_all, fields(user = %user.user))]
pub async fn qr(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Query(query): Query<QrQuery>,
) -> Result<Response> {
    let token = match bearer_or_sign_in(&state, &session, &user).await {
        Ok(token) => token,
        Err(response) => return Ok(response),
    };

    let profile = match state.backend().profile(&token).await {
        Ok(profile) => profile,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to fetch profile for entry pass");
            None
        }
    };
    let celesta_id = profile
        .filter(|p| p.qr_enabled)
        .and_then(|p| p.celesta_id)
        .ok_or_else(no_pass)?;

    let svg = state
        .qr()
        .svg_for(&user.user, state.backend(), &token)
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "Failed to produce entry pass");
            no_pass()
        })?;

    let disposition = format!(
        "{}; filename=\"{celesta_id}_QR.svg\"",
        if query.download { "attachment" } else { "inline" }
    );

    Ok((
        StatusCode::OK,
        [
            (CONTENT_TYPE, "image/svg+xml".to_string()),
            (CONTENT_DISPOSITION, disposition),
            (CACHE_CONTROL, "private, max-age=300".to_string()),
        ],
        svg.to_string(),
    )
        .into_response())
}
