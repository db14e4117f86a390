//! Session-related types.
//!
//! Everything a visitor's session carries lives under one of the [`keys`].

use serde::{Deserialize, Serialize};

use celesta_core::{Email, UserHandle};

use crate::services::backend::Role;
use crate::services::identity::RefreshToken;

/// Session-stored identity of the signed-in visitor.
///
/// Bearer tokens are short-lived and never stored; they are minted from
/// `refresh_token` when a backend call needs one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Identity provider account id.
    pub user: UserHandle,
    pub email: Email,
    pub role: Role,
    pub refresh_token: RefreshToken,
}

/// Session keys.
pub mod keys {
    /// The signed-in visitor.
    pub const CURRENT_USER: &str = "current_user";

    /// Cart lines.
    pub const CART: &str = "cart";

    /// Registration workflow state, including the expected code.
    pub const REGISTRATION: &str = "registration";

    /// Sponsor carousel page, direction and easter egg progress.
    pub const CAROUSEL: &str = "carousel";

    /// Best arcade score.
    pub const HIGH_SCORE: &str = "celestaSpaceHighScore";
}

/// Read a session value, falling back to its default.
///
/// Unreadable values (a session written by an older build) are discarded.
pub async fn load<T>(session: &tower_sessions::Session, key: &str) -> T
where
    T: serde::de::DeserializeOwned + Default,
{
    match session.get::<T>(key).await {
        Ok(value) => value.unwrap_or_default(),
        Err(e) => {
            tracing::warn!(key, error = %e, "Discarding unreadable session value");
            T::default()
        }
    }
}
