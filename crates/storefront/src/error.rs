//! Request error type with Sentry capture.
//!
//! Handlers return [`Result`]. Server-class failures are reported to Sentry
//! and logged with the event id; the visitor only ever sees a short generic
//! message. Form handlers usually redirect with a notice instead of failing,
//! so `AppError` covers what is left: missing pages, upstream outages and
//! session store failures.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::services::backend::BackendError;
use crate::services::identity::IdentityError;

/// Application-level error type for the site.
#[derive(Debug, Error)]
pub enum AppError {
    /// Festival backend call failed.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Identity provider call failed.
    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    /// Session store failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// No such event, product or pass.
    #[error("Not found: {0}")]
    NotFound(String),
}

impl AppError {
    const fn status(&self) -> StatusCode {
        match self {
            Self::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Backend(_) => StatusCode::BAD_GATEWAY,
            Self::Identity(IdentityError::InvalidCredentials | IdentityError::SessionExpired) => {
                StatusCode::UNAUTHORIZED
            }
            Self::Identity(IdentityError::EmailExists) => StatusCode::CONFLICT,
            Self::Identity(IdentityError::WeakPassword(_)) => StatusCode::BAD_REQUEST,
            Self::Identity(_) => StatusCode::BAD_GATEWAY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    /// Body text for the visitor. Never includes upstream detail.
    fn public_message(&self) -> &'static str {
        match self {
            Self::Session(_) => "Internal server error",
            Self::Backend(_) => "External service error",
            Self::Identity(IdentityError::InvalidCredentials) => "Invalid credentials",
            Self::Identity(IdentityError::SessionExpired) => {
                "Session expired, please sign in again"
            }
            Self::Identity(IdentityError::EmailExists) => {
                "An account with this email already exists"
            }
            Self::Identity(IdentityError::WeakPassword(_)) => {
                "Password should be at least 6 characters"
            }
            Self::Identity(_) => "Authentication error",
            Self::NotFound(_) => "Not found",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        (status, self.public_message()).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Attach the signed-in account to Sentry events.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Stop attributing events after sign-out.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_not_found_display() {
        let err = AppError::NotFound("event robowars".to_string());
        assert_eq!(err.to_string(), "Not found: event robowars");
        assert_eq!(status_of(err), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_identity_statuses() {
        assert_eq!(
            status_of(AppError::Identity(IdentityError::SessionExpired)),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(AppError::Identity(IdentityError::EmailExists)),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(AppError::Identity(IdentityError::Parse("bad json".to_string()))),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_upstream_failure_hides_detail() {
        let err = AppError::Backend(BackendError::Api {
            status: 500,
            message: "stack trace from backend".to_string(),
        });
        assert_eq!(err.public_message(), "External service error");
        assert_eq!(status_of(err), StatusCode::BAD_GATEWAY);
    }
}
