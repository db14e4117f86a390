//! Authentication error types.

use thiserror::Error;

use celesta_core::registration::RegistrationError;

use crate::services::backend::BackendError;
use crate::services::identity::IdentityError;
use crate::services::mailer::MailerError;

/// Errors that can occur while registering.
#[derive(Debug, Error)]
pub enum RegistrationFailure {
    /// Form or code rejected before any network call.
    #[error(transparent)]
    Invalid(#[from] RegistrationError),

    /// The code could not be delivered.
    #[error("code dispatch failed: {0}")]
    Dispatch(#[source] MailerError),

    /// The identity account could not be created.
    #[error("identity error: {0}")]
    Identity(#[from] IdentityError),

    /// Backend call failed while creating the profile.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// Backend answered `success: false` for the profile.
    #[error("profile creation rejected")]
    ProfileRejected,
}

impl RegistrationFailure {
    /// Message shown to the visitor.
    #[must_use]
    pub fn notice(&self) -> String {
        match self {
            Self::Invalid(err) => err.to_string(),
            Self::Dispatch(_) => "Failed to send OTP".to_string(),
            Self::Identity(IdentityError::EmailExists) => {
                "An account with this email already exists".to_string()
            }
            Self::Identity(IdentityError::WeakPassword(_)) => {
                "Password should be at least 6 characters".to_string()
            }
            Self::Identity(_) | Self::Backend(_) | Self::ProfileRejected => {
                "Registration failed".to_string()
            }
        }
    }
}

/// Errors that can occur while signing in.
#[derive(Debug, Error)]
pub enum LoginError {
    /// Email or password left blank.
    #[error("All fields are required!")]
    MissingFields,

    /// Sign-in rejected by the identity provider.
    #[error("identity error: {0}")]
    Identity(#[from] IdentityError),

    /// Role exchange failed.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// Backend answered `success: false`.
    #[error("login rejected by backend")]
    Rejected,
}

impl LoginError {
    /// Message shown to the visitor.
    #[must_use]
    pub fn notice(&self) -> &'static str {
        match self {
            Self::MissingFields => "All fields are required!",
            _ => "Login failed. Please check your credentials.",
        }
    }
}
