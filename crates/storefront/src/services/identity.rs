//! Identity provider client.
//!
//! Accounts (email + password) live with an external identity provider. The
//! storefront never stores passwords: it exchanges them for an id token and a
//! refresh token, keeps the refresh token in the visitor's session, and mints
//! a fresh id token whenever the backend needs a bearer.
//!
//! [`FirebaseIdentity`] talks to the Identity Toolkit REST API.

use core::fmt;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use celesta_core::{Email, UserHandle};

use crate::config::IdentityConfig;

/// Errors that can occur when talking to the identity provider.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Wrong email or password, or the account is disabled.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// An account already exists for this email.
    #[error("email already registered")]
    EmailExists,

    /// Provider rejected the password (too short).
    #[error("weak password: {0}")]
    WeakPassword(String),

    /// The refresh token no longer works; the visitor has to sign in again.
    #[error("session expired")]
    SessionExpired,

    /// Provider returned another error.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Short-lived bearer token for backend calls. Never stored.
#[derive(Clone)]
pub struct BearerToken(SecretString);

impl BearerToken {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    /// Value for the `Authorization` header.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken([REDACTED])")
    }
}

/// Long-lived token kept in the session to mint bearer tokens.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RefreshToken(String);

impl RefreshToken {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for RefreshToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RefreshToken([REDACTED])")
    }
}

/// A signed-in account as returned by sign up and sign in.
#[derive(Debug, Clone)]
pub struct IdentitySession {
    pub user: UserHandle,
    pub email: Email,
    pub id_token: BearerToken,
    pub refresh_token: RefreshToken,
}

/// Account operations offered by the identity provider.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create an account and sign it in.
    async fn create_account(
        &self,
        email: &Email,
        password: &str,
    ) -> Result<IdentitySession, IdentityError>;

    /// Sign in with email and password.
    async fn sign_in(&self, email: &Email, password: &str)
    -> Result<IdentitySession, IdentityError>;

    /// Forget the account's tokens.
    async fn sign_out(&self, user: &UserHandle) -> Result<(), IdentityError>;

    /// Mint a fresh bearer token for `user` from its refresh token.
    async fn issue_token(
        &self,
        user: &UserHandle,
        refresh_token: &RefreshToken,
    ) -> Result<BearerToken, IdentityError>;

    /// Delete the account the token belongs to.
    async fn delete_account(
        &self,
        user: &UserHandle,
        token: &BearerToken,
    ) -> Result<(), IdentityError>;
}

// =============================================================================
// Identity Toolkit REST client
// =============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordResponse {
    local_id: String,
    email: Option<String>,
    id_token: String,
    refresh_token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteRequest<'a> {
    id_token: &'a str,
}

#[derive(Deserialize)]
struct RefreshResponse {
    id_token: String,
    user_id: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Identity Toolkit (Firebase Authentication) REST client.
#[derive(Clone)]
pub struct FirebaseIdentity {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    token_base_url: String,
}

impl FirebaseIdentity {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &IdentityConfig) -> Result<Self, IdentityError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("celesta-storefront/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            token_base_url: config.token_base_url.clone(),
        })
    }

    fn account_url(&self, action: &str) -> String {
        format!(
            "{}/accounts:{action}?key={}",
            self.base_url,
            urlencoding::encode(self.api_key.expose_secret())
        )
    }

    async fn password_call(
        &self,
        action: &str,
        email: &Email,
        password: &str,
    ) -> Result<IdentitySession, IdentityError> {
        let body = PasswordRequest {
            email: email.as_str(),
            password,
            return_secure_token: true,
        };

        let response = self
            .client
            .post(self.account_url(action))
            .json(&body)
            .send()
            .await?;
        let response = check(response).await?;

        let data: PasswordResponse = response
            .json()
            .await
            .map_err(|e| IdentityError::Parse(e.to_string()))?;

        let email = match data.email.as_deref().map(Email::parse) {
            Some(Ok(returned)) => returned,
            _ => email.clone(),
        };

        Ok(IdentitySession {
            user: UserHandle::new(data.local_id),
            email,
            id_token: BearerToken::new(data.id_token),
            refresh_token: RefreshToken::new(data.refresh_token),
        })
    }
}

#[async_trait]
impl IdentityProvider for FirebaseIdentity {
    #[instrument(skip(self, password), fields(email = %email))]
    async fn create_account(
        &self,
        email: &Email,
        password: &str,
    ) -> Result<IdentitySession, IdentityError> {
        let session = self.password_call("signUp", email, password).await?;
        tracing::info!(user = %session.user, "Identity account created");
        Ok(session)
    }

    #[instrument(skip(self, password), fields(email = %email))]
    async fn sign_in(
        &self,
        email: &Email,
        password: &str,
    ) -> Result<IdentitySession, IdentityError> {
        self.password_call("signInWithPassword", email, password)
            .await
    }

    #[instrument(skip(self))]
    async fn sign_out(&self, user: &UserHandle) -> Result<(), IdentityError> {
        // Tokens are held only in the visitor's session, which the caller drops.
        tracing::debug!("Signed out");
        Ok(())
    }

    #[instrument(skip(self, refresh_token))]
    async fn issue_token(
        &self,
        user: &UserHandle,
        refresh_token: &RefreshToken,
    ) -> Result<BearerToken, IdentityError> {
        let url = format!(
            "{}/token?key={}",
            self.token_base_url,
            urlencoding::encode(self.api_key.expose_secret())
        );

        let response = self
            .client
            .post(url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.expose()),
            ])
            .send()
            .await?;
        let response = check(response).await?;

        let data: RefreshResponse = response
            .json()
            .await
            .map_err(|e| IdentityError::Parse(e.to_string()))?;

        if data.user_id != user.as_str() {
            tracing::warn!(returned = %data.user_id, "Refresh token belongs to another account");
            return Err(IdentityError::SessionExpired);
        }

        Ok(BearerToken::new(data.id_token))
    }

    #[instrument(skip(self, token))]
    async fn delete_account(
        &self,
        user: &UserHandle,
        token: &BearerToken,
    ) -> Result<(), IdentityError> {
        let response = self
            .client
            .post(self.account_url("delete"))
            .json(&DeleteRequest {
                id_token: token.expose(),
            })
            .send()
            .await?;
        check(response).await?;

        tracing::info!("Identity account deleted");
        Ok(())
    }
}

/// Map a non-success response to an [`IdentityError`].
async fn check(response: reqwest::Response) -> Result<reqwest::Response, IdentityError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorEnvelope>(&text)
        .map(|e| e.error.message)
        .unwrap_or(text);

    Err(classify(status.as_u16(), message))
}

/// Identity Toolkit reports error kinds as message codes, sometimes followed
/// by `" : detail"`.
fn classify(status: u16, message: String) -> IdentityError {
    let code = message.split(" : ").next().unwrap_or_default();
    match code {
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS"
        | "USER_DISABLED" | "INVALID_EMAIL" => IdentityError::InvalidCredentials,
        "EMAIL_EXISTS" => IdentityError::EmailExists,
        "WEAK_PASSWORD" => IdentityError::WeakPassword(message),
        "TOKEN_EXPIRED" | "INVALID_REFRESH_TOKEN" | "USER_NOT_FOUND"
        | "INVALID_ID_TOKEN" => IdentityError::SessionExpired,
        _ => IdentityError::Api { status, message },
    }
}
