//! Verification code dispatch.
//!
//! The transactional mail service accepts `{email, otp}` and delivers the
//! code. Delivery is fire-and-report: a failed request is surfaced to the
//! visitor as "Failed to send OTP" and never retried automatically.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

use celesta_core::Email;
use celesta_core::otp::OtpCode;

use crate::config::BackendConfig;

/// Errors that can occur when dispatching a code.
#[derive(Debug, Error)]
pub enum MailerError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Dispatch endpoint rejected the request.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
}

/// Delivers one-time codes to an email address.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait OtpMailer: Send + Sync {
    async fn send_code(&self, email: &Email, code: &OtpCode) -> Result<(), MailerError>;
}

#[derive(Serialize)]
struct DispatchRequest<'a> {
    email: &'a str,
    otp: &'a str,
}

/// `POST {email, otp}` to the dispatch endpoint.
#[derive(Clone)]
pub struct HttpOtpMailer {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpOtpMailer {
    /// Create a new mailer.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &BackendConfig) -> Result<Self, MailerError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.otp_dispatch_url.clone(),
        })
    }
}

#[async_trait]
impl OtpMailer for HttpOtpMailer {
    #[instrument(skip(self, code), fields(email = %email))]
    async fn send_code(&self, email: &Email, code: &OtpCode) -> Result<(), MailerError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&DispatchRequest {
                email: email.as_str(),
                otp: code.as_str(),
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(MailerError::Api {
                status: status.as_u16(),
                message,
            });
        }

        tracing::info!("Verification code dispatched");
        Ok(())
    }
}
