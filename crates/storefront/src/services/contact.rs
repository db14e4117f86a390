//! Contact form relay (Web3Forms).

use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use crate::config::ContactConfig;

/// Errors that can occur when relaying a contact message.
#[derive(Debug, Error)]
pub enum ContactError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Relay refused the submission.
    #[error("Rejected: {0}")]
    Rejected(String),

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// A message from the contact page.
#[derive(Debug, Clone, Deserialize)]
pub struct ContactMessage {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub message: String,
}

impl ContactMessage {
    /// All three fields are required.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        [&self.name, &self.email, &self.message]
            .iter()
            .all(|field| !field.trim().is_empty())
    }
}

#[derive(Serialize)]
struct SubmitRequest<'a> {
    access_key: &'a str,
    subject: &'a str,
    from_name: &'a str,
    name: &'a str,
    email: &'a str,
    message: &'a str,
}

#[derive(Deserialize)]
struct SubmitResponse {
    success: bool,
    #[serde(default)]
    message: String,
}

/// Web3Forms client.
#[derive(Clone)]
pub struct ContactClient {
    client: reqwest::Client,
    config: ContactConfig,
}

impl ContactClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: ContactConfig) -> Result<Self, ContactError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()?;

        Ok(Self { client, config })
    }

    /// Relay a message.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the relay reports failure.
    #[instrument(skip(self, message), fields(from = %message.email))]
    pub async fn send(&self, message: &ContactMessage) -> Result<(), ContactError> {
        let body = SubmitRequest {
            access_key: self.config.access_key.expose_secret(),
            subject: "New contact message from the Celesta site",
            from_name: "Celesta Website",
            name: &message.name,
            email: &message.email,
            message: &message.message,
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .json(&body)
            .send()
            .await?;

        let result: SubmitResponse = response
            .json()
            .await
            .map_err(|e| ContactError::Parse(e.to_string()))?;

        if result.success {
            Ok(())
        } else {
            Err(ContactError::Rejected(result.message))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_requires_all_fields() {
        let mut message = ContactMessage {
            name: "Ravi".to_string(),
            email: "ravi@example.com".to_string(),
            message: "When do passes open?".to_string(),
        };
        assert!(message.is_complete());

        message.message = "   ".to_string();
        assert!(!message.is_complete());
    }
}
