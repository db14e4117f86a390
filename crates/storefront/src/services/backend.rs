//! Festival backend API client.
//!
//! The backend owns user documents, the product collection, QR payloads and
//! checkout. Every authenticated call carries a bearer token minted by the
//! identity provider for the current visitor.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use celesta_core::cart::CartLine;
use celesta_core::catalog::Product;
use celesta_core::{CelestaId, ProductId};

use crate::config::BackendConfig;
use crate::services::identity::BearerToken;

/// Errors that can occur when calling the backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend returned a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Account role reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    #[serde(other)]
    User,
}

impl Role {
    /// Page a visitor lands on after signing in.
    #[must_use]
    pub const fn landing_path(self) -> &'static str {
        match self {
            Self::Admin => "/admin",
            Self::User => "/profile",
        }
    }
}

/// Outcome of `POST /register` and `POST /login`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct AccountStatus {
    pub success: bool,
    #[serde(default)]
    pub role: Role,
}

/// Registered visitor as shown on the profile page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub dob: String,
    #[serde(default)]
    pub celesta_id: Option<CelestaId>,
    #[serde(default)]
    pub qr_enabled: bool,
}

#[derive(Deserialize)]
struct ProfileEnvelope {
    #[serde(default)]
    success: bool,
    user: Option<Profile>,
}

#[derive(Deserialize)]
struct ProductsEnvelope {
    products: Vec<Product>,
}

#[derive(Debug, Serialize)]
struct RegisterRequest<'a> {
    name: &'a str,
    dob: &'a str,
}

#[derive(Debug, Serialize)]
struct CheckoutItem<'a> {
    id: &'a ProductId,
    name: &'a str,
    quantity: u32,
}

#[derive(Debug, Serialize)]
struct CheckoutRequest<'a> {
    items: Vec<CheckoutItem<'a>>,
}

#[derive(Deserialize)]
struct CheckoutResponse {
    url: String,
}

/// Operations the festival backend exposes to the site.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait BackendApi: Send + Sync {
    /// Create the user document for a freshly created identity account.
    async fn register(
        &self,
        token: &BearerToken,
        name: &str,
        dob: &str,
    ) -> Result<AccountStatus, BackendError>;

    /// Exchange a bearer token for the account's role.
    async fn login(&self, token: &BearerToken) -> Result<AccountStatus, BackendError>;

    /// Fetch the visitor's profile. `None` when the backend has no document.
    async fn profile(&self, token: &BearerToken) -> Result<Option<Profile>, BackendError>;

    /// Fetch the payload encoded into the visitor's entry QR code.
    async fn qr_payload(&self, token: &BearerToken) -> Result<serde_json::Value, BackendError>;

    /// Current merchandise list.
    async fn products(&self) -> Result<Vec<Product>, BackendError>;

    /// Start checkout for the given lines; returns the payment redirect URL.
    async fn checkout(
        &self,
        token: &BearerToken,
        lines: Vec<CartLine>,
    ) -> Result<String, BackendError>;
}

/// HTTP client for the festival backend.
#[derive(Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("celesta-storefront/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(15))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn bearer(token: &BearerToken) -> String {
        format!("Bearer {}", token.expose())
    }

    async fn parse<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, BackendError> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(BackendError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| BackendError::Parse(e.to_string()))
    }
}

#[async_trait]
impl BackendApi for HttpBackend {
    #[instrument(skip(self, token, name))]
    async fn register(
        &self,
        token: &BearerToken,
        name: &str,
        dob: &str,
    ) -> Result<AccountStatus, BackendError> {
        let response = self
            .client
            .post(self.url("/register"))
            .header(AUTHORIZATION, Self::bearer(token))
            .json(&RegisterRequest { name, dob })
            .send()
            .await?;

        Self::parse(response).await
    }

    #[instrument(skip(self, token))]
    async fn login(&self, token: &BearerToken) -> Result<AccountStatus, BackendError> {
        let response = self
            .client
            .post(self.url("/login"))
            .header(AUTHORIZATION, Self::bearer(token))
            .json(&serde_json::json!({}))
            .send()
            .await?;

        Self::parse(response).await
    }

    #[instrument(skip(self, token))]
    async fn profile(&self, token: &BearerToken) -> Result<Option<Profile>, BackendError> {
        let response = self
            .client
            .get(self.url("/profile"))
            .header(AUTHORIZATION, Self::bearer(token))
            .send()
            .await?;

        let envelope: ProfileEnvelope = Self::parse(response).await?;
        Ok(envelope.user.filter(|_| envelope.success))
    }

    #[instrument(skip(self, token))]
    async fn qr_payload(&self, token: &BearerToken) -> Result<serde_json::Value, BackendError> {
        let response = self
            .client
            .get(self.url("/qr/generate"))
            .header(AUTHORIZATION, Self::bearer(token))
            .send()
            .await?;

        Self::parse(response).await
    }

    #[instrument(skip(self))]
    async fn products(&self) -> Result<Vec<Product>, BackendError> {
        let response = self.client.get(self.url("/products")).send().await?;
        let envelope: ProductsEnvelope = Self::parse(response).await?;
        Ok(envelope.products)
    }

    #[instrument(skip(self, token, lines), fields(line_count = lines.len()))]
    async fn checkout(
        &self,
        token: &BearerToken,
        lines: Vec<CartLine>,
    ) -> Result<String, BackendError> {
        let request = CheckoutRequest {
            items: lines
                .iter()
                .map(|line| CheckoutItem {
                    id: &line.product_id,
                    name: &line.name,
                    quantity: line.quantity,
                })
                .collect(),
        };

        let response = self
            .client
            .post(self.url("/checkout"))
            .header(AUTHORIZATION, Self::bearer(token))
            .json(&request)
            .send()
            .await?;

        let body: CheckoutResponse = Self::parse(response).await?;
        Ok(body.url)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_role_landing() {
        assert_eq!(Role::Admin.landing_path(), "/admin");
        assert_eq!(Role::User.landing_path(), "/profile");
    }

    #[test]
    fn test_unknown_role_is_user() {
        let status: AccountStatus =
            serde_json::from_str(r#"{"success": true, "role": "volunteer"}"#).unwrap();
        assert_eq!(status.role, Role::User);

        let status: AccountStatus = serde_json::from_str(r#"{"success": false}"#).unwrap();
        assert!(!status.success);
        assert_eq!(status.role, Role::User);
    }

    #[test]
    fn test_profile_envelope() {
        let json = r#"{
            "success": true,
            "user": {
                "displayName": "Asha",
                "email": "asha@iitp.ac.in",
                "dob": "2003-04-09",
                "celestaId": "CEL-0042",
                "qrEnabled": true
            }
        }"#;
        let envelope: ProfileEnvelope = serde_json::from_str(json).unwrap();
        let profile = envelope.user.unwrap();
        assert_eq!(profile.display_name, "Asha");
        assert_eq!(profile.celesta_id.unwrap().as_str(), "CEL-0042");
        assert!(profile.qr_enabled);
    }

    #[test]
    fn test_checkout_request_shape() {
        let line = CartLine {
            product_id: ProductId::new("tee"),
            name: "Festival Tee".to_string(),
            unit_cost: celesta_core::Price::from_rupees(499),
            image: None,
            quantity: 2,
        };
        let request = CheckoutRequest {
            items: vec![CheckoutItem {
                id: &line.product_id,
                name: &line.name,
                quantity: line.quantity,
            }],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["items"][0]["id"], "tee");
        assert_eq!(json["items"][0]["quantity"], 2);
    }
}
