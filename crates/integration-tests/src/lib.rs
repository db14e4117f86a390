//! Integration tests for the Celesta festival site.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p celesta-integration-tests
//! ```
//!
//! The full router runs in-process with fake collaborators: an identity
//! provider, festival backend and code mailer that keep everything in
//! memory. Requests go through `tower::ServiceExt::oneshot`, and
//! [`TestContext`] carries the session cookie from one request to the next.
//!
//! # Test Categories
//!
//! - `health` - Liveness and readiness
//! - `access` - Sign-in gates and role redirects
//! - `registration` - Code-verified sign up and login
//! - `cart` - Store, cart fragments and checkout
//! - `sponsors` - Carousel and arcade unlock

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode, header};
use secrecy::SecretString;
use tower::ServiceExt;

use celesta_core::cart::CartLine;
use celesta_core::catalog::{CatalogSnapshot, Product};
use celesta_core::otp::OtpCode;
use celesta_core::{CelestaId, Email, Price, ProductId, UserHandle};
use celesta_storefront::app;
use celesta_storefront::config::{BackendConfig, IdentityConfig, StorefrontConfig};
use celesta_storefront::content::ContentStore;
use celesta_storefront::services::backend::{
    AccountStatus, BackendApi, BackendError, Profile, Role,
};
use celesta_storefront::services::catalog::ProductCatalog;
use celesta_storefront::services::identity::{
    BearerToken, IdentityError, IdentityProvider, IdentitySession, RefreshToken,
};
use celesta_storefront::services::mailer::{MailerError, OtpMailer};
use celesta_storefront::state::{AppState, Collaborators};

/// Password every fake account uses.
pub const PASSWORD: &str = "hunter22";

/// Admin account known to the fake backend.
pub const ADMIN_EMAIL: &str = "admin@celesta.in";

/// Payment page the fake backend hands out at checkout.
pub const PAYMENT_URL: &str = "https://pay.example.com/session/1";

// =============================================================================
// Fakes
// =============================================================================

/// Identity provider keeping accounts in a map.
#[derive(Default)]
pub struct FakeIdentity {
    accounts: Mutex<HashMap<String, String>>,
    pub deleted: Mutex<Vec<String>>,
}

impl FakeIdentity {
    /// Seed an existing account.
    pub fn with_account(self, email: &str) -> Self {
        self.accounts
            .lock()
            .unwrap()
            .insert(email.to_string(), PASSWORD.to_string());
        self
    }

    fn session(email: &Email) -> IdentitySession {
        IdentitySession {
            user: UserHandle::new(format!("uid-{}", email.local_part())),
            email: email.clone(),
            id_token: BearerToken::new(format!("id-{email}")),
            refresh_token: RefreshToken::new(format!("refresh-{email}")),
        }
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn create_account(
        &self,
        email: &Email,
        password: &str,
    ) -> Result<IdentitySession, IdentityError> {
        if password.len() < 6 {
            return Err(IdentityError::WeakPassword("too short".to_string()));
        }
        let mut accounts = self.accounts.lock().unwrap();
        if accounts.contains_key(email.as_str()) {
            return Err(IdentityError::EmailExists);
        }
        accounts.insert(email.to_string(), password.to_string());
        Ok(Self::session(email))
    }

    async fn sign_in(&self, email: &Email, password: &str) -> Result<IdentitySession, IdentityError> {
        match self.accounts.lock().unwrap().get(email.as_str()) {
            Some(stored) if stored == password => Ok(Self::session(email)),
            _ => Err(IdentityError::InvalidCredentials),
        }
    }

    async fn sign_out(&self, _user: &UserHandle) -> Result<(), IdentityError> {
        Ok(())
    }

    async fn issue_token(
        &self,
        user: &UserHandle,
        _refresh_token: &RefreshToken,
    ) -> Result<BearerToken, IdentityError> {
        Ok(BearerToken::new(format!("bearer-{user}")))
    }

    async fn delete_account(
        &self,
        user: &UserHandle,
        _token: &BearerToken,
    ) -> Result<(), IdentityError> {
        self.deleted.lock().unwrap().push(user.to_string());
        Ok(())
    }
}

/// Festival backend with a fixed product list.
#[derive(Default)]
pub struct FakeBackend {
    /// Fail `products()` to keep the catalog unready.
    pub catalog_down: bool,
    /// Answer `success: false` to profile creation.
    pub reject_profiles: bool,
    /// Fail `qr_payload()`.
    pub qr_down: bool,
    pub checkouts: Mutex<Vec<Vec<CartLine>>>,
}

#[async_trait]
impl BackendApi for FakeBackend {
    async fn register(
        &self,
        _token: &BearerToken,
        _name: &str,
        _dob: &str,
    ) -> Result<AccountStatus, BackendError> {
        Ok(AccountStatus {
            success: !self.reject_profiles,
            role: Role::User,
        })
    }

    async fn login(&self, token: &BearerToken) -> Result<AccountStatus, BackendError> {
        let role = if token.expose().contains(ADMIN_EMAIL) {
            Role::Admin
        } else {
            Role::User
        };
        Ok(AccountStatus {
            success: true,
            role,
        })
    }

    async fn profile(&self, _token: &BearerToken) -> Result<Option<Profile>, BackendError> {
        Ok(Some(Profile {
            display_name: "Asha Verma".to_string(),
            email: "asha@example.com".to_string(),
            dob: "2003-04-05".to_string(),
            celesta_id: Some(CelestaId::new("CEL-0042")),
            qr_enabled: true,
        }))
    }

    async fn qr_payload(&self, _token: &BearerToken) -> Result<serde_json::Value, BackendError> {
        if self.qr_down {
            return Err(BackendError::Api {
                status: 500,
                message: "qr service failed".to_string(),
            });
        }
        Ok(serde_json::json!({ "celestaId": "CEL-0042", "events": ["robowars"] }))
    }

    async fn products(&self) -> Result<CatalogSnapshot, BackendError> {
        if self.catalog_down {
            return Err(BackendError::Api {
                status: 503,
                message: "unavailable".to_string(),
            });
        }
        Ok(products())
    }

    async fn checkout(
        &self,
        _token: &BearerToken,
        lines: Vec<CartLine>,
    ) -> Result<String, BackendError> {
        self.checkouts.lock().unwrap().push(lines);
        Ok(PAYMENT_URL.to_string())
    }
}

/// Mailer that records every code it was asked to send.
#[derive(Default)]
pub struct FakeMailer {
    sent: Mutex<Vec<(String, OtpCode)>>,
}

impl FakeMailer {
    /// The most recent code sent to `email`.
    pub fn last_code(&self, email: &str) -> Option<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(to, _)| to == email)
            .map(|(_, code)| code.as_str().to_string())
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl OtpMailer for FakeMailer {
    async fn send_code(&self, email: &Email, code: &OtpCode) -> Result<(), MailerError> {
        self.sent
            .lock()
            .unwrap()
            .push((email.to_string(), code.clone()));
        Ok(())
    }
}

/// Products the fake backend serves.
pub fn products() -> CatalogSnapshot {
    vec![
        Product {
            id: ProductId::new("tee-01"),
            name: "Realms Tee".to_string(),
            cost: Price::from_rupees(399),
            img_src: Some("/static/images/merch/tee.png".to_string()),
        },
        Product {
            id: ProductId::new("band-01"),
            name: "Festival Band".to_string(),
            cost: Price::from_rupees(49),
            img_src: None,
        },
    ]
}

/// Configuration pointing at nowhere; the fakes never read it.
pub fn test_config() -> StorefrontConfig {
    StorefrontConfig {
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        base_url: "http://localhost:3000".to_string(),
        identity: IdentityConfig {
            api_key: SecretString::from("test-identity-key"),
            base_url: "http://identity.invalid".to_string(),
            token_base_url: "http://token.invalid".to_string(),
        },
        backend: BackendConfig {
            base_url: "http://backend.invalid".to_string(),
            otp_dispatch_url: "http://backend.invalid/send-otp".to_string(),
        },
        otp_resend_seconds: 30,
        catalog_poll_interval: Duration::from_secs(60),
        contact: None,
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 0.0,
        sentry_traces_sample_rate: 0.0,
    }
}

// =============================================================================
// Test context
// =============================================================================

/// One visitor talking to a fresh app.
pub struct TestContext {
    pub router: Router,
    pub identity: Arc<FakeIdentity>,
    pub backend: Arc<FakeBackend>,
    pub mailer: Arc<FakeMailer>,
    cookie: Option<String>,
}

/// Distinct client address per request, so rate limits never trip.
fn next_client_ip() -> String {
    static COUNTER: AtomicU32 = AtomicU32::new(1);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    Ipv4Addr::from(0x0A00_0000 | n).to_string()
}

/// A collected response.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: String,
}

impl TestResponse {
    /// `Location` header of a redirect.
    pub fn location(&self) -> &str {
        self.headers
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

impl TestContext {
    /// App with a ready catalog and no accounts.
    pub fn new() -> Self {
        Self::with(FakeIdentity::default(), FakeBackend::default())
    }

    /// App with the given fakes. The catalog polls the backend when it is
    /// down, so readiness reflects it; otherwise it is fixed.
    pub fn with(identity: FakeIdentity, backend: FakeBackend) -> Self {
        let identity = Arc::new(identity);
        let backend = Arc::new(backend);
        let mailer = Arc::new(FakeMailer::default());

        let catalog = if backend.catalog_down {
            let (catalog, _handle) = ProductCatalog::spawn(
                Arc::clone(&backend) as Arc<dyn BackendApi>,
                Duration::from_secs(60),
            );
            catalog
        } else {
            ProductCatalog::fixed(products())
        };

        let collaborators = Collaborators {
            identity: Arc::clone(&identity) as Arc<dyn IdentityProvider>,
            backend: Arc::clone(&backend) as Arc<dyn BackendApi>,
            mailer: Arc::clone(&mailer) as Arc<dyn OtpMailer>,
            contact: None,
        };

        let state = AppState::new(
            test_config(),
            collaborators,
            catalog,
            ContentStore::from_entries(Vec::new(), Vec::new()),
        );

        Self {
            router: app(state),
            identity,
            backend,
            mailer,
            cookie: None,
        }
    }

    async fn send(&mut self, request: Request<Body>) -> TestResponse {
        let response: Response<Body> = self.router.clone().oneshot(request).await.unwrap();

        if let Some(cookie) = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
        {
            self.cookie = Some(cookie.to_string());
        }

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        TestResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }

    fn builder(&self, method: &str, uri: &str) -> axum::http::request::Builder {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-forwarded-for", next_client_ip());
        if let Some(cookie) = &self.cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder
    }

    pub async fn get(&mut self, uri: &str) -> TestResponse {
        let request = self.builder("GET", uri).body(Body::empty()).unwrap();
        self.send(request).await
    }

    /// POST an urlencoded form.
    pub async fn post(&mut self, uri: &str, fields: &[(&str, &str)]) -> TestResponse {
        let body = fields
            .iter()
            .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        let request = self
            .builder("POST", uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    /// Sign in with an account the fake identity provider knows.
    pub async fn sign_in(&mut self, email: &str) -> TestResponse {
        self.post("/auth/login", &[("email", email), ("password", PASSWORD)])
            .await
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Value of the first `name="{field}" value="..."` input in `html`.
pub fn input_value<'a>(html: &'a str, field: &str) -> Option<&'a str> {
    let marker = format!("name=\"{field}\" value=\"");
    let start = html.find(&marker)? + marker.len();
    let len = html.get(start..)?.find('"')?;
    html.get(start..start + len)
}
