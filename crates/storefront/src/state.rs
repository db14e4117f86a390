//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::StorefrontConfig;
use crate::content::ContentStore;
use crate::services::auth::AuthService;
use crate::services::backend::BackendApi;
use crate::services::catalog::ProductCatalog;
use crate::services::contact::ContactClient;
use crate::services::identity::IdentityProvider;
use crate::services::mailer::OtpMailer;
use crate::services::qr::QrPasses;
use crate::services::ticker::TimerRegistry;

/// External collaborators the site talks to.
///
/// Built from configuration in the binary and from fakes in tests.
#[derive(Clone)]
pub struct Collaborators {
    pub identity: Arc<dyn IdentityProvider>,
    pub backend: Arc<dyn BackendApi>,
    pub mailer: Arc<dyn OtpMailer>,
    pub contact: Option<ContactClient>,
}

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. Holds no per-visitor data; carts,
/// registration progress and the signed-in user live in the session.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    collaborators: Collaborators,
    catalog: ProductCatalog,
    content: ContentStore,
    timers: TimerRegistry,
    qr: QrPasses,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(
        config: StorefrontConfig,
        collaborators: Collaborators,
        catalog: ProductCatalog,
        content: ContentStore,
    ) -> Self {
        let timers = TimerRegistry::new(config.otp_resend_seconds);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                collaborators,
                catalog,
                content,
                timers,
                qr: QrPasses::new(),
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn identity(&self) -> &dyn IdentityProvider {
        self.inner.collaborators.identity.as_ref()
    }

    #[must_use]
    pub fn backend(&self) -> &dyn BackendApi {
        self.inner.collaborators.backend.as_ref()
    }

    #[must_use]
    pub fn contact(&self) -> Option<&ContactClient> {
        self.inner.collaborators.contact.as_ref()
    }

    /// Latest product catalog.
    #[must_use]
    pub fn catalog(&self) -> &ProductCatalog {
        &self.inner.catalog
    }

    #[must_use]
    pub fn content(&self) -> &ContentStore {
        &self.inner.content
    }

    /// Live resend countdowns.
    #[must_use]
    pub fn timers(&self) -> &TimerRegistry {
        &self.inner.timers
    }

    #[must_use]
    pub fn qr(&self) -> &QrPasses {
        &self.inner.qr
    }

    /// Authentication service borrowing this state's collaborators.
    #[must_use]
    pub fn auth(&self) -> AuthService<'_> {
        AuthService::new(
            self.inner.collaborators.identity.as_ref(),
            self.inner.collaborators.backend.as_ref(),
            self.inner.collaborators.mailer.as_ref(),
            &self.inner.timers,
        )
    }
}
