//! Celesta Storefront - the festival's public site.
//!
//! This binary serves the site on port 3000.
//!
//! # Architecture
//!
//! - Axum web framework with HTMX-style fragments for interactivity
//! - Askama templates for server-side rendering
//! - Identity provider REST API for accounts and bearer tokens
//! - Festival backend API for profiles, products and checkout
//! - In-memory sessions for carts, registration progress and the sponsor wall

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::Path;
use std::sync::Arc;

use celesta_storefront::config::StorefrontConfig;
use celesta_storefront::content::ContentStore;
use celesta_storefront::services::backend::HttpBackend;
use celesta_storefront::services::catalog::ProductCatalog;
use celesta_storefront::services::contact::ContactClient;
use celesta_storefront::services::identity::FirebaseIdentity;
use celesta_storefront::services::mailer::HttpOtpMailer;
use celesta_storefront::state::{AppState, Collaborators};
use celesta_storefront::{CONTENT_DIR, app};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Start Sentry when a DSN is configured. Reporting stops when the guard drops.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            sample_rate: config.sentry_sample_rate,
            traces_sample_rate: config.sentry_traces_sample_rate,
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    Some(guard)
}

/// Errors and warnings become Sentry events; info and debug become breadcrumbs.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

/// Build the clients for everything the site talks to.
fn collaborators(config: &StorefrontConfig) -> Result<Collaborators, Box<dyn std::error::Error>> {
    let contact = match config.contact.clone() {
        Some(contact) => Some(ContactClient::new(contact)?),
        None => {
            tracing::warn!("WEB3FORMS_ACCESS_KEY not set, contact form disabled");
            None
        }
    };

    Ok(Collaborators {
        identity: Arc::new(FirebaseIdentity::new(&config.identity)?),
        backend: Arc::new(HttpBackend::new(&config.backend)?),
        mailer: Arc::new(HttpOtpMailer::new(&config.backend)?),
        contact,
    })
}

/// Console output plus the Sentry layer. `LOG_FORMAT=json` switches the
/// console to one JSON object per line.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "celesta_storefront=info,tower_http=debug".into());
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter));
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = StorefrontConfig::from_env()?;
    // Sentry goes first so the tracing layer has a client to report to.
    let _sentry = init_sentry(&config);
    init_tracing();

    let collaborators = collaborators(&config)?;
    let content = ContentStore::load(Path::new(CONTENT_DIR))?;
    tracing::info!(
        events = content.events().len(),
        workshops = content.workshops().len(),
        "Content loaded"
    );

    let (catalog, _poller) =
        ProductCatalog::spawn(Arc::clone(&collaborators.backend), config.catalog_poll_interval);
    tracing::info!(
        interval_secs = config.catalog_poll_interval.as_secs(),
        "Catalog polling started"
    );

    let state = AppState::new(config.clone(), collaborators, catalog, content);
    let app = app(state)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Storefront listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("Storefront stopped");
    Ok(())
}

/// Resolves on Ctrl+C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutting down, draining open requests");
}
