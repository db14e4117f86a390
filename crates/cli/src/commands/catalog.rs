//! Catalog dump.
//!
//! Fetches the merchandise list the store would show and prints it as JSON.
//!
//! # Environment Variables
//!
//! - `BACKEND_BASE_URL` - Festival backend API root

use std::io::{self, Write};

use celesta_storefront::config::BackendConfig;
use celesta_storefront::services::backend::{BackendApi, HttpBackend};

/// Print the current catalog.
///
/// # Errors
///
/// Returns an error if the backend is not configured or unreachable.
pub async fn dump() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let config = BackendConfig::from_env()?;
    let backend = HttpBackend::new(&config)?;

    tracing::info!(url = %config.base_url, "Fetching catalog...");
    let products = backend.products().await?;
    tracing::info!(count = products.len(), "Catalog fetched");

    let mut out = io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, &products)?;
    writeln!(out)?;
    Ok(())
}
