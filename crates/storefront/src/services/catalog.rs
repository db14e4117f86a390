//! Live product catalog.
//!
//! A background task polls the backend and publishes full snapshots on a
//! `watch` channel. Subscribers only wake when the product list actually
//! changes. A failed poll keeps the last good snapshot.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use celesta_core::ProductId;
use celesta_core::catalog::{CatalogSnapshot, Product};

use crate::services::backend::BackendApi;

type Published = Option<Arc<CatalogSnapshot>>;

/// Read handle on the latest catalog snapshot.
#[derive(Clone)]
pub struct ProductCatalog {
    rx: watch::Receiver<Published>,
}

impl ProductCatalog {
    /// Start polling `backend` every `interval`.
    ///
    /// The first poll runs immediately. The task ends when every
    /// [`ProductCatalog`] handle has been dropped.
    pub fn spawn(backend: Arc<dyn BackendApi>, interval: Duration) -> (Self, JoinHandle<()>) {
        let (tx, rx) = watch::channel(None);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                if tx.is_closed() {
                    break;
                }
                refresh(backend.as_ref(), &tx).await;
            }
            tracing::debug!("Catalog poller stopped");
        });

        (Self { rx }, handle)
    }

    /// A catalog that never changes.
    #[must_use]
    pub fn fixed(products: CatalogSnapshot) -> Self {
        let (_tx, rx) = watch::channel(Some(Arc::new(products)));
        Self { rx }
    }

    /// Latest snapshot, or `None` before the first successful poll.
    #[must_use]
    pub fn snapshot(&self) -> Option<Arc<CatalogSnapshot>> {
        self.rx.borrow().clone()
    }

    /// Latest products, empty before the first successful poll.
    #[must_use]
    pub fn products(&self) -> Arc<CatalogSnapshot> {
        self.snapshot().unwrap_or_default()
    }

    /// Look up a product in the latest snapshot.
    #[must_use]
    pub fn find(&self, id: &ProductId) -> Option<Product> {
        self.rx
            .borrow()
            .as_ref()
            .and_then(|products| products.iter().find(|p| &p.id == id).cloned())
    }

    /// Whether at least one snapshot has been published.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.rx.borrow().is_some()
    }

    /// Subscribe to snapshot changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Published> {
        self.rx.clone()
    }
}

/// Poll once and publish if the product list changed.
///
/// Returns whether subscribers were notified.
pub async fn refresh(backend: &dyn BackendApi, tx: &watch::Sender<Published>) -> bool {
    match backend.products().await {
        Ok(products) => {
            let changed = tx.send_if_modified(|current| {
                if current.as_deref() == Some(&products) {
                    return false;
                }
                *current = Some(Arc::new(products));
                true
            });
            if changed {
                tracing::info!(
                    product_count = tx.borrow().as_ref().map_or(0, |p| p.len()),
                    "Catalog updated"
                );
            }
            changed
        }
        Err(e) => {
            tracing::warn!(error = %e, "Catalog refresh failed, keeping last snapshot");
            false
        }
    }
}
