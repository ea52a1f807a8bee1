//! Background expiry scanning.
//!
//! Periodically sweeps active lots and raises one `ExpirySoon` alert per lot
//! whose expiry date enters the configured window. Alerts are deduplicated
//! per lot for the lifetime of the worker; a restarted worker may alert
//! again, which consumers already tolerate (delivery is at-least-once).

use std::collections::HashSet;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use kirana_catalog::ProductCatalog;
use kirana_core::{BatchId, DomainResult};
use kirana_events::{DomainEvent, EventOrchestrator, ExpirySoon, WorkerHandle};

use crate::store::InMemoryStore;

/// Expiry scanner tuning.
#[derive(Debug, Clone)]
pub struct ExpiryScanConfig {
    /// Time between sweeps.
    pub poll_interval: Duration,
    /// Alert when a lot expires within this many days.
    pub window_days: i64,
    /// Worker thread name.
    pub name: &'static str,
}

impl Default for ExpiryScanConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(60),
            window_days: 30,
            name: "expiry-scanner",
        }
    }
}

/// Periodic expiry sweep over the lot store.
pub struct ExpiryScanner;

impl ExpiryScanner {
    /// Start the background scanner thread.
    pub fn spawn(
        store: Arc<InMemoryStore>,
        catalog: Arc<dyn ProductCatalog>,
        orchestrator: Arc<EventOrchestrator>,
        config: ExpiryScanConfig,
    ) -> WorkerHandle {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let join = thread::Builder::new()
            .name(config.name.to_string())
            .spawn(move || {
                let mut alerted = HashSet::new();
                loop {
                    match shutdown_rx.recv_timeout(config.poll_interval) {
                        Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => return,
                        Err(mpsc::RecvTimeoutError::Timeout) => {}
                    }
                    match Self::scan_once(
                        &store,
                        catalog.as_ref(),
                        Utc::now(),
                        config.window_days,
                        &mut alerted,
                    ) {
                        Ok(events) => orchestrator.publish_all(events),
                        Err(error) => warn!(%error, "expiry sweep failed"),
                    }
                }
            })
            .expect("failed to spawn expiry scanner thread");

        WorkerHandle::new(shutdown_tx, join)
    }

    /// One sweep: collect `ExpirySoon` events for lots inside the window that
    /// have not been alerted yet. Split from the thread loop so tests can
    /// drive it with a fixed clock.
    pub fn scan_once(
        store: &InMemoryStore,
        catalog: &dyn ProductCatalog,
        now: DateTime<Utc>,
        window_days: i64,
        alerted: &mut HashSet<BatchId>,
    ) -> DomainResult<Vec<DomainEvent>> {
        let expiring = store.read(|state| state.expiring_batches(now, window_days))?;

        let mut events = Vec::new();
        for batch in expiring {
            if !alerted.insert(batch.id()) {
                continue;
            }
            let Some(product) = catalog.product(batch.product_id()) else {
                // Lot for a product the catalog no longer knows; nothing to
                // alert on.
                debug!(batch = %batch.id(), "skipping lot with unknown product");
                continue;
            };
            let Some(expiry_date) = batch.expiry_date() else {
                continue;
            };
            events.push(DomainEvent::ExpirySoon(ExpirySoon {
                product_id: batch.product_id(),
                product_name: product.name,
                sku: product.sku,
                batch_id: batch.id(),
                expiry_date,
                days_until_expiry: batch.days_until_expiry(now).unwrap_or(0),
                occurred_at: now,
            }));
        }
        Ok(events)
    }
}
