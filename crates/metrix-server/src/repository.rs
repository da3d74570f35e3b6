//! Storage-agnostic repository contract.
//!
//! Callers (HTTP handlers) only see [`Repository`]. The backend is picked
//! once at startup by [`open`]; today the in-memory store is the only one
//! shipped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use metrix_core::error::{MetricsError, Result};
use metrix_core::Metric;

use crate::store::{FlushScheduler, MetricsStore, PersistMode, StoreConfig};

/// Backend contract. Implementations must keep the metric invariants
/// (identity uniqueness, value/delta by type, valid signatures).
#[async_trait]
pub trait Repository: Send + Sync {
    /// Apply one (possibly signed) metric with the rule of its type.
    async fn upsert(&self, metric: Metric) -> Result<()>;
    /// Apply a batch; nothing is applied if any metric is rejected.
    async fn upsert_slice(&self, metrics: Vec<Metric>) -> Result<()>;
    /// Look up by the identity of `metric`.
    async fn get(&self, metric: &Metric) -> Result<Metric>;
    async fn get_slice(&self) -> Result<Vec<Metric>>;
    async fn delete(&self, metric: &Metric) -> Result<()>;
    async fn check_health(&self) -> bool;
    /// Flush and release resources. Idempotent.
    async fn close(&self) -> Result<()>;
}

/// In-memory backend over [`MetricsStore`].
pub struct MemoryRepository {
    store: Arc<MetricsStore>,
    flusher: Mutex<Option<FlushScheduler>>,
    closed: AtomicBool,
}

impl MemoryRepository {
    pub fn new(store: Arc<MetricsStore>, flusher: Option<FlushScheduler>) -> Self {
        Self {
            store,
            flusher: Mutex::new(flusher),
            closed: AtomicBool::new(false),
        }
    }

    pub fn store(&self) -> Arc<MetricsStore> {
        Arc::clone(&self.store)
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn upsert(&self, metric: Metric) -> Result<()> {
        self.store.update_from_signed(&metric)
    }

    async fn upsert_slice(&self, metrics: Vec<Metric>) -> Result<()> {
        self.store.update_batch(&metrics)
    }

    async fn get(&self, metric: &Metric) -> Result<Metric> {
        self.store.fetch(metric.mtype, &metric.id)
    }

    async fn get_slice(&self) -> Result<Vec<Metric>> {
        self.store.snapshot()
    }

    async fn delete(&self, metric: &Metric) -> Result<()> {
        self.store.delete(metric.mtype, &metric.id).map(|_| ())
    }

    async fn check_health(&self) -> bool {
        self.store.is_healthy()
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let flusher = self.flusher.lock().await.take();
        match (flusher, self.store.mode()) {
            (Some(flusher), _) => flusher.stop().await,
            (None, PersistMode::Disabled) => Ok(()),
            (None, _) => {
                let store = Arc::clone(&self.store);
                tokio::task::spawn_blocking(move || store.save())
                    .await
                    .map_err(|e| MetricsError::Internal(format!("close flush join failed: {e}")))?
            }
        }
    }
}

/// Build the configured backend: restore the snapshot when asked, then start
/// the periodic flusher if the store runs in periodic mode.
pub async fn open(cfg: StoreConfig) -> Result<Arc<MemoryRepository>> {
    let store = Arc::new(MetricsStore::new(cfg));

    if store.config().restore && store.mode() != PersistMode::Disabled {
        match store.restore() {
            Ok(restored) => tracing::info!(restored, "metrics restored from snapshot"),
            Err(e) if e.is_missing_file() => {
                tracing::info!("no snapshot to restore, starting empty");
            }
            Err(e) => return Err(e),
        }
    }

    let flusher = store.start_flusher()?;
    tracing::info!(mode = ?store.mode(), signing = store.signer().is_enabled(), "metrics store ready");
    Ok(Arc::new(MemoryRepository::new(store, flusher)))
}
