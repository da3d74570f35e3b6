//! Periodic snapshot scheduler.
//!
//! Runs on its own tokio task, independent of the request path. Tick failures
//! are logged and recorded for health checks; the loop keeps going.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use metrix_core::error::{MetricsError, Result};

use super::MetricsStore;

/// Handle to the background flush task.
///
/// `stop` signals the task, waits for it, then writes one last snapshot.
/// Dropping the handle only signals the task.
pub struct FlushScheduler {
    shutdown_tx: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
    store: Arc<MetricsStore>,
}

impl FlushScheduler {
    /// A zero period is rejected; the tokio interval cannot tick on it.
    pub(crate) fn spawn(store: Arc<MetricsStore>, every: Duration) -> Result<Self> {
        if every.is_zero() {
            return Err(MetricsError::Config("flush interval must be non-zero".into()));
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task_store = Arc::clone(&store);
        let handle = tokio::spawn(async move {
            run(task_store, every, shutdown_rx).await;
        });
        tracing::info!(every_ms = every.as_millis() as u64, "periodic flush started");

        Ok(Self {
            shutdown_tx,
            handle: Some(handle),
            store,
        })
    }

    /// Stop the task and drain: the final snapshot reflects every write
    /// accepted before this call.
    pub async fn stop(mut self) -> Result<()> {
        let _ = self.shutdown_tx.send(true);
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "flush task ended abnormally");
            }
        }

        let store = Arc::clone(&self.store);
        let res = tokio::task::spawn_blocking(move || store.save())
            .await
            .map_err(|e| MetricsError::Internal(format!("final flush join failed: {e}")))?;
        self.store.record_flush(res.is_ok());
        tracing::info!(ok = res.is_ok(), "periodic flush stopped");
        res
    }
}

impl Drop for FlushScheduler {
    fn drop(&mut self) {
        // Best-effort; the task may already be gone.
        let _ = self.shutdown_tx.send(true);
    }
}

async fn run(store: Arc<MetricsStore>, every: Duration, mut shutdown_rx: watch::Receiver<bool>) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown_rx.changed() => {
                return;
            }
        }

        let tick_store = Arc::clone(&store);
        match tokio::task::spawn_blocking(move || tick_store.save()).await {
            Ok(Ok(())) => store.record_flush(true),
            Ok(Err(e)) => {
                store.record_flush(false);
                tracing::error!(error = %e, "periodic flush failed");
            }
            Err(e) => {
                store.record_flush(false);
                tracing::error!(error = %e, "periodic flush task panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{SnapshotFile, StoreConfig};
    use metrix_core::Metric;
    use std::time::Instant;

    fn periodic(path: &std::path::Path, every: Duration) -> Arc<MetricsStore> {
        Arc::new(MetricsStore::new(
            StoreConfig::default().with_file(path).with_interval(every),
        ))
    }

    /// Poll until `cond` holds; ticks land on the blocking pool, so their
    /// timing is not tied to the runtime clock.
    async fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        cond()
    }

    #[tokio::test]
    async fn ticks_write_snapshots() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.json");
        let store = periodic(&path, Duration::from_millis(20));
        store.add_counter("hits", 5).unwrap();
        assert!(!path.exists(), "periodic mode must not flush on write");

        let flusher = store.start_flusher().unwrap().expect("periodic mode starts a flusher");
        assert!(store.start_flusher().unwrap().is_none(), "flusher starts once");

        let file = SnapshotFile::new(&path);
        let flushed = wait_for(|| {
            file.read().map(|m| m == vec![Metric::counter("hits", 5)]).unwrap_or(false)
        })
        .await;
        assert!(flushed, "no tick wrote the snapshot");

        flusher.stop().await.unwrap();
    }

    #[tokio::test]
    async fn stop_drains_latest_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.json");
        let store = periodic(&path, Duration::from_secs(3600));
        let flusher = store.start_flusher().unwrap().unwrap();

        store.set_gauge("temp", 10.5).unwrap();
        flusher.stop().await.unwrap();

        assert_eq!(SnapshotFile::new(&path).read().unwrap(), vec![Metric::gauge("temp", 10.5)]);
    }

    #[tokio::test]
    async fn failed_ticks_mark_store_unhealthy() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be opened as the snapshot file.
        let store = periodic(dir.path(), Duration::from_millis(20));
        let flusher = store.start_flusher().unwrap().unwrap();
        store.add_counter("hits", 1).unwrap();

        assert!(wait_for(|| !store.is_healthy()).await);

        // The task survives failures; stop still reports the final error.
        assert!(flusher.stop().await.is_err());
    }

    #[tokio::test]
    async fn no_flusher_outside_periodic_mode() {
        let store = Arc::new(MetricsStore::new(StoreConfig::default()));
        assert!(store.start_flusher().unwrap().is_none());
        let sync = Arc::new(MetricsStore::new(StoreConfig::default().with_file("/tmp/unused.json")));
        assert!(sync.start_flusher().unwrap().is_none());
    }

    #[tokio::test]
    async fn spawn_rejects_zero_period() {
        let store = Arc::new(MetricsStore::new(StoreConfig::default()));
        let err = FlushScheduler::spawn(store, Duration::ZERO).err().unwrap();
        assert_eq!(err.client_code().as_str(), "INVALID_CONFIG");
    }
}
