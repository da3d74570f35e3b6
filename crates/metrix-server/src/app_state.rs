//! Shared application state for the metrics server.
//!
//! The store is constructed explicitly here and handed to handlers by
//! injection; there is no global instance.

use std::sync::Arc;

use metrix_core::error::Result;

use crate::config::ServerConfig;
use crate::repository::{self, MemoryRepository, Repository};
use crate::store::MetricsStore;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: ServerConfig,
    repo: Arc<dyn Repository>,
    store: Arc<MetricsStore>,
}

impl AppState {
    /// Open the repository (restore + flusher) for this config.
    /// Must be called inside a tokio runtime.
    pub async fn new(cfg: ServerConfig) -> Result<Self> {
        let memory = repository::open(cfg.store.to_store_config()).await?;
        Ok(Self::from_parts(cfg, memory))
    }

    pub fn from_parts(cfg: ServerConfig, memory: Arc<MemoryRepository>) -> Self {
        let store = memory.store();
        let repo: Arc<dyn Repository> = memory;
        Self {
            inner: Arc::new(AppStateInner { cfg, repo, store }),
        }
    }

    pub fn cfg(&self) -> &ServerConfig {
        &self.inner.cfg
    }

    pub fn repo(&self) -> Arc<dyn Repository> {
        Arc::clone(&self.inner.repo)
    }

    /// Direct store access for the text endpoints (path updates, listings).
    pub fn store(&self) -> Arc<MetricsStore> {
        Arc::clone(&self.inner.store)
    }
}
