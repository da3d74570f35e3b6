use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use metrix_core::error::{MetricsError, Result};

use crate::store::StoreConfig;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub version: u32,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub store: StoreSection,
}

impl ServerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(MetricsError::Config(format!(
                "unsupported config version {}",
                self.version
            )));
        }

        self.server.validate()?;

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

impl ServerSection {
    pub fn validate(&self) -> Result<()> {
        self.listen_addr().map(|_| ())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen.parse().map_err(|e| {
            MetricsError::Config(format!("server.listen must be a socket address: {e}"))
        })
    }
}

fn default_listen() -> String {
    "127.0.0.1:8080".into()
}

/// Persistence and signing knobs for the metrics store.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreSection {
    /// Snapshot path; empty disables persistence.
    #[serde(default)]
    pub file: String,

    /// Flush period; 0 means every write is flushed synchronously.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    #[serde(default = "default_true")]
    pub restore: bool,

    /// Signing key; empty disables signing.
    #[serde(default)]
    pub key: String,

    #[serde(default = "default_true")]
    pub verify_on_update: bool,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            file: String::new(),
            interval_secs: default_interval_secs(),
            restore: true,
            key: String::new(),
            verify_on_update: true,
        }
    }
}

impl StoreSection {
    pub fn to_store_config(&self) -> StoreConfig {
        StoreConfig {
            store_file: (!self.file.is_empty()).then(|| PathBuf::from(&self.file)),
            store_interval: Duration::from_secs(self.interval_secs),
            secret_key: self.key.clone(),
            verify_on_update: self.verify_on_update,
            restore: self.restore,
        }
    }
}

fn default_interval_secs() -> u64 {
    300
}
fn default_true() -> bool {
    true
}
