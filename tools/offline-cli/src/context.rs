//! CLI execution context.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use offline_cache::SqliteCacheStorage;
use offline_core::{Connectivity, ConnectivityMonitor, OfflineConfig};
use offline_fetch::{FetchClient, FetchPolicy, Fetcher, HttpFetcher, OfflineFetcher, TimeoutConfig};
use offline_store::SqliteStore;

use crate::config;
use crate::output::Output;

/// Execution context for CLI commands.
pub struct Context {
    /// Offline layer configuration.
    pub config: OfflineConfig,
    /// File the configuration came from, if any.
    pub config_path: Option<PathBuf>,
    /// Output handler.
    pub output: Output,
    /// Working directory.
    pub cwd: PathBuf,
    /// Whether network fetches are forced to fail.
    pub offline: bool,
}

impl Context {
    /// Load context from an explicit config file or the nearest one found.
    pub fn load(config_path: Option<&str>, offline: bool, output: Output) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;

        let config_path = match config_path {
            Some(path) => Some(PathBuf::from(path)),
            None => config::find_config(&cwd),
        };
        let config = match &config_path {
            Some(path) => config::load(path)?,
            None => OfflineConfig::default(),
        };

        Ok(Self {
            config,
            config_path,
            output,
            cwd,
            offline,
        })
    }

    /// The data directory, created on demand.
    pub fn data_dir(&self) -> Result<PathBuf> {
        let dir = &self.config.storage.data_dir;
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create data directory: {}", dir.display()))?;
        Ok(dir.clone())
    }

    /// Open the request cache database.
    pub fn cache_storage(&self) -> Result<SqliteCacheStorage> {
        let path = self.data_dir()?.join("caches.db");
        SqliteCacheStorage::open(&path)
            .with_context(|| format!("Failed to open cache database: {}", path.display()))
    }

    /// Open the key-value store holding queued actions and cached data.
    pub fn store(&self) -> Result<SqliteStore> {
        let path = self.data_dir()?.join("store.db");
        SqliteStore::open(&path)
            .with_context(|| format!("Failed to open store: {}", path.display()))
    }

    /// The network seam: real HTTP with retries, or always-failing when
    /// `--offline` is set.
    pub fn fetcher(&self) -> Result<Arc<dyn Fetcher>> {
        if self.offline {
            return Ok(Arc::new(OfflineFetcher));
        }
        let http = HttpFetcher::new(TimeoutConfig::from_settings(&self.config.fetch))
            .context("Failed to build HTTP client")?;
        let client = FetchClient::new(http).with_policy(FetchPolicy::from_settings(&self.config.fetch));
        Ok(Arc::new(client))
    }

    /// Connectivity as seen by this invocation.
    pub fn connectivity(&self) -> ConnectivityMonitor {
        let state = if self.offline {
            Connectivity::Offline
        } else {
            Connectivity::Online
        };
        ConnectivityMonitor::new(state)
    }

    /// Resolve a path relative to the working directory.
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        let path = PathBuf::from(path);
        if path.is_absolute() {
            path
        } else {
            self.cwd.join(path)
        }
    }
}
