//! Everything the coordinator needs, decided once at startup.

use std::sync::Arc;

use tracing::{error, info};

use crate::config::{FleetConfig, RemoteConfig, DEFAULT_HISTORY_SCAN_LIMIT};
use crate::error::RemoteError;
use crate::remote::{PostgrestStore, RemoteStore};
use crate::seed::SeedRegistry;
use crate::storage::LocalCache;
use crate::types::DataMode;

/// Ordering used when scanning recent audit rows for a key.
pub const DEFAULT_RECENT_ORDER: &str = "data->>timestamp";

pub struct SyncContext {
    mode: DataMode,
    cache: LocalCache,
    remote: Option<Arc<dyn RemoteStore>>,
    seeds: SeedRegistry,
    history_scan_limit: usize,
    recent_order: String,
}

impl SyncContext {
    /// Decide the mode from `config`: CLOUD if usable remote parameters are
    /// present and a [`PostgrestStore`] can be built from them, LOCAL otherwise.
    pub fn init(config: &FleetConfig, cache: LocalCache, seeds: SeedRegistry) -> Self {
        Self::init_with(config, cache, seeds, |remote| {
            PostgrestStore::new(remote).map(|store| Arc::new(store) as Arc<dyn RemoteStore>)
        })
    }

    /// Like [`init`](Self::init) with a caller-supplied client constructor.
    pub fn init_with<F>(config: &FleetConfig, cache: LocalCache, seeds: SeedRegistry, connect: F) -> Self
    where
        F: FnOnce(&RemoteConfig) -> Result<Arc<dyn RemoteStore>, RemoteError>,
    {
        let ctx = match config.usable_remote() {
            Some(remote_config) => match connect(remote_config) {
                Ok(remote) => {
                    info!(url = %remote_config.url, "remote store configured; running in CLOUD mode");
                    Self::cloud(cache, remote, seeds)
                }
                Err(e) => {
                    error!(kind = %e.kind(), error = %e, "failed to build remote client; running in LOCAL mode");
                    Self::local(cache, seeds)
                }
            },
            None => {
                info!("no remote parameters; running in LOCAL mode");
                Self::local(cache, seeds)
            }
        };
        ctx.with_history_scan_limit(config.history_scan_limit)
    }

    pub fn local(cache: LocalCache, seeds: SeedRegistry) -> Self {
        Self {
            mode: DataMode::Local,
            cache,
            remote: None,
            seeds,
            history_scan_limit: DEFAULT_HISTORY_SCAN_LIMIT,
            recent_order: DEFAULT_RECENT_ORDER.to_string(),
        }
    }

    pub fn cloud(cache: LocalCache, remote: Arc<dyn RemoteStore>, seeds: SeedRegistry) -> Self {
        Self {
            mode: DataMode::Cloud,
            cache,
            remote: Some(remote),
            seeds,
            history_scan_limit: DEFAULT_HISTORY_SCAN_LIMIT,
            recent_order: DEFAULT_RECENT_ORDER.to_string(),
        }
    }

    pub fn with_history_scan_limit(mut self, limit: usize) -> Self {
        self.history_scan_limit = limit.max(1);
        self
    }

    pub fn with_recent_order(mut self, order_by: impl Into<String>) -> Self {
        self.recent_order = order_by.into();
        self
    }

    pub fn mode(&self) -> DataMode {
        self.mode
    }

    pub fn cache(&self) -> &LocalCache {
        &self.cache
    }

    /// The remote store, present only in CLOUD mode.
    pub fn remote(&self) -> Option<&dyn RemoteStore> {
        match self.mode {
            DataMode::Cloud => self.remote.as_deref(),
            DataMode::Local => None,
        }
    }

    pub fn seeds(&self) -> &SeedRegistry {
        &self.seeds
    }

    pub fn history_scan_limit(&self) -> usize {
        self.history_scan_limit
    }

    pub fn recent_order(&self) -> &str {
        &self.recent_order
    }
}
