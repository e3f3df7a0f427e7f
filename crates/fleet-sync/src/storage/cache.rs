//! Never-failing local cache over a `KeyValueBackend`.
//!
//! Each entity type is kept as one serialized collection that is rewritten
//! wholesale on every write. Access failures are logged and swallowed:
//! a failed read is an empty collection, a failed write is a no-op.

use std::path::Path;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::config::FleetConfig;
use crate::error::StorageError;
use crate::types::{HistoryLogEntry, VehicleRecord};

use super::memory::MemoryBackend;
use super::traits::KeyValueBackend;

pub const VEHICLES_KEY: &str = "metro_vehicles";
pub const HISTORY_KEY: &str = "metro_history";

#[derive(Clone)]
pub struct LocalCache {
    backend: Arc<dyn KeyValueBackend>,
}

impl LocalCache {
    pub fn new(backend: Arc<dyn KeyValueBackend>) -> Self {
        Self { backend }
    }

    /// Cache over a fresh [`MemoryBackend`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    /// Cache at `config.cache_path`. If the file cannot be opened the cache
    /// degrades to process memory instead of failing startup.
    pub fn from_config(config: &FleetConfig) -> Self {
        match &config.cache_path {
            Some(path) => Self::open_file(path),
            None => Self::in_memory(),
        }
    }

    #[cfg(feature = "sqlite")]
    fn open_file(path: &Path) -> Self {
        match super::sqlite::SqliteBackend::open(path) {
            Ok(backend) => Self::new(Arc::new(backend)),
            Err(e) => {
                warn!(
                    path = %path.display(),
                    kind = %e.kind(),
                    error = %e,
                    "cannot open local cache; falling back to memory"
                );
                Self::in_memory()
            }
        }
    }

    #[cfg(not(feature = "sqlite"))]
    fn open_file(path: &Path) -> Self {
        warn!(path = %path.display(), "built without sqlite support; local cache kept in memory");
        Self::in_memory()
    }

    // -----------------------------------------------------------------------
    // Raw access
    // -----------------------------------------------------------------------

    pub fn get(&self, key: &str) -> Option<String> {
        match self.backend.get(key) {
            Ok(value) => value,
            Err(e) => {
                warn!(key, kind = %e.kind(), error = %e, "local cache read failed; treating as empty");
                None
            }
        }
    }

    pub fn set(&self, key: &str, value: &str) {
        if let Err(e) = self.backend.set(key, value) {
            warn!(key, kind = %e.kind(), error = %e, "local cache write failed; change not persisted");
        }
    }

    // -----------------------------------------------------------------------
    // Collections
    // -----------------------------------------------------------------------

    /// The stored elements of a collection, undecoded. Absent content, or
    /// text that is not a JSON array, reads as empty.
    pub fn read_raw(&self, key: &str) -> Vec<Value> {
        let Some(text) = self.get(key) else {
            return Vec::new();
        };
        match serde_json::from_str(&text) {
            Ok(items) => items,
            Err(source) => {
                let e = StorageError::Corruption {
                    key: key.to_string(),
                    source,
                };
                warn!(key, kind = %e.kind(), error = %e, "{}", e.kind().remediation());
                Vec::new()
            }
        }
    }

    /// Read a collection. Elements that do not decode are skipped.
    pub fn read_collection<T: DeserializeOwned>(&self, key: &str) -> Vec<T> {
        self.read_raw(key)
            .into_iter()
            .enumerate()
            .filter_map(|(index, item)| match serde_json::from_value(item) {
                Ok(decoded) => Some(decoded),
                Err(source) => {
                    let e = StorageError::Corruption {
                        key: key.to_string(),
                        source,
                    };
                    warn!(key, index, kind = %e.kind(), error = %e, "skipping undecodable cached element");
                    None
                }
            })
            .collect()
    }

    pub fn write_collection<T: Serialize>(&self, key: &str, items: &[T]) {
        match serde_json::to_string(items) {
            Ok(text) => self.set(key, &text),
            Err(e) => warn!(key, error = %e, "failed to serialize collection; skipping write"),
        }
    }

    /// Apply `edit` to the raw elements and store the result. Elements the
    /// edit leaves alone are written back untouched, decodable or not.
    fn edit_raw<R>(&self, key: &str, edit: impl FnOnce(&mut Vec<Value>) -> R) -> R {
        let mut items = self.read_raw(key);
        let result = edit(&mut items);
        self.write_collection(key, &items);
        result
    }

    // -----------------------------------------------------------------------
    // Vehicles
    // -----------------------------------------------------------------------

    pub fn vehicles(&self) -> Vec<VehicleRecord> {
        self.read_collection(VEHICLES_KEY)
    }

    /// Ids of every cached vehicle, including ones that do not decode.
    pub fn vehicle_ids(&self) -> Vec<String> {
        self.read_raw(VEHICLES_KEY).iter().filter_map(element_id).collect()
    }

    pub fn set_vehicles(&self, vehicles: &[VehicleRecord]) {
        self.write_collection(VEHICLES_KEY, vehicles);
    }

    /// Replace the vehicle with the same id, or append it.
    pub fn upsert_vehicle(&self, vehicle: &VehicleRecord) {
        let value = match serde_json::to_value(vehicle) {
            Ok(value) => value,
            Err(e) => {
                warn!(vehicle_id = vehicle.id.as_str(), error = %e, "failed to serialize vehicle; skipping write");
                return;
            }
        };
        self.edit_raw(VEHICLES_KEY, |items| {
            match items.iter_mut().find(|v| element_id(v).as_deref() == Some(vehicle.id.as_str())) {
                Some(existing) => *existing = value,
                None => items.push(value),
            }
        });
    }

    // -----------------------------------------------------------------------
    // History
    // -----------------------------------------------------------------------

    pub fn history(&self) -> Vec<HistoryLogEntry> {
        self.read_collection(HISTORY_KEY)
    }

    pub fn set_history(&self, entries: &[HistoryLogEntry]) {
        self.write_collection(HISTORY_KEY, entries);
    }

    pub fn append_history(&self, entry: &HistoryLogEntry) {
        match serde_json::to_value(entry) {
            Ok(value) => self.edit_raw(HISTORY_KEY, |items| items.push(value)),
            Err(e) => warn!(log_id = entry.id.as_str(), error = %e, "failed to serialize entry; skipping write"),
        }
    }

    /// Drop every entry with `logical_id`. Returns whether anything was removed.
    pub fn remove_history(&self, logical_id: &str) -> bool {
        let mut items = self.read_raw(HISTORY_KEY);
        let before = items.len();
        items.retain(|e| element_id(e).as_deref() != Some(logical_id));
        if items.len() == before {
            return false;
        }
        self.write_collection(HISTORY_KEY, &items);
        true
    }
}

fn element_id(item: &Value) -> Option<String> {
    item.get("id")?.as_str().map(str::to_string)
}
