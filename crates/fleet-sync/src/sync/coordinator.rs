//! Read/write orchestration across the local cache and
//! the optional remote store.
//!
//! The local cache is written first and unconditionally; the remote store is
//! written once, best effort, and its failures are logged and reported but
//! never raised. Reads never fail: a remote error falls back to the local
//! snapshot.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::error::{ErrorKind, RemoteError};
use crate::remote::rows::{decode_history, decode_vehicle, history_row, row_ids, vehicle_row, KEY_FIELD};
use crate::types::{DataMode, HistoryLogEntry, Table, VehicleRecord};

use super::context::SyncContext;
use super::deletion::DeletionResolver;

/// What happened to a write beyond the local cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// LOCAL mode: the cache is the only store.
    LocalOnly,
    /// Written to the cache and accepted by the remote store.
    Replicated,
    /// Written to the cache; the single remote attempt failed.
    RemoteFailed(ErrorKind),
}

impl WriteOutcome {
    pub fn is_replicated(&self) -> bool {
        matches!(self, WriteOutcome::Replicated)
    }
}

pub struct SyncCoordinator {
    ctx: Arc<SyncContext>,
}

impl SyncCoordinator {
    pub fn new(ctx: Arc<SyncContext>) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &SyncContext {
        &self.ctx
    }

    pub fn mode(&self) -> DataMode {
        self.ctx.mode()
    }

    // -----------------------------------------------------------------------
    // Vehicles
    // -----------------------------------------------------------------------

    /// All vehicles, with missing defaults seeded. Never fails.
    pub async fn read_vehicles(&self) -> Vec<VehicleRecord> {
        let Some(remote) = self.ctx.remote() else {
            return self.read_local_vehicles();
        };

        let rows = match remote.select_all(Table::Vehicles).await {
            Ok(rows) => rows,
            Err(e) => {
                report(&e, "read vehicles");
                return self.read_local_vehicles();
            }
        };

        if rows.is_empty() {
            let seeds = self.ctx.seeds().seeds().to_vec();
            info!(count = seeds.len(), "remote vehicles table is empty; provisioning defaults");
            for seed in &seeds {
                self.write_vehicle(seed).await;
            }
            return seeds;
        }

        // Rows that fail to decode still hold their ids.
        let occupied: HashSet<String> = rows.iter().flat_map(row_ids).collect();
        let stored: Vec<VehicleRecord> = rows.iter().filter_map(decode_vehicle).collect();
        let merge = self.ctx.seeds().merge_excluding(stored, &occupied);
        for missing in &merge.added {
            info!(vehicle_id = missing.id.as_str(), "seeding missing default vehicle");
            self.write_vehicle(missing).await;
        }
        self.ctx.cache().set_vehicles(&merge.records);
        merge.records
    }

    fn read_local_vehicles(&self) -> Vec<VehicleRecord> {
        let cache = self.ctx.cache();
        let occupied: HashSet<String> = cache.vehicle_ids().into_iter().collect();
        let merge = self.ctx.seeds().merge_excluding(cache.vehicles(), &occupied);
        if !merge.added.is_empty() {
            info!(count = merge.added.len(), "seeding missing default vehicles into local cache");
            for seed in &merge.added {
                cache.upsert_vehicle(seed);
            }
        }
        merge.records
    }

    /// Write-through: cache first, then one remote upsert keyed by id.
    pub async fn write_vehicle(&self, vehicle: &VehicleRecord) -> WriteOutcome {
        self.ctx.cache().upsert_vehicle(vehicle);

        let Some(remote) = self.ctx.remote() else {
            return WriteOutcome::LocalOnly;
        };
        let row = match vehicle_row(vehicle) {
            Ok(row) => row,
            Err(e) => {
                warn!(vehicle_id = vehicle.id.as_str(), error = %e, "cannot encode vehicle row");
                return WriteOutcome::RemoteFailed(ErrorKind::RemoteRejected);
            }
        };
        match remote.upsert(Table::Vehicles, row, KEY_FIELD).await {
            Ok(()) => WriteOutcome::Replicated,
            Err(e) => {
                report(&e, "save vehicle");
                WriteOutcome::RemoteFailed(e.kind())
            }
        }
    }

    // -----------------------------------------------------------------------
    // History
    // -----------------------------------------------------------------------

    /// All audit entries. In CLOUD mode the remote copy replaces the cached
    /// one; on failure the cached copy is returned.
    pub async fn read_history(&self) -> Vec<HistoryLogEntry> {
        let Some(remote) = self.ctx.remote() else {
            return self.ctx.cache().history();
        };

        match remote.select_all(Table::HistoryLogs).await {
            Ok(rows) => {
                let entries: Vec<HistoryLogEntry> = rows.iter().filter_map(decode_history).collect();
                self.ctx.cache().set_history(&entries);
                entries
            }
            Err(e) => {
                report(&e, "read history");
                self.ctx.cache().history()
            }
        }
    }

    /// Append locally, then insert one remote row keyed by the logical id.
    pub async fn append_log(&self, entry: &HistoryLogEntry) -> WriteOutcome {
        self.ctx.cache().append_history(entry);

        let Some(remote) = self.ctx.remote() else {
            return WriteOutcome::LocalOnly;
        };
        let row = match history_row(entry) {
            Ok(row) => row,
            Err(e) => {
                warn!(log_id = entry.id.as_str(), error = %e, "cannot encode history row");
                return WriteOutcome::RemoteFailed(ErrorKind::RemoteRejected);
            }
        };
        match remote.insert(Table::HistoryLogs, row).await {
            Ok(()) => WriteOutcome::Replicated,
            Err(e) => {
                report(&e, "append history");
                WriteOutcome::RemoteFailed(e.kind())
            }
        }
    }

    /// Delete one audit entry.
    ///
    /// The local copy is always removed, whatever the remote outcome. In
    /// CLOUD mode the result is the remote outcome; in LOCAL mode it is
    /// whether a cached entry was removed.
    pub async fn delete_log(&self, logical_id: &str, physical_key: Option<&str>) -> bool {
        let remote_outcome = match self.ctx.remote() {
            Some(remote) => {
                let resolver =
                    DeletionResolver::new(remote, self.ctx.history_scan_limit(), self.ctx.recent_order());
                Some(resolver.run(logical_id, physical_key).await.is_success())
            }
            None => None,
        };

        let removed_locally = self.ctx.cache().remove_history(logical_id);
        remote_outcome.unwrap_or(removed_locally)
    }
}

fn report(e: &RemoteError, operation: &'static str) {
    error!(
        operation,
        table = e.table.as_str(),
        kind = %e.kind(),
        code = ?e.code,
        error = %e.message,
        "{}",
        e.kind().remediation()
    );
}
