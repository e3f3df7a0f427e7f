//! Operations exposed to presentation code.
//!
//! Thin layer over [`SyncCoordinator`]: hides retired vehicles and builds the
//! audit entry that accompanies every vehicle change.

use std::sync::Arc;

use chrono::Utc;
use tracing::warn;

use crate::config::FleetConfig;
use crate::seed::SeedRegistry;
use crate::storage::LocalCache;
use crate::sync::{RefreshScheduler, SyncContext, SyncCoordinator, WriteOutcome};
use crate::types::{ActionType, DataMode, HistoryLogEntry, Location, VehicleRecord, VehicleStatus};

/// A vehicle change together with the audit entry recorded for it.
#[derive(Debug, Clone, PartialEq)]
pub struct FleetChange {
    pub vehicle: VehicleRecord,
    pub entry: HistoryLogEntry,
    pub vehicle_write: WriteOutcome,
    pub log_write: WriteOutcome,
}

#[derive(Clone)]
pub struct FleetService {
    coordinator: Arc<SyncCoordinator>,
}

impl FleetService {
    pub fn new(ctx: SyncContext) -> Self {
        Self {
            coordinator: Arc::new(SyncCoordinator::new(Arc::new(ctx))),
        }
    }

    /// Open the cache, decide the mode and load the default fleet.
    pub fn from_config(config: &FleetConfig) -> Self {
        let cache = LocalCache::from_config(config);
        Self::new(SyncContext::init(config, cache, SeedRegistry::default_fleet()))
    }

    pub fn coordinator(&self) -> &Arc<SyncCoordinator> {
        &self.coordinator
    }

    pub fn current_mode(&self) -> DataMode {
        self.coordinator.mode()
    }

    // -----------------------------------------------------------------------
    // Reads and writes
    // -----------------------------------------------------------------------

    pub async fn get_vehicles(&self) -> Vec<VehicleRecord> {
        let seeds = self.coordinator.context().seeds();
        let mut vehicles = self.coordinator.read_vehicles().await;
        vehicles.retain(|v| !seeds.is_retired(&v.id));
        vehicles
    }

    pub async fn get_history(&self) -> Vec<HistoryLogEntry> {
        self.coordinator.read_history().await
    }

    pub async fn save_vehicle(&self, vehicle: &VehicleRecord) -> WriteOutcome {
        self.coordinator.write_vehicle(vehicle).await
    }

    pub async fn add_history_log(&self, entry: &HistoryLogEntry) -> WriteOutcome {
        self.coordinator.append_log(entry).await
    }

    pub async fn delete_history_log(&self, logical_id: &str, physical_key: Option<&str>) -> bool {
        self.coordinator.delete_log(logical_id, physical_key).await
    }

    // -----------------------------------------------------------------------
    // Domain actions
    // -----------------------------------------------------------------------

    /// Move a vehicle to `new_location` on behalf of `operator`.
    ///
    /// Returns `None` without writing anything if the vehicle is unknown.
    pub async fn relocate(
        &self,
        vehicle_id: &str,
        new_location: Location,
        operator: &str,
        registration: &str,
    ) -> Option<FleetChange> {
        let current = self.find_vehicle(vehicle_id).await?;

        let vehicle = VehicleRecord {
            last_location: Some(current.current_location),
            current_location: new_location,
            operator: operator.to_string(),
            registration: registration.to_string(),
            last_update: Utc::now(),
            ..current.clone()
        };
        let entry = HistoryLogEntry::new(
            vehicle_id,
            Some(current.current_location),
            new_location,
            operator,
            ActionType::LocationUpdate,
        )
        .with_details(format!("Registration: {registration}"))
        .with_registration(registration);

        Some(self.record(vehicle, entry).await)
    }

    /// Flip a vehicle between operation and maintenance.
    ///
    /// Entering maintenance sends the vehicle to the workshop and remembers
    /// where it was; leaving maintenance keeps it where it is.
    pub async fn toggle_status(&self, vehicle_id: &str, operator: &str) -> Option<FleetChange> {
        let current = self.find_vehicle(vehicle_id).await?;

        let mut vehicle = VehicleRecord {
            last_update: Utc::now(),
            ..current.clone()
        };
        let mut details = match current.status {
            VehicleStatus::Operating => {
                vehicle.status = VehicleStatus::Maintenance;
                vehicle.last_location = Some(current.current_location);
                vehicle.current_location = Location::Oficina;
                format!("Changed to {}", VehicleStatus::Maintenance)
            }
            VehicleStatus::Maintenance => {
                vehicle.status = VehicleStatus::Operating;
                format!("Changed to {}", VehicleStatus::Operating)
            }
        };
        if vehicle.status == VehicleStatus::Maintenance {
            details.push_str(&format!(" (moved to {})", Location::Oficina));
        }

        let entry = HistoryLogEntry::new(
            vehicle_id,
            Some(current.current_location),
            vehicle.current_location,
            operator,
            ActionType::StatusChange,
        )
        .with_details(details);

        Some(self.record(vehicle, entry).await)
    }

    /// Start the background refresh at the configured period.
    pub fn start_refresh(&self, config: &FleetConfig) -> RefreshScheduler {
        RefreshScheduler::start(self.coordinator.clone(), config.refresh_interval())
    }

    async fn find_vehicle(&self, vehicle_id: &str) -> Option<VehicleRecord> {
        let found = self
            .get_vehicles()
            .await
            .into_iter()
            .find(|v| v.id == vehicle_id);
        if found.is_none() {
            warn!(vehicle_id, "unknown vehicle; nothing recorded");
        }
        found
    }

    async fn record(&self, vehicle: VehicleRecord, entry: HistoryLogEntry) -> FleetChange {
        let vehicle_write = self.coordinator.write_vehicle(&vehicle).await;
        let log_write = self.coordinator.append_log(&entry).await;
        FleetChange {
            vehicle,
            entry,
            vehicle_write,
            log_write,
        }
    }
}
