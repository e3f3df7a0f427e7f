use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Enumerations
// ============================================================================

/// Known yard and line positions a vehicle can occupy.
///
/// Serialized with the labels used on the depot boards, which are also the
/// values already persisted in existing caches and remote rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Location {
    #[serde(rename = "PAT")]
    Pat,
    #[serde(rename = "ETC 5")]
    Etc5,
    #[serde(rename = "ETC 6")]
    Etc6,
    #[serde(rename = "ETC 7")]
    Etc7,
    #[serde(rename = "ECL 3")]
    Ecl3,
    #[serde(rename = "ECL 4")]
    Ecl4,
    #[serde(rename = "PIT")]
    Pit,
    #[serde(rename = "PTI")]
    Pti,
    #[serde(rename = "Ramal 5")]
    Ramal5,
    #[serde(rename = "Ramal 6")]
    Ramal6,
    #[serde(rename = "TM 02 de LUZ")]
    Tm02Luz,
    #[serde(rename = "TM 02 de ANR")]
    Tm02Anr,
    #[serde(rename = "Oficina")]
    Oficina,
}

impl Location {
    pub const ALL: [Location; 13] = [
        Location::Pat,
        Location::Etc5,
        Location::Etc6,
        Location::Etc7,
        Location::Ecl3,
        Location::Ecl4,
        Location::Pit,
        Location::Pti,
        Location::Ramal5,
        Location::Ramal6,
        Location::Tm02Luz,
        Location::Tm02Anr,
        Location::Oficina,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Location::Pat => "PAT",
            Location::Etc5 => "ETC 5",
            Location::Etc6 => "ETC 6",
            Location::Etc7 => "ETC 7",
            Location::Ecl3 => "ECL 3",
            Location::Ecl4 => "ECL 4",
            Location::Pit => "PIT",
            Location::Pti => "PTI",
            Location::Ramal5 => "Ramal 5",
            Location::Ramal6 => "Ramal 6",
            Location::Tm02Luz => "TM 02 de LUZ",
            Location::Tm02Anr => "TM 02 de ANR",
            Location::Oficina => "Oficina",
        }
    }

    pub fn from_label(label: &str) -> Option<Location> {
        Location::ALL.into_iter().find(|l| l.label() == label)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VehicleStatus {
    #[serde(rename = "Em Operação")]
    Operating,
    #[serde(rename = "Manutenção")]
    Maintenance,
}

impl fmt::Display for VehicleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VehicleStatus::Operating => f.write_str("Em Operação"),
            VehicleStatus::Maintenance => f.write_str("Manutenção"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    LocationUpdate,
    StatusChange,
}

/// Which stores the coordinator talks to. Decided once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DataMode {
    Local,
    Cloud,
}

impl fmt::Display for DataMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataMode::Local => f.write_str("LOCAL"),
            DataMode::Cloud => f.write_str("CLOUD"),
        }
    }
}

/// Remote tables known to the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Vehicles,
    HistoryLogs,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Vehicles => "vehicles",
            Table::HistoryLogs => "history_logs",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Records
// ============================================================================

/// Current state of one vehicle. Never hard-deleted, only overwritten whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleRecord {
    /// Human-assigned identifier, e.g. `"TM 01"`.
    pub id: String,
    pub current_location: Location,
    #[serde(default)]
    pub last_location: Option<Location>,
    #[serde(default)]
    pub operator: String,
    /// Badge id of the operator who made the last change.
    #[serde(default)]
    pub registration: String,
    pub status: VehicleStatus,
    pub last_update: DateTime<Utc>,
}

impl VehicleRecord {
    /// A vehicle in operation at `location` with no operator recorded.
    pub fn new(id: impl Into<String>, location: Location) -> Self {
        Self {
            id: id.into(),
            current_location: location,
            last_location: None,
            operator: String::new(),
            registration: String::new(),
            status: VehicleStatus::Operating,
            last_update: Utc::now(),
        }
    }
}

/// One append-only audit entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryLogEntry {
    /// Logical identifier, generated at creation time.
    pub id: String,
    pub vehicle_id: String,
    #[serde(default)]
    pub previous_location: Option<Location>,
    pub new_location: Location,
    #[serde(default)]
    pub operator: String,
    pub timestamp: DateTime<Utc>,
    pub action_type: ActionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration: Option<String>,
    /// Backend row key, present only on entries read back from the remote store.
    #[serde(skip)]
    pub physical_key: Option<String>,
}

impl HistoryLogEntry {
    /// New entry with a fresh UUID and the current time.
    pub fn new(
        vehicle_id: impl Into<String>,
        previous_location: Option<Location>,
        new_location: Location,
        operator: impl Into<String>,
        action_type: ActionType,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            vehicle_id: vehicle_id.into(),
            previous_location,
            new_location,
            operator: operator.into(),
            timestamp: Utc::now(),
            action_type,
            details: None,
            registration: None,
            physical_key: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_registration(mut self, registration: impl Into<String>) -> Self {
        self.registration = Some(registration.into());
        self
    }
}

// ============================================================================
// Tests
// ============================================================================
