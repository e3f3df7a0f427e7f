pub mod error;
pub mod types;

pub mod config;
pub mod fleet;
pub mod remote;
pub mod seed;
pub mod storage;
pub mod sync;

pub use config::{FleetConfig, RemoteConfig};
pub use error::{ErrorKind, FleetError, Result};
pub use fleet::{FleetChange, FleetService};
pub use types::{ActionType, DataMode, HistoryLogEntry, Location, VehicleRecord, VehicleStatus};
