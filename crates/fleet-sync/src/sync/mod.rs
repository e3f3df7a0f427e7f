pub mod context;
pub mod coordinator;
pub mod deletion;
pub mod scheduler;

pub use context::SyncContext;
pub use coordinator::{SyncCoordinator, WriteOutcome};
pub use deletion::{DeletionFailure, DeletionResolver, DeletionState};
pub use scheduler::{FleetSnapshot, RefreshScheduler};
