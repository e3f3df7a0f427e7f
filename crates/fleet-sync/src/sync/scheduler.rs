//! Periodic background refetch of fleet state.
//!
//! Only polls in CLOUD mode; in LOCAL mode nobody else can change the data.
//! Each cycle publishes a [`FleetSnapshot`] on a watch channel. A refresh can
//! land after an optimistic local write and briefly show older remote state;
//! the next cycle converges.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::types::{DataMode, HistoryLogEntry, VehicleRecord};

use super::coordinator::SyncCoordinator;

#[derive(Debug, Clone)]
pub struct FleetSnapshot {
    pub vehicles: Vec<VehicleRecord>,
    pub history: Vec<HistoryLogEntry>,
    pub taken_at: DateTime<Utc>,
}

type SnapshotSlot = Option<Arc<FleetSnapshot>>;

pub struct RefreshScheduler {
    disposed: Arc<AtomicBool>,
    refreshes: Arc<AtomicUsize>,
    snapshots: watch::Receiver<SnapshotSlot>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl RefreshScheduler {
    /// Start polling every `period`. The first refresh happens one period
    /// after start; the initial load is the caller's.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(coordinator: Arc<SyncCoordinator>, period: Duration) -> Self {
        let (tx, rx) = watch::channel(None);
        let disposed = Arc::new(AtomicBool::new(false));
        let refreshes = Arc::new(AtomicUsize::new(0));

        let task = match coordinator.mode() {
            DataMode::Cloud => Some(tokio::spawn(poll(
                coordinator,
                period,
                tx,
                disposed.clone(),
                refreshes.clone(),
            ))),
            DataMode::Local => {
                debug!("LOCAL mode; background refresh disabled");
                None
            }
        };

        Self {
            disposed,
            refreshes,
            snapshots: rx,
            task: Mutex::new(task),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SnapshotSlot> {
        self.snapshots.clone()
    }

    pub fn latest(&self) -> SnapshotSlot {
        self.snapshots.borrow().clone()
    }

    /// Completed refresh cycles.
    pub fn refresh_count(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        !self.disposed.load(Ordering::SeqCst) && self.task.lock().is_some()
    }

    /// Stop polling. An in-flight refresh is abandoned.
    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
        if let Some(handle) = self.task.lock().take() {
            handle.abort();
        }
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.dispose();
    }
}

async fn poll(
    coordinator: Arc<SyncCoordinator>,
    period: Duration,
    tx: watch::Sender<SnapshotSlot>,
    disposed: Arc<AtomicBool>,
    refreshes: Arc<AtomicUsize>,
) {
    let mut ticker = tokio::time::interval(period.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        if disposed.load(Ordering::SeqCst) {
            break;
        }

        let seeds = coordinator.context().seeds();
        let mut vehicles = coordinator.read_vehicles().await;
        vehicles.retain(|v| !seeds.is_retired(&v.id));
        let history = coordinator.read_history().await;
        debug!(vehicles = vehicles.len(), history = history.len(), "background refresh complete");

        refreshes.fetch_add(1, Ordering::SeqCst);
        tx.send_replace(Some(Arc::new(FleetSnapshot {
            vehicles,
            history,
            taken_at: Utc::now(),
        })));
    }
}
