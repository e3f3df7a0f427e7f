//! RefreshScheduler tests on paused tokio time.

use std::sync::Arc;
use std::time::Duration;

use fleet_sync::error::ErrorKind;
use fleet_sync::remote::rows::{history_row, vehicle_row};
use fleet_sync::remote::{MemoryRemote, RemoteOp, RemoteStore};
use fleet_sync::seed::SeedRegistry;
use fleet_sync::storage::LocalCache;
use fleet_sync::sync::{RefreshScheduler, SyncContext, SyncCoordinator};
use fleet_sync::types::Table;
use fleet_sync::{ActionType, HistoryLogEntry, Location, VehicleRecord};

const PERIOD: Duration = Duration::from_secs(30);

fn seeds() -> SeedRegistry {
    SeedRegistry::new(vec![VehicleRecord::new("TM 01", Location::Oficina)]).with_retired(["TV 01"])
}

fn cloud() -> (Arc<SyncCoordinator>, Arc<MemoryRemote>) {
    let remote = Arc::new(MemoryRemote::new());
    let ctx = SyncContext::cloud(LocalCache::in_memory(), remote.clone() as Arc<dyn RemoteStore>, seeds());
    (Arc::new(SyncCoordinator::new(Arc::new(ctx))), remote)
}

#[tokio::test(start_paused = true)]
async fn local_mode_never_polls() {
    let ctx = SyncContext::local(LocalCache::in_memory(), seeds());
    let scheduler = RefreshScheduler::start(Arc::new(SyncCoordinator::new(Arc::new(ctx))), PERIOD);

    assert!(!scheduler.is_running());
    tokio::time::sleep(PERIOD * 4).await;
    assert_eq!(scheduler.refresh_count(), 0);
    assert!(scheduler.latest().is_none());
}

#[tokio::test(start_paused = true)]
async fn first_refresh_lands_after_one_period() {
    let (coordinator, remote) = cloud();
    let scheduler = RefreshScheduler::start(coordinator, PERIOD);
    assert!(scheduler.is_running());

    tokio::time::sleep(PERIOD - Duration::from_secs(1)).await;
    assert_eq!(scheduler.refresh_count(), 0);
    assert_eq!(remote.call_count(Table::Vehicles, RemoteOp::SelectAll), 0);

    let mut rx = scheduler.subscribe();
    rx.changed().await.unwrap();

    assert_eq!(scheduler.refresh_count(), 1);
    let snapshot = scheduler.latest().unwrap();
    assert_eq!(snapshot.vehicles.len(), 1);
    assert!(snapshot.history.is_empty());
}

#[tokio::test(start_paused = true)]
async fn snapshots_follow_other_clients() {
    let (coordinator, remote) = cloud();
    remote.put_rows(
        Table::Vehicles,
        vec![
            vehicle_row(&VehicleRecord::new("TM 01", Location::Pit)).unwrap(),
            vehicle_row(&VehicleRecord::new("TV 01", Location::Pat)).unwrap(),
        ],
    );
    let scheduler = RefreshScheduler::start(coordinator, PERIOD);
    let mut rx = scheduler.subscribe();

    rx.changed().await.unwrap();
    let first = scheduler.latest().unwrap();
    let ids: Vec<_> = first.vehicles.iter().map(|v| v.id.as_str()).collect();
    assert_eq!(ids, vec!["TM 01"]);
    assert_eq!(first.vehicles[0].current_location, Location::Pit);

    // Another client records a move in the meantime.
    let e = HistoryLogEntry::new("TM 01", Some(Location::Pit), Location::Pti, "Rui", ActionType::LocationUpdate);
    remote.put_rows(Table::HistoryLogs, vec![history_row(&e).unwrap()]);

    rx.changed().await.unwrap();
    let second = scheduler.latest().unwrap();
    assert_eq!(second.history.len(), 1);
    assert_eq!(second.history[0].id, e.id);
    assert!(second.taken_at >= first.taken_at);
}

#[tokio::test(start_paused = true)]
async fn remote_outage_publishes_local_snapshot() {
    let (coordinator, remote) = cloud();
    coordinator.context().cache().set_vehicles(&[VehicleRecord::new("TM 01", Location::Etc5)]);
    remote.fail(Table::Vehicles, RemoteOp::SelectAll, ErrorKind::RemoteTransient);
    remote.fail(Table::HistoryLogs, RemoteOp::SelectAll, ErrorKind::RemoteTransient);

    let scheduler = RefreshScheduler::start(coordinator, PERIOD);
    let mut rx = scheduler.subscribe();
    rx.changed().await.unwrap();

    let snapshot = scheduler.latest().unwrap();
    assert_eq!(snapshot.vehicles[0].current_location, Location::Etc5);
}

#[tokio::test(start_paused = true)]
async fn dispose_stops_polling() {
    let (coordinator, remote) = cloud();
    let scheduler = RefreshScheduler::start(coordinator, PERIOD);
    let mut rx = scheduler.subscribe();
    rx.changed().await.unwrap();
    assert_eq!(scheduler.refresh_count(), 1);

    scheduler.dispose();
    assert!(!scheduler.is_running());

    tokio::time::sleep(PERIOD * 5).await;
    assert_eq!(scheduler.refresh_count(), 1);
    assert_eq!(remote.call_count(Table::Vehicles, RemoteOp::SelectAll), 1);
}
