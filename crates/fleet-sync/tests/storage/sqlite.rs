//! SqliteBackend and the file-backed LocalCache.

use fleet_sync::storage::{KeyValueBackend, LocalCache, SqliteBackend};
use fleet_sync::{FleetConfig, Location, VehicleRecord};

#[test]
fn in_memory_get_set() {
    let backend = SqliteBackend::open_in_memory().expect("open in-memory DB");
    assert_eq!(backend.get("k").unwrap(), None);
    backend.set("k", "one").unwrap();
    backend.set("k", "two").unwrap();
    assert_eq!(backend.get("k").unwrap().as_deref(), Some("two"));
}

#[test]
fn file_backend_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.db");

    {
        let backend = SqliteBackend::open(&path).unwrap();
        backend.set("metro_vehicles", "[]").unwrap();
    }

    let backend = SqliteBackend::open(&path).unwrap();
    assert_eq!(backend.get("metro_vehicles").unwrap().as_deref(), Some("[]"));
}

#[test]
fn cache_from_config_persists_collections() {
    let dir = tempfile::tempdir().unwrap();
    let config = FleetConfig {
        cache_path: Some(dir.path().join("fleet.db")),
        ..FleetConfig::default()
    };

    LocalCache::from_config(&config).upsert_vehicle(&VehicleRecord::new("TM 03", Location::Ecl3));

    let reopened = LocalCache::from_config(&config);
    let vehicles = reopened.vehicles();
    assert_eq!(vehicles.len(), 1);
    assert_eq!(vehicles[0].current_location, Location::Ecl3);
}

#[test]
fn unopenable_path_falls_back_to_memory() {
    let dir = tempfile::tempdir().unwrap();
    let config = FleetConfig {
        cache_path: Some(dir.path().join("missing").join("fleet.db")),
        ..FleetConfig::default()
    };

    let cache = LocalCache::from_config(&config);
    cache.set("k", "v");
    assert_eq!(cache.get("k").as_deref(), Some("v"));
}
