//! DeletionResolver tests: key-first deletion, the bounded scan fallback and
//! every failure state.

use chrono::{TimeZone, Utc};
use fleet_sync::error::ErrorKind;
use fleet_sync::remote::rows::history_row;
use fleet_sync::remote::{MemoryRemote, RemoteOp};
use fleet_sync::sync::{DeletionFailure, DeletionResolver, DeletionState};
use fleet_sync::types::Table;
use fleet_sync::{ActionType, HistoryLogEntry, Location};
use serde_json::{json, Value};
use tracing_test::traced_test;

const ORDER: &str = "data->>timestamp";

// ============================================================================
// Helpers
// ============================================================================

/// An entry stamped `day` days into 2024.
fn entry_on(day: u32) -> HistoryLogEntry {
    let mut e = HistoryLogEntry::new("TM 01", Some(Location::Oficina), Location::Pat, "Ana", ActionType::LocationUpdate);
    e.timestamp = Utc.with_ymd_and_hms(2024, 1, day, 8, 0, 0).unwrap();
    e
}

/// A row written by an older client: numeric key, logical id only in `data`.
fn legacy_row(key: i64, e: &HistoryLogEntry) -> Value {
    json!({"id": key, "vehicle_id": e.vehicle_id, "data": serde_json::to_value(e).unwrap()})
}

fn remote_with(rows: Vec<Value>) -> MemoryRemote {
    let remote = MemoryRemote::new();
    remote.put_rows(Table::HistoryLogs, rows);
    remote
}

fn remaining_keys(remote: &MemoryRemote) -> Vec<String> {
    remote
        .rows(Table::HistoryLogs)
        .iter()
        .map(|r| match &r["id"] {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect()
}

// ============================================================================
// Key-first
// ============================================================================

#[tokio::test]
async fn known_key_skips_resolution() {
    let target = entry_on(1);
    let remote = remote_with(vec![history_row(&target).unwrap(), history_row(&entry_on(2)).unwrap()]);

    let state = DeletionResolver::new(&remote, 200, ORDER).run(&target.id, Some(&target.id)).await;

    assert_eq!(state, DeletionState::Succeeded { key: target.id.clone() });
    assert_eq!(remote.call_count(Table::HistoryLogs, RemoteOp::SelectEmbedded), 0);
    assert_eq!(remote.call_count(Table::HistoryLogs, RemoteOp::SelectRecent), 0);
    assert_eq!(remote.call_count(Table::HistoryLogs, RemoteOp::DeleteByKey), 1);
    assert_eq!(remote.rows(Table::HistoryLogs).len(), 1);
}

#[tokio::test]
async fn empty_key_is_treated_as_missing() {
    let target = entry_on(1);
    let remote = remote_with(vec![history_row(&target).unwrap()]);

    let state = DeletionResolver::new(&remote, 200, ORDER).run(&target.id, Some("")).await;

    assert!(state.is_success());
    assert_eq!(remote.call_count(Table::HistoryLogs, RemoteOp::SelectEmbedded), 1);
}

// ============================================================================
// Resolution
// ============================================================================

#[tokio::test]
async fn embedded_filter_finds_legacy_key() {
    let target = entry_on(3);
    let other = entry_on(4);
    let remote = remote_with(vec![legacy_row(17, &target), legacy_row(18, &other)]);

    let state = DeletionResolver::new(&remote, 200, ORDER).run(&target.id, None).await;

    assert_eq!(state, DeletionState::Succeeded { key: "17".to_string() });
    assert_eq!(remaining_keys(&remote), vec!["18"]);
    assert_eq!(remote.call_count(Table::HistoryLogs, RemoteOp::SelectRecent), 0);
}

#[tokio::test]
async fn unreliable_embedded_filter_falls_back_to_scan() {
    let target = entry_on(3);
    let remote = remote_with(vec![legacy_row(17, &target), legacy_row(18, &entry_on(4))]);
    remote.set_embedded_unreliable(true);

    let state = DeletionResolver::new(&remote, 200, ORDER).run(&target.id, None).await;

    assert_eq!(state, DeletionState::Succeeded { key: "17".to_string() });
    assert_eq!(remote.call_count(Table::HistoryLogs, RemoteOp::SelectRecent), 1);
    assert_eq!(remote.call_count(Table::HistoryLogs, RemoteOp::DeleteByKey), 1);
    assert_eq!(remaining_keys(&remote), vec!["18"]);
}

#[tokio::test]
async fn misapplied_embedded_filter_falls_back_to_scan() {
    let target = entry_on(3);
    let other = entry_on(4);
    let remote = remote_with(vec![legacy_row(17, &target), legacy_row(18, &other)]);
    // The filter answers with a row that does not hold the id.
    remote.set_embedded_result(Some(vec![legacy_row(18, &other)]));

    let state = DeletionResolver::new(&remote, 200, ORDER).run(&target.id, None).await;

    assert_eq!(state, DeletionState::Succeeded { key: "17".to_string() });
    assert_eq!(
        remote.calls(),
        vec![
            (Table::HistoryLogs, RemoteOp::SelectEmbedded),
            (Table::HistoryLogs, RemoteOp::SelectRecent),
            (Table::HistoryLogs, RemoteOp::DeleteByKey),
        ]
    );
    assert_eq!(remaining_keys(&remote), vec!["18"]);
}

#[tokio::test]
async fn ambiguous_filter_result_is_not_rescanned() {
    let target = entry_on(3);
    let remote = remote_with(vec![legacy_row(7, &target)]);
    remote.set_embedded_result(Some(vec![legacy_row(7, &target), legacy_row(8, &target)]));

    let state = DeletionResolver::new(&remote, 200, ORDER).run(&target.id, None).await;

    assert!(matches!(state, DeletionState::Failed(DeletionFailure::Ambiguous { .. })));
    assert_eq!(remote.calls(), vec![(Table::HistoryLogs, RemoteOp::SelectEmbedded)]);
}

#[tokio::test]
async fn row_without_embedded_id_matches_by_key() {
    let target = entry_on(2);
    let mut row = history_row(&target).unwrap();
    row["data"].as_object_mut().unwrap().remove("id");
    let remote = remote_with(vec![row]);

    // The embedded filter cannot see it; the scan matches the row key.
    let state = DeletionResolver::new(&remote, 200, ORDER).run(&target.id, None).await;

    assert_eq!(state, DeletionState::Succeeded { key: target.id.clone() });
    assert_eq!(remote.call_count(Table::HistoryLogs, RemoteOp::SelectRecent), 1);
}

#[tokio::test]
async fn row_outside_scan_window_is_not_found() {
    let oldest = entry_on(1);
    let remote = remote_with(vec![
        legacy_row(1, &oldest),
        legacy_row(2, &entry_on(2)),
        legacy_row(3, &entry_on(3)),
    ]);
    remote.set_embedded_unreliable(true);

    let state = DeletionResolver::new(&remote, 2, ORDER).run(&oldest.id, None).await;

    assert_eq!(state, DeletionState::Failed(DeletionFailure::NotFound));
    assert_eq!(remote.call_count(Table::HistoryLogs, RemoteOp::DeleteByKey), 0);
    assert_eq!(remote.rows(Table::HistoryLogs).len(), 3);
}

#[tokio::test]
async fn duplicate_logical_ids_are_refused() {
    let target = entry_on(5);
    let remote = remote_with(vec![legacy_row(7, &target), legacy_row(8, &target)]);

    let state = DeletionResolver::new(&remote, 200, ORDER).run(&target.id, None).await;

    match state {
        DeletionState::Failed(DeletionFailure::Ambiguous { keys }) => assert_eq!(keys, vec!["7", "8"]),
        other => panic!("expected ambiguous failure, got {other:?}"),
    }
    assert_eq!(remote.call_count(Table::HistoryLogs, RemoteOp::DeleteByKey), 0);
    assert_eq!(remote.rows(Table::HistoryLogs).len(), 2);
}

#[tokio::test]
async fn scan_failure_is_a_remote_failure() {
    let remote = remote_with(Vec::new());
    remote.set_embedded_unreliable(true);
    remote.fail(Table::HistoryLogs, RemoteOp::SelectRecent, ErrorKind::RemoteTransient);

    let state = DeletionResolver::new(&remote, 200, ORDER).run("any", None).await;

    match state {
        DeletionState::Failed(failure) => assert_eq!(failure.kind(), ErrorKind::RemoteTransient),
        other => panic!("expected failure, got {other:?}"),
    }
}

// ============================================================================
// Deleting
// ============================================================================

#[tokio::test]
#[traced_test]
async fn silent_policy_block_is_reported() {
    let target = entry_on(1);
    let remote = remote_with(vec![history_row(&target).unwrap()]);
    remote.set_deletes_blocked(true);

    let state = DeletionResolver::new(&remote, 200, ORDER).run(&target.id, Some(&target.id)).await;

    assert_eq!(
        state,
        DeletionState::Failed(DeletionFailure::NoRowsAffected { key: target.id.clone() })
    );
    assert_eq!(remote.rows(Table::HistoryLogs).len(), 1);
    assert!(logs_contain("deletion_not_found"));
    assert!(logs_contain("delete policy"));
}

#[tokio::test]
async fn stale_key_affects_no_rows() {
    let remote = remote_with(Vec::new());

    let state = DeletionResolver::new(&remote, 200, ORDER).run("gone", Some("gone")).await;

    match state {
        DeletionState::Failed(failure) => assert_eq!(failure.kind(), ErrorKind::DeletionNotFound),
        other => panic!("expected failure, got {other:?}"),
    }
}

#[tokio::test]
async fn multi_row_delete_is_a_failure() {
    let e = entry_on(1);
    // Two rows sharing a key can only exist in a table without a primary key.
    let remote = remote_with(vec![history_row(&e).unwrap(), history_row(&e).unwrap()]);

    let state = DeletionResolver::new(&remote, 200, ORDER).run(&e.id, Some(&e.id)).await;

    assert_eq!(
        state,
        DeletionState::Failed(DeletionFailure::UnexpectedRowCount { key: e.id.clone(), count: 2 })
    );
}

#[tokio::test]
async fn delete_error_keeps_its_kind() {
    let e = entry_on(1);
    let remote = remote_with(vec![history_row(&e).unwrap()]);
    remote.fail(Table::HistoryLogs, RemoteOp::DeleteByKey, ErrorKind::RemoteAccessDenied);

    let state = DeletionResolver::new(&remote, 200, ORDER).run(&e.id, Some(&e.id)).await;

    match state {
        DeletionState::Failed(failure) => assert_eq!(failure.kind(), ErrorKind::RemoteAccessDenied),
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(remote.rows(Table::HistoryLogs).len(), 1);
}

#[test]
fn terminal_states() {
    assert!(!DeletionState::ResolvingKey.is_terminal());
    assert!(!DeletionState::Deleting { key: "k".into() }.is_terminal());
    assert!(DeletionState::Succeeded { key: "k".into() }.is_terminal());
    assert!(DeletionState::Failed(DeletionFailure::NotFound).is_terminal());
    assert!(!DeletionState::Failed(DeletionFailure::NotFound).is_success());
}
