//! Turns an audit-log deletion request into exactly one
//! remote delete by physical row key.
//!
//! ```text
//! ResolvingKey ──► Deleting ──► Succeeded
//!      │              │
//!      └──────────────┴──────► Failed
//! ```
//!
//! A caller-supplied row key skips resolution. Otherwise the key is looked up
//! with an embedded-field filter and, when that filter fails or returns no
//! matching row, by scanning a bounded window of the most recent rows. The scan only
//! discovers the key; the delete itself always targets a single key.

use std::collections::BTreeSet;
use std::fmt;

use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::error::{ErrorKind, RemoteError};
use crate::remote::rows::{row_key, row_matches_logical_id, KEY_FIELD, LOGICAL_ID_FIELD};
use crate::remote::RemoteStore;
use crate::types::Table;

// ============================================================================
// States
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum DeletionState {
    ResolvingKey,
    Deleting { key: String },
    Succeeded { key: String },
    Failed(DeletionFailure),
}

impl DeletionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DeletionState::Succeeded { .. } | DeletionState::Failed(_))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, DeletionState::Succeeded { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeletionFailure {
    /// No row with the logical id was found within the scan window.
    NotFound,
    /// More than one row claims the logical id; refusing to pick one.
    Ambiguous { keys: Vec<String> },
    /// The delete ran but removed nothing.
    NoRowsAffected { key: String },
    /// The delete removed more than one row.
    UnexpectedRowCount { key: String, count: usize },
    Remote(RemoteError),
}

impl DeletionFailure {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DeletionFailure::NotFound | DeletionFailure::NoRowsAffected { .. } => ErrorKind::DeletionNotFound,
            DeletionFailure::Ambiguous { .. } | DeletionFailure::UnexpectedRowCount { .. } => {
                ErrorKind::RemoteRejected
            }
            DeletionFailure::Remote(e) => e.kind(),
        }
    }
}

impl fmt::Display for DeletionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeletionFailure::NotFound => write!(f, "not found"),
            DeletionFailure::Ambiguous { keys } => {
                write!(f, "ambiguous: {} rows share the id ({})", keys.len(), keys.join(", "))
            }
            DeletionFailure::NoRowsAffected { key } => write!(f, "no rows affected deleting key {key}"),
            DeletionFailure::UnexpectedRowCount { key, count } => {
                write!(f, "{count} rows affected deleting key {key}")
            }
            DeletionFailure::Remote(e) => write!(f, "{e}"),
        }
    }
}

// ============================================================================
// DeletionResolver
// ============================================================================

pub struct DeletionResolver<'a> {
    remote: &'a dyn RemoteStore,
    scan_limit: usize,
    recent_order: &'a str,
}

impl<'a> DeletionResolver<'a> {
    pub fn new(remote: &'a dyn RemoteStore, scan_limit: usize, recent_order: &'a str) -> Self {
        Self {
            remote,
            scan_limit: scan_limit.max(1),
            recent_order,
        }
    }

    /// Run the protocol to a terminal state.
    pub async fn run(&self, logical_id: &str, physical_key: Option<&str>) -> DeletionState {
        let physical_key = physical_key.filter(|k| !k.is_empty());
        let mut state = DeletionState::ResolvingKey;
        while !state.is_terminal() {
            state = self.step(state, logical_id, physical_key).await;
        }

        match &state {
            DeletionState::Succeeded { key } => {
                info!(log_id = logical_id, key = key.as_str(), "audit row deleted");
            }
            DeletionState::Failed(DeletionFailure::NoRowsAffected { key }) => {
                let kind = ErrorKind::DeletionNotFound;
                warn!(log_id = logical_id, key = key.as_str(), kind = %kind, "{}", kind.remediation());
            }
            DeletionState::Failed(failure) => {
                error!(log_id = logical_id, kind = %failure.kind(), reason = %failure, "audit row deletion failed");
            }
            _ => {}
        }
        state
    }

    async fn step(&self, state: DeletionState, logical_id: &str, physical_key: Option<&str>) -> DeletionState {
        match state {
            DeletionState::ResolvingKey => {
                let resolved = match physical_key {
                    Some(key) => Ok(key.to_string()),
                    None => self.resolve_key(logical_id).await,
                };
                match resolved {
                    Ok(key) => DeletionState::Deleting { key },
                    Err(failure) => DeletionState::Failed(failure),
                }
            }
            DeletionState::Deleting { key } => {
                match self.remote.delete_by_key(Table::HistoryLogs, KEY_FIELD, &key).await {
                    Ok(0) => DeletionState::Failed(DeletionFailure::NoRowsAffected { key }),
                    Ok(1) => DeletionState::Succeeded { key },
                    Ok(count) => DeletionState::Failed(DeletionFailure::UnexpectedRowCount { key, count }),
                    Err(e) => DeletionState::Failed(DeletionFailure::Remote(e)),
                }
            }
            terminal => terminal,
        }
    }

    async fn resolve_key(&self, logical_id: &str) -> Result<String, DeletionFailure> {
        match self
            .remote
            .select_where_embedded_eq(Table::HistoryLogs, LOGICAL_ID_FIELD, logical_id)
            .await
        {
            Ok(rows) => match single_key(&rows, logical_id) {
                Err(DeletionFailure::NotFound) => debug!(
                    log_id = logical_id,
                    returned = rows.len(),
                    "embedded-field filter found no matching row; scanning recent rows"
                ),
                resolved => return resolved,
            },
            Err(e) => debug!(
                log_id = logical_id,
                kind = %e.kind(),
                error = %e,
                "embedded-field filter failed; scanning recent rows"
            ),
        }

        let rows = self
            .remote
            .select_recent(Table::HistoryLogs, self.recent_order, self.scan_limit)
            .await
            .map_err(DeletionFailure::Remote)?;
        single_key(&rows, logical_id)
    }
}

/// The one distinct row key among `rows` storing `logical_id`.
fn single_key(rows: &[Value], logical_id: &str) -> Result<String, DeletionFailure> {
    let keys: BTreeSet<String> = rows
        .iter()
        .filter(|row| row_matches_logical_id(row, logical_id))
        .filter_map(row_key)
        .collect();
    let mut keys = keys.into_iter();
    match (keys.next(), keys.next()) {
        (None, _) => Err(DeletionFailure::NotFound),
        (Some(key), None) => Ok(key),
        (Some(first), Some(second)) => {
            let mut all = vec![first, second];
            all.extend(keys);
            Err(DeletionFailure::Ambiguous { keys: all })
        }
    }
}
