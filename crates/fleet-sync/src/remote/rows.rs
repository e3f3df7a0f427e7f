//! Row encoding for the remote tables.
//!
//! Entities travel as a whole-record JSON blob in a `data` column:
//!
//! - `vehicles`: `{ id, data }`, keyed by the vehicle id.
//! - `history_logs`: `{ id, vehicle_id, data }`, keyed by the entry's logical
//!   id. Rows written by older clients may carry a generated key that differs
//!   from `data.id`, or no `data.id` at all.

use serde_json::{json, Value};
use tracing::warn;

use crate::types::{HistoryLogEntry, Table, VehicleRecord};

/// Primary key column of both tables.
pub const KEY_FIELD: &str = "id";
/// Column holding the serialized entity.
pub const DATA_FIELD: &str = "data";
/// Field of the embedded payload that carries an entry's logical id.
pub const LOGICAL_ID_FIELD: &str = "id";

pub fn vehicle_row(vehicle: &VehicleRecord) -> Result<Value, serde_json::Error> {
    Ok(json!({
        KEY_FIELD: vehicle.id,
        DATA_FIELD: serde_json::to_value(vehicle)?,
    }))
}

pub fn history_row(entry: &HistoryLogEntry) -> Result<Value, serde_json::Error> {
    Ok(json!({
        KEY_FIELD: entry.id,
        "vehicle_id": entry.vehicle_id,
        DATA_FIELD: serde_json::to_value(entry)?,
    }))
}

/// The row's own key, rendered as text. Older generations used numeric keys.
pub fn row_key(row: &Value) -> Option<String> {
    match row.get(KEY_FIELD)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// The logical id embedded in the row's payload, if any.
pub fn row_logical_id(row: &Value) -> Option<String> {
    row.get(DATA_FIELD)?
        .get(LOGICAL_ID_FIELD)?
        .as_str()
        .map(str::to_string)
}

/// Every id the row is known by: its key and its payload id. Works on rows
/// whose payload does not decode.
pub fn row_ids(row: &Value) -> impl Iterator<Item = String> {
    row_key(row).into_iter().chain(row_logical_id(row))
}

/// Whether the row stores the entry with `logical_id`.
pub fn row_matches_logical_id(row: &Value, logical_id: &str) -> bool {
    match row_logical_id(row) {
        Some(id) => id == logical_id,
        None => row_key(row).as_deref() == Some(logical_id),
    }
}

pub fn decode_vehicle(row: &Value) -> Option<VehicleRecord> {
    let data = row.get(DATA_FIELD)?;
    match serde_json::from_value(data.clone()) {
        Ok(vehicle) => Some(vehicle),
        Err(e) => {
            warn!(table = %Table::Vehicles, key = ?row_key(row), error = %e, "skipping undecodable row");
            None
        }
    }
}

/// Decode an audit row. The physical key is always the row key; the logical
/// id comes from the payload and falls back to the row key.
pub fn decode_history(row: &Value) -> Option<HistoryLogEntry> {
    let key = row_key(row);
    let mut data = row.get(DATA_FIELD)?.clone();
    if let (Some(obj), Some(key)) = (data.as_object_mut(), key.as_ref()) {
        obj.entry(LOGICAL_ID_FIELD)
            .or_insert_with(|| Value::String(key.clone()));
    }
    match serde_json::from_value::<HistoryLogEntry>(data) {
        Ok(mut entry) => {
            entry.physical_key = key;
            Some(entry)
        }
        Err(e) => {
            warn!(table = %Table::HistoryLogs, key = ?key, error = %e, "skipping undecodable row");
            None
        }
    }
}
