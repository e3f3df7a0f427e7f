//! In-process `RemoteStore`.
//!
//! Behaves like a small PostgREST table set and can be told to fail any
//! operation with a chosen [`ErrorKind`], to reject or misapply
//! embedded-field filters, or to silently skip deletes the way a restrictive
//! row policy does.

use std::cmp::Ordering as CmpOrdering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::error::{ErrorKind, RemoteError};
use crate::types::Table;

use super::rows::{row_key, DATA_FIELD};
use super::traits::RemoteStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteOp {
    SelectAll,
    Upsert,
    Insert,
    DeleteByKey,
    SelectEmbedded,
    SelectRecent,
}

#[derive(Default)]
pub struct MemoryRemote {
    tables: Mutex<HashMap<Table, Vec<Value>>>,
    failures: Mutex<HashMap<(Table, RemoteOp), ErrorKind>>,
    calls: Mutex<Vec<(Table, RemoteOp)>>,
    embedded_unreliable: AtomicBool,
    embedded_override: Mutex<Option<Vec<Value>>>,
    deletes_blocked: AtomicBool,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `op` on `table` fail with `kind` until cleared.
    pub fn fail(&self, table: Table, op: RemoteOp, kind: ErrorKind) {
        self.failures.lock().insert((table, op), kind);
    }

    pub fn clear_failures(&self) {
        self.failures.lock().clear();
    }

    /// Reject filters on embedded fields, as some backends do.
    pub fn set_embedded_unreliable(&self, unreliable: bool) {
        self.embedded_unreliable.store(unreliable, Ordering::SeqCst);
    }

    /// Answer every embedded-field query with `rows`, ignoring the filter.
    /// `None` restores normal filtering.
    pub fn set_embedded_result(&self, rows: Option<Vec<Value>>) {
        *self.embedded_override.lock() = rows;
    }

    /// Report zero affected rows for every delete without removing anything.
    pub fn set_deletes_blocked(&self, blocked: bool) {
        self.deletes_blocked.store(blocked, Ordering::SeqCst);
    }

    pub fn rows(&self, table: Table) -> Vec<Value> {
        self.tables.lock().get(&table).cloned().unwrap_or_default()
    }

    pub fn put_rows(&self, table: Table, rows: Vec<Value>) {
        self.tables.lock().insert(table, rows);
    }

    pub fn calls(&self) -> Vec<(Table, RemoteOp)> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self, table: Table, op: RemoteOp) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|(t, o)| *t == table && *o == op)
            .count()
    }

    fn enter(&self, table: Table, op: RemoteOp) -> Result<(), RemoteError> {
        self.calls.lock().push((table, op));
        match self.failures.lock().get(&(table, op)) {
            Some(kind) => Err(RemoteError::new(
                *kind,
                table.as_str(),
                format!("injected {op:?} failure"),
            )),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    async fn select_all(&self, table: Table) -> Result<Vec<Value>, RemoteError> {
        self.enter(table, RemoteOp::SelectAll)?;
        Ok(self.rows(table))
    }

    async fn upsert(&self, table: Table, row: Value, key_field: &str) -> Result<(), RemoteError> {
        self.enter(table, RemoteOp::Upsert)?;
        let key = row.get(key_field).cloned();
        let mut tables = self.tables.lock();
        let rows = tables.entry(table).or_default();
        match rows.iter_mut().find(|r| key.is_some() && r.get(key_field) == key.as_ref()) {
            Some(existing) => *existing = row,
            None => rows.push(row),
        }
        Ok(())
    }

    async fn insert(&self, table: Table, row: Value) -> Result<(), RemoteError> {
        self.enter(table, RemoteOp::Insert)?;
        let mut tables = self.tables.lock();
        let rows = tables.entry(table).or_default();
        if let Some(key) = row_key(&row) {
            if rows.iter().any(|r| row_key(r).as_deref() == Some(key.as_str())) {
                return Err(RemoteError::new(
                    ErrorKind::RemoteRejected,
                    table.as_str(),
                    format!("duplicate key value violates unique constraint: {key}"),
                )
                .with_code("23505"));
            }
        }
        rows.push(row);
        Ok(())
    }

    async fn delete_by_key(
        &self,
        table: Table,
        key_field: &str,
        key: &str,
    ) -> Result<usize, RemoteError> {
        self.enter(table, RemoteOp::DeleteByKey)?;
        if self.deletes_blocked.load(Ordering::SeqCst) {
            return Ok(0);
        }
        let mut tables = self.tables.lock();
        let rows = tables.entry(table).or_default();
        let before = rows.len();
        rows.retain(|r| render(r.get(key_field)).as_deref() != Some(key));
        Ok(before - rows.len())
    }

    async fn select_where_embedded_eq(
        &self,
        table: Table,
        field: &str,
        value: &str,
    ) -> Result<Vec<Value>, RemoteError> {
        self.enter(table, RemoteOp::SelectEmbedded)?;
        if self.embedded_unreliable.load(Ordering::SeqCst) {
            return Err(RemoteError::new(
                ErrorKind::RemoteRejected,
                table.as_str(),
                "operator does not exist: json ->> unknown",
            )
            .with_code("42883"));
        }
        if let Some(rows) = self.embedded_override.lock().clone() {
            return Ok(rows);
        }
        Ok(self
            .rows(table)
            .into_iter()
            .filter(|r| render(r.get(DATA_FIELD).and_then(|d| d.get(field))).as_deref() == Some(value))
            .collect())
    }

    async fn select_recent(
        &self,
        table: Table,
        order_by: &str,
        limit: usize,
    ) -> Result<Vec<Value>, RemoteError> {
        self.enter(table, RemoteOp::SelectRecent)?;
        let mut rows = self.rows(table);
        rows.sort_by(|a, b| compare(lookup(b, order_by), lookup(a, order_by)));
        rows.truncate(limit);
        Ok(rows)
    }
}

/// Resolve `column` or `column->>field` against a row.
fn lookup<'a>(row: &'a Value, path: &str) -> Option<&'a Value> {
    match path.split_once("->>") {
        Some((column, field)) => row.get(column)?.get(field),
        None => row.get(path),
    }
}

fn render(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> CmpOrdering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(CmpOrdering::Equal),
        _ => render(a).cmp(&render(b)),
    }
}
