//! The capabilities the coordinator needs from a networked
//! tabular backend.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::RemoteError;
use crate::types::Table;

/// Networked tabular store reached through an authenticated client.
///
/// Rows are plain JSON objects. Every method can fail; implementations must
/// return a [`RemoteError`] whose `kind` is already classified, so callers
/// never look at provider-specific codes.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch every row of `table`.
    async fn select_all(&self, table: Table) -> Result<Vec<Value>, RemoteError>;

    /// Insert `row`, or replace the row whose `key_field` equals the row's own.
    async fn upsert(&self, table: Table, row: Value, key_field: &str) -> Result<(), RemoteError>;

    /// Insert `row`. Fails if its key already exists.
    async fn insert(&self, table: Table, row: Value) -> Result<(), RemoteError>;

    /// Delete rows whose `key_field` equals `key`. Returns the affected row count.
    async fn delete_by_key(
        &self,
        table: Table,
        key_field: &str,
        key: &str,
    ) -> Result<usize, RemoteError>;

    /// Rows whose serialized `data` payload has `field == value`.
    ///
    /// Best effort: some backends cannot filter on embedded fields reliably
    /// and fail or return nothing.
    async fn select_where_embedded_eq(
        &self,
        table: Table,
        field: &str,
        value: &str,
    ) -> Result<Vec<Value>, RemoteError>;

    /// At most `limit` rows ordered by `order_by` descending. `order_by` is a
    /// column name or a `column->>field` path into an embedded object.
    async fn select_recent(
        &self,
        table: Table,
        order_by: &str,
        limit: usize,
    ) -> Result<Vec<Value>, RemoteError>;
}
