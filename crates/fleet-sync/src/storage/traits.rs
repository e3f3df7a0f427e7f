/// Storage backend trait for the local cache.
///
/// `KeyValueBackend` is the narrow raw I/O trait implemented by concrete
/// durable stores (SQLite file, in-memory map). It knows nothing about
/// vehicles or audit entries; `LocalCache` layers the collection semantics
/// and the never-fail contract on top.
use crate::error::StorageError;

/// Low-level key/value backend holding one serialized value per key.
///
/// Implementors must be `Send + Sync` so they can be shared across tasks.
pub trait KeyValueBackend: Send + Sync {
    /// Read the value stored under `key`, or `None` if the key was never set.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Insert or replace the value stored under `key`.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}
