//! In-memory key/value backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::error::StorageError;

use super::traits::KeyValueBackend;

/// Process-local backend. Survives nothing, but supports switching into a
/// denied state where every access fails like a sandboxed browser storage.
#[derive(Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, String>>,
    denied: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend that refuses every access from the start.
    pub fn denied() -> Self {
        let backend = Self::default();
        backend.set_denied(true);
        backend
    }

    pub fn set_denied(&self, denied: bool) {
        self.denied.store(denied, Ordering::SeqCst);
    }

    fn check_access(&self) -> Result<(), StorageError> {
        if self.denied.load(Ordering::SeqCst) {
            return Err(StorageError::AccessDenied(
                "storage is disabled in this context".to_string(),
            ));
        }
        Ok(())
    }
}

impl KeyValueBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.check_access()?;
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check_access()?;
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}
