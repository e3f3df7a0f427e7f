use std::fmt;
use thiserror::Error;

// ---------------------------------------------------------------------------
// ErrorKind
// ---------------------------------------------------------------------------

/// Classified failure kind shared by every component.
///
/// Raw provider errors never leave the remote adapter; they are translated
/// into one of these kinds at the boundary and everything above it branches
/// on the kind alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Local durable storage is blocked by the execution context.
    StorageAccessDenied,
    /// Local durable storage returned content that does not parse.
    LocalCorruption,
    /// The expected remote table does not exist.
    RemoteSchemaMissing,
    /// An authorization policy blocked the remote read, write or delete.
    RemoteAccessDenied,
    /// Network failure, timeout or temporary server error.
    RemoteTransient,
    /// Any other failure reported by the remote provider.
    RemoteRejected,
    /// A deletion affected zero rows or its key could not be resolved.
    DeletionNotFound,
}

impl ErrorKind {
    /// Stable label used in structured log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::StorageAccessDenied => "storage_access_denied",
            ErrorKind::LocalCorruption => "local_corruption",
            ErrorKind::RemoteSchemaMissing => "remote_schema_missing",
            ErrorKind::RemoteAccessDenied => "remote_access_denied",
            ErrorKind::RemoteTransient => "remote_transient",
            ErrorKind::RemoteRejected => "remote_rejected",
            ErrorKind::DeletionNotFound => "deletion_not_found",
        }
    }

    /// Actionable hint logged alongside a failure of this kind.
    pub fn remediation(&self) -> &'static str {
        match self {
            ErrorKind::StorageAccessDenied => {
                "local storage is blocked in this context; changes will not survive a restart"
            }
            ErrorKind::LocalCorruption => {
                "cached collection is unreadable and was treated as empty; it is rewritten on the next save"
            }
            ErrorKind::RemoteSchemaMissing => {
                "create the `vehicles` and `history_logs` tables in the remote project"
            }
            ErrorKind::RemoteAccessDenied => {
                "check the row-level security policies and the API key for this table"
            }
            ErrorKind::RemoteTransient => "remote store unreachable; serving the local snapshot",
            ErrorKind::RemoteRejected => "the remote store rejected the request; inspect the message",
            ErrorKind::DeletionNotFound => {
                "no row was removed; a delete policy may be blocking it or the row is already gone"
            }
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// StorageError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Local storage access denied: {0}")]
    AccessDenied(String),

    #[error("Local cache corruption in \"{key}\"")]
    Corruption {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

impl StorageError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StorageError::Corruption { .. } => ErrorKind::LocalCorruption,
            _ => ErrorKind::StorageAccessDenied,
        }
    }
}

// ---------------------------------------------------------------------------
// RemoteError
// ---------------------------------------------------------------------------

/// A remote store failure, already classified by the adapter that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Remote {kind} error on \"{table}\": {message}")]
pub struct RemoteError {
    pub kind: ErrorKind,
    pub table: String,
    pub message: String,
    /// Provider error code, kept for diagnostics only.
    pub code: Option<String>,
}

impl RemoteError {
    pub fn new(kind: ErrorKind, table: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            table: table.into(),
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: \"{value}\"")]
    InvalidValue { name: String, value: String },

    #[error("Failed to read config file {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config")]
    Parse(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// FleetError (top-level rollup)
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum FleetError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl FleetError {
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            FleetError::Storage(e) => Some(e.kind()),
            FleetError::Remote(e) => Some(e.kind()),
            FleetError::Config(_) => None,
        }
    }
}

/// Result alias defaulting to `FleetError`.
pub type Result<T, E = FleetError> = std::result::Result<T, E>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
