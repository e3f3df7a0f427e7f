//! Translation of provider errors into [`ErrorKind`].
//!
//! This is the only place that knows what PostgREST / Postgres error codes
//! look like.

use crate::error::ErrorKind;

const SCHEMA_MISSING_CODES: &[&str] = &["42P01", "PGRST106", "PGRST205"];
const ACCESS_DENIED_CODES: &[&str] = &["42501", "PGRST301", "PGRST302"];
const TRANSIENT_CODES: &[&str] = &["57014", "PGRST000", "PGRST001", "PGRST002", "PGRST003"];

/// Classify a failed request.
///
/// `status` is `None` when no HTTP response was received at all.
pub fn classify_provider_error(status: Option<u16>, code: Option<&str>, message: &str) -> ErrorKind {
    if let Some(code) = code {
        if SCHEMA_MISSING_CODES.contains(&code) {
            return ErrorKind::RemoteSchemaMissing;
        }
        if ACCESS_DENIED_CODES.contains(&code) {
            return ErrorKind::RemoteAccessDenied;
        }
        if TRANSIENT_CODES.contains(&code) {
            return ErrorKind::RemoteTransient;
        }
    }

    let lower = message.to_ascii_lowercase();
    if lower.contains("relation") && lower.contains("does not exist") {
        return ErrorKind::RemoteSchemaMissing;
    }
    if lower.contains("row-level security") || lower.contains("permission denied") {
        return ErrorKind::RemoteAccessDenied;
    }

    match status {
        None => ErrorKind::RemoteTransient,
        Some(401) | Some(403) => ErrorKind::RemoteAccessDenied,
        // An unknown table surfaces as a bare 404 on older PostgREST versions.
        Some(404) if code.is_none() => ErrorKind::RemoteSchemaMissing,
        Some(408) | Some(429) => ErrorKind::RemoteTransient,
        Some(s) if (500..600).contains(&s) => ErrorKind::RemoteTransient,
        Some(_) => ErrorKind::RemoteRejected,
    }
}
