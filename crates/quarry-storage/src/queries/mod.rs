//! Per-table query functions. Each takes a raw `&Connection`; routing to the
//! writer or a reader is the engine's job.

pub mod executions;
pub mod translations;

use chrono::{DateTime, TimeZone, Utc};
use quarry_core::errors::StorageError;
use rusqlite::ErrorCode;

/// rusqlite error → StorageError. Lock contention surfaces as `DbBusy`.
pub fn sqe(e: rusqlite::Error) -> StorageError {
    if let rusqlite::Error::SqliteFailure(ref failure, _) = e {
        if matches!(failure.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) {
            return StorageError::DbBusy;
        }
    }
    StorageError::SqliteError {
        message: e.to_string(),
    }
}

pub(crate) fn corrupt(table: &str, details: impl std::fmt::Display) -> StorageError {
    StorageError::CorruptRow {
        table: table.to_string(),
        details: details.to_string(),
    }
}

pub(crate) fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

pub(crate) fn from_millis(table: &str, millis: i64) -> Result<DateTime<Utc>, StorageError> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| corrupt(table, format!("timestamp out of range: {}", millis)))
}
