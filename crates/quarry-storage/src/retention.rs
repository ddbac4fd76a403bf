//! Age-based pruning of execution records.
//!
//! Translations are kept; they are small and replay needs them.

use chrono::{Duration, Utc};
use quarry_core::errors::StorageError;
use rusqlite::Connection;

use crate::queries::{executions, to_millis};

/// Delete execution records older than `retention_days`. 0 keeps everything.
pub fn apply_retention(conn: &Connection, retention_days: u32) -> Result<usize, StorageError> {
    if retention_days == 0 {
        return Ok(0);
    }
    let cutoff = Utc::now() - Duration::days(i64::from(retention_days));
    let removed = executions::delete_started_before(conn, to_millis(cutoff))?;
    if removed > 0 {
        tracing::info!(removed, retention_days, "pruned old execution records");
    }
    Ok(removed)
}
