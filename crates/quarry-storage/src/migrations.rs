//! Schema versioning through a dedicated single-row version table.

use quarry_core::errors::StorageError;
use rusqlite::{params, Connection};
use tracing::info;

use crate::queries::sqe;
use crate::schema::HISTORY_TABLES_V1;

/// Bump when adding a migration.
pub const CURRENT_VERSION: u32 = 1;

pub fn get_schema_version(conn: &Connection) -> Result<u32, StorageError> {
    let exists: bool = conn
        .query_row(
            "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='quarry_schema_version'",
            [],
            |row| row.get(0),
        )
        .map_err(sqe)?;
    if !exists {
        return Ok(0);
    }

    match conn.query_row("SELECT version FROM quarry_schema_version LIMIT 1", [], |row| {
        row.get::<_, u32>(0)
    }) {
        Ok(version) => Ok(version),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
        Err(e) => Err(sqe(e)),
    }
}

fn set_schema_version(conn: &Connection, version: u32) -> Result<(), StorageError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS quarry_schema_version (
            version INTEGER NOT NULL
        ) STRICT;",
    )
    .map_err(sqe)?;
    conn.execute("DELETE FROM quarry_schema_version", [])
        .map_err(sqe)?;
    conn.execute(
        "INSERT INTO quarry_schema_version (version) VALUES (?1)",
        params![version],
    )
    .map_err(sqe)?;
    Ok(())
}

/// Bring the database up to `CURRENT_VERSION`. Returns the resulting version.
pub fn migrate(conn: &Connection) -> Result<u32, StorageError> {
    let current = get_schema_version(conn)?;
    if current >= CURRENT_VERSION {
        return Ok(current);
    }

    if current < 1 {
        info!("migrating history schema: 0 -> 1 (translations, executions)");
        conn.execute_batch(HISTORY_TABLES_V1)
            .map_err(|e| StorageError::MigrationFailed {
                version: 1,
                message: e.to_string(),
            })?;
        set_schema_version(conn, 1)?;
    }

    let final_version = get_schema_version(conn)?;
    info!(from = current, to = final_version, "history schema migration complete");
    Ok(final_version)
}
