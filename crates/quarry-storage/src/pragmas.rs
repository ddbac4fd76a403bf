//! PRAGMAs applied to every history.db connection right after opening.

use quarry_core::errors::StorageError;
use rusqlite::Connection;

use crate::queries::sqe;

const BASE_PRAGMAS: &str = "
    PRAGMA journal_mode = WAL;
    PRAGMA synchronous = NORMAL;
    PRAGMA foreign_keys = ON;
    PRAGMA busy_timeout = 5000;
    PRAGMA cache_size = -8000;
    PRAGMA mmap_size = 268435456;
    PRAGMA temp_store = MEMORY;
";

/// Writer setup: WAL, NORMAL sync, foreign keys, 5s busy timeout.
pub fn configure_connection(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(BASE_PRAGMAS).map_err(sqe)
}

/// Reader setup. Adds `query_only` so a reader can never write.
pub fn configure_readonly_connection(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(BASE_PRAGMAS).map_err(sqe)?;
    conn.execute_batch("PRAGMA query_only = ON;").map_err(sqe)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writer_pragmas_applied() {
        let conn = Connection::open_in_memory().unwrap();
        configure_connection(&conn).unwrap();

        let journal_mode: String = conn
            .pragma_query_value(None, "journal_mode", |row| row.get(0))
            .unwrap();
        // In-memory databases report "memory".
        assert!(journal_mode == "wal" || journal_mode == "memory", "got {}", journal_mode);

        let timeout: i64 = conn
            .pragma_query_value(None, "busy_timeout", |row| row.get(0))
            .unwrap();
        assert_eq!(timeout, 5000);

        let fk: i64 = conn
            .pragma_query_value(None, "foreign_keys", |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);
    }

    #[test]
    fn readonly_connection_refuses_writes() {
        let conn = Connection::open_in_memory().unwrap();
        configure_readonly_connection(&conn).unwrap();
        assert!(conn.execute_batch("CREATE TABLE t (x INTEGER);").is_err());
    }
}
