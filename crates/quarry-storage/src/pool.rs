//! ConnectionPool: one writer plus round-robin readers over history.db.
//!
//! The only place in the crate that holds `Mutex<Connection>`.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use quarry_core::errors::StorageError;
use rusqlite::{Connection, OpenFlags};

use crate::pragmas::{configure_connection, configure_readonly_connection};

const DEFAULT_READ_POOL_SIZE: usize = 2;

pub struct ConnectionPool {
    writer: Mutex<Connection>,
    readers: Vec<Mutex<Connection>>,
    read_index: AtomicUsize,
    path: Option<PathBuf>,
}

impl ConnectionPool {
    /// File-backed pool. `read_pool_size == 0` means the default of 2.
    ///
    /// The writer is opened (and the file created) before any reader.
    pub fn open(path: &Path, read_pool_size: usize) -> Result<Self, StorageError> {
        let pool_size = if read_pool_size == 0 {
            DEFAULT_READ_POOL_SIZE
        } else {
            read_pool_size
        };

        let writer = Connection::open(path).map_err(|e| StorageError::SqliteError {
            message: format!("failed to open history writer at {}: {}", path.display(), e),
        })?;
        configure_connection(&writer)?;

        let mut readers = Vec::with_capacity(pool_size);
        for i in 0..pool_size {
            let reader = Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )
            .map_err(|e| StorageError::SqliteError {
                message: format!("failed to open history reader {}: {}", i, e),
            })?;
            configure_readonly_connection(&reader)?;
            readers.push(Mutex::new(reader));
        }

        Ok(Self {
            writer: Mutex::new(writer),
            readers,
            read_index: AtomicUsize::new(0),
            path: Some(path.to_path_buf()),
        })
    }

    /// Single in-memory connection; reads go through the writer.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let writer = Connection::open_in_memory().map_err(|e| StorageError::SqliteError {
            message: format!("failed to open in-memory history: {}", e),
        })?;
        configure_connection(&writer)?;

        Ok(Self {
            writer: Mutex::new(writer),
            readers: Vec::new(),
            read_index: AtomicUsize::new(0),
            path: None,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn reader_count(&self) -> usize {
        self.readers.len()
    }

    pub fn with_writer<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Connection) -> Result<T, E>,
        E: From<StorageError>,
    {
        let conn = self
            .writer
            .lock()
            .map_err(|e| StorageError::LockPoisoned(format!("history writer: {}", e)))?;
        f(&conn)
    }

    /// Round-robin reader. Falls back to the writer when there are no readers.
    pub fn with_reader<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Connection) -> Result<T, E>,
        E: From<StorageError>,
    {
        if self.readers.is_empty() {
            return self.with_writer(f);
        }

        let index = self.read_index.fetch_add(1, Ordering::Relaxed) % self.readers.len();
        let conn = self.readers[index]
            .lock()
            .map_err(|e| StorageError::LockPoisoned(format!("history reader {}: {}", index, e)))?;
        f(&conn)
    }

    pub fn is_wal_mode(&self) -> bool {
        self.with_writer(|conn| {
            let mode: String = conn
                .query_row("PRAGMA journal_mode", [], |row| row.get(0))
                .unwrap_or_default();
            Ok::<_, StorageError>(mode.eq_ignore_ascii_case("wal"))
        })
        .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_reads_fall_back_to_writer() {
        let pool = ConnectionPool::open_in_memory().unwrap();
        assert_eq!(pool.reader_count(), 0);
        pool.with_writer(|c| {
            c.execute_batch("CREATE TABLE t (x INTEGER); INSERT INTO t VALUES (7);")
                .map_err(crate::queries::sqe)
        })
        .unwrap();
        let x: i64 = pool
            .with_reader(|c| {
                c.query_row("SELECT x FROM t", [], |r| r.get(0))
                    .map_err(crate::queries::sqe)
            })
            .unwrap();
        assert_eq!(x, 7);
    }

    #[test]
    fn file_pool_uses_wal_and_default_reader_count() {
        let dir = tempfile::tempdir().unwrap();
        let pool = ConnectionPool::open(&dir.path().join("history.db"), 0).unwrap();
        assert_eq!(pool.reader_count(), 2);
        assert!(pool.is_wal_mode());
    }
}
