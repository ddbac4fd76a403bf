//! `SqliteHistoryStore`: the durable `HistoryStore`.
//!
//! Reads go through `with_reader()`, writes through `with_writer()`. Status
//! checks and the update they guard run under the single writer lock, so
//! two racing updates cannot both leave `Running`.

use std::path::Path;

use quarry_core::config::StorageConfig;
use quarry_core::errors::{QuarryError, QuarryResult, StorageError};
use quarry_core::traits::HistoryStore;
use quarry_core::types::{
    EntityRef, ExecutionId, ExecutionRecord, OrganizationId, Translation, TranslationId,
};

use crate::migrations;
use crate::pool::ConnectionPool;
use crate::queries::{executions, translations};
use crate::retention;

pub struct SqliteHistoryStore {
    pool: ConnectionPool,
}

impl SqliteHistoryStore {
    /// Open per config: a file when `path` is set, memory otherwise.
    /// Runs migrations, then retention.
    pub fn open(config: &StorageConfig) -> Result<Self, StorageError> {
        let pool = match config.path.as_deref() {
            Some(path) => ConnectionPool::open(Path::new(path), config.read_pool_size)?,
            None => ConnectionPool::open_in_memory()?,
        };
        Self::initialize(pool, config.retention_days)
    }

    pub fn open_path(path: &Path) -> Result<Self, StorageError> {
        let defaults = StorageConfig::default();
        let pool = ConnectionPool::open(path, defaults.read_pool_size)?;
        Self::initialize(pool, defaults.retention_days)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::initialize(ConnectionPool::open_in_memory()?, 0)
    }

    fn initialize(pool: ConnectionPool, retention_days: u32) -> Result<Self, StorageError> {
        let version = pool.with_writer(migrations::migrate)?;
        // Pruning failures are logged, never fatal.
        if let Err(e) = pool.with_writer(|conn| retention::apply_retention(conn, retention_days)) {
            tracing::warn!(error = %e, "history retention failed");
        }
        tracing::debug!(
            path = ?pool.path(),
            schema_version = version,
            readers = pool.reader_count(),
            "history store opened"
        );
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    /// Prune now, outside of open.
    pub fn apply_retention(&self, retention_days: u32) -> Result<usize, StorageError> {
        self.pool
            .with_writer(|conn| retention::apply_retention(conn, retention_days))
    }

    pub fn translation_count(&self) -> Result<i64, StorageError> {
        self.pool.with_reader(translations::count_translations)
    }

    pub fn execution_count(&self) -> Result<i64, StorageError> {
        self.pool.with_reader(executions::count_executions)
    }
}

impl HistoryStore for SqliteHistoryStore {
    fn insert_translation(&self, translation: &Translation) -> QuarryResult<()> {
        self.pool
            .with_writer(|conn| Ok(translations::insert_translation(conn, translation)?))
    }

    fn get_translation(&self, id: &TranslationId) -> QuarryResult<Option<Translation>> {
        self.pool
            .with_reader(|conn| Ok(translations::get_translation(conn, id)?))
    }

    fn insert_execution(&self, record: &ExecutionRecord) -> QuarryResult<()> {
        self.pool.with_writer(|conn| {
            if executions::get_status(conn, &record.id)?.is_some() {
                return Err(QuarryError::InvalidInput(format!(
                    "execution {} already recorded",
                    record.id
                )));
            }
            Ok(executions::insert_execution(conn, record)?)
        })
    }

    fn update_execution(&self, record: &ExecutionRecord) -> QuarryResult<()> {
        self.pool.with_writer(|conn| {
            let stored = executions::get_status(conn, &record.id)?.ok_or_else(|| {
                QuarryError::ExecutionNotFound {
                    id: record.id.to_string(),
                }
            })?;
            let allowed = if stored == record.status {
                !stored.is_terminal()
            } else {
                stored.can_transition_to(record.status)
            };
            if !allowed {
                return Err(QuarryError::InvalidTransition {
                    execution_id: record.id.to_string(),
                    from: stored.to_string(),
                    to: record.status.to_string(),
                });
            }
            executions::update_execution(conn, record)?;
            Ok(())
        })
    }

    fn get_execution(&self, id: &ExecutionId) -> QuarryResult<Option<ExecutionRecord>> {
        self.pool
            .with_reader(|conn| Ok(executions::get_execution(conn, id)?))
    }

    fn executions_for_translation(&self, id: &TranslationId) -> QuarryResult<Vec<ExecutionRecord>> {
        self.pool
            .with_reader(|conn| Ok(executions::executions_for_translation(conn, id)?))
    }

    fn recent_targets(
        &self,
        organization_id: &OrganizationId,
        limit: usize,
    ) -> QuarryResult<Vec<EntityRef>> {
        self.pool
            .with_reader(|conn| Ok(translations::recent_targets(conn, organization_id, limit)?))
    }
}
