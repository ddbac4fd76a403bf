//! executions table queries.

use quarry_core::errors::StorageError;
use quarry_core::types::{
    ConfirmationReason, ConnectionId, ExecutionFailure, ExecutionId, ExecutionMode,
    ExecutionRecord, ExecutionStatus, TranslationId,
};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{corrupt, from_millis, sqe, to_millis};

const TABLE: &str = "executions";

const SELECT_COLUMNS: &str = "SELECT id, translation_id, connection_id, mode, status,
        row_count, execution_time_ms, truncated, cached, confirmed, confirmation_reason,
        preview_json, body_fingerprint, replay_of, failure_code, failure_message,
        started_at, finished_at
     FROM executions";

struct ExecutionRow {
    id: String,
    translation_id: String,
    connection_id: String,
    mode: String,
    status: String,
    row_count: i64,
    execution_time_ms: i64,
    truncated: bool,
    cached: bool,
    confirmed: bool,
    confirmation_reason: Option<String>,
    preview_json: String,
    body_fingerprint: String,
    replay_of: Option<String>,
    failure_code: Option<String>,
    failure_message: Option<String>,
    started_at: i64,
    finished_at: Option<i64>,
}

impl ExecutionRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            translation_id: row.get(1)?,
            connection_id: row.get(2)?,
            mode: row.get(3)?,
            status: row.get(4)?,
            row_count: row.get(5)?,
            execution_time_ms: row.get(6)?,
            truncated: row.get(7)?,
            cached: row.get(8)?,
            confirmed: row.get(9)?,
            confirmation_reason: row.get(10)?,
            preview_json: row.get(11)?,
            body_fingerprint: row.get(12)?,
            replay_of: row.get(13)?,
            failure_code: row.get(14)?,
            failure_message: row.get(15)?,
            started_at: row.get(16)?,
            finished_at: row.get(17)?,
        })
    }

    fn decode(self) -> Result<ExecutionRecord, StorageError> {
        let mode = ExecutionMode::parse(&self.mode)
            .ok_or_else(|| corrupt(TABLE, format!("unknown mode {:?} on {}", self.mode, self.id)))?;
        let status = ExecutionStatus::parse(&self.status).ok_or_else(|| {
            corrupt(TABLE, format!("unknown status {:?} on {}", self.status, self.id))
        })?;
        let confirmation_reason = match self.confirmation_reason.as_deref() {
            None => None,
            Some(raw) => Some(ConfirmationReason::parse(raw).ok_or_else(|| {
                corrupt(TABLE, format!("unknown confirmation reason {:?}", raw))
            })?),
        };
        let preview = serde_json::from_str(&self.preview_json)
            .map_err(|e| corrupt(TABLE, format!("preview_json of {}: {}", self.id, e)))?;
        let failure = match (self.failure_code, self.failure_message) {
            (Some(code), message) => Some(ExecutionFailure {
                code,
                message: message.unwrap_or_default(),
            }),
            (None, _) => None,
        };
        let finished_at = self
            .finished_at
            .map(|ms| from_millis(TABLE, ms))
            .transpose()?;

        Ok(ExecutionRecord {
            id: ExecutionId::new(self.id),
            translation_id: TranslationId::new(self.translation_id),
            connection_id: ConnectionId::new(self.connection_id),
            mode,
            status,
            row_count: self.row_count.max(0) as u64,
            execution_time_ms: self.execution_time_ms.max(0) as u64,
            truncated: self.truncated,
            cached: self.cached,
            confirmed: self.confirmed,
            confirmation_reason,
            preview,
            body_fingerprint: self.body_fingerprint,
            replay_of: self.replay_of.map(ExecutionId::new),
            failure,
            started_at: from_millis(TABLE, self.started_at)?,
            finished_at,
        })
    }
}

pub fn insert_execution(conn: &Connection, r: &ExecutionRecord) -> Result<(), StorageError> {
    let preview_json = serde_json::to_string(&r.preview).map_err(|e| corrupt(TABLE, e))?;
    conn.prepare_cached(
        "INSERT INTO executions
         (id, translation_id, connection_id, mode, status, row_count, execution_time_ms,
          truncated, cached, confirmed, confirmation_reason, preview_json, body_fingerprint,
          replay_of, failure_code, failure_message, started_at, finished_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
    )
    .map_err(sqe)?
    .execute(params![
        r.id.as_str(),
        r.translation_id.as_str(),
        r.connection_id.as_str(),
        r.mode.as_str(),
        r.status.as_str(),
        r.row_count as i64,
        r.execution_time_ms as i64,
        r.truncated,
        r.cached,
        r.confirmed,
        r.confirmation_reason.map(|c| c.as_str()),
        preview_json,
        r.body_fingerprint,
        r.replay_of.as_ref().map(|id| id.as_str()),
        r.failure.as_ref().map(|f| f.code.as_str()),
        r.failure.as_ref().map(|f| f.message.as_str()),
        to_millis(r.started_at),
        r.finished_at.map(to_millis),
    ])
    .map_err(sqe)?;
    Ok(())
}

/// Overwrite the mutable columns of a record. Returns the number of rows touched.
pub fn update_execution(conn: &Connection, r: &ExecutionRecord) -> Result<usize, StorageError> {
    let preview_json = serde_json::to_string(&r.preview).map_err(|e| corrupt(TABLE, e))?;
    conn.prepare_cached(
        "UPDATE executions SET
            status = ?2, row_count = ?3, execution_time_ms = ?4, truncated = ?5,
            cached = ?6, confirmed = ?7, confirmation_reason = ?8, preview_json = ?9,
            failure_code = ?10, failure_message = ?11, finished_at = ?12
         WHERE id = ?1",
    )
    .map_err(sqe)?
    .execute(params![
        r.id.as_str(),
        r.status.as_str(),
        r.row_count as i64,
        r.execution_time_ms as i64,
        r.truncated,
        r.cached,
        r.confirmed,
        r.confirmation_reason.map(|c| c.as_str()),
        preview_json,
        r.failure.as_ref().map(|f| f.code.as_str()),
        r.failure.as_ref().map(|f| f.message.as_str()),
        r.finished_at.map(to_millis),
    ])
    .map_err(sqe)
}

pub fn get_status(conn: &Connection, id: &ExecutionId) -> Result<Option<ExecutionStatus>, StorageError> {
    let raw: Option<String> = conn
        .prepare_cached("SELECT status FROM executions WHERE id = ?1")
        .map_err(sqe)?
        .query_row(params![id.as_str()], |row| row.get(0))
        .optional()
        .map_err(sqe)?;
    raw.map(|s| {
        ExecutionStatus::parse(&s).ok_or_else(|| corrupt(TABLE, format!("unknown status {:?}", s)))
    })
    .transpose()
}

pub fn get_execution(conn: &Connection, id: &ExecutionId) -> Result<Option<ExecutionRecord>, StorageError> {
    let sql = format!("{} WHERE id = ?1", SELECT_COLUMNS);
    let row = conn
        .prepare_cached(&sql)
        .map_err(sqe)?
        .query_row(params![id.as_str()], ExecutionRow::from_row)
        .optional()
        .map_err(sqe)?;
    row.map(ExecutionRow::decode).transpose()
}

/// Oldest first.
pub fn executions_for_translation(
    conn: &Connection,
    translation_id: &TranslationId,
) -> Result<Vec<ExecutionRecord>, StorageError> {
    let sql = format!(
        "{} WHERE translation_id = ?1 ORDER BY started_at ASC, rowid ASC",
        SELECT_COLUMNS
    );
    let mut stmt = conn.prepare_cached(&sql).map_err(sqe)?;
    let rows = stmt
        .query_map(params![translation_id.as_str()], ExecutionRow::from_row)
        .map_err(sqe)?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row.map_err(sqe)?.decode()?);
    }
    Ok(out)
}

/// Delete records started before `cutoff_ms`. Returns the number removed.
pub fn delete_started_before(conn: &Connection, cutoff_ms: i64) -> Result<usize, StorageError> {
    conn.execute("DELETE FROM executions WHERE started_at < ?1", params![cutoff_ms])
        .map_err(sqe)
}

pub fn count_executions(conn: &Connection) -> Result<i64, StorageError> {
    conn.query_row("SELECT COUNT(*) FROM executions", [], |row| row.get(0))
        .map_err(sqe)
}
