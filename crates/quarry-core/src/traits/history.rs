//! `HistoryStore` trait: persistence of translations and execution records.
//!
//! Works for both the in-memory store and SQLite. Implementations must reject
//! status updates that leave a terminal state.

use crate::errors::QuarryResult;
use crate::types::{EntityRef, ExecutionId, ExecutionRecord, OrganizationId, Translation, TranslationId};

pub trait HistoryStore: Send + Sync {
    // ── Translations ──

    fn insert_translation(&self, translation: &Translation) -> QuarryResult<()>;

    fn get_translation(&self, id: &TranslationId) -> QuarryResult<Option<Translation>>;

    // ── Executions ──

    fn insert_execution(&self, record: &ExecutionRecord) -> QuarryResult<()>;

    /// Replace a stored record. Fails with `InvalidTransition` when the stored
    /// status cannot move to `record.status`, and `ExecutionNotFound` when absent.
    fn update_execution(&self, record: &ExecutionRecord) -> QuarryResult<()>;

    fn get_execution(&self, id: &ExecutionId) -> QuarryResult<Option<ExecutionRecord>>;

    /// Oldest first.
    fn executions_for_translation(&self, id: &TranslationId) -> QuarryResult<Vec<ExecutionRecord>>;

    // ── Resolver support ──

    /// Distinct targets of the organization's most recent translations, newest first.
    fn recent_targets(&self, organization_id: &OrganizationId, limit: usize) -> QuarryResult<Vec<EntityRef>>;
}
