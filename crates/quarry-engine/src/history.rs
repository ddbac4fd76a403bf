//! In-memory `HistoryStore`, the engine default.
//!
//! Everything lives behind one `RwLock`. Process restarts lose history; use
//! the SQLite store from `quarry-storage` when that matters.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use quarry_core::errors::{QuarryError, QuarryResult};
use quarry_core::traits::HistoryStore;
use quarry_core::types::{
    EntityRef, ExecutionId, ExecutionRecord, OrganizationId, Translation, TranslationId,
};
use rustc_hash::{FxHashMap, FxHashSet};

#[derive(Default)]
struct Inner {
    translations: FxHashMap<TranslationId, Translation>,
    /// Insertion order, for recency.
    translation_order: Vec<TranslationId>,
    executions: FxHashMap<ExecutionId, ExecutionRecord>,
    executions_by_translation: FxHashMap<TranslationId, Vec<ExecutionId>>,
}

#[derive(Default)]
pub struct InMemoryHistoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> QuarryResult<RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|e| QuarryError::Concurrency(format!("history lock poisoned: {}", e)))
    }

    fn write(&self) -> QuarryResult<RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|e| QuarryError::Concurrency(format!("history lock poisoned: {}", e)))
    }

    pub fn translation_count(&self) -> usize {
        self.read().map_or(0, |g| g.translations.len())
    }

    pub fn execution_count(&self) -> usize {
        self.read().map_or(0, |g| g.executions.len())
    }
}

impl HistoryStore for InMemoryHistoryStore {
    fn insert_translation(&self, translation: &Translation) -> QuarryResult<()> {
        let mut inner = self.write()?;
        if inner
            .translations
            .insert(translation.id.clone(), translation.clone())
            .is_none()
        {
            inner.translation_order.push(translation.id.clone());
        }
        Ok(())
    }

    fn get_translation(&self, id: &TranslationId) -> QuarryResult<Option<Translation>> {
        Ok(self.read()?.translations.get(id).cloned())
    }

    fn insert_execution(&self, record: &ExecutionRecord) -> QuarryResult<()> {
        let mut inner = self.write()?;
        if inner.executions.contains_key(&record.id) {
            return Err(QuarryError::InvalidInput(format!(
                "execution {} already recorded",
                record.id
            )));
        }
        inner
            .executions_by_translation
            .entry(record.translation_id.clone())
            .or_default()
            .push(record.id.clone());
        inner.executions.insert(record.id.clone(), record.clone());
        Ok(())
    }

    fn update_execution(&self, record: &ExecutionRecord) -> QuarryResult<()> {
        let mut inner = self.write()?;
        let stored = inner
            .executions
            .get_mut(&record.id)
            .ok_or_else(|| QuarryError::ExecutionNotFound {
                id: record.id.to_string(),
            })?;
        if stored.status != record.status && !stored.status.can_transition_to(record.status) {
            return Err(QuarryError::InvalidTransition {
                execution_id: record.id.to_string(),
                from: stored.status.to_string(),
                to: record.status.to_string(),
            });
        }
        if stored.status == record.status && stored.status.is_terminal() {
            return Err(QuarryError::InvalidTransition {
                execution_id: record.id.to_string(),
                from: stored.status.to_string(),
                to: record.status.to_string(),
            });
        }
        *stored = record.clone();
        Ok(())
    }

    fn get_execution(&self, id: &ExecutionId) -> QuarryResult<Option<ExecutionRecord>> {
        Ok(self.read()?.executions.get(id).cloned())
    }

    fn executions_for_translation(&self, id: &TranslationId) -> QuarryResult<Vec<ExecutionRecord>> {
        let inner = self.read()?;
        Ok(inner
            .executions_by_translation
            .get(id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|eid| inner.executions.get(eid).cloned())
                    .collect()
            })
            .unwrap_or_default())
    }

    fn recent_targets(
        &self,
        organization_id: &OrganizationId,
        limit: usize,
    ) -> QuarryResult<Vec<EntityRef>> {
        let inner = self.read()?;
        let mut seen = FxHashSet::default();
        let mut out = Vec::new();
        for id in inner.translation_order.iter().rev() {
            if out.len() >= limit {
                break;
            }
            let Some(t) = inner.translations.get(id) else {
                continue;
            };
            if &t.organization_id != organization_id {
                continue;
            }
            let target = t.target.entity_ref();
            if seen.insert(target.clone()) {
                out.push(target);
            }
        }
        Ok(out)
    }
}
