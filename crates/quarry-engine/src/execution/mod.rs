//! Execution coordinator: confirm-before-run, bounded, recorded.
//!
//! State machine per execution:
//! `Translated → [PendingConfirmation] → Running → {Completed | Failed}`.
//!
//! Every coordinator path is read-only by policy: bodies that mutate are
//! rejected whatever the caller's permission. The confirmation gate is
//! decided synchronously from the stored translation; a closed gate has no
//! side effects.

pub mod pool;
pub mod result_cache;

use std::sync::Arc;
use std::time::{Duration, Instant};

use quarry_core::config::ExecutionConfig;
use quarry_core::errors::error_code;
use quarry_core::errors::{QuarryError, QuarryErrorCode, QuarryResult};
use quarry_core::traits::{ConnectionRegistry, HistoryStore, QueryBackend};
use quarry_core::types::{
    Caller, ConfirmationReason, ConfirmationRequest, Connection, ConnectionId, ExecuteOutcome,
    ExecutionId, ExecutionMode, ExecutionRecord, ExecutionResult, FailedExecution, PreviewResult,
    QueryBody, Row, Translation, TranslationId,
};

use crate::safety;
use pool::ConnectionPools;
use result_cache::{CachedRows, ResultCache};

pub struct ExecutionCoordinator {
    config: ExecutionConfig,
    backend: Arc<dyn QueryBackend>,
    registry: Arc<dyn ConnectionRegistry>,
    history: Arc<dyn HistoryStore>,
    pools: ConnectionPools,
    cache: ResultCache,
}

/// How a recorded run was started.
struct RunPlan {
    mode: ExecutionMode,
    confirmed: bool,
    replay_of: Option<ExecutionId>,
    use_cache: bool,
}

impl ExecutionCoordinator {
    pub fn new(
        config: ExecutionConfig,
        backend: Arc<dyn QueryBackend>,
        registry: Arc<dyn ConnectionRegistry>,
        history: Arc<dyn HistoryStore>,
    ) -> Self {
        let pools = ConnectionPools::new(config.max_concurrent_per_connection);
        let cache = ResultCache::new(
            config.result_cache_capacity,
            Duration::from_secs(config.result_cache_ttl_secs),
        );
        Self {
            config,
            backend,
            registry,
            history,
            pools,
            cache,
        }
    }

    pub fn result_cache(&self) -> &ResultCache {
        &self.cache
    }

    pub fn pools(&self) -> &ConnectionPools {
        &self.pools
    }

    /// First rows of a translation, capped at `preview_row_cap`. Skips the
    /// confirmation gate and leaves no record.
    pub async fn preview(
        &self,
        translation_id: &TranslationId,
        connection_id: &ConnectionId,
        caller: &Caller,
    ) -> QuarryResult<PreviewResult> {
        let translation = self.load_translation(translation_id, caller)?;
        check_connection_matches(&translation, connection_id)?;
        let connection = self.active_connection(connection_id).await?;
        reject_mutation(&translation.body)?;

        let cap = self.config.preview_row_cap;
        let (mut rows, elapsed_ms) = self
            .run_bounded(&connection, &translation.target.entity, &translation.body, cap + 1)
            .await?;
        let truncated = rows.len() > cap;
        rows.truncate(cap);

        tracing::debug!(
            translation = %translation.id,
            rows = rows.len(),
            elapsed_ms,
            "preview served"
        );
        Ok(PreviewResult {
            translation_id: translation.id,
            preview_row_count: rows.len() as u64,
            results: rows,
            truncated,
        })
    }

    /// Full execution. Returns `PendingConfirmation` (no record) when the
    /// translation needs confirmation and `confirmed` is false.
    pub async fn execute(
        &self,
        translation_id: &TranslationId,
        connection_id: &ConnectionId,
        confirmed: bool,
        caller: &Caller,
    ) -> QuarryResult<ExecuteOutcome> {
        let translation = self.load_translation(translation_id, caller)?;
        check_connection_matches(&translation, connection_id)?;
        let connection = self.active_connection(connection_id).await?;
        reject_mutation(&translation.body)?;

        if translation.requires_confirmation && !confirmed {
            let reason = translation
                .confirmation_reason
                .unwrap_or(ConfirmationReason::HighCost);
            tracing::info!(
                translation = %translation.id,
                reason = reason.as_str(),
                cost = translation.cost_score,
                "execution held for confirmation"
            );
            return Ok(ExecuteOutcome::PendingConfirmation(ConfirmationRequest {
                translation_id: translation.id.clone(),
                reason,
                message: reason.message(translation.cost_score),
                estimated_cost: translation.cost_score,
                safety: translation.safety,
            }));
        }

        let plan = RunPlan {
            mode: ExecutionMode::Full,
            confirmed,
            replay_of: None,
            use_cache: true,
        };
        self.run_recorded(&translation, &connection, plan).await
    }

    /// Re-run the exact stored body of a past execution. No re-resolution,
    /// no re-compilation, no cache.
    pub async fn replay(
        &self,
        execution_id: &ExecutionId,
        caller: &Caller,
    ) -> QuarryResult<ExecuteOutcome> {
        let original = self
            .history
            .get_execution(execution_id)?
            .ok_or_else(|| QuarryError::ExecutionNotFound {
                id: execution_id.to_string(),
            })?;
        let translation = self.load_translation(&original.translation_id, caller)?;
        let connection = self.active_connection(&original.connection_id).await?;
        reject_mutation(&translation.body)?;

        let fingerprint = translation.body.fingerprint()?;
        if fingerprint != original.body_fingerprint {
            return Err(QuarryError::InvalidInput(format!(
                "stored body of translation {} no longer matches execution {}",
                translation.id, execution_id
            )));
        }

        tracing::info!(
            execution = %execution_id,
            translation = %translation.id,
            "replaying execution"
        );
        let plan = RunPlan {
            mode: ExecutionMode::Replay,
            confirmed: original.confirmed,
            replay_of: Some(original.id.clone()),
            use_cache: false,
        };
        self.run_recorded(&translation, &connection, plan).await
    }

    fn load_translation(&self, id: &TranslationId, caller: &Caller) -> QuarryResult<Translation> {
        match self.history.get_translation(id)? {
            Some(t) if t.organization_id == caller.organization_id => Ok(t),
            _ => Err(QuarryError::TranslationNotFound { id: id.to_string() }),
        }
    }

    async fn active_connection(&self, id: &ConnectionId) -> QuarryResult<Connection> {
        match self.registry.get(id).await? {
            Some(c) if c.is_active() => Ok(c),
            Some(_) => Err(QuarryError::connection_unavailable(id, "connection has been revoked")),
            None => Err(QuarryError::connection_unavailable(id, "connection no longer exists")),
        }
    }

    /// Pool wait and query under one wall-clock bound.
    async fn run_bounded(
        &self,
        connection: &Connection,
        entity: &str,
        body: &QueryBody,
        row_limit: usize,
    ) -> QuarryResult<(Vec<Row>, u64)> {
        let started = Instant::now();
        let run = async {
            let _permit = self.pools.acquire(&connection.id).await?;
            self.backend
                .run(connection, entity, body, row_limit)
                .await
                .map_err(|e| e.into_quarry(&connection.id))
        };
        let outcome = tokio::time::timeout(Duration::from_millis(self.config.timeout_ms), run).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match outcome {
            Ok(Ok(rows)) => Ok((rows.rows, elapsed_ms)),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(QuarryError::ExecutionTimeout {
                timeout_ms: self.config.timeout_ms,
            }),
        }
    }

    async fn run_recorded(
        &self,
        translation: &Translation,
        connection: &Connection,
        plan: RunPlan,
    ) -> QuarryResult<ExecuteOutcome> {
        let fingerprint = translation.body.fingerprint()?;
        let mut record = ExecutionRecord::running(
            translation.id.clone(),
            connection.id.clone(),
            plan.mode,
            fingerprint.clone(),
        );
        record.confirmed = plan.confirmed;
        record.confirmation_reason = translation.confirmation_reason;
        record.replay_of = plan.replay_of.clone();

        if plan.use_cache {
            if let Some(hit) = self.cache.get(&connection.id, &fingerprint) {
                let rows: Vec<Row> = hit.rows.as_ref().clone();
                record.cached = true;
                record.complete(
                    rows.len() as u64,
                    0,
                    hit.truncated,
                    self.stored_preview(&rows),
                )?;
                self.history.insert_execution(&record)?;
                tracing::debug!(execution = %record.id, "served from result cache");
                return Ok(ExecuteOutcome::Success(result_of(&record, rows)));
            }
        }

        self.history.insert_execution(&record)?;
        tracing::info!(
            execution = %record.id,
            translation = %translation.id,
            connection = %connection.id,
            mode = plan.mode.as_str(),
            "execution started"
        );

        let max_rows = self.config.max_rows;
        let started = Instant::now();
        match self
            .run_bounded(connection, &translation.target.entity, &translation.body, max_rows + 1)
            .await
        {
            Ok((mut rows, elapsed_ms)) => {
                let truncated = rows.len() > max_rows;
                rows.truncate(max_rows);
                if truncated {
                    tracing::info!(
                        execution = %record.id,
                        code = error_code::RESULT_TRUNCATED,
                        max_rows,
                        "result truncated"
                    );
                }
                record.complete(rows.len() as u64, elapsed_ms, truncated, self.stored_preview(&rows))?;
                self.persist_terminal(&record);

                if plan.use_cache {
                    self.cache.insert(
                        &connection.id,
                        &fingerprint,
                        CachedRows {
                            rows: Arc::new(rows.clone()),
                            truncated,
                        },
                    );
                }
                tracing::info!(
                    execution = %record.id,
                    rows = record.row_count,
                    elapsed_ms,
                    "execution completed"
                );
                Ok(ExecuteOutcome::Success(result_of(&record, rows)))
            }
            Err(error) => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                record.fail(&error, elapsed_ms)?;
                self.persist_terminal(&record);
                tracing::warn!(
                    execution = %record.id,
                    code = error.error_code(),
                    error = %error,
                    "execution failed"
                );
                Ok(ExecuteOutcome::Failed(FailedExecution { record, error }))
            }
        }
    }

    /// Write a finished record, retrying once. The run already happened, so a
    /// storage failure here is logged and the outcome still returned.
    fn persist_terminal(&self, record: &ExecutionRecord) {
        let Err(first) = self.history.update_execution(record) else {
            return;
        };
        tracing::warn!(
            execution = %record.id,
            code = first.error_code(),
            error = %first,
            "terminal record write failed, retrying"
        );
        if let Err(second) = self.history.update_execution(record) {
            tracing::error!(
                execution = %record.id,
                status = %record.status,
                code = second.error_code(),
                error = %second,
                "terminal record could not be stored"
            );
        }
    }

    fn stored_preview(&self, rows: &[Row]) -> Vec<Row> {
        rows.iter()
            .take(self.config.stored_preview_rows)
            .cloned()
            .collect()
    }
}

fn check_connection_matches(translation: &Translation, connection_id: &ConnectionId) -> QuarryResult<()> {
    if &translation.target.connection_id != connection_id {
        return Err(QuarryError::InvalidInput(format!(
            "translation {} targets connection {}, not {}",
            translation.id, translation.target.connection_id, connection_id
        )));
    }
    Ok(())
}

fn reject_mutation(body: &QueryBody) -> QuarryResult<()> {
    if let Some(verb) = safety::mutation_verb(body)? {
        tracing::warn!(verb = %verb, "mutating body refused by coordinator");
        return Err(QuarryError::UnsafeQueryRejected {
            verb,
            reason: "the execution path is read-only".to_string(),
        });
    }
    Ok(())
}

fn result_of(record: &ExecutionRecord, rows: Vec<Row>) -> ExecutionResult {
    ExecutionResult {
        execution_id: record.id.clone(),
        translation_id: record.translation_id.clone(),
        results: rows,
        row_count: record.row_count,
        execution_time_ms: record.execution_time_ms,
        truncated: record.truncated,
        cached: record.cached,
        replay_of: record.replay_of.clone(),
    }
}
