//! `QueryService`: the external operations, wired over the components.
//!
//! translate → resolve, compile, classify, persist.
//! preview / execute / replay → coordinator.

use std::sync::Arc;

use quarry_core::config::QuarryConfig;
use quarry_core::errors::{QuarryError, QuarryResult};
use quarry_core::traits::{
    ConnectionRegistry, HistoryStore, LanguageModel, QueryBackend, SchemaIntrospector,
};
use quarry_core::types::api::{
    ExecuteRequest, ExecuteResponse, ExecutionSummary, PreviewRequest, PreviewResponse,
    TranslateRequest, TranslateResponse,
};
use quarry_core::types::{
    Caller, Connection, ConnectionId, ExecuteOutcome, ExecutionId, ExecutionRecord, SchemaSnapshot,
    Translation, TranslationId,
};

use crate::catalog::SchemaCatalog;
use crate::compiler::{CompileRequest, QueryCompiler};
use crate::execution::ExecutionCoordinator;
use crate::history::InMemoryHistoryStore;
use crate::resolver::{Candidate, TargetHint, TargetResolver};
use crate::safety::SafetyClassifier;

/// External collaborators the service is built over.
pub struct Collaborators {
    pub model: Arc<dyn LanguageModel>,
    pub backend: Arc<dyn QueryBackend>,
    pub registry: Arc<dyn ConnectionRegistry>,
    pub introspector: Arc<dyn SchemaIntrospector>,
    pub history: Arc<dyn HistoryStore>,
}

impl Collaborators {
    /// History kept in process memory.
    pub fn with_in_memory_history(
        model: Arc<dyn LanguageModel>,
        backend: Arc<dyn QueryBackend>,
        registry: Arc<dyn ConnectionRegistry>,
        introspector: Arc<dyn SchemaIntrospector>,
    ) -> Self {
        Self {
            model,
            backend,
            registry,
            introspector,
            history: Arc::new(InMemoryHistoryStore::new()),
        }
    }
}

pub struct QueryService {
    registry: Arc<dyn ConnectionRegistry>,
    history: Arc<dyn HistoryStore>,
    catalog: SchemaCatalog,
    resolver: TargetResolver,
    compiler: QueryCompiler,
    classifier: SafetyClassifier,
    coordinator: ExecutionCoordinator,
}

impl QueryService {
    pub fn new(config: QuarryConfig, collaborators: Collaborators) -> Self {
        let Collaborators {
            model,
            backend,
            registry,
            introspector,
            history,
        } = collaborators;
        Self {
            catalog: SchemaCatalog::new(config.catalog, introspector),
            resolver: TargetResolver::new(config.resolver),
            compiler: QueryCompiler::new(config.compiler, model),
            classifier: SafetyClassifier::new(config.safety),
            coordinator: ExecutionCoordinator::new(
                config.execution,
                backend,
                registry.clone(),
                history.clone(),
            ),
            registry,
            history,
        }
    }

    pub fn catalog(&self) -> &SchemaCatalog {
        &self.catalog
    }

    pub fn coordinator(&self) -> &ExecutionCoordinator {
        &self.coordinator
    }

    // ── Translation ──

    pub async fn translate(&self, request: &TranslateRequest) -> QuarryResult<TranslateResponse> {
        let translation = self.build_translation(request).await?;
        Ok(TranslateResponse::from_translation(&translation, false))
    }

    /// Same pipeline as `translate`; the response is flagged `explainOnly`.
    pub async fn explain(&self, request: &TranslateRequest) -> QuarryResult<TranslateResponse> {
        let translation = self.build_translation(request).await?;
        Ok(TranslateResponse::from_translation(&translation, true))
    }

    /// Resolve, compile, classify, and persist. Nothing is stored on failure.
    pub async fn build_translation(&self, request: &TranslateRequest) -> QuarryResult<Translation> {
        let text = request.query.trim();
        if text.is_empty() {
            return Err(QuarryError::InvalidInput("query text is empty".to_string()));
        }
        let caller = &request.caller;
        QueryCompiler::pre_gate(text, caller.permission)?;

        let candidates = self
            .candidates(caller, request.connection_id.as_ref())
            .await?;
        let recent = self
            .history
            .recent_targets(&caller.organization_id, self.resolver.config().recency_window)?;
        let hint = TargetHint {
            connection_id: request.connection_id.as_ref(),
            entity: request.entity.as_deref(),
        };
        let resolution = self.resolver.resolve(text, hint, &candidates, &recent)?;

        let compiled = self
            .compiler
            .compile(CompileRequest {
                question: text,
                target: &resolution.target,
                entity: &resolution.entity,
                context: &request.context,
                permission: caller.permission,
            })
            .await?;

        let verdict = self.classifier.classify(
            &compiled.body,
            &resolution.entity,
            caller.permission,
            &compiled.suggested_indexes,
            &compiled.hint,
        )?;

        let translation = Translation {
            id: TranslationId::generate(),
            organization_id: caller.organization_id.clone(),
            text: text.to_string(),
            target: resolution.target,
            body: compiled.body,
            explanation: compiled.explanation,
            required_indexes: verdict.required_indexes,
            safety: verdict.tier,
            cost_score: verdict.cost.total,
            requires_confirmation: verdict.requires_confirmation,
            confirmation_reason: verdict.confirmation_reason,
            model_hint: compiled.hint,
            created_at: chrono::Utc::now(),
        };
        self.history.insert_translation(&translation)?;

        tracing::info!(
            translation = %translation.id,
            target = %translation.target.entity_ref(),
            auto_detected = translation.target.auto_detected,
            safety = %translation.safety,
            cost = translation.cost_score,
            requires_confirmation = translation.requires_confirmation,
            "translation stored"
        );
        Ok(translation)
    }

    /// Active connections in scope with their current schema. Connections
    /// whose schema cannot be loaded are skipped unless explicitly named.
    async fn candidates(
        &self,
        caller: &Caller,
        explicit: Option<&ConnectionId>,
    ) -> QuarryResult<Vec<Candidate>> {
        if let Some(id) = explicit {
            let connection = self.owned_connection(id, caller).await?;
            let snapshot = self.catalog.snapshot(&connection).await?;
            return Ok(vec![Candidate {
                connection,
                snapshot,
            }]);
        }

        let connections = self
            .registry
            .list_for_organization(&caller.organization_id)
            .await?;
        let mut candidates = Vec::new();
        let mut last_error = None;
        for connection in connections.into_iter().filter(Connection::is_active) {
            match self.catalog.snapshot(&connection).await {
                Ok(snapshot) => candidates.push(Candidate {
                    connection,
                    snapshot,
                }),
                Err(e) => {
                    tracing::warn!(
                        connection = %connection.id,
                        error = %e,
                        "skipping connection without schema"
                    );
                    last_error = Some(e);
                }
            }
        }
        match (candidates.is_empty(), last_error) {
            (true, Some(e)) => Err(e),
            _ => Ok(candidates),
        }
    }

    /// The caller's connection. Foreign or missing ids are unknown targets.
    async fn owned_connection(&self, id: &ConnectionId, caller: &Caller) -> QuarryResult<Connection> {
        match self.registry.get(id).await? {
            Some(c) if c.organization_id == caller.organization_id => {
                if c.is_active() {
                    Ok(c)
                } else {
                    Err(QuarryError::connection_unavailable(id, "connection has been revoked"))
                }
            }
            _ => Err(QuarryError::UnknownTarget {
                target: id.to_string(),
            }),
        }
    }

    // ── Execution ──

    pub async fn preview(&self, request: &PreviewRequest) -> QuarryResult<PreviewResponse> {
        let preview = self
            .coordinator
            .preview(&request.translation_id, &request.connection_id, &request.caller)
            .await?;
        Ok(PreviewResponse {
            preview_row_count: preview.preview_row_count,
            results: preview.results,
        })
    }

    /// The explicit outcome variant, failures included.
    pub async fn execute_outcome(&self, request: &ExecuteRequest) -> QuarryResult<ExecuteOutcome> {
        self.coordinator
            .execute(
                &request.translation_id,
                &request.connection_id,
                request.confirmed,
                &request.caller,
            )
            .await
    }

    /// Wire shape of `execute`. A failed run (already recorded) becomes `Err`.
    pub async fn execute(&self, request: &ExecuteRequest) -> QuarryResult<ExecuteResponse> {
        match self.execute_outcome(request).await? {
            ExecuteOutcome::Success(result) => Ok(ExecuteResponse::Completed(result.into())),
            ExecuteOutcome::PendingConfirmation(pending) => {
                Ok(ExecuteResponse::ConfirmationRequired(pending.into()))
            }
            ExecuteOutcome::Failed(failed) => Err(failed.error),
        }
    }

    pub async fn replay(
        &self,
        execution_id: &ExecutionId,
        caller: &Caller,
    ) -> QuarryResult<ExecutionSummary> {
        match self.coordinator.replay(execution_id, caller).await? {
            ExecuteOutcome::Success(result) => Ok(result.into()),
            ExecuteOutcome::Failed(failed) => Err(failed.error),
            ExecuteOutcome::PendingConfirmation(_) => Err(QuarryError::InvalidInput(
                "replay never waits for confirmation".to_string(),
            )),
        }
    }

    // ── Catalog & history ──

    /// Force a single-flight schema refresh and drop cached results.
    pub async fn refresh_schema(
        &self,
        connection_id: &ConnectionId,
        caller: &Caller,
    ) -> QuarryResult<Arc<SchemaSnapshot>> {
        let connection = self.owned_connection(connection_id, caller).await?;
        let snapshot = self.catalog.refresh(&connection).await?;
        self.coordinator.result_cache().invalidate_connection(connection_id);
        Ok(snapshot)
    }

    /// Executions of one translation, oldest first.
    pub fn history(
        &self,
        translation_id: &TranslationId,
        caller: &Caller,
    ) -> QuarryResult<Vec<ExecutionRecord>> {
        match self.history.get_translation(translation_id)? {
            Some(t) if t.organization_id == caller.organization_id => {
                self.history.executions_for_translation(translation_id)
            }
            _ => Err(QuarryError::TranslationNotFound {
                id: translation_id.to_string(),
            }),
        }
    }
}
