//! Scripted collaborators shared by the engine integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use quarry_core::config::QuarryConfig;
use quarry_core::errors::{BackendError, ModelError, QuarryResult, StorageError};
use quarry_core::traits::{
    ConnectionRegistry, HistoryStore, LanguageModel, QueryBackend, QueryRows, SchemaIntrospector,
};
use quarry_core::types::{
    BackendKind, Caller, Connection, ConnectionId, ConnectionStatus, EntityRef, ExecutionId,
    ExecutionRecord, FieldDef, OrganizationId, QueryBody, Row, SchemaEntity, Translation,
    TranslationId,
};
use quarry_engine::{Collaborators, InMemoryHistoryStore, QueryService};
use serde_json::json;

pub const ORG: &str = "org-acme";

// ── Language model ──

enum Step {
    Reply(String),
    Fail(ModelError),
    Stall(Duration, String),
}

/// Plays back queued steps, then repeats the fallback reply.
#[derive(Default)]
pub struct ScriptedModel {
    steps: Mutex<VecDeque<Step>>,
    fallback: Mutex<Option<String>>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn always(reply: impl Into<String>) -> Self {
        let model = Self::new();
        model.set_fallback(reply);
        model
    }

    pub fn set_fallback(&self, reply: impl Into<String>) {
        *self.fallback.lock().unwrap() = Some(reply.into());
    }

    pub fn push_reply(&self, reply: impl Into<String>) {
        self.steps.lock().unwrap().push_back(Step::Reply(reply.into()));
    }

    pub fn push_error(&self, error: ModelError) {
        self.steps.lock().unwrap().push_back(Step::Fail(error));
    }

    pub fn push_stall(&self, delay: Duration, reply: impl Into<String>) {
        self.steps
            .lock()
            .unwrap()
            .push_back(Step::Stall(delay, reply.into()));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, prompt: &str) -> Result<String, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(Step::Reply(text)) => Ok(text),
            Some(Step::Fail(e)) => Err(e),
            Some(Step::Stall(delay, text)) => {
                tokio::time::sleep(delay).await;
                Ok(text)
            }
            None => self
                .fallback
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| ModelError::Permanent("no scripted reply".to_string())),
        }
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// A well-formed relational reply.
pub fn sql_reply(statement: &str, safety: &str, estimated_cost: f64) -> String {
    json!({
        "query": statement,
        "kind": "sql",
        "explain": format!("Runs: {}", statement),
        "safety": safety,
        "estimatedCost": estimated_cost,
        "requiresIndexes": [],
    })
    .to_string()
}

// ── Backend ──

/// Rows per entity, with switchable latency and reachability.
#[derive(Default)]
pub struct InMemoryBackend {
    tables: Mutex<HashMap<String, Vec<Row>>>,
    delay: Mutex<Option<Duration>>,
    unavailable: AtomicBool,
    runs: Mutex<Vec<(String, QueryBody, usize)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(self, entity: &str, count: usize) -> Self {
        self.tables
            .lock()
            .unwrap()
            .insert(entity.to_string(), rows(count));
        self
    }

    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn run_count(&self) -> usize {
        self.runs.lock().unwrap().len()
    }

    pub fn bodies(&self) -> Vec<QueryBody> {
        self.runs
            .lock()
            .unwrap()
            .iter()
            .map(|(_, body, _)| body.clone())
            .collect()
    }

    pub fn last_row_limit(&self) -> Option<usize> {
        self.runs.lock().unwrap().last().map(|(_, _, limit)| *limit)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QueryBackend for InMemoryBackend {
    async fn run(
        &self,
        _connection: &Connection,
        entity: &str,
        body: &QueryBody,
        row_limit: usize,
    ) -> Result<QueryRows, BackendError> {
        self.runs
            .lock()
            .unwrap()
            .push((entity.to_string(), body.clone(), row_limit));
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable("connection refused".to_string()));
        }

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let rows = self
            .tables
            .lock()
            .unwrap()
            .get(entity)
            .map(|all| all.iter().take(row_limit).cloned().collect())
            .unwrap_or_default();
        Ok(QueryRows::new(rows))
    }
}

pub fn rows(count: usize) -> Vec<Row> {
    (0..count)
        .map(|i| json!({"id": i, "name": format!("row-{}", i)}))
        .collect()
}

// ── Registry ──

#[derive(Default)]
pub struct StaticRegistry {
    connections: Mutex<Vec<Connection>>,
}

impl StaticRegistry {
    pub fn new(connections: Vec<Connection>) -> Self {
        Self {
            connections: Mutex::new(connections),
        }
    }

    pub fn remove(&self, id: &str) {
        self.connections
            .lock()
            .unwrap()
            .retain(|c| c.id.as_str() != id);
    }

    pub fn revoke(&self, id: &str) {
        for c in self.connections.lock().unwrap().iter_mut() {
            if c.id.as_str() == id {
                c.status = ConnectionStatus::Revoked;
            }
        }
    }
}

#[async_trait]
impl ConnectionRegistry for StaticRegistry {
    async fn get(&self, id: &ConnectionId) -> QuarryResult<Option<Connection>> {
        Ok(self
            .connections
            .lock()
            .unwrap()
            .iter()
            .find(|c| &c.id == id)
            .cloned())
    }

    async fn list_for_organization(
        &self,
        organization_id: &OrganizationId,
    ) -> QuarryResult<Vec<Connection>> {
        Ok(self
            .connections
            .lock()
            .unwrap()
            .iter()
            .filter(|c| &c.organization_id == organization_id)
            .cloned()
            .collect())
    }
}

// ── Introspector ──

#[derive(Default)]
pub struct CountingIntrospector {
    schemas: Mutex<HashMap<ConnectionId, Vec<SchemaEntity>>>,
    calls: AtomicUsize,
    failing: AtomicBool,
    delay: Mutex<Option<Duration>>,
}

impl CountingIntrospector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schema(self, connection_id: &str, entities: Vec<SchemaEntity>) -> Self {
        self.set_schema(connection_id, entities);
        self
    }

    pub fn set_schema(&self, connection_id: &str, entities: Vec<SchemaEntity>) {
        self.schemas
            .lock()
            .unwrap()
            .insert(ConnectionId::new(connection_id), entities);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SchemaIntrospector for CountingIntrospector {
    async fn introspect(&self, connection: &Connection) -> Result<Vec<SchemaEntity>, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable("introspection refused".to_string()));
        }
        Ok(self
            .schemas
            .lock()
            .unwrap()
            .get(&connection.id)
            .cloned()
            .unwrap_or_default())
    }
}

// ── History ──

/// In-memory history whose next `failures` record updates report a busy database.
#[derive(Default)]
pub struct BusyHistory {
    inner: InMemoryHistoryStore,
    failures: AtomicUsize,
    update_attempts: AtomicUsize,
}

impl BusyHistory {
    pub fn failing(failures: usize) -> Self {
        let history = Self::default();
        history.failures.store(failures, Ordering::SeqCst);
        history
    }

    pub fn update_attempts(&self) -> usize {
        self.update_attempts.load(Ordering::SeqCst)
    }
}

impl HistoryStore for BusyHistory {
    fn insert_translation(&self, translation: &Translation) -> QuarryResult<()> {
        self.inner.insert_translation(translation)
    }

    fn get_translation(&self, id: &TranslationId) -> QuarryResult<Option<Translation>> {
        self.inner.get_translation(id)
    }

    fn insert_execution(&self, record: &ExecutionRecord) -> QuarryResult<()> {
        self.inner.insert_execution(record)
    }

    fn update_execution(&self, record: &ExecutionRecord) -> QuarryResult<()> {
        self.update_attempts.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(StorageError::DbBusy.into());
        }
        self.inner.update_execution(record)
    }

    fn get_execution(&self, id: &ExecutionId) -> QuarryResult<Option<ExecutionRecord>> {
        self.inner.get_execution(id)
    }

    fn executions_for_translation(&self, id: &TranslationId) -> QuarryResult<Vec<ExecutionRecord>> {
        self.inner.executions_for_translation(id)
    }

    fn recent_targets(&self, organization_id: &OrganizationId, limit: usize) -> QuarryResult<Vec<EntityRef>> {
        self.inner.recent_targets(organization_id, limit)
    }
}

// ── Fixtures ──

pub fn connection(id: &str, kind: BackendKind) -> Connection {
    Connection {
        id: ConnectionId::new(id),
        organization_id: OrganizationId::new(ORG),
        name: format!("{} ({})", id, kind.db_type()),
        database: "shop".to_string(),
        kind,
        credential_handle: format!("cred-{}", id),
        status: ConnectionStatus::Active,
    }
}

pub fn caller() -> Caller {
    Caller::read_only(ORG)
}

pub fn customers(connection_id: &str) -> SchemaEntity {
    SchemaEntity::new(connection_id, "customers")
        .with_field(FieldDef::new("id", "integer").primary())
        .with_field(FieldDef::new("name", "text"))
        .with_field(FieldDef::new("email", "text"))
        .with_field(FieldDef::new("city", "text"))
        .with_rows(5_000)
}

pub fn orders(connection_id: &str) -> SchemaEntity {
    SchemaEntity::new(connection_id, "orders")
        .with_field(FieldDef::new("id", "integer").primary())
        .with_field(FieldDef::new("customer_id", "integer"))
        .with_field(FieldDef::new("total", "numeric"))
        .with_field(FieldDef::new("status", "text"))
        .with_index("idx_orders_customer", &["customer_id"])
        .with_rows(10_000_000)
}

pub fn products(connection_id: &str) -> SchemaEntity {
    SchemaEntity::new(connection_id, "products")
        .with_field(FieldDef::new("id", "integer").primary())
        .with_field(FieldDef::new("sku", "text"))
        .with_field(FieldDef::new("price", "numeric"))
        .with_rows(800)
}

/// Service over one Postgres connection `pg` (customers, orders, products).
pub struct Harness {
    pub service: QueryService,
    pub model: Arc<ScriptedModel>,
    pub backend: Arc<InMemoryBackend>,
    pub registry: Arc<StaticRegistry>,
    pub introspector: Arc<CountingIntrospector>,
    pub history: Arc<InMemoryHistoryStore>,
}

impl Harness {
    pub fn new(config: QuarryConfig) -> Self {
        let backend = InMemoryBackend::new()
            .with_rows("customers", 40)
            .with_rows("orders", 2_500)
            .with_rows("products", 3);
        let introspector = CountingIntrospector::new().with_schema(
            "pg",
            vec![customers("pg"), orders("pg"), products("pg")],
        );
        Self::with_parts(
            config,
            ScriptedModel::new(),
            backend,
            StaticRegistry::new(vec![connection("pg", BackendKind::Postgres)]),
            introspector,
        )
    }

    pub fn with_parts(
        config: QuarryConfig,
        model: ScriptedModel,
        backend: InMemoryBackend,
        registry: StaticRegistry,
        introspector: CountingIntrospector,
    ) -> Self {
        quarry_core::tracing::init_tracing(&config.observability);
        let model = Arc::new(model);
        let backend = Arc::new(backend);
        let registry = Arc::new(registry);
        let introspector = Arc::new(introspector);
        let history = Arc::new(InMemoryHistoryStore::new());
        let service = QueryService::new(
            config,
            Collaborators {
                model: model.clone(),
                backend: backend.clone(),
                registry: registry.clone(),
                introspector: introspector.clone(),
                history: history.clone(),
            },
        );
        Self {
            service,
            model,
            backend,
            registry,
            introspector,
            history,
        }
    }
}
