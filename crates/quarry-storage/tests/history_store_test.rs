//! SqliteHistoryStore: round trips, lifecycle enforcement, recency, retention.

use chrono::{Duration, Utc};
use quarry_core::config::StorageConfig;
use quarry_core::errors::{QuarryError, QuarryErrorCode};
use quarry_core::traits::HistoryStore;
use quarry_core::types::{
    BackendKind, ConfirmationReason, ExecutionMode, ExecutionRecord, ExecutionStatus,
    ModelSafetyHint, OrganizationId, QueryBody, ResolvedTarget, SafetyTier, Translation,
    TranslationId,
};
use quarry_storage::SqliteHistoryStore;
use serde_json::json;
use tempfile::TempDir;

fn translation(org: &str, connection: &str, entity: &str) -> Translation {
    Translation {
        id: TranslationId::generate(),
        organization_id: OrganizationId::new(org),
        text: format!("show me {}", entity),
        target: ResolvedTarget {
            connection_id: connection.into(),
            connection_name: "Analytics".to_string(),
            database: "shop".to_string(),
            backend: BackendKind::Postgres,
            entity: entity.to_string(),
            auto_detected: true,
            confidence: Some(75.0),
            match_reasons: vec![format!("name \"{}\" mentioned", entity)],
            alternatives: vec![],
        },
        body: QueryBody::sql(format!("SELECT * FROM {} LIMIT 50", entity)),
        explanation: "Lists rows".to_string(),
        required_indexes: vec!["city".to_string()],
        safety: SafetyTier::Warning,
        cost_score: 0.42,
        requires_confirmation: true,
        confirmation_reason: Some(ConfirmationReason::HighCost),
        model_hint: ModelSafetyHint {
            safety: Some(SafetyTier::Safe),
            estimated_cost: Some(0.1),
        },
        created_at: Utc::now(),
    }
}

fn running(t: &Translation) -> ExecutionRecord {
    ExecutionRecord::running(
        t.id.clone(),
        t.target.connection_id.clone(),
        ExecutionMode::Full,
        t.body.fingerprint().unwrap(),
    )
}

#[test]
fn translation_round_trips() {
    let store = SqliteHistoryStore::open_in_memory().unwrap();
    let t = translation("org-1", "c1", "customers");
    store.insert_translation(&t).unwrap();

    let loaded = store.get_translation(&t.id).unwrap().unwrap();
    assert_eq!(loaded.body, t.body);
    assert_eq!(loaded.target, t.target);
    assert_eq!(loaded.confirmation_reason, Some(ConfirmationReason::HighCost));
    assert_eq!(loaded.model_hint, t.model_hint);
    assert_eq!(loaded.created_at.timestamp_millis(), t.created_at.timestamp_millis());
    assert!(store.get_translation(&TranslationId::new("missing")).unwrap().is_none());
}

#[test]
fn document_sort_order_round_trips() {
    let store = SqliteHistoryStore::open_in_memory().unwrap();
    let mut t = translation("org-1", "m1", "customers");
    t.body = serde_json::from_value(json!({
        "kind": "find",
        "payload": {"filter": {"city": "Oslo"}, "sort": {"name": 1, "age": -1}, "limit": 5}
    }))
    .unwrap();
    store.insert_translation(&t).unwrap();

    let loaded = store.get_translation(&t.id).unwrap().unwrap();
    let QueryBody::Find(find) = &loaded.body else {
        panic!("expected a find body, got {:?}", loaded.body);
    };
    let sort = find.sort.as_ref().and_then(|s| s.as_object()).unwrap();
    let keys: Vec<&str> = sort.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["name", "age"]);
    assert_eq!(loaded.body.fingerprint().unwrap(), t.body.fingerprint().unwrap());
}

#[test]
fn execution_lifecycle_is_monotonic() {
    let store = SqliteHistoryStore::open_in_memory().unwrap();
    let t = translation("org-1", "c1", "orders");
    store.insert_translation(&t).unwrap();

    let mut record = running(&t);
    store.insert_execution(&record).unwrap();
    assert!(store.insert_execution(&record).is_err(), "duplicate id must be refused");

    record
        .complete(2, 14, false, vec![json!({"id": 1}), json!({"id": 2})])
        .unwrap();
    store.update_execution(&record).unwrap();

    let loaded = store.get_execution(&record.id).unwrap().unwrap();
    assert_eq!(loaded.status, ExecutionStatus::Completed);
    assert_eq!(loaded.row_count, 2);
    assert_eq!(loaded.preview.len(), 2);
    assert!(loaded.finished_at.is_some());

    // A stale writer trying to fail a completed run.
    let mut stale = running(&t);
    stale.id = record.id.clone();
    stale
        .fail(&QuarryError::ExecutionTimeout { timeout_ms: 10 }, 10)
        .unwrap();
    let err = store.update_execution(&stale).unwrap_err();
    assert_eq!(err.error_code(), "INVALID_TRANSITION");

    // Terminal → same terminal is also refused.
    assert!(matches!(
        store.update_execution(&record),
        Err(QuarryError::InvalidTransition { .. })
    ));
}

#[test]
fn failed_record_keeps_failure_details() {
    let store = SqliteHistoryStore::open_in_memory().unwrap();
    let t = translation("org-1", "c1", "orders");
    store.insert_translation(&t).unwrap();

    let mut record = running(&t);
    store.insert_execution(&record).unwrap();
    record
        .fail(&QuarryError::ExecutionTimeout { timeout_ms: 250 }, 250)
        .unwrap();
    store.update_execution(&record).unwrap();

    let loaded = store.get_execution(&record.id).unwrap().unwrap();
    let failure = loaded.failure.unwrap();
    assert_eq!(failure.code, "EXECUTION_TIMEOUT");
    assert!(failure.message.contains("250"));
}

#[test]
fn update_of_unknown_execution_is_not_found() {
    let store = SqliteHistoryStore::open_in_memory().unwrap();
    let t = translation("org-1", "c1", "orders");
    let record = running(&t);
    assert!(matches!(
        store.update_execution(&record),
        Err(QuarryError::ExecutionNotFound { .. })
    ));
}

#[test]
fn executions_listed_oldest_first_with_replay_link() {
    let store = SqliteHistoryStore::open_in_memory().unwrap();
    let t = translation("org-1", "c1", "orders");
    store.insert_translation(&t).unwrap();

    let first = running(&t);
    store.insert_execution(&first).unwrap();
    let mut replay = running(&t);
    replay.mode = ExecutionMode::Replay;
    replay.replay_of = Some(first.id.clone());
    replay.started_at = first.started_at + Duration::milliseconds(5);
    store.insert_execution(&replay).unwrap();

    let listed = store.executions_for_translation(&t.id).unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, first.id);
    assert_eq!(listed[1].replay_of.as_ref(), Some(&first.id));
    assert_eq!(listed[1].body_fingerprint, listed[0].body_fingerprint);
}

#[test]
fn recent_targets_are_distinct_newest_first_and_scoped() {
    let store = SqliteHistoryStore::open_in_memory().unwrap();
    let base = Utc::now();
    for (i, entity) in ["orders", "customers", "orders", "products"].iter().enumerate() {
        let mut t = translation("org-1", "c1", entity);
        t.created_at = base + Duration::milliseconds(i as i64);
        store.insert_translation(&t).unwrap();
    }
    store
        .insert_translation(&translation("org-2", "c9", "secrets"))
        .unwrap();

    let recent = store
        .recent_targets(&OrganizationId::new("org-1"), 10)
        .unwrap();
    let names: Vec<&str> = recent.iter().map(|r| r.entity.as_str()).collect();
    assert_eq!(names, vec!["products", "orders", "customers"]);

    let capped = store
        .recent_targets(&OrganizationId::new("org-1"), 2)
        .unwrap();
    assert_eq!(capped.len(), 2);
}

#[test]
fn retention_prunes_only_old_executions() {
    let store = SqliteHistoryStore::open_in_memory().unwrap();
    let t = translation("org-1", "c1", "orders");
    store.insert_translation(&t).unwrap();

    let mut old = running(&t);
    old.started_at = Utc::now() - Duration::days(120);
    store.insert_execution(&old).unwrap();
    let fresh = running(&t);
    store.insert_execution(&fresh).unwrap();

    assert_eq!(store.apply_retention(90).unwrap(), 1);
    assert!(store.get_execution(&old.id).unwrap().is_none());
    assert!(store.get_execution(&fresh.id).unwrap().is_some());
    assert_eq!(store.apply_retention(0).unwrap(), 0);
    assert_eq!(store.translation_count().unwrap(), 1);
}

#[test]
fn file_backed_store_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("history.db");
    let config = StorageConfig {
        path: Some(path.to_string_lossy().into_owned()),
        read_pool_size: 2,
        retention_days: 90,
    };

    let t = translation("org-1", "c1", "customers");
    let record = running(&t);
    {
        let store = SqliteHistoryStore::open(&config).unwrap();
        assert!(store.pool().is_wal_mode());
        store.insert_translation(&t).unwrap();
        store.insert_execution(&record).unwrap();
    }

    let store = SqliteHistoryStore::open(&config).unwrap();
    let loaded = store.get_translation(&t.id).unwrap().unwrap();
    assert_eq!(loaded.text, t.text);
    let exec = store.get_execution(&record.id).unwrap().unwrap();
    assert_eq!(exec.status, ExecutionStatus::Running);
    assert_eq!(store.execution_count().unwrap(), 1);
}
