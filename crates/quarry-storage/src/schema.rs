//! Schema SQL for history.db.

/// V1: translations and executions.
///
/// Timestamps are unix milliseconds. JSON columns hold serde_json encodings
/// of the core types.
pub const HISTORY_TABLES_V1: &str = "
    CREATE TABLE IF NOT EXISTS translations (
        id TEXT PRIMARY KEY NOT NULL,
        organization_id TEXT NOT NULL,
        connection_id TEXT NOT NULL,
        entity TEXT NOT NULL,
        text TEXT NOT NULL,
        target_json TEXT NOT NULL,
        body_json TEXT NOT NULL,
        body_fingerprint TEXT NOT NULL,
        explanation TEXT NOT NULL,
        required_indexes TEXT NOT NULL DEFAULT '[]',
        safety TEXT NOT NULL,
        cost_score REAL NOT NULL,
        requires_confirmation INTEGER NOT NULL,
        confirmation_reason TEXT,
        model_hint_json TEXT NOT NULL DEFAULT '{}',
        created_at INTEGER NOT NULL
    ) STRICT;

    CREATE TABLE IF NOT EXISTS executions (
        id TEXT PRIMARY KEY NOT NULL,
        translation_id TEXT NOT NULL REFERENCES translations(id) ON DELETE CASCADE,
        connection_id TEXT NOT NULL,
        mode TEXT NOT NULL,
        status TEXT NOT NULL,
        row_count INTEGER NOT NULL DEFAULT 0,
        execution_time_ms INTEGER NOT NULL DEFAULT 0,
        truncated INTEGER NOT NULL DEFAULT 0,
        cached INTEGER NOT NULL DEFAULT 0,
        confirmed INTEGER NOT NULL DEFAULT 0,
        confirmation_reason TEXT,
        preview_json TEXT NOT NULL DEFAULT '[]',
        body_fingerprint TEXT NOT NULL,
        replay_of TEXT,
        failure_code TEXT,
        failure_message TEXT,
        started_at INTEGER NOT NULL,
        finished_at INTEGER
    ) STRICT;

    CREATE INDEX IF NOT EXISTS idx_translations_org ON translations(organization_id);
    CREATE INDEX IF NOT EXISTS idx_executions_translation ON executions(translation_id);
    CREATE INDEX IF NOT EXISTS idx_executions_started ON executions(started_at);
";

pub const HISTORY_TABLE_NAMES: [&str; 2] = ["translations", "executions"];
