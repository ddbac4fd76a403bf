//! Compiled query bodies: a dialect-tagged union.
//!
//! Serialized as `{"kind": "find" | "pipeline" | "sql", "payload": {...}}`.
//! Object keys keep their written order (`preserve_order`), since a compound
//! sort document means something different when reordered. `canonical_bytes`
//! is therefore stable across serialize/deserialize cycles but sensitive to
//! key order; replay and the result cache key on it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Document-store `find` against one collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FindQuery {
    /// Filter document. Empty object means "match everything".
    #[serde(default = "empty_object")]
    pub filter: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projection: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

/// Document-store aggregation pipeline: one single-key object per stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PipelineQuery {
    pub stages: Vec<Value>,
}

impl PipelineQuery {
    /// Stage operator names in order (`$match`, `$group`, ...).
    pub fn operators(&self) -> Vec<&str> {
        self.stages
            .iter()
            .filter_map(|stage| stage.as_object())
            .filter_map(|obj| obj.keys().next().map(String::as_str))
            .collect()
    }
}

/// Relational statement text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlQuery {
    pub statement: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "lowercase")]
pub enum QueryBody {
    Find(FindQuery),
    Pipeline(PipelineQuery),
    Sql(SqlQuery),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryKind {
    Find,
    Pipeline,
    Sql,
}

impl QueryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Find => "find",
            Self::Pipeline => "pipeline",
            Self::Sql => "sql",
        }
    }
}

impl QueryBody {
    pub fn sql(statement: impl Into<String>) -> Self {
        Self::Sql(SqlQuery {
            statement: statement.into(),
        })
    }

    pub fn kind(&self) -> QueryKind {
        match self {
            Self::Find(_) => QueryKind::Find,
            Self::Pipeline(_) => QueryKind::Pipeline,
            Self::Sql(_) => QueryKind::Sql,
        }
    }

    /// The value handed back to callers as `query`: statement text for SQL,
    /// the filter/pipeline document otherwise.
    pub fn display_value(&self) -> Value {
        match self {
            Self::Sql(q) => Value::String(q.statement.clone()),
            Self::Find(q) => serde_json::to_value(q).unwrap_or(Value::Null),
            Self::Pipeline(q) => Value::Array(q.stages.clone()),
        }
    }

    pub fn canonical_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// blake3 hex digest of the canonical encoding.
    pub fn fingerprint(&self) -> Result<String, serde_json::Error> {
        let bytes = self.canonical_bytes()?;
        Ok(blake3::hash(&bytes).to_hex().to_string())
    }
}
