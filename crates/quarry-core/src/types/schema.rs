//! Cached schema shape consumed by the resolver, compiler, and classifier.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::identifiers::ConnectionId;

/// One column / document field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDef {
    pub name: String,
    pub field_type: String,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub primary_key: bool,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into(),
            nullable: true,
            primary_key: false,
        }
    }

    pub fn primary(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexDef {
    pub name: String,
    /// Indexed fields, leading field first.
    pub fields: Vec<String>,
    #[serde(default)]
    pub unique: bool,
}

/// A table or collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaEntity {
    pub connection_id: ConnectionId,
    pub name: String,
    pub fields: Vec<FieldDef>,
    #[serde(default)]
    pub indexes: Vec<IndexDef>,
    /// Approximate row/document count reported by the backend.
    #[serde(default)]
    pub estimated_rows: u64,
}

impl SchemaEntity {
    pub fn new(connection_id: impl Into<ConnectionId>, name: impl Into<String>) -> Self {
        Self {
            connection_id: connection_id.into(),
            name: name.into(),
            fields: Vec::new(),
            indexes: Vec::new(),
            estimated_rows: 0,
        }
    }

    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_index(mut self, name: impl Into<String>, fields: &[&str]) -> Self {
        self.indexes.push(IndexDef {
            name: name.into(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
            unique: false,
        });
        self
    }

    pub fn with_rows(mut self, estimated_rows: u64) -> Self {
        self.estimated_rows = estimated_rows;
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name.eq_ignore_ascii_case(name))
    }

    /// A field counts as indexed when it leads an index or is the primary key.
    /// Mongo's implicit `_id` index is always present.
    pub fn is_indexed(&self, field: &str) -> bool {
        if field == "_id" {
            return true;
        }
        if self
            .field(field)
            .is_some_and(|f| f.primary_key)
        {
            return true;
        }
        self.indexes.iter().any(|idx| {
            idx.fields
                .first()
                .is_some_and(|lead| lead.eq_ignore_ascii_case(field))
        })
    }
}

/// Committed catalog state for one connection.
///
/// Snapshots are immutable; a refresh builds a new one with `generation + 1`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaSnapshot {
    pub connection_id: ConnectionId,
    pub entities: Vec<SchemaEntity>,
    pub refreshed_at: DateTime<Utc>,
    pub generation: u64,
}

impl SchemaSnapshot {
    pub fn entity(&self, name: &str) -> Option<&SchemaEntity> {
        self.entities
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(name))
    }

    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> bool {
        now.signed_duration_since(self.refreshed_at) < ttl
    }
}
