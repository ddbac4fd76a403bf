//! Connections, backend kinds, and caller permissions.

use serde::{Deserialize, Serialize};

use super::identifiers::{ConnectionId, OrganizationId};

/// Concrete database product behind a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    MongoDb,
    Postgres,
    MySql,
    Sqlite,
}

/// Query family shared by several backend kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendFamily {
    Document,
    Relational,
}

impl BackendKind {
    pub fn family(self) -> BackendFamily {
        match self {
            Self::MongoDb => BackendFamily::Document,
            Self::Postgres | Self::MySql | Self::Sqlite => BackendFamily::Relational,
        }
    }

    /// Name reported to callers as `dbType`.
    pub fn db_type(self) -> &'static str {
        match self {
            Self::MongoDb => "mongodb",
            Self::Postgres => "postgresql",
            Self::MySql => "mysql",
            Self::Sqlite => "sqlite",
        }
    }

    /// What a single entity is called in this backend.
    pub fn entity_noun(self) -> &'static str {
        match self.family() {
            BackendFamily::Document => "collection",
            BackendFamily::Relational => "table",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Active,
    Revoked,
}

/// A database connection as seen by the core. Credentials stay opaque.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: ConnectionId,
    pub organization_id: OrganizationId,
    /// Display name, e.g. "Production analytics".
    pub name: String,
    /// Database (schema) name inside the server.
    pub database: String,
    pub kind: BackendKind,
    /// Handle resolved by the external credential service. Never inspected here.
    pub credential_handle: String,
    pub status: ConnectionStatus,
}

impl Connection {
    pub fn is_active(&self) -> bool {
        self.status == ConnectionStatus::Active
    }
}

/// What the caller is allowed to do with compiled queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    #[default]
    ReadOnly,
    /// Elevated: write-shaped bodies may be compiled.
    ReadWrite,
}

impl Permission {
    pub fn allows_mutation(self) -> bool {
        matches!(self, Self::ReadWrite)
    }
}

/// Identity of the caller of a core operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Caller {
    pub organization_id: OrganizationId,
    #[serde(default)]
    pub permission: Permission,
}

impl Caller {
    pub fn read_only(organization_id: impl Into<OrganizationId>) -> Self {
        Self {
            organization_id: organization_id.into(),
            permission: Permission::ReadOnly,
        }
    }

    pub fn elevated(organization_id: impl Into<OrganizationId>) -> Self {
        Self {
            organization_id: organization_id.into(),
            permission: Permission::ReadWrite,
        }
    }
}
