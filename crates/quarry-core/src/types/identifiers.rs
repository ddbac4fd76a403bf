//! Strongly-typed identifiers.
//!
//! All identifiers are opaque strings on the wire. Newtypes keep a connection id
//! from being passed where a translation id is expected.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// Identifier of a database connection, assigned by the external registry.
    ConnectionId
);

string_id!(
    /// Identifier of the organization owning connections and history.
    OrganizationId
);

string_id!(
    /// Identifier of a Translation (UUID v4).
    TranslationId
);

string_id!(
    /// Identifier of an ExecutionRecord (UUID v4).
    ExecutionId
);

impl TranslationId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl ExecutionId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

/// Reference to one table/collection inside one connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRef {
    pub connection_id: ConnectionId,
    pub entity: String,
}

impl EntityRef {
    pub fn new(connection_id: impl Into<ConnectionId>, entity: impl Into<String>) -> Self {
        Self {
            connection_id: connection_id.into(),
            entity: entity.into(),
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.connection_id, self.entity)
    }
}
