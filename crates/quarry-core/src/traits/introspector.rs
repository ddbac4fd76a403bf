use async_trait::async_trait;

use crate::errors::BackendError;
use crate::types::{Connection, SchemaEntity};

/// Reads tables/collections, fields, indexes, and row estimates from a backend.
/// Transport mechanics live entirely behind this trait.
#[async_trait]
pub trait SchemaIntrospector: Send + Sync {
    async fn introspect(&self, connection: &Connection) -> Result<Vec<SchemaEntity>, BackendError>;
}
