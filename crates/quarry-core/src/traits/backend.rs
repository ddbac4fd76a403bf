use async_trait::async_trait;

use crate::errors::BackendError;
use crate::types::{Connection, QueryBody, Row};

/// Rows returned by a backend run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryRows {
    pub rows: Vec<Row>,
}

impl QueryRows {
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }
}

/// Runs compiled bodies against a backing database.
///
/// `row_limit` is advisory: backends should stop after that many rows, and the
/// coordinator truncates anything beyond it regardless.
#[async_trait]
pub trait QueryBackend: Send + Sync {
    async fn run(
        &self,
        connection: &Connection,
        entity: &str,
        body: &QueryBody,
        row_limit: usize,
    ) -> Result<QueryRows, BackendError>;
}
