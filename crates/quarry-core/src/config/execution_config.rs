//! Execution coordinator configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Row cap forced on previews.
    pub preview_row_cap: usize,
    /// Full executions are truncated here with `truncated=true`.
    pub max_rows: usize,
    /// Wall-clock bound covering pool wait and query.
    pub timeout_ms: u64,
    /// Simultaneous queries allowed against one connection.
    pub max_concurrent_per_connection: usize,
    /// Rows kept on the persisted ExecutionRecord.
    pub stored_preview_rows: usize,
    /// 0 disables the result cache.
    pub result_cache_capacity: u64,
    pub result_cache_ttl_secs: u64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            preview_row_cap: 5,
            max_rows: 1_000,
            timeout_ms: 30_000,
            max_concurrent_per_connection: 4,
            stored_preview_rows: 20,
            result_cache_capacity: 1_000,
            result_cache_ttl_secs: 60,
        }
    }
}
