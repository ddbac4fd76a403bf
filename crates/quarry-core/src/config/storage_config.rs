//! History store configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to history.db. `None` keeps history in memory.
    pub path: Option<String>,
    /// Reader connections next to the single writer. 0 = default (2).
    pub read_pool_size: usize,
    /// Execution records older than this are pruned on open. 0 disables pruning.
    pub retention_days: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: None,
            read_pool_size: 2,
            retention_days: 90,
        }
    }
}
