use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Snapshots older than this are refreshed on next read.
    pub schema_ttl_secs: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            schema_ttl_secs: 300,
        }
    }
}

impl CatalogConfig {
    /// Longest accepted TTL: ten years.
    const MAX_TTL_SECS: u64 = 315_360_000;

    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.schema_ttl_secs.min(Self::MAX_TTL_SECS) as i64)
    }
}
