//! Short-lived result cache keyed by (connection, body fingerprint).

use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;
use quarry_core::types::{ConnectionId, Row};

type CacheKey = (ConnectionId, String);

/// Rows of a completed full execution. `truncated` travels with them.
#[derive(Debug, Clone)]
pub struct CachedRows {
    pub rows: Arc<Vec<Row>>,
    pub truncated: bool,
}

/// Moka cache (TinyLFU admission, TTL expiry). Capacity 0 disables it.
pub struct ResultCache {
    inner: Option<Cache<CacheKey, CachedRows>>,
}

impl ResultCache {
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        let inner = (capacity > 0 && !ttl.is_zero()).then(|| {
            Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .support_invalidation_closures()
                .build()
        });
        Self { inner }
    }

    pub fn disabled() -> Self {
        Self { inner: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    pub fn get(&self, connection_id: &ConnectionId, fingerprint: &str) -> Option<CachedRows> {
        self.inner
            .as_ref()?
            .get(&(connection_id.clone(), fingerprint.to_string()))
    }

    pub fn insert(&self, connection_id: &ConnectionId, fingerprint: &str, rows: CachedRows) {
        if let Some(cache) = &self.inner {
            cache.insert((connection_id.clone(), fingerprint.to_string()), rows);
        }
    }

    /// Drop every entry for one connection, e.g. after a schema change.
    pub fn invalidate_connection(&self, connection_id: &ConnectionId) {
        if let Some(cache) = &self.inner {
            let id = connection_id.clone();
            // Only fails when invalidation closures are disabled on the builder.
            let _ = cache.invalidate_entries_if(move |(conn, _), _| *conn == id);
        }
    }
}
