//! Per-connection concurrency limits.

use std::sync::Arc;

use dashmap::DashMap;
use quarry_core::errors::{QuarryError, QuarryResult};
use quarry_core::types::ConnectionId;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// One semaphore per connection, created on first use.
pub struct ConnectionPools {
    max_concurrent: usize,
    semaphores: DashMap<ConnectionId, Arc<Semaphore>>,
}

impl ConnectionPools {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            max_concurrent: max_concurrent.max(1),
            semaphores: DashMap::new(),
        }
    }

    fn semaphore(&self, id: &ConnectionId) -> Arc<Semaphore> {
        self.semaphores
            .entry(id.clone())
            .or_insert_with(|| Arc::new(Semaphore::new(self.max_concurrent)))
            .clone()
    }

    /// Wait for a slot on `id`. The permit is released on drop.
    pub async fn acquire(&self, id: &ConnectionId) -> QuarryResult<OwnedSemaphorePermit> {
        self.semaphore(id)
            .acquire_owned()
            .await
            .map_err(|_| QuarryError::Concurrency(format!("pool for {} is closed", id)))
    }

    /// Free slots on `id`.
    pub fn available(&self, id: &ConnectionId) -> usize {
        self.semaphores
            .get(id)
            .map_or(self.max_concurrent, |s| s.available_permits())
    }
}
