//! Schema catalog: per-connection snapshots with single-flight refresh.
//!
//! Readers always get a committed `Arc<SchemaSnapshot>`; a refresh builds the
//! next generation off to the side and swaps it in. Concurrent refreshes of
//! one connection collapse into a single introspection. When introspection
//! fails and an older snapshot exists, the old one keeps being served.

use std::sync::{Arc, RwLock};

use chrono::Utc;
use dashmap::DashMap;
use quarry_core::config::CatalogConfig;
use quarry_core::errors::{QuarryError, QuarryResult};
use quarry_core::traits::SchemaIntrospector;
use quarry_core::types::{Connection, ConnectionId, SchemaSnapshot};

#[derive(Default)]
struct Slot {
    current: RwLock<Option<Arc<SchemaSnapshot>>>,
    /// Held for the duration of an introspection.
    refresh: tokio::sync::Mutex<()>,
}

impl Slot {
    fn load(&self) -> QuarryResult<Option<Arc<SchemaSnapshot>>> {
        self.current
            .read()
            .map(|guard| guard.clone())
            .map_err(|e| QuarryError::Concurrency(format!("catalog lock poisoned: {}", e)))
    }

    fn store(&self, snapshot: Arc<SchemaSnapshot>) -> QuarryResult<()> {
        let mut guard = self
            .current
            .write()
            .map_err(|e| QuarryError::Concurrency(format!("catalog lock poisoned: {}", e)))?;
        *guard = Some(snapshot);
        Ok(())
    }
}

pub struct SchemaCatalog {
    config: CatalogConfig,
    introspector: Arc<dyn SchemaIntrospector>,
    slots: DashMap<ConnectionId, Arc<Slot>>,
}

impl SchemaCatalog {
    pub fn new(config: CatalogConfig, introspector: Arc<dyn SchemaIntrospector>) -> Self {
        Self {
            config,
            introspector,
            slots: DashMap::new(),
        }
    }

    fn slot(&self, id: &ConnectionId) -> Arc<Slot> {
        self.slots.entry(id.clone()).or_default().clone()
    }

    /// The committed snapshot, without triggering a refresh.
    pub fn cached(&self, id: &ConnectionId) -> Option<Arc<SchemaSnapshot>> {
        let slot = self.slots.get(id)?.clone();
        slot.load().ok().flatten()
    }

    /// A snapshot no older than the TTL, refreshing if needed.
    pub async fn snapshot(&self, connection: &Connection) -> QuarryResult<Arc<SchemaSnapshot>> {
        let slot = self.slot(&connection.id);
        let current = slot.load()?;
        if let Some(snapshot) = &current {
            if snapshot.is_fresh(Utc::now(), self.config.ttl()) {
                return Ok(snapshot.clone());
            }
        }
        self.refresh_slot(&slot, connection, current.map(|s| s.generation))
            .await
    }

    /// Force a refresh. Callers racing on the same connection share one
    /// introspection.
    pub async fn refresh(&self, connection: &Connection) -> QuarryResult<Arc<SchemaSnapshot>> {
        let slot = self.slot(&connection.id);
        let observed = slot.load()?.map(|s| s.generation);
        self.refresh_slot(&slot, connection, observed).await
    }

    /// Drop the connection's snapshot; the next read introspects.
    pub fn invalidate(&self, id: &ConnectionId) {
        self.slots.remove(id);
    }

    async fn refresh_slot(
        &self,
        slot: &Slot,
        connection: &Connection,
        observed: Option<u64>,
    ) -> QuarryResult<Arc<SchemaSnapshot>> {
        let _guard = slot.refresh.lock().await;

        let current = slot.load()?;
        if let Some(snapshot) = &current {
            if Some(snapshot.generation) != observed {
                tracing::debug!(
                    connection = %connection.id,
                    generation = snapshot.generation,
                    "schema refresh collapsed into concurrent refresh"
                );
                return Ok(snapshot.clone());
            }
        }

        match self.introspector.introspect(connection).await {
            Ok(mut entities) => {
                for entity in &mut entities {
                    entity.connection_id = connection.id.clone();
                }
                let generation = current.as_ref().map_or(1, |s| s.generation + 1);
                let snapshot = Arc::new(SchemaSnapshot {
                    connection_id: connection.id.clone(),
                    entities,
                    refreshed_at: Utc::now(),
                    generation,
                });
                slot.store(snapshot.clone())?;
                tracing::info!(
                    connection = %connection.id,
                    generation,
                    entities = snapshot.entities.len(),
                    "schema snapshot committed"
                );
                Ok(snapshot)
            }
            Err(e) => match current {
                Some(stale) => {
                    tracing::warn!(
                        connection = %connection.id,
                        generation = stale.generation,
                        error = %e,
                        "introspection failed, serving stale schema"
                    );
                    Ok(stale)
                }
                None => Err(e.into_quarry(&connection.id)),
            },
        }
    }
}
