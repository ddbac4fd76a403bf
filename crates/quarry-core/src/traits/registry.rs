use async_trait::async_trait;

use crate::errors::QuarryResult;
use crate::types::{Connection, ConnectionId, OrganizationId};

/// Read-only view of the externally managed connection registry.
#[async_trait]
pub trait ConnectionRegistry: Send + Sync {
    /// `None` when the connection never existed or was deleted.
    async fn get(&self, id: &ConnectionId) -> QuarryResult<Option<Connection>>;

    /// Connections the organization may query, revoked ones included.
    async fn list_for_organization(
        &self,
        organization_id: &OrganizationId,
    ) -> QuarryResult<Vec<Connection>>;
}
