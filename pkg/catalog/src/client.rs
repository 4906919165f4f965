use async_trait::async_trait;
use pkg_types::agent::AgentHandle;
use pkg_types::owner::OwnerKey;

use crate::error::CatalogError;
use crate::model::{AgentInstance, CatalogRegistration};

/// Remote capability over the mesh catalog, addressed per agent.
/// Register/deregister are idempotent by service id, so at-least-once
/// delivery is safe.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Register a service instance (and its embedded check) with an agent.
    async fn register(
        &self,
        agent: &AgentHandle,
        registration: &CatalogRegistration,
    ) -> Result<(), CatalogError>;

    /// Deregister a service instance by id. Deregistering also removes
    /// the instance's checks. `namespace` scopes the call for
    /// namespace-aware agents.
    async fn deregister(
        &self,
        agent: &AgentHandle,
        service_id: &str,
        namespace: Option<&str>,
    ) -> Result<(), CatalogError>;

    /// All instances on this agent whose metadata marks the given
    /// owner, across namespaces.
    async fn list_by_owner(
        &self,
        agent: &AgentHandle,
        owner: &OwnerKey,
    ) -> Result<Vec<AgentInstance>, CatalogError>;

    /// Flip a TTL check and record why.
    async fn set_health(
        &self,
        agent: &AgentHandle,
        check_id: &str,
        passing: bool,
        output: &str,
    ) -> Result<(), CatalogError>;
}
