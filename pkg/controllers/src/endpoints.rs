//! Endpoints controller: turns one endpoints object into per-agent
//! catalog registrations and corrects drift with minimal writes.

use async_trait::async_trait;
use futures_util::future::join_all;
use pkg_catalog::client::CatalogClient;
use pkg_catalog::model::{CatalogRegistration, CheckUpdate};
use pkg_locator::AgentLocator;
use pkg_policy::NamespacePolicy;
use pkg_state::reader::{PodReader, SnapshotReader};
use pkg_types::agent::AgentHandle;
use pkg_types::endpoint::Endpoint;
use pkg_types::instance::{InstancePair, ServiceInstance};
use pkg_types::key::ServiceKey;
use pkg_types::mesh_config::MeshConfig;
use pkg_types::owner::OwnerKey;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::diff::diff_instances;
use crate::dispatcher::Reconciler;
use crate::error::ReconcileError;

/// Outcome of one agent-scoped batch of operations.
enum AgentOutcome {
    Ok,
    Failed(String),
    Cancelled,
}

/// Reconciles endpoints objects against the mesh catalog.
///
/// One reconciliation pass is self-contained: it reads the current
/// endpoints object and pods, computes the desired instance set, reads
/// the observed set from every relevant agent, and applies the diff.
/// Passes are idempotent, so the dispatcher can requeue freely.
pub struct EndpointsController {
    snapshots: Arc<dyn SnapshotReader>,
    pods: Arc<dyn PodReader>,
    catalog: Arc<dyn CatalogClient>,
    locator: AgentLocator,
    policy: NamespacePolicy,
}

impl EndpointsController {
    pub fn new(
        snapshots: Arc<dyn SnapshotReader>,
        pods: Arc<dyn PodReader>,
        catalog: Arc<dyn CatalogClient>,
        locator: AgentLocator,
        policy: NamespacePolicy,
    ) -> Self {
        Self {
            snapshots,
            pods,
            catalog,
            locator,
            policy,
        }
    }

    /// Run one reconciliation pass for `key`.
    pub async fn reconcile(
        &self,
        key: &ServiceKey,
        cancel: &CancellationToken,
    ) -> Result<(), ReconcileError> {
        if !self.policy.is_allowed(&key.namespace) {
            debug!("Namespace {} not allowed, skipping {}", key.namespace, key);
            return Ok(());
        }

        let owner = OwnerKey::from(key);
        let endpoint = match self.snapshots.get_endpoints(key).await {
            Ok(ep) => ep,
            // Malformed static input cannot be fixed by retrying.
            Err(e) if e.to_string().contains("Malformed object") => {
                return Err(ReconcileError::Fatal {
                    reason: e.to_string(),
                });
            }
            Err(e) => return Err(ReconcileError::Store(e)),
        };

        match endpoint {
            Some(ep) => self.converge(key, &owner, &ep, cancel).await,
            None => {
                info!("Endpoints {} deleted, deregistering everywhere", key);
                self.sweep(key, &owner, cancel).await
            }
        }
    }

    /// Normal path: build the desired set and fan out per agent.
    async fn converge(
        &self,
        key: &ServiceKey,
        owner: &OwnerKey,
        endpoint: &Endpoint,
        cancel: &CancellationToken,
    ) -> Result<(), ReconcileError> {
        let (desired_by_node, mut failures) = self.desired_instances(key, endpoint).await?;

        let mut agents = self
            .locator
            .all_agents()
            .await
            .map_err(|e| ReconcileError::Store(e.into()))?;
        let mut known_nodes: HashSet<String> =
            agents.iter().map(|a| a.node_name.clone()).collect();

        // A desired node outside the fan-out set gets a direct lookup;
        // an unlocatable agent is a failure, not a silent drop.
        for node in desired_by_node.keys() {
            if !known_nodes.contains(node) {
                match self.locator.locate(node).await {
                    Ok(agent) => {
                        known_nodes.insert(agent.node_name.clone());
                        agents.push(agent);
                    }
                    Err(e) => failures.push(e.to_string()),
                }
            }
        }

        let tasks = agents.iter().map(|agent| {
            let desired = desired_by_node
                .get(&agent.node_name)
                .cloned()
                .unwrap_or_default();
            self.reconcile_agent(agent, desired, owner, &key.namespace, cancel)
        });
        let outcomes = join_all(tasks).await;

        self.aggregate(key, agents.len(), outcomes, failures)
    }

    /// Deletion path: the owner's instances are removed from every
    /// agent; there is nothing to register.
    async fn sweep(
        &self,
        key: &ServiceKey,
        owner: &OwnerKey,
        cancel: &CancellationToken,
    ) -> Result<(), ReconcileError> {
        let agents = self
            .locator
            .all_agents()
            .await
            .map_err(|e| ReconcileError::Store(e.into()))?;

        let tasks = agents
            .iter()
            .map(|agent| self.reconcile_agent(agent, Vec::new(), owner, &key.namespace, cancel));
        let outcomes = join_all(tasks).await;

        self.aggregate(key, agents.len(), outcomes, Vec::new())
    }

    /// Desired instances grouped by node, plus address-level failures
    /// that should not abort the whole pass.
    async fn desired_instances(
        &self,
        key: &ServiceKey,
        endpoint: &Endpoint,
    ) -> Result<(HashMap<String, Vec<ServiceInstance>>, Vec<String>), ReconcileError> {
        let owner = OwnerKey::from(key);
        let mut by_node: HashMap<String, Vec<ServiceInstance>> = HashMap::new();
        let mut failures = Vec::new();

        for address in endpoint.ready_addresses() {
            let Some(pod_ref) = &address.target_pod else {
                debug!("Address {} of {} has no target pod, skipping", address.ip, key);
                continue;
            };
            let pod = match self.pods.get_pod(&pod_ref.namespace, &pod_ref.name).await {
                Ok(Some(pod)) => pod,
                Ok(None) => {
                    // Pod deleted between the endpoints update and this
                    // pass; the next endpoints update drops the address.
                    debug!("Pod {}/{} gone, skipping address", pod_ref.namespace, pod_ref.name);
                    continue;
                }
                Err(e) => return Err(ReconcileError::Store(e)),
            };

            let config = match MeshConfig::from_pod(&pod) {
                Ok(Some(config)) => config,
                Ok(None) => {
                    debug!("Pod {}/{} not injected, skipping", pod.namespace, pod.name);
                    continue;
                }
                Err(e) => {
                    warn!("Skipping address of {}: {}", key, e);
                    continue;
                }
            };

            let Some(node) = address
                .node_name
                .clone()
                .or_else(|| pod.node_name.clone())
            else {
                failures.push(format!(
                    "address {} of {} has no node assignment",
                    address.ip, key
                ));
                continue;
            };

            let service_name = config.effective_service_name(&endpoint.service_name);
            let namespace = config
                .namespace
                .clone()
                .unwrap_or_else(|| self.policy.resolve(&key.namespace));
            let port = config.port.or_else(|| endpoint.first_port()).unwrap_or(0);

            let pair = InstancePair::new(
                service_name,
                &pod.name,
                &owner,
                &namespace,
                &address.ip,
                port,
                config.tags.clone(),
            );
            let entry = by_node.entry(node).or_default();
            entry.push(pair.primary);
            entry.push(pair.proxy);
        }

        Ok((by_node, failures))
    }

    /// Apply the diff between `desired` and the agent's observed set.
    /// Deregistrations run before registrations so an id moving between
    /// namespaces is never doubly registered.
    async fn reconcile_agent(
        &self,
        agent: &AgentHandle,
        desired: Vec<ServiceInstance>,
        owner: &OwnerKey,
        k8s_namespace: &str,
        cancel: &CancellationToken,
    ) -> AgentOutcome {
        if cancel.is_cancelled() {
            return AgentOutcome::Cancelled;
        }

        let observed = match self.catalog.list_by_owner(agent, owner).await {
            Ok(listed) => listed.iter().map(|i| i.to_instance()).collect::<Vec<_>>(),
            Err(e) => return AgentOutcome::Failed(format!("{}: list failed: {}", agent, e)),
        };

        let ops = diff_instances(&desired, &observed);
        if ops.is_empty() {
            return AgentOutcome::Ok;
        }
        info!(
            "Agent {}: {} to register, {} to deregister for {}",
            agent,
            ops.register.len(),
            ops.deregister.len(),
            owner
        );

        for instance in &ops.deregister {
            if cancel.is_cancelled() {
                return AgentOutcome::Cancelled;
            }
            let namespace = (!instance.namespace.is_empty()).then_some(instance.namespace.as_str());
            if let Err(e) = self.catalog.deregister(agent, &instance.id, namespace).await {
                return AgentOutcome::Failed(format!(
                    "{}: deregister {} failed: {}",
                    agent, instance.id, e
                ));
            }
        }

        for instance in &ops.register {
            if cancel.is_cancelled() {
                return AgentOutcome::Cancelled;
            }
            let registration = CatalogRegistration::from_instance(instance, k8s_namespace);
            if let Err(e) = self.catalog.register(agent, &registration).await {
                return AgentOutcome::Failed(format!(
                    "{}: register {} failed: {}",
                    agent, instance.id, e
                ));
            }
            // The TTL check is created by the registration; a follow-up
            // update records the passing output text.
            if !instance.is_proxy() {
                let check_id = instance.health_check_id(k8s_namespace);
                let update = CheckUpdate::passing();
                if let Err(e) = self
                    .catalog
                    .set_health(agent, &check_id, true, &update.output)
                    .await
                {
                    return AgentOutcome::Failed(format!(
                        "{}: health update {} failed: {}",
                        agent, check_id, e
                    ));
                }
            }
        }

        AgentOutcome::Ok
    }

    fn aggregate(
        &self,
        key: &ServiceKey,
        total_agents: usize,
        outcomes: Vec<AgentOutcome>,
        mut failures: Vec<String>,
    ) -> Result<(), ReconcileError> {
        let mut cancelled = false;
        for outcome in outcomes {
            match outcome {
                AgentOutcome::Ok => {}
                AgentOutcome::Failed(detail) => failures.push(detail),
                AgentOutcome::Cancelled => cancelled = true,
            }
        }
        if cancelled {
            return Err(ReconcileError::Cancelled);
        }
        if failures.is_empty() {
            return Ok(());
        }
        Err(ReconcileError::PartialFailure {
            key: key.to_string(),
            failed: failures.len(),
            total: total_agents.max(failures.len()),
            details: failures.join("; "),
        })
    }
}

#[async_trait]
impl Reconciler for EndpointsController {
    async fn reconcile(
        &self,
        key: &ServiceKey,
        cancel: &CancellationToken,
    ) -> Result<(), ReconcileError> {
        EndpointsController::reconcile(self, key, cancel).await
    }
}
