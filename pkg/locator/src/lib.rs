//! Agent locator: resolves which mesh agent pod is colocated with a
//! given node, so registrations go to the agent local to the instance.

use pkg_constants::annotations::{
    AGENT_COMPONENT_LABEL, AGENT_COMPONENT_VALUE, AGENT_RELEASE_LABEL,
};
use pkg_state::reader::PodReader;
use pkg_types::agent::AgentHandle;
use pkg_types::pod::{Pod, PodPhase};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LocateError {
    /// No agent pod matches the node. Retryable: the agent may be
    /// mid-rollout.
    #[error("no mesh agent found on node {node}")]
    AgentNotFound { node: String },

    #[error("failed to list agent pods: {0}")]
    Store(#[from] anyhow::Error),
}

/// Resolves agents from label-selected agent pods in the state store.
#[derive(Clone)]
pub struct AgentLocator {
    pods: Arc<dyn PodReader>,
    selector: HashMap<String, String>,
    /// Node the controller itself runs on; its agent is addressed via
    /// loopback instead of the pod address.
    local_node: Option<String>,
}

impl AgentLocator {
    pub fn new(pods: Arc<dyn PodReader>, release_name: &str, local_node: Option<String>) -> Self {
        let mut selector = HashMap::new();
        selector.insert(
            AGENT_COMPONENT_LABEL.to_string(),
            AGENT_COMPONENT_VALUE.to_string(),
        );
        if !release_name.is_empty() {
            selector.insert(AGENT_RELEASE_LABEL.to_string(), release_name.to_string());
        }
        Self {
            pods,
            selector,
            local_node,
        }
    }

    fn handle_for(&self, pod: &Pod) -> Option<AgentHandle> {
        let node = pod.node_name.as_deref()?;
        if self.local_node.as_deref() == Some(node) {
            return Some(AgentHandle::new(node, "127.0.0.1"));
        }
        let host = pod.host_ip.as_deref().or(pod.pod_ip.as_deref())?;
        Some(AgentHandle::new(node, host))
    }

    fn running_agent_pods(&self, pods: Vec<Pod>) -> Vec<Pod> {
        pods.into_iter()
            .filter(|p| p.phase == PodPhase::Running)
            .collect()
    }

    /// The agent colocated with `node`.
    pub async fn locate(&self, node: &str) -> Result<AgentHandle, LocateError> {
        let pods = self.pods.list_pods_by_labels(&self.selector).await?;
        self.running_agent_pods(pods)
            .iter()
            .filter(|p| p.node_name.as_deref() == Some(node))
            .find_map(|p| self.handle_for(p))
            .ok_or_else(|| LocateError::AgentNotFound {
                node: node.to_string(),
            })
    }

    /// Every reachable agent, one handle per node. Used for
    /// catalog-wide sweeps (deletion path) and observed-set fan-out.
    pub async fn all_agents(&self) -> Result<Vec<AgentHandle>, LocateError> {
        let pods = self.pods.list_pods_by_labels(&self.selector).await?;
        let mut seen = HashMap::new();
        for pod in self.running_agent_pods(pods) {
            if let Some(handle) = self.handle_for(&pod) {
                seen.entry(handle.node_name.clone()).or_insert(handle);
            }
        }
        let mut agents: Vec<AgentHandle> = seen.into_values().collect();
        agents.sort_by(|a, b| a.node_name.cmp(&b.node_name));
        Ok(agents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;

    struct FakePods(Vec<Pod>);

    #[async_trait]
    impl PodReader for FakePods {
        async fn get_pod(&self, namespace: &str, name: &str) -> anyhow::Result<Option<Pod>> {
            Ok(self
                .0
                .iter()
                .find(|p| p.namespace == namespace && p.name == name)
                .cloned())
        }

        async fn list_pods_by_labels(
            &self,
            selector: &HashMap<String, String>,
        ) -> anyhow::Result<Vec<Pod>> {
            Ok(self
                .0
                .iter()
                .filter(|p| selector.iter().all(|(k, v)| p.labels.get(k) == Some(v)))
                .cloned()
                .collect())
        }
    }

    fn agent_pod(name: &str, node: &str, host_ip: &str, release: &str) -> Pod {
        let mut labels = HashMap::new();
        labels.insert("component".to_string(), "client".to_string());
        labels.insert("release".to_string(), release.to_string());
        Pod {
            id: format!("{name}-id"),
            name: name.to_string(),
            namespace: "mesh-system".to_string(),
            labels,
            annotations: HashMap::new(),
            node_name: Some(node.to_string()),
            pod_ip: Some(host_ip.to_string()),
            host_ip: Some(host_ip.to_string()),
            phase: PodPhase::Running,
            ready: true,
            created_at: Utc::now(),
        }
    }

    fn locator(pods: Vec<Pod>, local_node: Option<&str>) -> AgentLocator {
        AgentLocator::new(
            Arc::new(FakePods(pods)),
            "mesh",
            local_node.map(String::from),
        )
    }

    #[tokio::test]
    async fn locates_agent_on_matching_node() {
        let loc = locator(
            vec![
                agent_pod("agent-1", "node-1", "10.0.0.1", "mesh"),
                agent_pod("agent-2", "node-2", "10.0.0.2", "mesh"),
            ],
            None,
        );
        let agent = loc.locate("node-2").await.unwrap();
        assert_eq!(agent.host, "10.0.0.2");
        assert_eq!(agent.node_name, "node-2");
    }

    #[tokio::test]
    async fn prefers_loopback_on_local_node() {
        let loc = locator(
            vec![agent_pod("agent-1", "node-1", "10.0.0.1", "mesh")],
            Some("node-1"),
        );
        let agent = loc.locate("node-1").await.unwrap();
        assert_eq!(agent.host, "127.0.0.1");
    }

    #[tokio::test]
    async fn missing_agent_is_not_found() {
        let loc = locator(
            vec![agent_pod("agent-1", "node-1", "10.0.0.1", "mesh")],
            None,
        );
        let err = loc.locate("node-9").await.unwrap_err();
        assert!(matches!(err, LocateError::AgentNotFound { .. }));
    }

    #[tokio::test]
    async fn ignores_pods_from_other_releases() {
        let loc = locator(
            vec![agent_pod("agent-1", "node-1", "10.0.0.1", "other-release")],
            None,
        );
        assert!(loc.locate("node-1").await.is_err());
    }

    #[tokio::test]
    async fn all_agents_dedupes_per_node() {
        let loc = locator(
            vec![
                agent_pod("agent-1", "node-1", "10.0.0.1", "mesh"),
                agent_pod("agent-1b", "node-1", "10.0.0.1", "mesh"),
                agent_pod("agent-2", "node-2", "10.0.0.2", "mesh"),
            ],
            None,
        );
        let agents = loc.all_agents().await.unwrap();
        assert_eq!(agents.len(), 2);
        assert_eq!(agents[0].node_name, "node-1");
        assert_eq!(agents[1].node_name, "node-2");
    }
}
