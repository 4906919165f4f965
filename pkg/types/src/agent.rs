use serde::{Deserialize, Serialize};

/// A resolved mesh agent: the per-node process that accepts local
/// registration calls for instances scheduled on its node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentHandle {
    /// Node the agent is colocated with.
    pub node_name: String,
    /// Host (IP or name) the agent's HTTP API is reachable on.
    pub host: String,
}

impl AgentHandle {
    pub fn new(node_name: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            node_name: node_name.into(),
            host: host.into(),
        }
    }

    /// Base URL of the agent's HTTP API.
    pub fn base_url(&self, scheme: &str, port: u16) -> String {
        format!("{}://{}:{}", scheme, self.host, port)
    }
}

impl std::fmt::Display for AgentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.host, self.node_name)
    }
}
