use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reference to the pod backing an endpoint address.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PodRef {
    pub name: String,
    pub namespace: String,
}

/// An address of a backend pod serving a Service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointAddress {
    pub ip: String,
    #[serde(default)]
    pub node_name: Option<String>,
    #[serde(default)]
    pub target_pod: Option<PodRef>,
    #[serde(default = "default_ready")]
    pub ready: bool,
}

fn default_ready() -> bool {
    true
}

/// A port exposed by a backend pod.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointPort {
    pub name: String,
    pub port: u16,
    #[serde(default = "default_protocol")]
    pub protocol: String,
}

fn default_protocol() -> String {
    "TCP".to_string()
}

/// Endpoint represents the set of backend addresses for a Service.
/// Equivalent to an EndpointSlice in Kubernetes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoint {
    pub id: String,
    pub service_name: String,
    pub namespace: String,
    #[serde(default)]
    pub addresses: Vec<EndpointAddress>,
    #[serde(default)]
    pub ports: Vec<EndpointPort>,
    pub created_at: DateTime<Utc>,
}

impl Endpoint {
    /// Addresses the orchestration layer reports as ready.
    pub fn ready_addresses(&self) -> impl Iterator<Item = &EndpointAddress> {
        self.addresses.iter().filter(|a| a.ready)
    }

    /// Default instance port: the first declared endpoint port.
    pub fn first_port(&self) -> Option<u16> {
        self.ports.first().map(|p| p.port)
    }
}
