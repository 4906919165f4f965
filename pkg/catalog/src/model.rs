//! Wire model of the mesh agent HTTP API.
//! Field names match the agent API specification (PascalCase).

use pkg_constants::mesh::{
    HEALTH_CHECK_NAME, HEALTH_CHECK_TTL, HEALTH_PASSING_OUTPUT, KIND_CONNECT_PROXY,
};
use pkg_types::instance::{InstanceKind, ServiceInstance};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Proxy configuration of a sidecar-proxy registration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProxyConfig {
    #[serde(rename = "DestinationServiceName")]
    pub destination_service_name: String,
    #[serde(rename = "DestinationServiceID")]
    pub destination_service_id: String,
}

/// Health check definition embedded in a service registration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckDefinition {
    #[serde(rename = "CheckID")]
    pub check_id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "TTL")]
    pub ttl: String,
    /// Initial status: "passing" or "critical".
    #[serde(rename = "Status")]
    pub status: String,
}

impl CheckDefinition {
    /// The TTL check attached to a primary instance, initialized passing.
    pub fn ttl_passing(check_id: String) -> Self {
        Self {
            check_id,
            name: HEALTH_CHECK_NAME.to_string(),
            ttl: HEALTH_CHECK_TTL.to_string(),
            status: "passing".to_string(),
        }
    }
}

/// Service registration request.
/// PUT /v1/agent/service/register
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogRegistration {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Tags")]
    pub tags: Vec<String>,
    #[serde(rename = "Address")]
    pub address: String,
    #[serde(rename = "Port")]
    pub port: u16,
    #[serde(rename = "Meta")]
    pub meta: HashMap<String, String>,
    #[serde(rename = "Kind", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(rename = "Proxy", default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<ProxyConfig>,
    #[serde(rename = "Namespace", default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(rename = "Check", default, skip_serializing_if = "Option::is_none")]
    pub check: Option<CheckDefinition>,
}

impl CatalogRegistration {
    /// Build the registration for a domain instance. Primaries carry
    /// the TTL health check; proxies carry the proxy block instead.
    pub fn from_instance(instance: &ServiceInstance, k8s_namespace: &str) -> Self {
        let (kind, proxy, check) = match &instance.kind {
            InstanceKind::Primary => (
                None,
                None,
                Some(CheckDefinition::ttl_passing(
                    instance.health_check_id(k8s_namespace),
                )),
            ),
            InstanceKind::SidecarProxy {
                destination_name,
                destination_id,
            } => (
                Some(KIND_CONNECT_PROXY.to_string()),
                Some(ProxyConfig {
                    destination_service_name: destination_name.clone(),
                    destination_service_id: destination_id.clone(),
                }),
                None,
            ),
        };
        Self {
            id: instance.id.clone(),
            name: instance.name.clone(),
            tags: instance.tags.clone(),
            address: instance.address.clone(),
            port: instance.port,
            meta: instance.meta.clone(),
            kind,
            proxy,
            namespace: Some(instance.namespace.clone()),
            check,
        }
    }
}

/// One service instance as reported by an agent.
/// GET /v1/agent/services
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentInstance {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Service")]
    pub service: String,
    #[serde(rename = "Tags", default)]
    pub tags: Vec<String>,
    #[serde(rename = "Address", default)]
    pub address: String,
    #[serde(rename = "Port", default)]
    pub port: u16,
    #[serde(rename = "Meta", default)]
    pub meta: HashMap<String, String>,
    #[serde(rename = "Kind", default)]
    pub kind: Option<String>,
    #[serde(rename = "Proxy", default)]
    pub proxy: Option<ProxyConfig>,
    #[serde(rename = "Namespace", default)]
    pub namespace: Option<String>,
}

impl AgentInstance {
    /// Convert to the domain representation for diffing.
    pub fn to_instance(&self) -> ServiceInstance {
        let kind = match (&self.kind, &self.proxy) {
            (Some(k), Some(p)) if k == KIND_CONNECT_PROXY => InstanceKind::SidecarProxy {
                destination_name: p.destination_service_name.clone(),
                destination_id: p.destination_service_id.clone(),
            },
            _ => InstanceKind::Primary,
        };
        ServiceInstance {
            id: self.id.clone(),
            name: self.service.clone(),
            namespace: self.namespace.clone().unwrap_or_default(),
            address: self.address.clone(),
            port: self.port,
            tags: self.tags.clone(),
            meta: self.meta.clone(),
            kind,
        }
    }
}

/// Body of a TTL check update.
/// PUT /v1/agent/check/update/{check_id}
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckUpdate {
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "Output")]
    pub output: String,
}

impl CheckUpdate {
    pub fn new(passing: bool, output: &str) -> Self {
        Self {
            status: if passing { "passing" } else { "critical" }.to_string(),
            output: output.to_string(),
        }
    }

    pub fn passing() -> Self {
        Self::new(true, HEALTH_PASSING_OUTPUT)
    }
}
