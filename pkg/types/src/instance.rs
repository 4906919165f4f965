use pkg_constants::mesh::{
    HEALTH_CHECK_ID_SUFFIX, META_KEY_POD_NAME, SIDECAR_PROXY_PORT, SIDECAR_PROXY_SUFFIX,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::owner::OwnerKey;

/// Whether an instance is the service itself or its co-located sidecar
/// proxy. A proxy carries a back-reference to its primary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum InstanceKind {
    Primary,
    SidecarProxy {
        destination_name: String,
        destination_id: String,
    },
}

/// One service instance in the mesh catalog, identified by
/// `(id, namespace)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceInstance {
    pub id: String,
    pub name: String,
    pub namespace: String,
    pub address: String,
    pub port: u16,
    pub tags: Vec<String>,
    pub meta: HashMap<String, String>,
    pub kind: InstanceKind,
}

impl ServiceInstance {
    pub fn is_proxy(&self) -> bool {
        matches!(self.kind, InstanceKind::SidecarProxy { .. })
    }

    /// Registration equality: two instances with the same id need no
    /// re-registration when everything the catalog stores about them
    /// matches. Tags compare order-sensitively.
    pub fn same_registration(&self, other: &Self) -> bool {
        self.name == other.name
            && self.namespace == other.namespace
            && self.address == other.address
            && self.port == other.port
            && self.tags == other.tags
            && self.meta == other.meta
            && self.kind == other.kind
    }

    /// Id of the TTL health check attached to this instance.
    pub fn health_check_id(&self, k8s_namespace: &str) -> String {
        format!("{}/{}/{}", k8s_namespace, self.id, HEALTH_CHECK_ID_SUFFIX)
    }
}

/// A primary instance and its sidecar proxy. The two are always
/// registered and deregistered together, against the same agent.
#[derive(Debug, Clone, PartialEq)]
pub struct InstancePair {
    pub primary: ServiceInstance,
    pub proxy: ServiceInstance,
}

impl InstancePair {
    /// Build the pair for one endpoint address.
    ///
    /// `service_name` is the mesh service name (post-override), `owner`
    /// the originating endpoints object. The primary id is
    /// `{pod}-{service}`; the proxy derives its id, name and
    /// destination back-reference from the primary.
    pub fn new(
        service_name: &str,
        pod_name: &str,
        owner: &OwnerKey,
        namespace: &str,
        address: &str,
        port: u16,
        tags: Vec<String>,
    ) -> Self {
        let mut meta = HashMap::new();
        meta.insert(META_KEY_POD_NAME.to_string(), pod_name.to_string());
        owner.write_meta(&mut meta);

        let primary = ServiceInstance {
            id: format!("{}-{}", pod_name, service_name),
            name: service_name.to_string(),
            namespace: namespace.to_string(),
            address: address.to_string(),
            port,
            tags: tags.clone(),
            meta: meta.clone(),
            kind: InstanceKind::Primary,
        };
        let proxy = ServiceInstance {
            id: format!("{}{}", primary.id, SIDECAR_PROXY_SUFFIX),
            name: format!("{}{}", service_name, SIDECAR_PROXY_SUFFIX),
            namespace: namespace.to_string(),
            address: address.to_string(),
            port: SIDECAR_PROXY_PORT,
            tags,
            meta,
            kind: InstanceKind::SidecarProxy {
                destination_name: primary.name.clone(),
                destination_id: primary.id.clone(),
            },
        };
        Self { primary, proxy }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> InstancePair {
        InstancePair::new(
            "service-created",
            "pod1",
            &OwnerKey::new("service-created", "kube"),
            "kube",
            "1.2.3.4",
            80,
            vec!["a".to_string(), "b".to_string()],
        )
    }

    #[test]
    fn primary_and_proxy_identity() {
        let p = pair();
        assert_eq!(p.primary.id, "pod1-service-created");
        assert_eq!(p.primary.name, "service-created");
        assert_eq!(p.proxy.id, "pod1-service-created-sidecar-proxy");
        assert_eq!(p.proxy.name, "service-created-sidecar-proxy");
        assert_eq!(p.proxy.port, SIDECAR_PROXY_PORT);
        assert_eq!(
            p.proxy.kind,
            InstanceKind::SidecarProxy {
                destination_name: "service-created".to_string(),
                destination_id: "pod1-service-created".to_string(),
            }
        );
    }

    #[test]
    fn owner_meta_present_on_both() {
        let p = pair();
        let owner = OwnerKey::new("service-created", "kube");
        assert!(owner.matches(&p.primary.meta));
        assert!(owner.matches(&p.proxy.meta));
        assert_eq!(p.primary.meta.get("pod-name").unwrap(), "pod1");
    }

    #[test]
    fn registration_equality_is_order_sensitive_on_tags() {
        let a = pair().primary;
        let mut b = a.clone();
        assert!(a.same_registration(&b));
        b.tags.reverse();
        assert!(!a.same_registration(&b));
    }

    #[test]
    fn health_check_id_format() {
        let p = pair();
        assert_eq!(
            p.primary.health_check_id("kube"),
            "kube/pod1-service-created/kubernetes-health-check"
        );
    }
}
