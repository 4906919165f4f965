use pkg_constants::mesh::{META_KEY_K8S_NAMESPACE, META_KEY_K8S_SERVICE_NAME};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::key::ServiceKey;

/// Identifies the orchestration-layer endpoints object that owns a mesh
/// instance. Written into instance metadata on registration and used as
/// the filter predicate when listing observed instances.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerKey {
    pub service_name: String,
    pub namespace: String,
}

impl OwnerKey {
    pub fn new(service_name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            namespace: namespace.into(),
        }
    }

    /// Write the owner marker into an instance metadata map.
    pub fn write_meta(&self, meta: &mut HashMap<String, String>) {
        meta.insert(
            META_KEY_K8S_SERVICE_NAME.to_string(),
            self.service_name.clone(),
        );
        meta.insert(META_KEY_K8S_NAMESPACE.to_string(), self.namespace.clone());
    }

    /// Parse the owner marker out of instance metadata, if present.
    pub fn from_meta(meta: &HashMap<String, String>) -> Option<Self> {
        let service_name = meta.get(META_KEY_K8S_SERVICE_NAME)?;
        let namespace = meta.get(META_KEY_K8S_NAMESPACE)?;
        Some(Self::new(service_name, namespace))
    }

    /// Whether an instance metadata map marks this owner.
    pub fn matches(&self, meta: &HashMap<String, String>) -> bool {
        Self::from_meta(meta).as_ref() == Some(self)
    }
}

impl From<&ServiceKey> for OwnerKey {
    fn from(key: &ServiceKey) -> Self {
        Self::new(&key.name, &key.namespace)
    }
}

impl std::fmt::Display for OwnerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.service_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn round_trips_through_meta() {
        let owner = OwnerKey::new("service-created", "kube");
        let mut m = HashMap::new();
        owner.write_meta(&mut m);
        assert_eq!(OwnerKey::from_meta(&m), Some(owner.clone()));
        assert!(owner.matches(&m));
    }

    #[test]
    fn matches_ignores_extra_meta_keys() {
        let owner = OwnerKey::new("web", "default");
        let m = meta(&[
            ("k8s-service-name", "web"),
            ("k8s-namespace", "default"),
            ("pod-name", "web-abc123"),
        ]);
        assert!(owner.matches(&m));
    }

    #[test]
    fn rejects_different_owner() {
        let owner = OwnerKey::new("web", "default");
        assert!(!owner.matches(&meta(&[
            ("k8s-service-name", "web"),
            ("k8s-namespace", "other"),
        ])));
        assert!(!owner.matches(&meta(&[("k8s-service-name", "web")])));
        assert!(!owner.matches(&HashMap::new()));
    }

    #[test]
    fn derived_from_service_key() {
        let key = ServiceKey::new("kube", "service-created");
        let owner = OwnerKey::from(&key);
        assert_eq!(owner.service_name, "service-created");
        assert_eq!(owner.namespace, "kube");
    }
}
