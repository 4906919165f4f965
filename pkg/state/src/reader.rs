use async_trait::async_trait;
use pkg_constants::state::{ENDPOINTS_PREFIX, PODS_PREFIX};
use pkg_types::endpoint::Endpoint;
use pkg_types::key::ServiceKey;
use pkg_types::pod::Pod;
use std::collections::HashMap;

use crate::client::StateStore;

/// Read access to endpoints objects, keyed by namespace/name.
#[async_trait]
pub trait SnapshotReader: Send + Sync {
    /// Current endpoints object for the key, or `None` if deleted.
    async fn get_endpoints(&self, key: &ServiceKey) -> anyhow::Result<Option<Endpoint>>;

    /// Keys of every endpoints object currently in the store.
    async fn list_endpoint_keys(&self) -> anyhow::Result<Vec<ServiceKey>>;
}

/// Read access to pods.
#[async_trait]
pub trait PodReader: Send + Sync {
    async fn get_pod(&self, namespace: &str, name: &str) -> anyhow::Result<Option<Pod>>;

    /// Pods whose labels contain every `selector` pair.
    async fn list_pods_by_labels(
        &self,
        selector: &HashMap<String, String>,
    ) -> anyhow::Result<Vec<Pod>>;
}

/// Map a registry key back to a ServiceKey, if it is an endpoints key.
pub fn parse_endpoints_key(key: &str) -> Option<ServiceKey> {
    let rest = key.strip_prefix(ENDPOINTS_PREFIX)?;
    let (ns, name) = rest.split_once('/')?;
    if ns.is_empty() || name.is_empty() {
        return None;
    }
    Some(ServiceKey::new(ns, name))
}

/// Store-backed implementation of both reader traits.
#[derive(Clone)]
pub struct StoreReader {
    store: StateStore,
}

impl StoreReader {
    pub fn new(store: StateStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl SnapshotReader for StoreReader {
    async fn get_endpoints(&self, key: &ServiceKey) -> anyhow::Result<Option<Endpoint>> {
        let store_key = format!("{}{}/{}", ENDPOINTS_PREFIX, key.namespace, key.name);
        self.store.get_json(&store_key).await
    }

    async fn list_endpoint_keys(&self) -> anyhow::Result<Vec<ServiceKey>> {
        let entries = self.store.list_prefix(ENDPOINTS_PREFIX).await?;
        Ok(entries
            .into_iter()
            .filter_map(|(k, _)| parse_endpoints_key(&k))
            .collect())
    }
}

#[async_trait]
impl PodReader for StoreReader {
    async fn get_pod(&self, namespace: &str, name: &str) -> anyhow::Result<Option<Pod>> {
        let store_key = format!("{}{}/{}", PODS_PREFIX, namespace, name);
        self.store.get_json(&store_key).await
    }

    async fn list_pods_by_labels(
        &self,
        selector: &HashMap<String, String>,
    ) -> anyhow::Result<Vec<Pod>> {
        let pods: Vec<Pod> = self.store.list_json(PODS_PREFIX).await?;
        Ok(pods
            .into_iter()
            .filter(|pod| {
                selector
                    .iter()
                    .all(|(k, v)| pod.labels.get(k) == Some(v))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_endpoints_keys() {
        assert_eq!(
            parse_endpoints_key("/registry/endpoints/kube/service-created"),
            Some(ServiceKey::new("kube", "service-created"))
        );
        assert_eq!(parse_endpoints_key("/registry/pods/kube/pod1"), None);
        assert_eq!(parse_endpoints_key("/registry/endpoints/kube"), None);
        assert_eq!(parse_endpoints_key("/registry/endpoints//x"), None);
    }
}
