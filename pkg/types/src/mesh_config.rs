use pkg_constants::annotations::{
    ANNOTATION_SERVICE, ANNOTATION_SERVICE_NAMESPACE, ANNOTATION_SERVICE_PORT,
    ANNOTATION_SERVICE_TAGS, INJECTED, KEY_INJECT_STATUS,
};
use thiserror::Error;

use crate::pod::Pod;

#[derive(Debug, Error)]
pub enum MeshConfigError {
    #[error("pod {pod}: annotation {annotation} has invalid value {value:?}: {reason}")]
    InvalidAnnotation {
        pod: String,
        annotation: &'static str,
        value: String,
        reason: String,
    },
}

/// Typed mesh configuration of a single pod, parsed and validated once
/// per reconciliation pass instead of re-reading annotation maps at
/// every use site.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeshConfig {
    /// Mesh service name override; defaults to the endpoints object name.
    pub service_name: Option<String>,
    /// Port the primary instance is registered with.
    pub port: Option<u16>,
    /// Tags applied to both instances, in annotation order.
    pub tags: Vec<String>,
    /// Destination mesh namespace override.
    pub namespace: Option<String>,
}

impl MeshConfig {
    /// Whether the sidecar injector has marked this pod as mesh-managed.
    /// The marker is written as both a label and an annotation; either
    /// counts.
    pub fn is_injected(pod: &Pod) -> bool {
        pod.labels.get(KEY_INJECT_STATUS).map(String::as_str) == Some(INJECTED)
            || pod.annotations.get(KEY_INJECT_STATUS).map(String::as_str) == Some(INJECTED)
    }

    /// Parse a pod's mesh annotations. Returns `Ok(None)` for pods
    /// without the injection marker; `Err` for a malformed annotation
    /// (which skips only this pod's address, per the error taxonomy).
    pub fn from_pod(pod: &Pod) -> Result<Option<Self>, MeshConfigError> {
        if !Self::is_injected(pod) {
            return Ok(None);
        }

        let invalid = |annotation: &'static str, value: &str, reason: &str| {
            MeshConfigError::InvalidAnnotation {
                pod: format!("{}/{}", pod.namespace, pod.name),
                annotation,
                value: value.to_string(),
                reason: reason.to_string(),
            }
        };

        let service_name = match pod.annotations.get(ANNOTATION_SERVICE) {
            Some(v) if v.trim().is_empty() => {
                return Err(invalid(ANNOTATION_SERVICE, v, "must not be empty"));
            }
            Some(v) => Some(v.clone()),
            None => None,
        };

        let port = match pod.annotations.get(ANNOTATION_SERVICE_PORT) {
            Some(v) => Some(
                v.parse::<u16>()
                    .map_err(|e| invalid(ANNOTATION_SERVICE_PORT, v, &e.to_string()))?,
            ),
            None => None,
        };

        let tags = pod
            .annotations
            .get(ANNOTATION_SERVICE_TAGS)
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        let namespace = match pod.annotations.get(ANNOTATION_SERVICE_NAMESPACE) {
            Some(v) if v.trim().is_empty() => {
                return Err(invalid(ANNOTATION_SERVICE_NAMESPACE, v, "must not be empty"));
            }
            Some(v) => Some(v.clone()),
            None => None,
        };

        Ok(Some(Self {
            service_name,
            port,
            tags,
            namespace,
        }))
    }

    /// Mesh service name after applying the override annotation.
    pub fn effective_service_name<'a>(&'a self, endpoints_name: &'a str) -> &'a str {
        self.service_name.as_deref().unwrap_or(endpoints_name)
    }
}
