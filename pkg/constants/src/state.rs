//! State store key layout.

/// etcd-style prefix for endpoints objects: `{prefix}{ns}/{name}`.
pub const ENDPOINTS_PREFIX: &str = "/registry/endpoints/";

/// Prefix for pod objects: `{prefix}{ns}/{name}`.
pub const PODS_PREFIX: &str = "/registry/pods/";

/// Prefix for node objects: `{prefix}{name}`.
pub const NODES_PREFIX: &str = "/registry/nodes/";
