//! Mesh catalog conventions: instance metadata keys, proxy pairing,
//! health check naming.

/// Instance metadata key for the owning pod name.
pub const META_KEY_POD_NAME: &str = "pod-name";

/// Instance metadata key for the originating endpoints object name.
pub const META_KEY_K8S_SERVICE_NAME: &str = "k8s-service-name";

/// Instance metadata key for the originating Kubernetes namespace.
pub const META_KEY_K8S_NAMESPACE: &str = "k8s-namespace";

/// Suffix appended to a primary instance id/name for its sidecar proxy.
pub const SIDECAR_PROXY_SUFFIX: &str = "-sidecar-proxy";

/// Port every sidecar proxy instance is registered with.
pub const SIDECAR_PROXY_PORT: u16 = 20000;

/// Service kind of sidecar proxy registrations.
pub const KIND_CONNECT_PROXY: &str = "connect-proxy";

/// Suffix of the per-instance TTL health check id.
/// Full id = `{k8s_namespace}/{service_id}/kubernetes-health-check`.
pub const HEALTH_CHECK_ID_SUFFIX: &str = "kubernetes-health-check";

/// Display name of the per-instance TTL health check.
pub const HEALTH_CHECK_NAME: &str = "Kubernetes Health Check";

/// Check output when the orchestration layer reports the pod ready.
pub const HEALTH_PASSING_OUTPUT: &str = "Kubernetes health checks passing";

/// TTL of the health check. Effectively forever: the controller flips
/// the check explicitly instead of refreshing it on a timer.
pub const HEALTH_CHECK_TTL: &str = "100000h";

/// Default HTTP port of a mesh agent.
pub const DEFAULT_AGENT_HTTP_PORT: u16 = 8500;

/// Default scheme for talking to mesh agents.
pub const DEFAULT_AGENT_SCHEME: &str = "http";

/// Default timeout for a single catalog API call, in seconds.
pub const DEFAULT_CATALOG_TIMEOUT_SECS: u64 = 10;
