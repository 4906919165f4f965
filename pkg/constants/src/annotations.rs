//! Pod label and annotation keys consumed by the controller.

/// Label *and* annotation key marking a pod as mesh-managed.
/// Set by the sidecar injector; the controller only reads it.
pub const KEY_INJECT_STATUS: &str = "meshsync.dev/inject-status";

/// Value of [`KEY_INJECT_STATUS`] once injection has happened.
pub const INJECTED: &str = "injected";

/// Overrides the mesh service name for a pod's instances.
/// Defaults to the endpoints object name when absent.
pub const ANNOTATION_SERVICE: &str = "meshsync.dev/service-name";

/// Port the primary service instance is registered with.
/// Must parse as a u16; a malformed value skips the pod's address.
pub const ANNOTATION_SERVICE_PORT: &str = "meshsync.dev/service-port";

/// Comma-separated tags applied to both the primary and proxy instance.
pub const ANNOTATION_SERVICE_TAGS: &str = "meshsync.dev/service-tags";

/// Overrides the destination mesh namespace for a pod's instances.
pub const ANNOTATION_SERVICE_NAMESPACE: &str = "meshsync.dev/service-namespace";

/// Label key identifying mesh agent pods.
pub const AGENT_COMPONENT_LABEL: &str = "component";

/// Label value identifying mesh agent pods.
pub const AGENT_COMPONENT_VALUE: &str = "client";

/// Label key carrying the release name on agent pods.
pub const AGENT_RELEASE_LABEL: &str = "release";
