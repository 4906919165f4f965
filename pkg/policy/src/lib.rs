//! Namespace policy: maps a source Kubernetes namespace to a
//! destination mesh namespace and decides which source namespaces the
//! controller handles at all.

use std::collections::HashSet;

/// Allow-set wildcard: every namespace is allowed.
pub const WILDCARD: &str = "*";

/// Destination-namespace resolution plus allow/deny filtering.
///
/// With mirroring enabled, each source namespace maps 1:1 to
/// `{prefix}{source}`. Otherwise every source maps to the configured
/// static destination. Deny always wins over allow; `"*"` in the allow
/// set admits everything not denied.
#[derive(Debug, Clone)]
pub struct NamespacePolicy {
    destination_namespace: String,
    enable_mirroring: bool,
    mirroring_prefix: String,
    allow: HashSet<String>,
    deny: HashSet<String>,
}

impl NamespacePolicy {
    pub fn new(
        destination_namespace: impl Into<String>,
        enable_mirroring: bool,
        mirroring_prefix: impl Into<String>,
        allow: impl IntoIterator<Item = String>,
        deny: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            destination_namespace: destination_namespace.into(),
            enable_mirroring,
            mirroring_prefix: mirroring_prefix.into(),
            allow: allow.into_iter().collect(),
            deny: deny.into_iter().collect(),
        }
    }

    /// Mirror every namespace as-is into the mesh.
    pub fn mirrored() -> Self {
        Self::new("", true, "", [WILDCARD.to_string()], [])
    }

    /// Send every namespace to one static destination.
    pub fn static_destination(destination: impl Into<String>) -> Self {
        Self::new(destination, false, "", [WILDCARD.to_string()], [])
    }

    /// Destination mesh namespace for a source namespace.
    pub fn resolve(&self, source_namespace: &str) -> String {
        if self.enable_mirroring {
            format!("{}{}", self.mirroring_prefix, source_namespace)
        } else {
            self.destination_namespace.clone()
        }
    }

    /// Whether the controller processes this source namespace.
    pub fn is_allowed(&self, namespace: &str) -> bool {
        if self.deny.contains(namespace) {
            return false;
        }
        self.allow.contains(WILDCARD) || self.allow.contains(namespace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mirroring_without_prefix() {
        let policy = NamespacePolicy::mirrored();
        assert_eq!(policy.resolve("default"), "default");
        assert_eq!(policy.resolve("kube"), "kube");
    }

    #[test]
    fn mirroring_with_prefix() {
        let policy = NamespacePolicy::new("", true, "prefix-", [WILDCARD.to_string()], []);
        assert_eq!(policy.resolve("default"), "prefix-default");
    }

    #[test]
    fn static_destination_ignores_source() {
        let policy = NamespacePolicy::static_destination("other");
        assert_eq!(policy.resolve("default"), "other");
        assert_eq!(policy.resolve("kube"), "other");
    }

    #[test]
    fn wildcard_allows_everything_not_denied() {
        let policy = NamespacePolicy::new(
            "default",
            false,
            "",
            [WILDCARD.to_string()],
            ["kube-system".to_string()],
        );
        assert!(policy.is_allowed("default"));
        assert!(policy.is_allowed("anything"));
        assert!(!policy.is_allowed("kube-system"));
    }

    #[test]
    fn explicit_allow_list() {
        let policy = NamespacePolicy::new("default", false, "", ["team-a".to_string()], []);
        assert!(policy.is_allowed("team-a"));
        assert!(!policy.is_allowed("team-b"));
    }

    #[test]
    fn deny_wins_over_allow() {
        let policy = NamespacePolicy::new(
            "default",
            false,
            "",
            ["team-a".to_string()],
            ["team-a".to_string()],
        );
        assert!(!policy.is_allowed("team-a"));
    }

    #[test]
    fn empty_allow_set_denies_everything() {
        let policy = NamespacePolicy::new("default", false, "", [], []);
        assert!(!policy.is_allowed("default"));
    }
}
