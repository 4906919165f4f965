//! Filesystem path constants.

/// Default config file path for the controller.
pub const DEFAULT_CONFIG: &str = "/etc/meshsync/config.yaml";

/// Default data directory for the state store.
pub const DEFAULT_DATA_DIR: &str = "/tmp/meshsync-data";
