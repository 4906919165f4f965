use serde::{Deserialize, Serialize};

/// Controller configuration file (YAML).
///
/// Example `config.yaml`:
/// ```yaml
/// data-dir: /var/lib/meshsync/data
/// node-name: worker-1
/// agent-port: 8500
/// destination-namespace: default
/// enable-namespace-mirroring: true
/// namespace-mirroring-prefix: prefix-
/// allow-namespaces: ["*"]
/// deny-namespaces: ["kube-system"]
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ControllerConfigFile {
    #[serde(default, alias = "data-dir")]
    pub data_dir: Option<String>,
    /// Name of the node the controller itself runs on, for loopback
    /// agent addressing.
    #[serde(default, alias = "node-name")]
    pub node_name: Option<String>,
    #[serde(default, alias = "release-name")]
    pub release_name: Option<String>,
    #[serde(default, alias = "agent-scheme")]
    pub agent_scheme: Option<String>,
    #[serde(default, alias = "agent-port")]
    pub agent_port: Option<u16>,
    #[serde(default, alias = "destination-namespace")]
    pub destination_namespace: Option<String>,
    #[serde(default, alias = "enable-namespace-mirroring")]
    pub enable_namespace_mirroring: Option<bool>,
    #[serde(default, alias = "namespace-mirroring-prefix")]
    pub namespace_mirroring_prefix: Option<String>,
    #[serde(default, alias = "allow-namespaces")]
    pub allow_namespaces: Option<Vec<String>>,
    #[serde(default, alias = "deny-namespaces")]
    pub deny_namespaces: Option<Vec<String>>,
    #[serde(default)]
    pub workers: Option<usize>,
    #[serde(default, alias = "resync-secs")]
    pub resync_secs: Option<u64>,
}

/// Load a YAML config file, returning the default if the file doesn't exist.
pub fn load_config_file<T: serde::de::DeserializeOwned + Default>(path: &str) -> anyhow::Result<T> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(T::default());
        }
        Err(e) => return Err(e.into()),
    };
    let config: T = serde_yaml::from_str(&content)?;
    Ok(config)
}
