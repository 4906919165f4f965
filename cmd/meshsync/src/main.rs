use clap::Parser;
use pkg_catalog::http::HttpCatalogClient;
use pkg_constants::mesh::{DEFAULT_AGENT_HTTP_PORT, DEFAULT_AGENT_SCHEME, DEFAULT_CATALOG_TIMEOUT_SECS};
use pkg_constants::paths::{DEFAULT_CONFIG, DEFAULT_DATA_DIR};
use pkg_controllers::{Dispatcher, EndpointsController};
use pkg_locator::AgentLocator;
use pkg_policy::{NamespacePolicy, WILDCARD};
use pkg_state::client::StateStore;
use pkg_state::reader::StoreReader;
use pkg_state::watch::EventLog;
use pkg_types::config::{ControllerConfigFile, load_config_file};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "meshsync", about = "mesh catalog sync controller")]
struct Cli {
    /// Path to YAML config file
    #[arg(long, short, default_value = DEFAULT_CONFIG)]
    config: String,

    /// Directory for SlateDB state storage
    #[arg(long)]
    data_dir: Option<String>,

    /// Node this controller runs on; its agent is reached via loopback
    #[arg(long)]
    node_name: Option<String>,

    /// Release label agent pods are selected by
    #[arg(long)]
    release_name: Option<String>,

    /// Scheme for agent HTTP API calls
    #[arg(long)]
    agent_scheme: Option<String>,

    /// Port of the agent HTTP API on every node
    #[arg(long)]
    agent_port: Option<u16>,

    /// Static destination mesh namespace (ignored with mirroring on)
    #[arg(long)]
    destination_namespace: Option<String>,

    /// Mirror each source namespace into the mesh 1:1
    #[arg(long)]
    enable_namespace_mirroring: Option<bool>,

    /// Prefix prepended to mirrored namespace names
    #[arg(long)]
    namespace_mirroring_prefix: Option<String>,

    /// Source namespaces to reconcile ("*" for all)
    #[arg(long, value_delimiter = ',')]
    allow_namespaces: Option<Vec<String>>,

    /// Source namespaces to never reconcile; wins over allow
    #[arg(long, value_delimiter = ',')]
    deny_namespaces: Option<Vec<String>>,

    /// Number of concurrent reconciliation workers
    #[arg(long)]
    workers: Option<usize>,

    /// Seconds between full resyncs
    #[arg(long)]
    resync_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    // Load config file (returns defaults if file not found)
    let file_cfg: ControllerConfigFile = load_config_file(&cli.config)?;
    info!("Config file: {}", cli.config);

    // Merge: CLI args > config file > defaults
    let data_dir = cli
        .data_dir
        .or(file_cfg.data_dir)
        .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string());
    let node_name = cli.node_name.or(file_cfg.node_name);
    let release_name = cli
        .release_name
        .or(file_cfg.release_name)
        .unwrap_or_default();
    let agent_scheme = cli
        .agent_scheme
        .or(file_cfg.agent_scheme)
        .unwrap_or_else(|| DEFAULT_AGENT_SCHEME.to_string());
    let agent_port = cli
        .agent_port
        .or(file_cfg.agent_port)
        .unwrap_or(DEFAULT_AGENT_HTTP_PORT);
    let destination_namespace = cli
        .destination_namespace
        .or(file_cfg.destination_namespace)
        .unwrap_or_else(|| "default".to_string());
    let enable_mirroring = cli
        .enable_namespace_mirroring
        .or(file_cfg.enable_namespace_mirroring)
        .unwrap_or(false);
    let mirroring_prefix = cli
        .namespace_mirroring_prefix
        .or(file_cfg.namespace_mirroring_prefix)
        .unwrap_or_default();
    let allow_namespaces = cli
        .allow_namespaces
        .or(file_cfg.allow_namespaces)
        .unwrap_or_else(|| vec![WILDCARD.to_string()]);
    let deny_namespaces = cli
        .deny_namespaces
        .or(file_cfg.deny_namespaces)
        .unwrap_or_default();
    let workers = cli.workers.or(file_cfg.workers).unwrap_or(4);
    let resync_secs = cli.resync_secs.or(file_cfg.resync_secs).unwrap_or(300);

    info!("Starting meshsync");
    info!("  Data dir:    {}", data_dir);
    info!("  Node:        {}", node_name.as_deref().unwrap_or("<none>"));
    info!("  Agents:      {}://<node>:{}", agent_scheme, agent_port);
    if enable_mirroring {
        info!("  Namespaces:  mirrored with prefix {:?}", mirroring_prefix);
    } else {
        info!("  Namespaces:  static destination {}", destination_namespace);
    }
    info!("  Workers:     {}", workers);
    info!("  Resync:      {}s", resync_secs);

    let events = EventLog::new(1024);
    let store = StateStore::new(&data_dir)
        .await?
        .with_events(events.clone());
    let reader = Arc::new(StoreReader::new(store.clone()));

    let catalog = Arc::new(HttpCatalogClient::new(
        &agent_scheme,
        agent_port,
        Duration::from_secs(DEFAULT_CATALOG_TIMEOUT_SECS),
    )?);
    let locator = AgentLocator::new(reader.clone(), &release_name, node_name);
    let policy = NamespacePolicy::new(
        destination_namespace,
        enable_mirroring,
        mirroring_prefix,
        allow_namespaces,
        deny_namespaces,
    );

    let controller = Arc::new(EndpointsController::new(
        reader.clone(),
        reader.clone(),
        catalog,
        locator,
        policy,
    ));
    let dispatcher = Arc::new(Dispatcher::new(
        controller,
        reader,
        workers,
        Duration::from_secs(resync_secs),
    ));

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown signal received");
                cancel.cancel();
            }
        });
    }

    dispatcher.run(events.subscribe(), cancel).await;

    store.close().await?;
    Ok(())
}
