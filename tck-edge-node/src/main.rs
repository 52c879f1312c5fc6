use anyhow::Context;
use clap::Parser;
use log::{error, info};
use sparkplug_tck_edge_node::{EdgeNodeConfig, MqttSessionFactory, StdinConsole, TckEdgeNode};
use std::path::PathBuf;
use tokio::signal;
use tokio::sync::broadcast;

#[cfg(test)]
mod tests;

#[derive(Parser, Debug)]
#[command(name = "tck-edge-node")]
#[command(about = "Sparkplug TCK edge node driven by the TCK console over MQTT")]
#[command(
    after_help = "Example:\n  tck-edge-node --broker tcp://localhost:1883 --group-id MyGroup --edge-node-id Edge01"
)]
struct Args {
    /// MQTT broker URL (default: tcp://localhost:1883)
    #[arg(long)]
    broker: Option<String>,

    /// Group ID (default: tck_group)
    #[arg(long)]
    group_id: Option<String>,

    /// Edge Node ID (default: tck_edge)
    #[arg(long)]
    edge_node_id: Option<String>,

    /// MQTT username
    #[arg(long)]
    username: Option<String>,

    /// MQTT password
    #[arg(long)]
    password: Option<String>,

    /// Prefix for the control connection's client ID
    #[arg(long)]
    client_id_prefix: Option<String>,

    /// Configuration file (TOML, YAML or JSON); TCK_* environment variables also apply
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl Args {
    /// Flags override the file and environment
    fn apply(self, mut config: EdgeNodeConfig) -> EdgeNodeConfig {
        if let Some(broker) = self.broker {
            config.broker_url = broker;
        }
        if let Some(group_id) = self.group_id {
            config.group_id = group_id;
        }
        if let Some(edge_node_id) = self.edge_node_id {
            config.edge_node_id = edge_node_id;
        }
        if let Some(username) = self.username {
            config.username = Some(username);
        }
        if let Some(password) = self.password {
            config.password = Some(password);
        }
        if let Some(prefix) = self.client_id_prefix {
            config.client_id_prefix = prefix;
        }
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = EdgeNodeConfig::load(args.config.as_deref())
        .context("Failed to load configuration")?;
    let config = args.apply(config);

    info!("Sparkplug TCK Edge Node");
    info!("  Broker URL: {}", config.broker_url);
    info!("  Group ID: {}", config.group_id);
    info!("  Edge Node ID: {}", config.edge_node_id);
    if let Some(username) = config.username.as_deref().filter(|u| !u.is_empty()) {
        info!("  Username: {}", username);
    }

    let mut node = TckEdgeNode::new(config, MqttSessionFactory::new(), StdinConsole::new())
        .context("Failed to create TCK Edge Node")?;
    node.start().context("Failed to start TCK Edge Node")?;

    info!("TCK Edge Node is running. Waiting for test commands from TCK Console...");
    info!("Press Ctrl+C to exit.");

    let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move {
        wait_for_termination().await;
        info!("Received termination signal, shutting down...");
        if let Err(e) = shutdown_tx.send(()) {
            error!("Failed to send shutdown signal: {}", e);
        }
    });

    let _ = shutdown_rx.recv().await;
    node.stop().await;

    info!("TCK Edge Node terminated.");
    Ok(())
}

async fn wait_for_termination() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for ctrl-c signal: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
