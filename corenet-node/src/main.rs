//! CLI for running a corenet node and inspecting its identity and directory.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use corenet_identity::Identity;
use corenet_node::{Node, NodeConfig};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "corenet-node")]
#[command(about = "Run a corenet P2P node or inspect its local identity")]
#[command(version)]
struct Cli {
    /// Path to the node's identity key file, generated on first run.
    #[arg(long, default_value = "node.key", env = "CORENET_IDENTITY_PATH")]
    identity_path: PathBuf,

    /// Enable verbose (debug) logging.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the node and run until interrupted.
    Run {
        /// Local address to bind the QUIC listener to.
        #[arg(short, long, default_value = "0.0.0.0:4001", env = "CORENET_LISTEN_ADDR")]
        listen: std::net::SocketAddr,

        /// Bootstrap peers, as `/ip4/.../udp/.../quic-v1/p2p/<nodeID>` strings.
        #[arg(short, long, env = "CORENET_BOOTSTRAP_PEERS")]
        bootstrap: Vec<String>,

        /// Republish and re-bootstrap interval, in seconds.
        #[arg(long, default_value = "300")]
        publish_interval_secs: u64,
    },

    /// Identity management.
    Identity {
        #[command(subcommand)]
        action: IdentityAction,
    },

    /// Print routing-table and readiness statistics for a freshly started node.
    DirectoryStats {
        #[arg(short, long, default_value = "127.0.0.1:0")]
        listen: std::net::SocketAddr,
    },
}

#[derive(Subcommand)]
enum IdentityAction {
    /// Generate a new identity key file, failing if one already exists.
    Generate,
    /// Print the NodeID and public key for the configured identity.
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose && std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "debug");
    }
    corenet_common::logging::init();

    match cli.command {
        Commands::Run {
            listen,
            bootstrap,
            publish_interval_secs,
        } => run_node(cli.identity_path, listen, bootstrap, publish_interval_secs).await,
        Commands::Identity { action } => run_identity(cli.identity_path, action),
        Commands::DirectoryStats { listen } => run_directory_stats(cli.identity_path, listen),
    }
}

async fn run_node(
    identity_path: PathBuf,
    listen: std::net::SocketAddr,
    bootstrap: Vec<String>,
    publish_interval_secs: u64,
) -> Result<()> {
    let config = NodeConfig::builder(identity_path, listen)
        .bootstrap_peers(bootstrap.clone())
        .build();
    let node = Node::start(&config).context("failed to start node")?;

    tracing::info!(node_id = %node.node_id(), "starting bootstrap");
    node.bootstrap(&bootstrap).await;

    let publisher = node.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(publish_interval_secs));
        loop {
            ticker.tick().await;
            publisher.publish_self().await;
        }
    });

    node.run().await.context("node accept loop exited")
}

fn run_identity(identity_path: PathBuf, action: IdentityAction) -> Result<()> {
    match action {
        IdentityAction::Generate => {
            if identity_path.exists() {
                anyhow::bail!("identity file already exists at {}", identity_path.display());
            }
            let identity = Identity::generate();
            identity.persist(&identity_path)?;
            println!("generated identity {}", identity.node_id());
            Ok(())
        }
        IdentityAction::Show => {
            let identity = Identity::load(&identity_path).context("failed to load identity")?;
            println!("node_id:    {}", identity.node_id());
            println!("public_key: {}", identity.public_key());
            Ok(())
        }
    }
}

fn run_directory_stats(identity_path: PathBuf, listen: std::net::SocketAddr) -> Result<()> {
    let config = NodeConfig::builder(identity_path, listen).build();
    let node = Node::start(&config).context("failed to start node")?;
    println!("node_id:       {}", node.node_id());
    println!("listen_addr:   {}", node.local_addr()?);
    println!("ready_level:   {:?}", node.ready_level());
    println!("routing_table: {} peers", node.directory().routing_table_len());
    Ok(())
}
