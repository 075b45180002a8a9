use std::path::PathBuf;
use anyhow::Result;
use clap::{Parser, Subcommand};
use crate::crypto::Keypair;
use crate::node::config::{NodeConfig, TrackerConfig};
use crate::node::{Node, ServiceHandle};
use crate::tracker::Tracker;
use crate::utils::init_logging;

/// CLI for the tracker and peer processes.
#[derive(Parser)]
#[clap(name = "votechain", version)]
pub struct Cli {
    /// default log filter when RUST_LOG is unset
    #[clap(long, default_value = "info")]
    pub log_level: String,

    #[clap(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand)]
pub enum Cmd {
    /// Run the tracker
    Tracker {
        /// TOML config file
        #[clap(long)]
        config: Option<PathBuf>,

        /// bind address (host:port)
        #[clap(long)]
        bind: Option<String>,

        #[clap(long)]
        initial_stake: Option<u64>,
    },
    /// Run a peer node
    Peer {
        #[clap(long)]
        config: Option<PathBuf>,

        /// bind address (host:port); also the peer id
        #[clap(long)]
        bind: Option<String>,

        /// tracker address (host:port)
        #[clap(long)]
        tracker: Option<String>,

        /// topology file (`node -> neighbour, neighbour` per line)
        #[clap(long)]
        topology: Option<PathBuf>,

        /// JSON-RPC bind address
        #[clap(long)]
        rpc: Option<String>,

        /// hex Ed25519 secret key
        #[clap(long)]
        secret_key: Option<String>,

        /// mine as soon as a transaction is admitted
        #[clap(long)]
        auto_mine: bool,
    },
    /// Print a fresh key pair
    Keygen,
}

pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match cli.cmd {
        Cmd::Tracker { config, bind, initial_stake } => {
            let mut cfg = match config {
                Some(path) => TrackerConfig::load(path)?,
                None => TrackerConfig::default(),
            };
            if let Some(bind) = bind {
                cfg.bind_addr = bind;
            }
            if let Some(stake) = initial_stake {
                cfg.initial_stake = stake;
            }
            let svc = Tracker::new(cfg).start().await?;
            run_until_ctrl_c(svc).await
        }
        Cmd::Peer { config, bind, tracker, topology, rpc, secret_key, auto_mine } => {
            let mut cfg = match config {
                Some(path) => NodeConfig::load(path)?,
                None => NodeConfig::default(),
            };
            if let Some(bind) = bind {
                cfg.bind_addr = bind;
            }
            if tracker.is_some() {
                cfg.tracker_addr = tracker;
            }
            if topology.is_some() {
                cfg.topology_path = topology;
            }
            if rpc.is_some() {
                cfg.rpc_addr = rpc;
            }
            if secret_key.is_some() {
                cfg.secret_key = secret_key;
            }
            cfg.auto_mine |= auto_mine;

            let node = Node::new(cfg)?;
            let svc = node.start().await?;
            run_until_ctrl_c(svc).await
        }
        Cmd::Keygen => {
            let kp = Keypair::generate();
            println!("public {}", kp.public_hex());
            println!("secret {}", kp.secret_hex());
            Ok(())
        }
    }
}

async fn run_until_ctrl_c(svc: ServiceHandle) -> Result<()> {
    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    svc.shutdown().await?;
    tracing::info!("stopped");
    Ok(())
}
