//! Definitions of CLI arguments and commands for deploy scripts

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use clap::{Args, Parser, Subcommand, ValueEnum};
use ethers::providers::Middleware;

use crate::{
    commands::{migrate, show_deployments},
    errors::ScriptError,
};

/// Deployment and upgrade scripts for the CCAL contracts
#[derive(Parser)]
pub struct Cli {
    /// Private key of the deployer
    // TODO: Better key management
    #[arg(short, long)]
    pub priv_key: String,

    /// Network RPC URL
    #[arg(short, long)]
    pub rpc_url: String,

    /// Name of the network being deployed to
    #[arg(short, long)]
    pub network: String,

    /// Name of the network hosting the main-chain CCAL contract
    #[arg(long, env = "MAIN_CHAIN", default_value = "rinkeby")]
    pub main_chain: String,

    /// Directory containing compiled contract artifacts
    #[arg(short, long, default_value = "build/contracts")]
    pub artifacts_dir: PathBuf,

    /// Directory the per-network deployment records are written to
    #[arg(short, long, default_value = ".")]
    pub deployments_dir: PathBuf,

    /// The script to run
    #[command(subcommand)]
    pub command: Command,
}

/// The scripts that can be run
#[derive(Subcommand)]
pub enum Command {
    /// Run the ordered migration plan for the selected network
    Migrate(MigrateArgs),
    /// Print the addresses recorded for the selected network
    Deployments,
}

/// Arguments to the migrate command
#[derive(Args)]
pub struct MigrateArgs {
    /// Whether the CCAL proxy step deploys fresh or upgrades in place
    #[arg(short, long, value_enum, default_value = "fresh")]
    pub mode: ProxyMode,
}

/// The operator's choice for the proxy-backed step, fixed before the run
#[derive(ValueEnum, Copy, Clone, Debug)]
pub enum ProxyMode {
    /// Deploy a new implementation behind a new proxy
    Fresh,
    /// Upgrade the recorded proxy to a new implementation
    Upgrade,
}

impl Command {
    /// Dispatches to the selected script
    pub async fn run(
        self,
        client: Arc<impl Middleware>,
        network: &str,
        main_chain: &str,
        artifacts_dir: &Path,
        deployments_dir: &Path,
    ) -> Result<(), ScriptError> {
        match self {
            Command::Migrate(args) => {
                migrate(args, client, network, main_chain, artifacts_dir, deployments_dir).await
            }
            Command::Deployments => show_deployments(deployments_dir, network),
        }
    }
}
