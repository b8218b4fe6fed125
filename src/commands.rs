//! Implementations of the various deploy scripts

use std::{path::Path, sync::Arc};

use ethers::providers::Middleware;
use tracing::info;

use crate::{
    cli::{MigrateArgs, ProxyMode},
    deployments::{DeploymentStore, FileDeploymentStore},
    errors::ScriptError,
    executor::EthersDeployer,
    migrations::{DeploymentMode, Sequencer},
    plan::migration_plan,
};

/// Runs the migration plan for the selected network
pub async fn migrate(
    args: MigrateArgs,
    client: Arc<impl Middleware>,
    network: &str,
    main_chain: &str,
    artifacts_dir: &Path,
    deployments_dir: &Path,
) -> Result<(), ScriptError> {
    let store = FileDeploymentStore::new(deployments_dir);
    let record = store.load(network)?;

    let ccal_mode = match args.mode {
        ProxyMode::Fresh => DeploymentMode::FreshProxy,
        ProxyMode::Upgrade => DeploymentMode::UpgradeProxy,
    };
    let plan = migration_plan(network, main_chain, ccal_mode, &record);
    info!(network, steps = plan.len(), "running migrations");

    let deployer = EthersDeployer::new(client, artifacts_dir);
    Sequencer::new(&deployer, &store, network, main_chain)
        .run(&plan)
        .await?;

    for (name, address) in store.load(network)? {
        println!("{name}: {address}");
    }

    Ok(())
}

/// Prints the addresses recorded for the selected network
pub fn show_deployments(deployments_dir: &Path, network: &str) -> Result<(), ScriptError> {
    let store = FileDeploymentStore::new(deployments_dir);
    let record = store.load(network)?;
    if record.is_empty() {
        println!("no deployments recorded for {network}");
        return Ok(());
    }

    for (name, address) in record {
        println!("{name}: {address}");
    }

    Ok(())
}
