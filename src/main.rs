use ccal_scripts::{cli::Cli, errors::ScriptError, utils::setup_client};
use clap::Parser;

#[tokio::main]
async fn main() -> Result<(), ScriptError> {
    let Cli {
        priv_key,
        rpc_url,
        network,
        main_chain,
        artifacts_dir,
        deployments_dir,
        command,
    } = Cli::parse();

    tracing_subscriber::fmt().pretty().init();

    let client = setup_client(&priv_key, &rpc_url).await?;

    command
        .run(client, &network, &main_chain, &artifacts_dir, &deployments_dir)
        .await
}
