//! Migration step definitions and the sequencer that executes them
//!
//! Steps run in fixed order: each one links the libraries its contract
//! depends on, performs exactly one deployment or upgrade, and records the
//! resulting address before the next step may run. Ordering is load-bearing —
//! later steps resolve initializer arguments out of the record earlier steps
//! wrote — so the first failure aborts the remainder of the sequence.

use std::fmt::{self, Display, Formatter};

use ethers::{abi::Address, types::U256};
use tracing::info;

use crate::{
    deployments::{DeploymentRecord, DeploymentStore},
    errors::ScriptError,
    executor::{ArgValue, Deployer},
    networks::lz_endpoint,
    utils::parse_recorded_address,
};

/// How a step's contract reaches the chain
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeploymentMode {
    /// A plain deployment with no proxy in front
    Simple,
    /// A fresh deployment behind a transparent upgradeable proxy
    FreshProxy,
    /// An upgrade of the already-recorded proxy to a new implementation
    UpgradeProxy,
}

/// Whether a library dependency is expected on-chain already
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkMode {
    /// The library address is read from the deployment record
    Reuse,
    /// The library is deployed, and recorded, before linking
    Deploy,
}

/// A library the step's contract must be linked against before deployment
#[derive(Clone, Debug)]
pub struct LibraryDep {
    /// Logical name of the library, which is also its record key
    pub name: &'static str,
    /// Whether to reuse the recorded deployment or make a fresh one
    pub mode: LinkMode,
}

/// Which network an endpoint-table argument refers to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NetworkRef {
    /// The network being migrated
    Current,
    /// The network hosting the main-chain contract
    MainChain,
}

/// An initializer or constructor argument, resolved when the step runs
#[derive(Clone, Debug)]
pub enum InitArg {
    /// A literal string constant
    Str(&'static str),
    /// A literal unsigned integer constant
    Uint(u64),
    /// The address an earlier step recorded under this key
    Recorded(&'static str),
    /// The deployer's own address
    Sender,
    /// The LayerZero chain id of the referenced network
    LzChainId(NetworkRef),
    /// The LayerZero endpoint address of the referenced network
    LzEndpoint(NetworkRef),
}

/// One entry in the ordered migration plan
#[derive(Clone, Debug)]
pub struct MigrationStep {
    /// Position in the plan
    pub index: usize,
    /// Artifact name of the contract to deploy or upgrade
    pub contract: &'static str,
    /// Key the resulting address is recorded under
    pub record_key: &'static str,
    /// Libraries to bind before deployment
    pub links: Vec<LibraryDep>,
    /// Deploy or upgrade mode, fixed by the operator ahead of the run
    pub mode: DeploymentMode,
    /// Arguments for the constructor (simple deploys) or the initializer
    pub init_args: Vec<InitArg>,
}

/// The states a step moves through while executing
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepState {
    /// Not yet started
    Pending,
    /// Binding library dependencies
    Linking,
    /// Submitting the deployment or upgrade
    Deploying,
    /// Persisting the resulting address
    RecordWriting,
    /// Completed
    Done,
}

impl Display for StepState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            StepState::Pending => write!(f, "pending"),
            StepState::Linking => write!(f, "linking libraries"),
            StepState::Deploying => write!(f, "deploying"),
            StepState::RecordWriting => write!(f, "recording address"),
            StepState::Done => write!(f, "done"),
        }
    }
}

/// Logs a step's transition into a new state
fn enter(step: &MigrationStep, state: StepState) {
    info!(step = step.index, contract = step.contract, "{state}");
}

/// Resolution context for [`InitArg`] values
pub struct ArgContext<'a> {
    /// The addresses recorded by earlier steps
    pub record: &'a DeploymentRecord,
    /// The network being migrated
    pub network: &'a str,
    /// The network hosting the main-chain contract
    pub main_chain: &'a str,
    /// The deployer's address
    pub sender: Address,
}

impl ArgContext<'_> {
    /// The network name a [`NetworkRef`] refers to
    fn network_name(&self, network: NetworkRef) -> &str {
        match network {
            NetworkRef::Current => self.network,
            NetworkRef::MainChain => self.main_chain,
        }
    }
}

/// Resolves plan-time argument descriptions into concrete values
///
/// A `Recorded` key absent from the record is a missing dependency; a null
/// never reaches the executor.
pub fn resolve_args(
    args: &[InitArg],
    ctx: &ArgContext<'_>,
) -> Result<Vec<ArgValue>, ScriptError> {
    args.iter().map(|arg| resolve_arg(arg, ctx)).collect()
}

/// Resolves a single argument against the context
fn resolve_arg(arg: &InitArg, ctx: &ArgContext<'_>) -> Result<ArgValue, ScriptError> {
    let value = match arg {
        InitArg::Str(value) => ArgValue::String((*value).to_string()),
        InitArg::Uint(value) => ArgValue::Uint(U256::from(*value)),
        InitArg::Recorded(key) => {
            let address = ctx.record.get(*key).ok_or_else(|| {
                ScriptError::MissingDependency(format!(
                    "no {key} address recorded for {}",
                    ctx.network
                ))
            })?;
            ArgValue::Address(parse_recorded_address(key, address)?)
        }
        InitArg::Sender => ArgValue::Address(ctx.sender),
        InitArg::LzChainId(network) => {
            let endpoint = lz_endpoint(ctx.network_name(*network))?;
            ArgValue::Uint(U256::from(endpoint.chain_id))
        }
        InitArg::LzEndpoint(network) => {
            let endpoint = lz_endpoint(ctx.network_name(*network))?;
            let address = endpoint
                .endpoint
                .parse()
                .map_err(|_| ScriptError::UnknownNetwork(ctx.network_name(*network).to_string()))?;
            ArgValue::Address(address)
        }
    };

    Ok(value)
}

/// Executes migration steps in order against a record store and an executor
pub struct Sequencer<'a, D, S> {
    /// The chain-facing executor
    deployer: &'a D,
    /// The record store step results are merged into
    store: &'a S,
    /// The network being migrated
    network: &'a str,
    /// The network hosting the main-chain contract
    main_chain: &'a str,
}

impl<'a, D: Deployer, S: DeploymentStore> Sequencer<'a, D, S> {
    /// Creates a sequencer for the given network
    pub fn new(deployer: &'a D, store: &'a S, network: &'a str, main_chain: &'a str) -> Self {
        Self {
            deployer,
            store,
            network,
            main_chain,
        }
    }

    /// Runs every step in order, stopping at the first failure
    ///
    /// The returned error names the failed step and contract; later steps are
    /// not attempted, since they read addresses the failed step would have
    /// recorded.
    pub async fn run(&self, plan: &[MigrationStep]) -> Result<(), ScriptError> {
        for step in plan {
            enter(step, StepState::Pending);
            self.run_step(step)
                .await
                .map_err(|source| ScriptError::Step {
                    index: step.index,
                    contract: step.contract.to_string(),
                    source: Box::new(source),
                })?;
            enter(step, StepState::Done);
        }

        Ok(())
    }

    /// Runs a single step through the linking and deployment sub-protocols
    async fn run_step(&self, step: &MigrationStep) -> Result<(), ScriptError> {
        // An upgrade needs the recorded proxy address before anything touches
        // the chain, library deployments included
        let record = self.store.load(self.network)?;
        if step.mode == DeploymentMode::UpgradeProxy {
            self.recorded_proxy(step, &record)?;
        }

        enter(step, StepState::Linking);
        self.link_libraries(step).await?;

        enter(step, StepState::Deploying);
        // Re-read: the linking phase may have recorded fresh library deployments
        let record = self.store.load(self.network)?;
        let ctx = ArgContext {
            record: &record,
            network: self.network,
            main_chain: self.main_chain,
            sender: self.deployer.sender()?,
        };
        let args = resolve_args(&step.init_args, &ctx)?;

        let address = match step.mode {
            DeploymentMode::Simple => self.deployer.deploy(step.contract, &args).await?,
            DeploymentMode::FreshProxy => self.deployer.deploy_proxy(step.contract, &args).await?,
            DeploymentMode::UpgradeProxy => {
                let proxy = self.recorded_proxy(step, &record)?;
                self.deployer.upgrade_proxy(step.contract, proxy).await?
            }
        };

        enter(step, StepState::RecordWriting);
        self.record(step.record_key, address)
    }

    /// Runs the linking sub-protocol for each of the step's library
    /// dependencies: reuse or deploy the library, then bind its address
    async fn link_libraries(&self, step: &MigrationStep) -> Result<(), ScriptError> {
        for dep in &step.links {
            let address = match dep.mode {
                LinkMode::Reuse => {
                    let record = self.store.load(self.network)?;
                    let recorded = record.get(dep.name).ok_or_else(|| {
                        ScriptError::MissingDependency(format!(
                            "no {} library recorded for {}",
                            dep.name, self.network
                        ))
                    })?;
                    parse_recorded_address(dep.name, recorded)?
                }
                LinkMode::Deploy => {
                    let address = self.deployer.deploy(dep.name, &[]).await?;
                    self.record(dep.name, address)?;
                    address
                }
            };

            self.deployer.link(dep.name, address, step.contract).await?;
        }

        Ok(())
    }

    /// Looks up the proxy address recorded for the step's contract
    fn recorded_proxy(
        &self,
        step: &MigrationStep,
        record: &DeploymentRecord,
    ) -> Result<Address, ScriptError> {
        let recorded = record.get(step.record_key).ok_or_else(|| {
            ScriptError::MissingDependency(format!(
                "no {} proxy recorded for {} on {}",
                step.record_key, step.contract, self.network
            ))
        })?;

        parse_recorded_address(step.record_key, recorded)
    }

    /// Merges a single deployed address into the network's record
    fn record(&self, key: &str, address: Address) -> Result<(), ScriptError> {
        let mut partial = DeploymentRecord::new();
        partial.insert(key.to_string(), format!("{address:#x}"));
        self.store.merge_and_save(self.network, &partial)
    }
}

#[cfg(test)]
mod tests {
    use ethers::{abi::Address, types::U256};

    use super::{resolve_args, ArgContext, InitArg, NetworkRef};
    use crate::{deployments::DeploymentRecord, errors::ScriptError, executor::ArgValue};

    /// A context migrating the bsc subchain with a fixed sender
    fn ctx(record: &DeploymentRecord) -> ArgContext<'_> {
        ArgContext {
            record,
            network: "bsc",
            main_chain: "rinkeby",
            sender: Address::repeat_byte(0xAA),
        }
    }

    #[test]
    fn test_literals_and_sender_resolve() {
        let record = DeploymentRecord::new();
        let args = resolve_args(
            &[InitArg::Str("Tether USD"), InitArg::Uint(18), InitArg::Sender],
            &ctx(&record),
        )
        .unwrap();

        assert_eq!(
            args,
            vec![
                ArgValue::String("Tether USD".to_string()),
                ArgValue::Uint(U256::from(18u64)),
                ArgValue::Address(Address::repeat_byte(0xAA)),
            ],
        );
    }

    #[test]
    fn test_recorded_address_resolves() {
        let mut record = DeploymentRecord::new();
        let credit = Address::from_low_u64_be(7);
        record.insert("CreditSystem".to_string(), format!("{credit:#x}"));

        let args = resolve_args(&[InitArg::Recorded("CreditSystem")], &ctx(&record)).unwrap();
        assert_eq!(args, vec![ArgValue::Address(credit)]);
    }

    #[test]
    fn test_missing_recorded_address_is_a_missing_dependency() {
        let record = DeploymentRecord::new();
        assert!(matches!(
            resolve_args(&[InitArg::Recorded("CreditSystem")], &ctx(&record)),
            Err(ScriptError::MissingDependency(_)),
        ));
    }

    #[test]
    fn test_endpoint_args_follow_the_network_ref() {
        let record = DeploymentRecord::new();
        let args = resolve_args(
            &[
                InitArg::LzChainId(NetworkRef::Current),
                InitArg::LzChainId(NetworkRef::MainChain),
            ],
            &ctx(&record),
        )
        .unwrap();

        // bsc is 102, the rinkeby main chain 10001
        assert_eq!(
            args,
            vec![
                ArgValue::Uint(U256::from(102u64)),
                ArgValue::Uint(U256::from(10001u64)),
            ],
        );
    }
}
