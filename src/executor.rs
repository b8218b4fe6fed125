//! The chain-facing deployment executor
//!
//! The migration sequencer drives every chain mutation through the
//! [`Deployer`] trait, so tests can substitute a mock. [`EthersDeployer`] is
//! the production implementation: it loads compiled truffle artifacts,
//! applies registered library bindings to their bytecode, and submits
//! deployments and upgrades through an RPC client.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    str::FromStr,
    sync::{Arc, Mutex},
};

use ethers::{
    abi::{Address, Contract, Token},
    contract::ContractFactory,
    providers::Middleware,
    types::{Bytes, H256, U256},
};
use serde::Deserialize;

use crate::{
    constants::{
        INITIALIZER_METHOD, NUM_BYTES_ADDRESS, NUM_BYTES_STORAGE_SLOT, NUM_DEPLOY_CONFIRMATIONS,
        PROXY_ADMIN_STORAGE_SLOT, PROXY_ARTIFACT,
    },
    errors::ScriptError,
    link::{ensure_fully_linked, link_bytecode, link_placeholder},
    solidity::ProxyAdminContract,
};

/// A resolved initializer or constructor argument
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArgValue {
    /// An address argument
    Address(Address),
    /// An unsigned integer argument
    Uint(U256),
    /// A string argument
    String(String),
}

impl From<&ArgValue> for Token {
    fn from(value: &ArgValue) -> Self {
        match value {
            ArgValue::Address(address) => Token::Address(*address),
            ArgValue::Uint(value) => Token::Uint(*value),
            ArgValue::String(value) => Token::String(value.clone()),
        }
    }
}

/// The deployment executor the migration sequencer drives
///
/// Every method that mutates the chain suspends until the transaction is
/// confirmed; the sequencer depends on the returned address being final.
#[allow(async_fn_in_trait)]
pub trait Deployer {
    /// The address transactions are sent from
    fn sender(&self) -> Result<Address, ScriptError>;

    /// Deploys a contract, returning its address
    async fn deploy(&self, contract: &str, args: &[ArgValue]) -> Result<Address, ScriptError>;

    /// Deploys a contract behind a transparent upgradeable proxy, calling its
    /// initializer with the given arguments, and returns the proxy address
    async fn deploy_proxy(
        &self,
        contract: &str,
        init_args: &[ArgValue],
    ) -> Result<Address, ScriptError>;

    /// Deploys a new implementation of the contract and points the existing
    /// proxy at it, preserving the proxy's storage; returns the (unchanged)
    /// proxy address
    async fn upgrade_proxy(&self, contract: &str, proxy: Address) -> Result<Address, ScriptError>;

    /// Binds a deployed library's address into the contract's bytecode ahead
    /// of its deployment
    async fn link(
        &self,
        library: &str,
        address: Address,
        contract: &str,
    ) -> Result<(), ScriptError>;
}

/// A truffle-style compilation artifact, `<artifacts-dir>/<Contract>.json`
#[derive(Deserialize)]
struct ContractArtifact {
    /// The contract ABI
    abi: serde_json::Value,
    /// Hex-encoded creation bytecode, possibly containing unlinked
    /// library placeholders
    bytecode: String,
}

/// [`Deployer`] implementation submitting transactions through an ethers client
pub struct EthersDeployer<M> {
    /// The RPC client
    client: Arc<M>,
    /// The directory holding `<Contract>.json` compilation artifacts
    artifacts_dir: PathBuf,
    /// Library bindings registered per contract, applied when the contract's
    /// bytecode is loaded for deployment
    links: Mutex<HashMap<String, Vec<(String, Address)>>>,
}

impl<M: Middleware> EthersDeployer<M> {
    /// Creates an executor reading artifacts from the given directory
    pub fn new(client: Arc<M>, artifacts_dir: &Path) -> Self {
        Self {
            client,
            artifacts_dir: artifacts_dir.to_path_buf(),
            links: Mutex::new(HashMap::new()),
        }
    }

    /// Reads the compilation artifact for the given contract
    fn artifact(&self, contract: &str) -> Result<(Contract, String), ScriptError> {
        let path = self.artifacts_dir.join(format!("{contract}.json"));
        let contents = fs::read_to_string(&path)
            .map_err(|e| ScriptError::ArtifactParsing(format!("{}: {}", path.display(), e)))?;

        let artifact: ContractArtifact = serde_json::from_str(&contents)
            .map_err(|e| ScriptError::ArtifactParsing(format!("{}: {}", path.display(), e)))?;
        let abi: Contract = serde_json::from_value(artifact.abi)
            .map_err(|e| ScriptError::ArtifactParsing(e.to_string()))?;

        Ok((abi, artifact.bytecode))
    }

    /// Returns the contract's creation bytecode with every registered library
    /// binding applied
    fn linked_bytecode(&self, contract: &str, mut bytecode: String) -> Result<Bytes, ScriptError> {
        let bindings = self
            .links
            .lock()
            .unwrap()
            .get(contract)
            .cloned()
            .unwrap_or_default();
        for (library, address) in &bindings {
            bytecode = link_bytecode(&bytecode, library, *address)?;
        }
        ensure_fully_linked(contract, &bytecode)?;

        let raw = hex::decode(bytecode.trim_start_matches("0x"))
            .map_err(|e| ScriptError::ArtifactParsing(e.to_string()))?;
        Ok(Bytes::from(raw))
    }

    /// Deploys linked bytecode through a contract factory and waits for
    /// confirmation
    async fn deploy_factory(
        &self,
        abi: Contract,
        bytecode: Bytes,
        args: Vec<Token>,
    ) -> Result<Address, ScriptError> {
        let factory = ContractFactory::new(abi, bytecode, self.client.clone());
        let contract = factory
            .deploy_tokens(args)
            .map_err(|e| ScriptError::DeployFailure(e.to_string()))?
            .confirmations(NUM_DEPLOY_CONFIRMATIONS)
            .send()
            .await
            .map_err(|e| ScriptError::DeployFailure(e.to_string()))?;

        Ok(contract.address())
    }

    /// Reads the proxy admin contract address out of the proxy
    ///
    /// This is the recommended way to get the proxy admin address:
    /// https://github.com/OpenZeppelin/openzeppelin-contracts/blob/v5.0.0/contracts/proxy/ERC1967/ERC1967Utils.sol#L104-L106
    async fn proxy_admin(&self, proxy: Address) -> Result<Address, ScriptError> {
        // Can `unwrap` here since we know the storage slot constitutes a valid H256
        let slot = H256::from_str(PROXY_ADMIN_STORAGE_SLOT).unwrap();
        let value = self
            .client
            .get_storage_at(proxy, slot, None /* block */)
            .await
            .map_err(|e| ScriptError::UpgradeFailure(e.to_string()))?;

        Ok(Address::from_slice(
            &value.as_bytes()[NUM_BYTES_STORAGE_SLOT - NUM_BYTES_ADDRESS..NUM_BYTES_STORAGE_SLOT],
        ))
    }
}

/// Encodes the contract's initializer call for the given arguments
fn initializer_calldata(abi: &Contract, init_args: &[ArgValue]) -> Result<Vec<u8>, ScriptError> {
    let initializer = abi
        .function(INITIALIZER_METHOD)
        .map_err(|e| ScriptError::CalldataConstruction(e.to_string()))?;
    let tokens: Vec<Token> = init_args.iter().map(Token::from).collect();

    initializer
        .encode_input(&tokens)
        .map_err(|e| ScriptError::CalldataConstruction(e.to_string()))
}

impl<M: Middleware> Deployer for EthersDeployer<M> {
    fn sender(&self) -> Result<Address, ScriptError> {
        self.client.default_sender().ok_or_else(|| {
            ScriptError::ClientInitialization("client does not have a sender attached".to_string())
        })
    }

    async fn deploy(&self, contract: &str, args: &[ArgValue]) -> Result<Address, ScriptError> {
        let (abi, bytecode) = self.artifact(contract)?;
        let bytecode = self.linked_bytecode(contract, bytecode)?;
        let tokens = args.iter().map(Token::from).collect();

        self.deploy_factory(abi, bytecode, tokens).await
    }

    async fn deploy_proxy(
        &self,
        contract: &str,
        init_args: &[ArgValue],
    ) -> Result<Address, ScriptError> {
        // Implementation first; upgradeable contracts take no constructor
        // arguments, state comes in through the initializer
        let (abi, bytecode) = self.artifact(contract)?;
        let calldata = initializer_calldata(&abi, init_args)?;
        let bytecode = self.linked_bytecode(contract, bytecode)?;
        let implementation = self.deploy_factory(abi, bytecode, vec![]).await?;

        let (proxy_abi, proxy_bytecode) = self.artifact(PROXY_ARTIFACT)?;
        let proxy_bytecode = self.linked_bytecode(PROXY_ARTIFACT, proxy_bytecode)?;
        let owner = self.sender()?;

        self.deploy_factory(
            proxy_abi,
            proxy_bytecode,
            vec![
                Token::Address(implementation),
                Token::Address(owner),
                Token::Bytes(calldata),
            ],
        )
        .await
    }

    async fn upgrade_proxy(&self, contract: &str, proxy: Address) -> Result<Address, ScriptError> {
        let (abi, bytecode) = self.artifact(contract)?;
        let bytecode = self.linked_bytecode(contract, bytecode)?;
        let implementation = self.deploy_factory(abi, bytecode, vec![]).await?;

        let admin = self.proxy_admin(proxy).await?;
        ProxyAdminContract::new(admin, self.client.clone())
            .upgrade_and_call(proxy, implementation, Bytes::new())
            .send()
            .await
            .map_err(|e| ScriptError::UpgradeFailure(e.to_string()))?
            .await
            .map_err(|e| ScriptError::UpgradeFailure(e.to_string()))?;

        Ok(proxy)
    }

    async fn link(
        &self,
        library: &str,
        address: Address,
        contract: &str,
    ) -> Result<(), ScriptError> {
        let (_, bytecode) = self.artifact(contract)?;
        if !bytecode.contains(&link_placeholder(library)) {
            return Err(ScriptError::LinkFailure(format!(
                "{contract} has no link reference to {library}"
            )));
        }

        self.links
            .lock()
            .unwrap()
            .entry(contract.to_string())
            .or_default()
            .push((library.to_string(), address));

        Ok(())
    }
}
