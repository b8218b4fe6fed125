//! Definitions of errors that can occur during the execution of the deploy scripts

use std::{
    error::Error,
    fmt::{self, Display, Formatter},
};

/// Errors that can occur during the execution of the deploy scripts
#[derive(Debug)]
pub enum ScriptError {
    /// An existing `deploy-<network>.json` file is not a JSON object of strings
    RecordCorrupt(String),
    /// Error reading a `deploy-<network>.json` file
    ReadDeployments(String),
    /// Error writing a `deploy-<network>.json` file
    WriteDeployments(String),
    /// A step requires an address that no earlier step has recorded
    MissingDependency(String),
    /// Library linking did not complete
    LinkFailure(String),
    /// The deployment executor reported a failure deploying a contract
    DeployFailure(String),
    /// The deployment executor reported a failure upgrading a proxy
    UpgradeFailure(String),
    /// Error parsing a contract compilation artifact
    ArtifactParsing(String),
    /// Error constructing calldata for a contract method
    CalldataConstruction(String),
    /// Error initializing the RPC client
    ClientInitialization(String),
    /// The network has no entry in the endpoint configuration table
    UnknownNetwork(String),
    /// A migration step failed, aborting the remainder of the sequence
    Step {
        /// Index of the failed step in the plan
        index: usize,
        /// Logical name of the contract the step was handling
        contract: String,
        /// The underlying failure
        source: Box<ScriptError>,
    },
}

impl Display for ScriptError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ScriptError::RecordCorrupt(s) => write!(f, "corrupt deployment record: {}", s),
            ScriptError::ReadDeployments(s) => write!(f, "error reading deployments: {}", s),
            ScriptError::WriteDeployments(s) => write!(f, "error writing deployments: {}", s),
            ScriptError::MissingDependency(s) => write!(f, "missing dependency: {}", s),
            ScriptError::LinkFailure(s) => write!(f, "error linking library: {}", s),
            ScriptError::DeployFailure(s) => write!(f, "error deploying contract: {}", s),
            ScriptError::UpgradeFailure(s) => write!(f, "error upgrading proxy: {}", s),
            ScriptError::ArtifactParsing(s) => write!(f, "error parsing artifact: {}", s),
            ScriptError::CalldataConstruction(s) => write!(f, "error constructing calldata: {}", s),
            ScriptError::ClientInitialization(s) => write!(f, "error initializing client: {}", s),
            ScriptError::UnknownNetwork(s) => write!(f, "no endpoint configuration for network {}", s),
            ScriptError::Step {
                index,
                contract,
                source,
            } => write!(f, "migration step {} ({}) failed: {}", index, contract, source),
        }
    }
}

impl Error for ScriptError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ScriptError::Step { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}
