//! Constants used in the deploy scripts

/// The prefix of the per-network deployment record file, completed as
/// `deploy-<network>.json`
pub const DEPLOYMENTS_FILE_PREFIX: &str = "deploy-";

/// The indentation used when pretty-printing deployment record files
pub const JSON_INDENT: u16 = 4;

/// The credit scoring contract key in the deployment record
pub const CREDIT_SYSTEM_KEY: &str = "CreditSystem";

/// The game asset contract key in the deployment record
pub const GAME_KEY: &str = "Game";

/// The settlement currency contract key in the deployment record
pub const USDT_KEY: &str = "USDT";

/// The CCAL proxy contract key in the deployment record, shared by the
/// main-chain and subchain variants
pub const CCAL_KEY: &str = "CCALAddress";

/// The name of the main-chain CCAL contract artifact
pub const CCAL_MAIN_CONTRACT: &str = "CCALMainChain";

/// The name of the subchain CCAL contract artifact
pub const CCAL_SUB_CONTRACT: &str = "CCALSubChain";

/// The shared error-definitions library both CCAL contracts link against
pub const ERRORS_LIBRARY: &str = "Errors";

/// The validation-logic library both CCAL contracts link against
pub const VALIDATE_LOGIC_LIBRARY: &str = "ValidateLogic";

/// The name of the upgradeable proxy contract artifact
///
/// See https://docs.openzeppelin.com/contracts/4.x/api/proxy#transparent_proxy
pub const PROXY_ARTIFACT: &str = "TransparentUpgradeableProxy";

/// The name of the initializer method called through a freshly deployed proxy
pub const INITIALIZER_METHOD: &str = "initialize";

/// The number of confirmations to wait for a deployment transaction
pub const NUM_DEPLOY_CONFIRMATIONS: usize = 1;

/// The storage slot containing the proxy admin contract address in the upgradeable proxy.
///
/// This is specified in EIP1967: https://eips.ethereum.org/EIPS/eip-1967#admin-address
pub const PROXY_ADMIN_STORAGE_SLOT: &str =
    "0xb53127684a568b3173ae13b9f8a6016e243e63b6e8ee1178d6a717850b5d6103";

/// The number of bytes stored in a single storage slot
pub const NUM_BYTES_STORAGE_SLOT: usize = 32;

/// The number of bytes in an Ethereum address
pub const NUM_BYTES_ADDRESS: usize = 20;

/// The length of the placeholder the compiler leaves for an unlinked library
pub const LINK_PLACEHOLDER_LEN: usize = 40;

/// The platform fee the main-chain contract is initialized with, in basis points
pub const PLATFORM_FEE: u64 = 500;

/// The decimals of the settlement currency
pub const CURRENCY_DECIMALS: u64 = 18;
