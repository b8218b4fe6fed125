//! LayerZero endpoint configuration, keyed by network name
//!
//! The CCAL contracts pass messages between chains over LayerZero; each
//! network the scripts know about carries the protocol's chain id and the
//! address of its endpoint contract, both handed to the contracts'
//! initializers.

use crate::errors::ScriptError;

/// A network's LayerZero identifiers
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LzEndpoint {
    /// The LayerZero chain id (distinct from the EVM chain id)
    pub chain_id: u16,
    /// The address of the LayerZero endpoint contract on this network
    pub endpoint: &'static str,
}

/// Looks up the LayerZero identifiers of a network
///
/// The network names mirror the truffle configuration the contracts are
/// operated with. `ganache` maps to a locally deployed endpoint mock.
pub fn lz_endpoint(network: &str) -> Result<LzEndpoint, ScriptError> {
    let endpoint = match network {
        "mainnet" => LzEndpoint {
            chain_id: 101,
            endpoint: "0x66A71Dcef29A0fFBDBE3c6a460a3B5BC225Cd675",
        },
        "bsc" => LzEndpoint {
            chain_id: 102,
            endpoint: "0x3c2269811836af69497E5F486A85D7316753cf62",
        },
        "polygonMainnet" => LzEndpoint {
            chain_id: 109,
            endpoint: "0x3c2269811836af69497E5F486A85D7316753cf62",
        },
        "rinkeby" => LzEndpoint {
            chain_id: 10001,
            endpoint: "0x79a63d6d8BBD5c6dfc774dA79bCcD948EAcb53FA",
        },
        "bscTestnet" => LzEndpoint {
            chain_id: 10002,
            endpoint: "0x6Fcb97553D41516Cb228ac03FdC8B9a0a9df04A1",
        },
        "polygonTestnet" => LzEndpoint {
            chain_id: 10009,
            endpoint: "0xf69186dfBa60DdB133E91E9A4B5673624293d8F8",
        },
        "ganache" => LzEndpoint {
            chain_id: 1,
            endpoint: "0x0000000000000000000000000000000000000000",
        },
        _ => return Err(ScriptError::UnknownNetwork(network.to_string())),
    };

    Ok(endpoint)
}

/// Whether the given network hosts the main-chain CCAL contract
pub fn is_main_chain(network: &str, main_chain: &str) -> bool {
    network.eq_ignore_ascii_case(main_chain)
}

#[cfg(test)]
mod tests {
    use super::{is_main_chain, lz_endpoint};
    use crate::errors::ScriptError;

    #[test]
    fn test_known_network_lookup() {
        let endpoint = lz_endpoint("rinkeby").unwrap();
        assert_eq!(endpoint.chain_id, 10001);
    }

    #[test]
    fn test_unknown_network_is_an_error() {
        assert!(matches!(
            lz_endpoint("ropsten"),
            Err(ScriptError::UnknownNetwork(_)),
        ));
    }

    #[test]
    fn test_main_chain_comparison_ignores_case() {
        assert!(is_main_chain("Rinkeby", "rinkeby"));
        assert!(!is_main_chain("bsc", "rinkeby"));
    }
}
