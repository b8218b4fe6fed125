//! The ordered deployment plan for the CCAL contracts
//!
//! Main-chain networks receive the full credit-market stack topped by
//! `CCALMainChain`; every other network receives `CCALSubChain` wired to the
//! main chain's LayerZero identifiers. Both CCAL contracts link against the
//! shared `Errors` and `ValidateLogic` libraries.

use crate::{
    constants::{
        CCAL_KEY, CCAL_MAIN_CONTRACT, CCAL_SUB_CONTRACT, CREDIT_SYSTEM_KEY, CURRENCY_DECIMALS,
        ERRORS_LIBRARY, GAME_KEY, PLATFORM_FEE, USDT_KEY, VALIDATE_LOGIC_LIBRARY,
    },
    deployments::DeploymentRecord,
    migrations::{DeploymentMode, InitArg, LibraryDep, LinkMode, MigrationStep, NetworkRef},
    networks::is_main_chain,
};

/// Builds the migration plan for the given network
///
/// `ccal_mode` is the operator's fresh-vs-upgrade choice for the proxy-backed
/// CCAL step. Link modes, and the omission of simple steps whose output is
/// already recorded, are decided here against the record as it stands — the
/// steps themselves carry no dead branches.
pub fn migration_plan(
    network: &str,
    main_chain: &str,
    ccal_mode: DeploymentMode,
    record: &DeploymentRecord,
) -> Vec<MigrationStep> {
    let mut builder = PlanBuilder {
        record,
        steps: Vec::new(),
    };

    if is_main_chain(network, main_chain) {
        builder.simple(CREDIT_SYSTEM_KEY, vec![]);
        builder.simple(GAME_KEY, vec![InitArg::Str("Game"), InitArg::Str("game")]);
        builder.simple(
            USDT_KEY,
            vec![InitArg::Str("Tether USD"), InitArg::Str("USDT")],
        );
        builder.ccal(
            CCAL_MAIN_CONTRACT,
            ccal_mode,
            vec![
                InitArg::Recorded(CREDIT_SYSTEM_KEY),
                // Fees accrue to the deployer until a dedicated vault is set
                InitArg::Sender,
                InitArg::Uint(PLATFORM_FEE),
                InitArg::LzChainId(NetworkRef::Current),
                InitArg::LzEndpoint(NetworkRef::Current),
                InitArg::Recorded(USDT_KEY),
                InitArg::Uint(CURRENCY_DECIMALS),
            ],
        );
    } else {
        builder.simple(GAME_KEY, vec![InitArg::Str("Game"), InitArg::Str("game")]);
        builder.simple(
            USDT_KEY,
            vec![InitArg::Str("Tether USD"), InitArg::Str("USDT")],
        );
        builder.ccal(
            CCAL_SUB_CONTRACT,
            ccal_mode,
            vec![
                InitArg::LzEndpoint(NetworkRef::Current),
                InitArg::LzChainId(NetworkRef::Current),
                InitArg::LzChainId(NetworkRef::MainChain),
                InitArg::Recorded(USDT_KEY),
                InitArg::Uint(CURRENCY_DECIMALS),
            ],
        );
    }

    builder.steps
}

/// Accumulates steps, numbering them and consulting the record for work that
/// is already done
struct PlanBuilder<'a> {
    /// The record as it stood when planning started
    record: &'a DeploymentRecord,
    /// The steps accumulated so far
    steps: Vec<MigrationStep>,
}

impl PlanBuilder<'_> {
    /// Adds a plain deployment step, unless its output is already recorded
    ///
    /// Simple contracts are deployed once per network; re-runs pick up where
    /// the record left off.
    fn simple(&mut self, contract: &'static str, init_args: Vec<InitArg>) {
        if self.record.contains_key(contract) {
            return;
        }

        self.push(contract, contract, Vec::new(), DeploymentMode::Simple, init_args);
    }

    /// Adds the proxy-backed CCAL step with its library dependencies
    fn ccal(&mut self, contract: &'static str, mode: DeploymentMode, init_args: Vec<InitArg>) {
        let links = [ERRORS_LIBRARY, VALIDATE_LOGIC_LIBRARY]
            .into_iter()
            .map(|name| LibraryDep {
                name,
                mode: self.link_mode(name),
            })
            .collect();

        self.push(contract, CCAL_KEY, links, mode, init_args);
    }

    /// Reuse a recorded library deployment, deploy otherwise
    fn link_mode(&self, library: &str) -> LinkMode {
        if self.record.contains_key(library) {
            LinkMode::Reuse
        } else {
            LinkMode::Deploy
        }
    }

    /// Appends a step with the next index
    fn push(
        &mut self,
        contract: &'static str,
        record_key: &'static str,
        links: Vec<LibraryDep>,
        mode: DeploymentMode,
        init_args: Vec<InitArg>,
    ) {
        self.steps.push(MigrationStep {
            index: self.steps.len(),
            contract,
            record_key,
            links,
            mode,
            init_args,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::migration_plan;
    use crate::{
        deployments::DeploymentRecord,
        migrations::{DeploymentMode, LinkMode},
    };

    /// Builds a record from key/value pairs
    fn record(pairs: &[(&str, &str)]) -> DeploymentRecord {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_main_chain_plan_shape() {
        let plan = migration_plan(
            "rinkeby",
            "rinkeby",
            DeploymentMode::FreshProxy,
            &DeploymentRecord::new(),
        );

        let contracts: Vec<&str> = plan.iter().map(|s| s.contract).collect();
        assert_eq!(
            contracts,
            vec!["CreditSystem", "Game", "USDT", "CCALMainChain"],
        );
        assert_eq!(plan.last().unwrap().mode, DeploymentMode::FreshProxy);
        assert_eq!(plan.last().unwrap().record_key, "CCALAddress");
        assert!(plan.iter().enumerate().all(|(i, s)| s.index == i));
    }

    #[test]
    fn test_sub_chain_plan_shape() {
        let plan = migration_plan(
            "bsc",
            "rinkeby",
            DeploymentMode::FreshProxy,
            &DeploymentRecord::new(),
        );

        let contracts: Vec<&str> = plan.iter().map(|s| s.contract).collect();
        assert_eq!(contracts, vec!["Game", "USDT", "CCALSubChain"]);
    }

    #[test]
    fn test_recorded_libraries_are_reused() {
        let plan = migration_plan(
            "bsc",
            "rinkeby",
            DeploymentMode::FreshProxy,
            &record(&[("Errors", "0x1")]),
        );

        let links = &plan.last().unwrap().links;
        assert_eq!(links[0].mode, LinkMode::Reuse);
        assert_eq!(links[1].mode, LinkMode::Deploy);
    }

    #[test]
    fn test_recorded_simple_steps_are_omitted() {
        let plan = migration_plan(
            "rinkeby",
            "rinkeby",
            DeploymentMode::UpgradeProxy,
            &record(&[
                ("CreditSystem", "0x1"),
                ("Game", "0x2"),
                ("USDT", "0x3"),
                ("Errors", "0x4"),
                ("ValidateLogic", "0x5"),
                ("CCALAddress", "0x6"),
            ]),
        );

        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].index, 0);
        assert_eq!(plan[0].contract, "CCALMainChain");
        assert_eq!(plan[0].mode, DeploymentMode::UpgradeProxy);
    }
}
