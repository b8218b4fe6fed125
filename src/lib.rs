//! Scripts for deploying and upgrading the Kyoko CCAL smart contracts.

#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

pub mod cli;
mod commands;
pub mod constants;
pub mod deployments;
pub mod errors;
pub mod executor;
pub mod link;
pub mod migrations;
pub mod networks;
pub mod plan;
mod solidity;
pub mod utils;
