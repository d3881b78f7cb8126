//! EVM chain primitives for the wallet platform's chain adapters.
//!
//! This crate provides:
//! - Address parsing and EIP-55 checksums
//! - Fixed-point decimal amounts at an asset's declared precision
//! - ABI encoding/decoding driven by a contract's JSON interface
//! - The ERC-20 interface description
//! - Legacy (EIP-155) transaction encoding, signing and signer recovery
//! - JSON-RPC transaction receipt decoding

pub mod abi;
pub mod address;
pub mod erc20;
pub mod error;
pub mod receipt;
pub mod transaction;
pub mod units;

pub use alloy_primitives::{Address, Bytes, B256, U256};
pub use error::EvmError;
pub use units::Amount;
