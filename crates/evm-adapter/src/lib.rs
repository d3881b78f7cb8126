//! # evm-adapter
//!
//! Transaction pipeline for EVM-compatible chains: fee estimation, raw
//! transaction construction (native coin and ERC-20), batch sweeps into a
//! collection address, and the sign → verify → submit lifecycle.
//!
//! All collaborators (chain RPC, ABI codec, key store, wallet store) sit
//! behind traits and are bundled in a [`PipelineContext`] that callers build
//! explicitly and hand to [`EvmAdapter`].

pub mod balance;
pub mod builder;
pub mod client;
pub mod codec;
pub mod config;
pub mod context;
pub mod error;
pub mod fee;
pub mod lifecycle;
pub mod manager;
pub mod rpc;
pub mod signer;
pub mod store;
pub mod summary;
pub mod types;

pub use client::{BlockTag, CallMsg, ChainClient, RpcError, RpcMethod};
pub use codec::{AbiCodec, DynAbiCodec};
pub use config::AdapterConfig;
pub use context::PipelineContext;
pub use error::AdapterError;
pub use manager::EvmAdapter;
pub use rpc::HttpChainClient;
pub use signer::KeyStore;
pub use store::{MemoryWalletStore, WalletStore};
pub use types::*;
