use chain_evm::EvmError;
use keystore::KeyStoreError;
use thiserror::Error;

use crate::types::TxStatus;

/// Errors surfaced by the transaction pipeline.
///
/// `Clone` so batch results can carry a per-address error alongside the
/// entries that succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdapterError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("insufficient balance on {address}: need {required}, have {available}")]
    InsufficientBalance {
        address: String,
        required: String,
        available: String,
    },

    #[error("fee estimation failed: {0}")]
    FeeEstimationFailed(String),

    #[error("contract call failed: {0}")]
    ContractCallFailed(String),

    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("signing failed: {0}")]
    SigningFailed(String),

    #[error("signature invalid: {0}")]
    SignatureInvalid(String),

    #[error("threshold not met: {present} of {required} signatures")]
    ThresholdNotMet { required: u8, present: usize },

    /// The node refused the transaction. Carries the node's reason.
    #[error("broadcast rejected: {0}")]
    BroadcastRejected(String),

    #[error("transaction already submitted as {0}")]
    AlreadySubmitted(String),

    #[error("timed out waiting for {0}")]
    Timeout(String),

    #[error("rpc unavailable: {0}")]
    RpcUnavailable(String),

    #[error("cannot {operation} a transaction in state {status}")]
    InvalidState {
        operation: &'static str,
        status: TxStatus,
    },

    #[error("account not found: {0}")]
    AccountNotFound(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<EvmError> for AdapterError {
    fn from(e: EvmError) -> Self {
        match e {
            EvmError::InvalidAddress(msg) => AdapterError::InvalidAddress(msg),
            EvmError::InvalidAmount(msg) => AdapterError::InvalidAmount(msg),
            EvmError::AbiError(msg) | EvmError::EncodingError(msg) => {
                AdapterError::ContractCallFailed(msg)
            }
            EvmError::InvalidSignature(msg) | EvmError::InvalidPublicKey(msg) => {
                AdapterError::SignatureInvalid(msg)
            }
            EvmError::InvalidPrivateKey(msg)
            | EvmError::SigningError(msg)
            | EvmError::TransactionBuildError(msg) => AdapterError::SigningFailed(msg),
        }
    }
}

impl From<KeyStoreError> for AdapterError {
    fn from(e: KeyStoreError) -> Self {
        match e {
            KeyStoreError::AuthenticationFailed(_) => AdapterError::AuthenticationFailed(e.to_string()),
            other => AdapterError::SigningFailed(other.to_string()),
        }
    }
}
