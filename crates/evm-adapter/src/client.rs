//! The chain RPC seam.

use async_trait::async_trait;
use chain_evm::receipt::TransactionReceipt;
use chain_evm::{Address, U256};
use thiserror::Error;

use crate::error::AdapterError;

/// A message for `eth_call` / `eth_estimateGas`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallMsg {
    pub from: Option<Address>,
    pub to: Address,
    pub value: U256,
    pub data: Vec<u8>,
}

impl CallMsg {
    /// A read-only call with no sender and no value.
    pub fn read(to: Address, data: Vec<u8>) -> Self {
        Self {
            from: None,
            to,
            value: U256::ZERO,
            data,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockTag {
    Latest,
    Pending,
}

impl BlockTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockTag::Latest => "latest",
            BlockTag::Pending => "pending",
        }
    }
}

/// JSON-RPC methods the adapter issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcMethod {
    ChainId,
    GetBalance,
    GetTransactionCount,
    EstimateGas,
    GasPrice,
    Call,
    SendRawTransaction,
    GetCode,
    GetTransactionReceipt,
}

impl RpcMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            RpcMethod::ChainId => "eth_chainId",
            RpcMethod::GetBalance => "eth_getBalance",
            RpcMethod::GetTransactionCount => "eth_getTransactionCount",
            RpcMethod::EstimateGas => "eth_estimateGas",
            RpcMethod::GasPrice => "eth_gasPrice",
            RpcMethod::Call => "eth_call",
            RpcMethod::SendRawTransaction => "eth_sendRawTransaction",
            RpcMethod::GetCode => "eth_getCode",
            RpcMethod::GetTransactionReceipt => "eth_getTransactionReceipt",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RpcError {
    /// The request never got a JSON-RPC answer.
    #[error("transport error: {0}")]
    Transport(String),

    /// The node answered with an error object.
    #[error("node error {code}: {message}")]
    Node { code: i64, message: String },

    /// The node answered with something unparseable.
    #[error("malformed response: {0}")]
    Decode(String),
}

impl AdapterError {
    /// Classifies a failed chain call. Node-side refusals of gas estimation,
    /// contract calls and broadcasts keep their own kinds; everything else is
    /// an availability problem.
    pub fn from_rpc(method: RpcMethod, err: RpcError) -> Self {
        match (method, err) {
            (RpcMethod::EstimateGas, RpcError::Node { message, .. }) => AdapterError::FeeEstimationFailed(message),
            (RpcMethod::Call, RpcError::Node { message, .. }) => AdapterError::ContractCallFailed(message),
            (RpcMethod::SendRawTransaction, RpcError::Node { message, .. }) => {
                AdapterError::BroadcastRejected(message)
            }
            (method, err) => AdapterError::RpcUnavailable(format!("{}: {err}", method.as_str())),
        }
    }
}

/// Read and broadcast access to an EVM node.
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn chain_id(&self) -> Result<u64, RpcError>;

    /// Balance in wei at the latest block.
    async fn get_balance(&self, address: Address) -> Result<U256, RpcError>;

    /// Next nonce, counting pending transactions.
    async fn get_nonce(&self, address: Address) -> Result<u64, RpcError>;

    async fn estimate_gas(&self, call: &CallMsg) -> Result<u64, RpcError>;

    async fn gas_price(&self) -> Result<U256, RpcError>;

    async fn call(&self, call: &CallMsg, block: BlockTag) -> Result<Vec<u8>, RpcError>;

    /// Returns the transaction hash the node assigned.
    async fn send_raw_transaction(&self, raw_tx: &[u8]) -> Result<String, RpcError>;

    async fn is_contract(&self, address: Address) -> Result<bool, RpcError>;

    /// `None` while the transaction is unknown or pending.
    async fn get_transaction_receipt(&self, tx_hash: &str) -> Result<Option<TransactionReceipt>, RpcError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(message: &str) -> RpcError {
        RpcError::Node {
            code: -32000,
            message: message.into(),
        }
    }

    #[test]
    fn node_errors_keep_their_kind() {
        assert_eq!(
            AdapterError::from_rpc(RpcMethod::EstimateGas, node("execution reverted")),
            AdapterError::FeeEstimationFailed("execution reverted".into())
        );
        assert_eq!(
            AdapterError::from_rpc(RpcMethod::SendRawTransaction, node("nonce too low")),
            AdapterError::BroadcastRejected("nonce too low".into())
        );
        assert!(matches!(
            AdapterError::from_rpc(RpcMethod::Call, node("revert")),
            AdapterError::ContractCallFailed(_)
        ));
    }

    #[test]
    fn transport_errors_are_unavailability() {
        let err = AdapterError::from_rpc(
            RpcMethod::SendRawTransaction,
            RpcError::Transport("connection refused".into()),
        );
        assert_eq!(
            err,
            AdapterError::RpcUnavailable("eth_sendRawTransaction: transport error: connection refused".into())
        );
        assert!(matches!(
            AdapterError::from_rpc(RpcMethod::GetBalance, node("header not found")),
            AdapterError::RpcUnavailable(_)
        ));
    }
}
