//! JSON-RPC 2.0 over HTTP.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chain_evm::address::lower_hex;
use chain_evm::receipt::{parse_quantity, TransactionReceipt};
use chain_evm::{Address, U256};
use serde_json::{json, Value};

use crate::client::{BlockTag, CallMsg, ChainClient, RpcError, RpcMethod};

/// [`ChainClient`] backed by a node's HTTP endpoint.
#[derive(Debug)]
pub struct HttpChainClient {
    http: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl HttpChainClient {
    pub fn new(url: impl Into<String>) -> Result<Self, RpcError> {
        Self::build(url.into(), reqwest::Client::builder())
    }

    /// Bounds each HTTP request at the transport level as well.
    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self, RpcError> {
        Self::build(url.into(), reqwest::Client::builder().timeout(timeout))
    }

    fn build(url: String, builder: reqwest::ClientBuilder) -> Result<Self, RpcError> {
        let http = builder
            .build()
            .map_err(|e| RpcError::Transport(format!("cannot build http client: {e}")))?;
        Ok(Self {
            http,
            url,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn request(&self, method: RpcMethod, params: Value) -> Result<Value, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method.as_str(),
            "params": params,
        });

        tracing::debug!(method = method.as_str(), id, "rpc request");
        let response = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RpcError::Transport(e.to_string()))?;

        let status = response.status();
        let mut reply: Value = response
            .json()
            .await
            .map_err(|e| RpcError::Decode(format!("http {status}: {e}")))?;

        if let Some(error) = reply.get("error").filter(|e| !e.is_null()) {
            return Err(RpcError::Node {
                code: error.get("code").and_then(Value::as_i64).unwrap_or_default(),
                message: error
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error")
                    .to_string(),
            });
        }

        match reply.get_mut("result") {
            Some(result) => Ok(result.take()),
            None => Err(RpcError::Decode(format!("{} reply has no result", method.as_str()))),
        }
    }

    async fn request_str(&self, method: RpcMethod, params: Value) -> Result<String, RpcError> {
        match self.request(method, params).await? {
            Value::String(s) => Ok(s),
            other => Err(RpcError::Decode(format!("{} returned {other}", method.as_str()))),
        }
    }

    async fn request_u64(&self, method: RpcMethod, params: Value) -> Result<u64, RpcError> {
        let s = self.request_str(method, params).await?;
        parse_quantity(&s).map_err(|e| RpcError::Decode(e.to_string()))
    }

    async fn request_u256(&self, method: RpcMethod, params: Value) -> Result<U256, RpcError> {
        let s = self.request_str(method, params).await?;
        parse_u256(&s)
    }

    async fn request_bytes(&self, method: RpcMethod, params: Value) -> Result<Vec<u8>, RpcError> {
        let s = self.request_str(method, params).await?;
        decode_hex(&s)
    }
}

#[async_trait]
impl ChainClient for HttpChainClient {
    async fn chain_id(&self) -> Result<u64, RpcError> {
        self.request_u64(RpcMethod::ChainId, json!([])).await
    }

    async fn get_balance(&self, address: Address) -> Result<U256, RpcError> {
        self.request_u256(RpcMethod::GetBalance, json!([lower_hex(&address), "latest"]))
            .await
    }

    async fn get_nonce(&self, address: Address) -> Result<u64, RpcError> {
        self.request_u64(
            RpcMethod::GetTransactionCount,
            json!([lower_hex(&address), "pending"]),
        )
        .await
    }

    async fn estimate_gas(&self, call: &CallMsg) -> Result<u64, RpcError> {
        self.request_u64(RpcMethod::EstimateGas, json!([call_object(call)]))
            .await
    }

    async fn gas_price(&self) -> Result<U256, RpcError> {
        self.request_u256(RpcMethod::GasPrice, json!([])).await
    }

    async fn call(&self, call: &CallMsg, block: BlockTag) -> Result<Vec<u8>, RpcError> {
        self.request_bytes(RpcMethod::Call, json!([call_object(call), block.as_str()]))
            .await
    }

    async fn send_raw_transaction(&self, raw_tx: &[u8]) -> Result<String, RpcError> {
        self.request_str(
            RpcMethod::SendRawTransaction,
            json!([format!("0x{}", hex::encode(raw_tx))]),
        )
        .await
    }

    async fn is_contract(&self, address: Address) -> Result<bool, RpcError> {
        let code = self
            .request_bytes(RpcMethod::GetCode, json!([lower_hex(&address), "latest"]))
            .await?;
        Ok(!code.is_empty())
    }

    async fn get_transaction_receipt(&self, tx_hash: &str) -> Result<Option<TransactionReceipt>, RpcError> {
        let result = self
            .request(RpcMethod::GetTransactionReceipt, json!([tx_hash]))
            .await?;
        if result.is_null() {
            return Ok(None);
        }
        TransactionReceipt::from_json(result)
            .map(Some)
            .map_err(|e| RpcError::Decode(e.to_string()))
    }
}

fn call_object(call: &CallMsg) -> Value {
    let mut object = json!({
        "to": lower_hex(&call.to),
        "value": format!("0x{:x}", call.value),
        "data": format!("0x{}", hex::encode(&call.data)),
    });
    if let Some(from) = call.from {
        object["from"] = Value::String(lower_hex(&from));
    }
    object
}

fn parse_u256(s: &str) -> Result<U256, RpcError> {
    let digits = s
        .strip_prefix("0x")
        .ok_or_else(|| RpcError::Decode(format!("quantity {s:?} lacks 0x prefix")))?;
    if digits.is_empty() {
        return Err(RpcError::Decode("empty quantity".into()));
    }
    U256::from_str_radix(digits, 16).map_err(|e| RpcError::Decode(format!("quantity {s:?}: {e}")))
}

fn decode_hex(s: &str) -> Result<Vec<u8>, RpcError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(digits).map_err(|e| RpcError::Decode(format!("hex data {s:?}: {e}")))
}
