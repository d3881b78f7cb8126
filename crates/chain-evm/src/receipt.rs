//! Transaction receipts as returned by `eth_getTransactionReceipt`.
//!
//! Nodes in the wild disagree on optional fields (`status` is absent before
//! Byzantium, `cumulativeGasUsed` is sometimes omitted), so only the fields
//! the adapter relies on are required.

use alloy_primitives::{Address, Bytes, B256};
use serde::{Deserialize, Deserializer};

use crate::error::EvmError;

/// A mined transaction's receipt.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: B256,
    #[serde(default, deserialize_with = "opt_quantity")]
    pub status: Option<u64>,
    #[serde(deserialize_with = "quantity")]
    pub gas_used: u64,
    #[serde(default, deserialize_with = "opt_quantity")]
    pub cumulative_gas_used: Option<u64>,
    pub logs_bloom: Bytes,
    pub logs: Vec<Log>,
    #[serde(default)]
    pub contract_address: Option<Address>,
    #[serde(default)]
    pub block_hash: Option<B256>,
    #[serde(default, deserialize_with = "opt_quantity")]
    pub block_number: Option<u64>,
    #[serde(default, deserialize_with = "opt_quantity")]
    pub transaction_index: Option<u64>,
}

/// An event log emitted during execution.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Log {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    #[serde(default, deserialize_with = "opt_quantity")]
    pub log_index: Option<u64>,
    #[serde(default)]
    pub transaction_hash: Option<B256>,
    #[serde(default, deserialize_with = "opt_quantity")]
    pub block_number: Option<u64>,
}

impl TransactionReceipt {
    pub fn from_json(value: serde_json::Value) -> Result<Self, EvmError> {
        serde_json::from_value(value)
            .map_err(|e| EvmError::EncodingError(format!("invalid receipt: {e}")))
    }

    pub fn from_json_str(json: &str) -> Result<Self, EvmError> {
        serde_json::from_str(json)
            .map_err(|e| EvmError::EncodingError(format!("invalid receipt: {e}")))
    }

    /// `Some(true)` for status 1, `Some(false)` for status 0, `None` for
    /// pre-Byzantium receipts that carry a state root instead.
    pub fn succeeded(&self) -> Option<bool> {
        self.status.map(|s| s == 1)
    }
}

impl Log {
    pub fn from_json_str(json: &str) -> Result<Self, EvmError> {
        serde_json::from_str(json)
            .map_err(|e| EvmError::EncodingError(format!("invalid log: {e}")))
    }
}

/// Parses a JSON-RPC hex quantity such as `"0x4b"`.
pub fn parse_quantity(s: &str) -> Result<u64, EvmError> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .ok_or_else(|| EvmError::EncodingError(format!("quantity {s:?} lacks 0x prefix")))?;
    if digits.is_empty() {
        return Err(EvmError::EncodingError("empty quantity".into()));
    }
    u64::from_str_radix(digits, 16)
        .map_err(|e| EvmError::EncodingError(format!("quantity {s:?}: {e}")))
}

fn quantity<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let s = String::deserialize(deserializer)?;
    parse_quantity(&s).map_err(serde::de::Error::custom)
}

fn opt_quantity<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    match Option::<String>::deserialize(deserializer)? {
        Some(s) => parse_quantity(&s).map(Some).map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOG_JSON: &str = r#"{
        "logIndex": "0x0",
        "transactionIndex": "0x0",
        "transactionHash": "0x6a949727089705103e873c5dc9ebfaac79deb5fe5df0b9f02672988336130af9",
        "blockHash": "0xd80805f3b261f8dc9fd95a60030615c20ff1ca29ecb34101faf91512aedd9f2c",
        "blockNumber": "0x4b",
        "address": "0xf8afe0a06e27ddbd5ec8adbbd5cee5220c3d4d85",
        "data": "0x",
        "topics": [
            "0xbc7cd75a20ee27fd9adebab32041f755214dbc6bffa90cc0225b39da2e5c2d3b",
            "0x00000000000000000000000044f64ef4bc4952b133a9c4b07157770f048eebe9"
        ],
        "type": "mined"
    }"#;

    fn receipt_json(logs: &str) -> String {
        format!(
            r#"{{
                "transactionHash": "0x6a949727089705103e873c5dc9ebfaac79deb5fe5df0b9f02672988336130af9",
                "status": "0x1",
                "gasUsed": "0x5208",
                "logsBloom": "0x00",
                "logs": {logs},
                "blockNumber": "0x4b",
                "contractAddress": null
            }}"#
        )
    }

    #[test]
    fn parses_receipt_with_logs() {
        let receipt = TransactionReceipt::from_json_str(&receipt_json(&format!("[{LOG_JSON}]"))).unwrap();

        assert_eq!(receipt.gas_used, 21_000);
        assert_eq!(receipt.block_number, Some(0x4b));
        assert_eq!(receipt.succeeded(), Some(true));
        assert!(receipt.contract_address.is_none());
        assert_eq!(receipt.logs.len(), 1);
        assert_eq!(receipt.logs[0].topics.len(), 2);
        assert!(receipt.logs[0].data.is_empty());
    }

    #[test]
    fn missing_required_field_is_rejected() {
        let json = r#"{"transactionHash": "0x6a949727089705103e873c5dc9ebfaac79deb5fe5df0b9f02672988336130af9", "gasUsed": "0x1", "logs": []}"#;
        assert!(TransactionReceipt::from_json_str(json).is_err());
    }

    #[test]
    fn parses_standalone_log() {
        let log = Log::from_json_str(LOG_JSON).unwrap();
        assert_eq!(log.block_number, Some(75));
        assert_eq!(log.log_index, Some(0));
    }

    #[test]
    fn quantity_parsing() {
        assert_eq!(parse_quantity("0x0").unwrap(), 0);
        assert_eq!(parse_quantity("0x5208").unwrap(), 21_000);
        assert!(parse_quantity("5208").is_err());
        assert!(parse_quantity("0x").is_err());
        assert!(parse_quantity("0xzz").is_err());
    }
}
