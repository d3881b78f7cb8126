//! The ABI codec seam.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chain_evm::abi::ContractAbi;
use chain_evm::receipt::Log;
use serde_json::{Map, Value};

use crate::error::AdapterError;

/// Encodes calls and decodes results against a JSON ABI description.
pub trait AbiCodec: Send + Sync {
    /// Encodes `method(args...)` into calldata. Arguments are strings read
    /// as the declared Solidity types.
    fn encode(&self, abi_json: &str, method: &str, args: &[String]) -> Result<Vec<u8>, AdapterError>;

    /// Decodes the return data of `method` into a name → value mapping.
    fn decode_result(&self, abi_json: &str, method: &str, data: &[u8]) -> Result<Map<String, Value>, AdapterError>;

    /// Decodes an event log into its field mapping and event name.
    fn decode_log(&self, abi_json: &str, log: &Log) -> Result<(Map<String, Value>, String), AdapterError>;
}

/// [`AbiCodec`] over `alloy-dyn-abi`, caching parsed interfaces.
#[derive(Debug, Default)]
pub struct DynAbiCodec {
    parsed: RwLock<HashMap<String, Arc<ContractAbi>>>,
}

impl DynAbiCodec {
    pub fn new() -> Self {
        Self::default()
    }

    fn abi(&self, abi_json: &str) -> Result<Arc<ContractAbi>, AdapterError> {
        if let Ok(cache) = self.parsed.read() {
            if let Some(abi) = cache.get(abi_json) {
                return Ok(Arc::clone(abi));
            }
        }

        let abi = Arc::new(ContractAbi::from_json(abi_json)?);
        if let Ok(mut cache) = self.parsed.write() {
            cache.insert(abi_json.to_string(), Arc::clone(&abi));
        }
        Ok(abi)
    }
}

impl AbiCodec for DynAbiCodec {
    fn encode(&self, abi_json: &str, method: &str, args: &[String]) -> Result<Vec<u8>, AdapterError> {
        Ok(self.abi(abi_json)?.encode_call(method, args)?)
    }

    fn decode_result(&self, abi_json: &str, method: &str, data: &[u8]) -> Result<Map<String, Value>, AdapterError> {
        Ok(self.abi(abi_json)?.decode_output(method, data)?)
    }

    fn decode_log(&self, abi_json: &str, log: &Log) -> Result<(Map<String, Value>, String), AdapterError> {
        Ok(self.abi(abi_json)?.decode_log(&log.topics, &log.data)?)
    }
}
