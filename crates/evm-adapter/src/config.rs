//! Adapter configuration, loaded from TOML.
//!
//! ```toml
//! symbol = "ETH"
//! chain_id = 1
//! rpc_url = "http://127.0.0.1:8545"
//! rpc_timeout_secs = 10
//! fix_gas_limit = 21000
//! offset_gas_price = 1000000000
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::AdapterError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Native asset symbol, e.g. `ETH`.
    pub symbol: String,
    /// Native asset precision.
    #[serde(default = "default_decimals")]
    pub decimals: u8,
    pub chain_id: u64,
    pub rpc_url: String,
    /// Bound on every chain call. `0` disables the bound.
    #[serde(default = "default_rpc_timeout_secs")]
    pub rpc_timeout_secs: u64,
    /// Gas limit used instead of `eth_estimateGas` when set.
    #[serde(default)]
    pub fix_gas_limit: Option<u64>,
    /// Gas price in wei used instead of `eth_gasPrice` when set.
    #[serde(default)]
    pub fix_gas_price: Option<u64>,
    /// Wei added on top of the node's gas price.
    #[serde(default)]
    pub offset_gas_price: u64,
    /// Compare the node's `eth_chainId` against `chain_id` on connect.
    #[serde(default = "default_true")]
    pub verify_chain_id: bool,
}

fn default_decimals() -> u8 {
    18
}

fn default_rpc_timeout_secs() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation failed: {}", .0.join(", "))]
    Validation(Vec<String>),
}

impl From<ConfigError> for AdapterError {
    fn from(e: ConfigError) -> Self {
        AdapterError::Config(e.to_string())
    }
}

impl AdapterConfig {
    /// A config with every optional setting at its default.
    pub fn new(symbol: impl Into<String>, chain_id: u64, rpc_url: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            decimals: default_decimals(),
            chain_id,
            rpc_url: rpc_url.into(),
            rpc_timeout_secs: default_rpc_timeout_secs(),
            fix_gas_limit: None,
            fix_gas_price: None,
            offset_gas_price: 0,
            verify_chain_id: true,
        }
    }

    /// Load and validate configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: AdapterConfig = toml::from_str(content)?;
        config.validate().map_err(ConfigError::Validation)?;
        Ok(config)
    }

    /// Returns every problem found, not just the first.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.symbol.trim().is_empty() {
            errors.push("symbol must not be empty".to_string());
        }
        if self.decimals > 77 {
            errors.push(format!("decimals {} exceeds 77", self.decimals));
        }
        if self.chain_id == 0 {
            errors.push("chain_id must be non-zero".to_string());
        }
        if !(self.rpc_url.starts_with("http://") || self.rpc_url.starts_with("https://")) {
            errors.push(format!("rpc_url {:?} must be an http(s) url", self.rpc_url));
        }
        if self.fix_gas_limit == Some(0) {
            errors.push("fix_gas_limit must be non-zero when set".to_string());
        }
        if self.fix_gas_price == Some(0) {
            errors.push("fix_gas_price must be non-zero when set".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    pub fn rpc_timeout(&self) -> Option<Duration> {
        (self.rpc_timeout_secs > 0).then(|| Duration::from_secs(self.rpc_timeout_secs))
    }
}
