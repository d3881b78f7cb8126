use std::future::Future;
use std::sync::Arc;

use tokio::time::timeout;

use crate::client::{ChainClient, RpcError, RpcMethod};
use crate::codec::AbiCodec;
use crate::config::AdapterConfig;
use crate::error::AdapterError;
use crate::signer::KeyStore;
use crate::store::WalletStore;

/// Everything a pipeline operation needs, passed in explicitly.
#[derive(Clone)]
pub struct PipelineContext {
    pub config: AdapterConfig,
    pub client: Arc<dyn ChainClient>,
    pub abi: Arc<dyn AbiCodec>,
    pub keys: Arc<dyn KeyStore>,
    pub wallets: Arc<dyn WalletStore>,
}

impl PipelineContext {
    pub fn new(
        config: AdapterConfig,
        client: Arc<dyn ChainClient>,
        abi: Arc<dyn AbiCodec>,
        keys: Arc<dyn KeyStore>,
        wallets: Arc<dyn WalletStore>,
    ) -> Self {
        Self {
            config,
            client,
            abi,
            keys,
            wallets,
        }
    }

    /// Runs one chain call under the configured timeout and classifies its
    /// failure.
    pub async fn rpc<T, F>(&self, method: RpcMethod, call: F) -> Result<T, AdapterError>
    where
        F: Future<Output = Result<T, RpcError>>,
    {
        let result = match self.config.rpc_timeout() {
            Some(limit) => match timeout(limit, call).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(method = method.as_str(), timeout_secs = limit.as_secs(), "RPC timeout");
                    return Err(AdapterError::Timeout(method.as_str().to_string()));
                }
            },
            None => call.await,
        };

        result.map_err(|e| {
            tracing::debug!(method = method.as_str(), error = %e, "RPC error");
            AdapterError::from_rpc(method, e)
        })
    }
}

impl std::fmt::Debug for PipelineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineContext")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
