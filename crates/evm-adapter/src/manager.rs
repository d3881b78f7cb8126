//! The wallet-manager facing surface.

use chain_evm::address::parse_address;
use chain_evm::receipt::TransactionReceipt;
use chain_evm::U256;
use secrecy::SecretString;
use serde_json::{Map, Value};

use crate::builder::{self, asset_decimals, parse_positive, transfer_call, Transfer};
use crate::client::{BlockTag, CallMsg, RpcMethod};
use crate::context::PipelineContext;
use crate::error::AdapterError;
use crate::fee::{Fee, FeeEstimator};
use crate::types::{
    Account, Balance, ExtraParams, RawTransaction, RawTransactionWithError, SmartContract, SummaryRequest,
    TokenBalance, TransferKind, TransferRequest,
};
use crate::{balance, lifecycle, summary};

/// An event log decoded against a contract ABI.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedLog {
    pub address: String,
    pub event: String,
    pub fields: Map<String, Value>,
}

/// Chain adapter for one EVM network.
#[derive(Debug, Clone)]
pub struct EvmAdapter {
    ctx: PipelineContext,
}

impl EvmAdapter {
    pub fn new(ctx: PipelineContext) -> Self {
        Self { ctx }
    }

    /// Builds the adapter, checking the node's chain id first when
    /// `verify_chain_id` is set.
    pub async fn connect(ctx: PipelineContext) -> Result<Self, AdapterError> {
        let adapter = Self::new(ctx);
        if adapter.ctx.config.verify_chain_id {
            adapter.verify_chain_id().await?;
        }
        tracing::info!(
            symbol = %adapter.ctx.config.symbol,
            chain_id = adapter.ctx.config.chain_id,
            rpc_url = %adapter.ctx.config.rpc_url,
            "EVM adapter ready"
        );
        Ok(adapter)
    }

    pub fn context(&self) -> &PipelineContext {
        &self.ctx
    }

    /// Fails with [`AdapterError::Config`] when the node serves another chain.
    pub async fn verify_chain_id(&self) -> Result<u64, AdapterError> {
        let actual = self
            .ctx
            .rpc(RpcMethod::ChainId, self.ctx.client.chain_id())
            .await?;
        if actual != self.ctx.config.chain_id {
            return Err(AdapterError::Config(format!(
                "node serves chain {actual}, configured for {}",
                self.ctx.config.chain_id
            )));
        }
        Ok(actual)
    }

    fn account(&self, app_id: &str, wallet_id: &str, account_id: &str) -> Result<Account, AdapterError> {
        self.ctx.wallets.account(app_id, wallet_id, account_id)
    }

    pub async fn create_transaction(
        &self,
        app_id: &str,
        wallet_id: &str,
        account_id: &str,
        request: &TransferRequest,
    ) -> Result<RawTransaction, AdapterError> {
        let account = self.account(app_id, wallet_id, account_id)?;
        builder::create_transaction(&self.ctx, &account, request).await
    }

    pub async fn create_summary_transactions(
        &self,
        app_id: &str,
        wallet_id: &str,
        account_id: &str,
        request: &SummaryRequest,
    ) -> Result<Vec<RawTransactionWithError>, AdapterError> {
        let account = self.account(app_id, wallet_id, account_id)?;
        let sponsor = match &request.fee_support {
            Some(support) => Some(self.account(app_id, wallet_id, &support.account_id)?),
            None => None,
        };
        summary::create_summary_transactions(&self.ctx, &account, request, sponsor.as_ref()).await
    }

    pub fn sign_transaction(
        &self,
        app_id: &str,
        wallet_id: &str,
        account_id: &str,
        tx: &mut RawTransaction,
        password: &SecretString,
    ) -> Result<(), AdapterError> {
        let account = self.account(app_id, wallet_id, account_id)?;
        lifecycle::sign_transaction(&self.ctx, &account, tx, password)
    }

    pub fn verify_transaction(
        &self,
        app_id: &str,
        wallet_id: &str,
        account_id: &str,
        tx: &mut RawTransaction,
    ) -> Result<(), AdapterError> {
        let account = self.account(app_id, wallet_id, account_id)?;
        lifecycle::verify_transaction(&account, tx)
    }

    pub async fn submit_transaction(
        &self,
        app_id: &str,
        wallet_id: &str,
        account_id: &str,
        tx: &mut RawTransaction,
    ) -> Result<String, AdapterError> {
        let account = self.account(app_id, wallet_id, account_id)?;
        lifecycle::submit_transaction(&self.ctx, &account, tx).await
    }

    pub async fn get_assets_account_balance(
        &self,
        app_id: &str,
        wallet_id: &str,
        account_id: &str,
    ) -> Result<Balance, AdapterError> {
        let account = self.account(app_id, wallet_id, account_id)?;
        balance::account_balance(&self.ctx, &account).await
    }

    pub async fn get_assets_account_token_balance(
        &self,
        app_id: &str,
        wallet_id: &str,
        account_id: &str,
        contract: &SmartContract,
    ) -> Result<TokenBalance, AdapterError> {
        let account = self.account(app_id, wallet_id, account_id)?;
        balance::account_token_balance(&self.ctx, &account, contract).await
    }

    pub async fn get_address_balance(&self, address: &str) -> Result<Balance, AdapterError> {
        balance::address_balance(&self.ctx, address).await
    }

    /// Quotes the fee of a transfer without building it.
    pub async fn estimate_transaction_fee(
        &self,
        from: &str,
        to: &str,
        amount: &str,
        contract: Option<&SmartContract>,
    ) -> Result<Fee, AdapterError> {
        let kind = TransferKind::from_contract(contract.cloned());
        let transfer = Transfer {
            from: parse_address(from)?,
            to: parse_address(to)?,
            amount: parse_positive(amount, asset_decimals(&self.ctx, &kind))?,
            kind,
            fee_rate: None,
            extra: ExtraParams::default(),
        };
        let call = transfer_call(&self.ctx, &transfer)?;
        FeeEstimator::new(&self.ctx)
            .estimate(&call, None, &transfer.extra)
            .await
    }

    pub async fn is_contract(&self, address: &str) -> Result<bool, AdapterError> {
        let address = parse_address(address)?;
        self.ctx
            .rpc(RpcMethod::GetCode, self.ctx.client.is_contract(address))
            .await
    }

    /// Calls a view `method` on `contract` and decodes its outputs.
    pub async fn call_contract(
        &self,
        contract: &str,
        abi_json: &str,
        method: &str,
        args: &[String],
    ) -> Result<Map<String, Value>, AdapterError> {
        let to = parse_address(contract)?;
        let data = self.ctx.abi.encode(abi_json, method, args)?;
        let call = CallMsg {
            from: None,
            to,
            value: U256::ZERO,
            data,
        };
        let output = self
            .ctx
            .rpc(RpcMethod::Call, self.ctx.client.call(&call, BlockTag::Latest))
            .await?;
        self.ctx.abi.decode_result(abi_json, method, &output)
    }

    /// Fetches the receipt of `tx_id` and decodes every log `abi_json`
    /// describes. Logs of other contracts or unknown events are skipped.
    pub async fn decode_receipt_logs(&self, tx_id: &str, abi_json: &str) -> Result<Vec<DecodedLog>, AdapterError> {
        let receipt = self.transaction_receipt(tx_id).await?;
        let mut decoded = Vec::new();
        for log in &receipt.logs {
            match self.ctx.abi.decode_log(abi_json, log) {
                Ok((fields, event)) => decoded.push(DecodedLog {
                    address: chain_evm::address::checksum(&log.address),
                    event,
                    fields,
                }),
                Err(e) => tracing::debug!(tx_id, address = %log.address, error = %e, "log not decodable"),
            }
        }
        Ok(decoded)
    }

    pub async fn transaction_receipt(&self, tx_id: &str) -> Result<TransactionReceipt, AdapterError> {
        self.ctx
            .rpc(RpcMethod::GetTransactionReceipt, self.ctx.client.get_transaction_receipt(tx_id))
            .await?
            .ok_or_else(|| AdapterError::RpcUnavailable(format!("no receipt for {tx_id}")))
    }
}
