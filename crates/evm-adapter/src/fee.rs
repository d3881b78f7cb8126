//! Gas price, gas limit and the resulting native fee.

use chain_evm::{Amount, U256};

use crate::client::{CallMsg, RpcMethod};
use crate::context::PipelineContext;
use crate::error::AdapterError;
use crate::types::{ExtraParams, FeesSupportAccount};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fee {
    /// Wei per unit of gas.
    pub gas_price: U256,
    pub gas_limit: u64,
}

impl Fee {
    /// `gas_price * gas_limit` in wei.
    pub fn total(&self) -> U256 {
        self.gas_price.saturating_mul(U256::from(self.gas_limit))
    }

    pub fn total_amount(&self, decimals: u8) -> Amount {
        Amount::from_raw(self.total(), decimals)
    }
}

pub struct FeeEstimator<'a> {
    ctx: &'a PipelineContext,
}

impl<'a> FeeEstimator<'a> {
    pub fn new(ctx: &'a PipelineContext) -> Self {
        Self { ctx }
    }

    /// Gas price in wei: the override (a native decimal amount per gas), else
    /// the configured fixed price, else the node's price plus the configured
    /// offset.
    pub async fn gas_price(&self, fee_rate: Option<&str>) -> Result<U256, AdapterError> {
        if let Some(rate) = fee_rate.filter(|r| !r.trim().is_empty()) {
            let rate = Amount::parse(rate, self.ctx.config.decimals)?;
            if rate.is_zero() {
                return Err(AdapterError::InvalidAmount("fee rate must be positive".into()));
            }
            return Ok(rate.raw());
        }

        if let Some(fixed) = self.ctx.config.fix_gas_price {
            return Ok(U256::from(fixed));
        }

        let price = self
            .ctx
            .rpc(RpcMethod::GasPrice, self.ctx.client.gas_price())
            .await?;
        Ok(price.saturating_add(U256::from(self.ctx.config.offset_gas_price)))
    }

    /// Gas limit: the per-call override, else the configured fixed limit,
    /// else the node's estimate for `call`.
    pub async fn gas_limit(&self, call: &CallMsg, extra: &ExtraParams) -> Result<u64, AdapterError> {
        if let Some(limit) = extra.gas_limit.or(self.ctx.config.fix_gas_limit) {
            return Ok(limit);
        }

        let limit = self
            .ctx
            .rpc(RpcMethod::EstimateGas, self.ctx.client.estimate_gas(call))
            .await?;
        if limit == 0 {
            return Err(AdapterError::FeeEstimationFailed("node estimated zero gas".into()));
        }
        Ok(limit)
    }

    pub async fn estimate(
        &self,
        call: &CallMsg,
        fee_rate: Option<&str>,
        extra: &ExtraParams,
    ) -> Result<Fee, AdapterError> {
        let gas_price = self.gas_price(fee_rate).await?;
        let gas_limit = self.gas_limit(call, extra).await?;
        Ok(Fee { gas_price, gas_limit })
    }
}

/// Native amount a sponsor sends so an address can pay `fee`: the fixed
/// amount when configured, else `fee` times the scale.
pub fn support_amount(fee: &Fee, support: &FeesSupportAccount, decimals: u8) -> Result<Amount, AdapterError> {
    support.validate()?;

    let amount = match &support.fix_support_amount {
        Some(fixed) => Amount::parse(fixed, decimals)?,
        None => {
            let scale = Amount::parse_factor(support.scale())?;
            fee.total_amount(decimals)
                .mul_factor(&scale)
                .ok_or_else(|| AdapterError::InvalidAmount(format!("fee support scale {} overflows", support.scale())))?
        }
    };

    if amount.is_zero() {
        return Err(AdapterError::InvalidAmount("fee support amount must be positive".into()));
    }
    Ok(amount)
}
