//! Native and ERC-20 balance queries.

use chain_evm::address::{lower_hex, parse_address};
use chain_evm::erc20::ERC20_ABI;
use chain_evm::{Address, Amount, U256};
use futures::future::join_all;
use serde_json::Value;

use crate::client::{BlockTag, CallMsg, RpcMethod};
use crate::context::PipelineContext;
use crate::error::AdapterError;
use crate::types::{Account, Balance, SmartContract, TokenBalance};

pub async fn native_balance(ctx: &PipelineContext, address: Address) -> Result<U256, AdapterError> {
    ctx.rpc(RpcMethod::GetBalance, ctx.client.get_balance(address)).await
}

/// `balanceOf(owner)` on `contract`, in the token's smallest unit.
pub async fn token_balance(
    ctx: &PipelineContext,
    contract: &SmartContract,
    owner: Address,
) -> Result<U256, AdapterError> {
    let contract_address = parse_address(&contract.address)?;
    let data = ctx.abi.encode(ERC20_ABI, "balanceOf", &[lower_hex(&owner)])?;

    let call = CallMsg::read(contract_address, data);
    let output = ctx
        .rpc(RpcMethod::Call, ctx.client.call(&call, BlockTag::Latest))
        .await?;

    let result = ctx.abi.decode_result(ERC20_ABI, "balanceOf", &output)?;
    let raw = result
        .get("balance")
        .and_then(Value::as_str)
        .ok_or_else(|| AdapterError::ContractCallFailed(format!("{} balanceOf returned no balance", contract.address)))?;
    U256::from_str_radix(raw, 10)
        .map_err(|e| AdapterError::ContractCallFailed(format!("{} balanceOf returned {raw}: {e}", contract.address)))
}

/// A balance with nothing pending.
pub fn settled(address: impl Into<String>, amount: Amount) -> Balance {
    let display = amount.to_string();
    Balance {
        address: address.into(),
        confirmed: display.clone(),
        unconfirmed: "0".to_string(),
        total: display,
    }
}

pub async fn address_balance(ctx: &PipelineContext, address: &str) -> Result<Balance, AdapterError> {
    let parsed = parse_address(address)?;
    let raw = native_balance(ctx, parsed).await?;
    Ok(settled(address, Amount::from_raw(raw, ctx.config.decimals)))
}

/// Sum of the native balances of every address of `account`.
pub async fn account_balance(ctx: &PipelineContext, account: &Account) -> Result<Balance, AdapterError> {
    let addresses = parse_all(&account.addresses)?;
    let balances = join_all(addresses.into_iter().map(|a| native_balance(ctx, a))).await;
    let total = sum(balances)?;
    Ok(settled(account.account_id.clone(), Amount::from_raw(total, ctx.config.decimals)))
}

/// Sum of the `contract` balances of every address of `account`.
pub async fn account_token_balance(
    ctx: &PipelineContext,
    account: &Account,
    contract: &SmartContract,
) -> Result<TokenBalance, AdapterError> {
    let addresses = parse_all(&account.addresses)?;
    let balances = join_all(addresses.into_iter().map(|a| token_balance(ctx, contract, a))).await;
    let total = sum(balances)?;
    Ok(TokenBalance {
        contract: contract.clone(),
        balance: settled(account.account_id.clone(), Amount::from_raw(total, contract.decimals)),
    })
}

fn parse_all(addresses: &[String]) -> Result<Vec<Address>, AdapterError> {
    addresses
        .iter()
        .map(|a| parse_address(a).map_err(AdapterError::from))
        .collect()
}

fn sum(balances: Vec<Result<U256, AdapterError>>) -> Result<U256, AdapterError> {
    balances
        .into_iter()
        .try_fold(U256::ZERO, |acc, balance| Ok(acc.saturating_add(balance?)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settled_balance_has_nothing_pending() {
        let balance = settled("0xabc", Amount::parse("1.50", 2).unwrap());
        assert_eq!(balance.confirmed, "1.5");
        assert_eq!(balance.total, "1.5");
        assert_eq!(balance.unconfirmed, "0");
    }

    #[test]
    fn sum_propagates_first_error() {
        let ok = sum(vec![Ok(U256::from(2u64)), Ok(U256::from(3u64))]).unwrap();
        assert_eq!(ok, U256::from(5u64));

        let err = sum(vec![
            Ok(U256::from(2u64)),
            Err(AdapterError::RpcUnavailable("down".into())),
        ]);
        assert!(matches!(err, Err(AdapterError::RpcUnavailable(_))));
    }
}
