//! Unsigned transaction construction.

use chain_evm::address::{checksum, lower_hex, parse_address};
use chain_evm::erc20::ERC20_ABI;
use chain_evm::transaction::LegacyTransaction;
use chain_evm::{Address, Amount, U256};

use crate::balance;
use crate::client::{CallMsg, RpcMethod};
use crate::context::PipelineContext;
use crate::error::AdapterError;
use crate::fee::{Fee, FeeEstimator};
use crate::types::{Account, ExtraParams, RawTransaction, TransferKind, TransferRequest, TxStatus};

/// A transfer resolved to concrete addresses and a parsed amount.
#[derive(Debug, Clone)]
pub struct Transfer {
    pub from: Address,
    pub to: Address,
    pub amount: Amount,
    pub kind: TransferKind,
    pub fee_rate: Option<String>,
    pub extra: ExtraParams,
}

/// Precision of the asset `kind` moves.
pub fn asset_decimals(ctx: &PipelineContext, kind: &TransferKind) -> u8 {
    kind.contract().map_or(ctx.config.decimals, |c| c.decimals)
}

/// Parses a transfer amount, rejecting zero.
pub fn parse_positive(amount: &str, decimals: u8) -> Result<Amount, AdapterError> {
    let parsed = Amount::parse(amount, decimals)?;
    if parsed.is_zero() {
        return Err(AdapterError::InvalidAmount(format!("{amount} is not positive")));
    }
    Ok(parsed)
}

/// Builds an unsigned transfer for `account`.
///
/// With `request.from` unset, the account's addresses are tried in order and
/// the first one able to cover amount and fee sends. When none can, the
/// shortfall of the first address is returned.
pub async fn create_transaction(
    ctx: &PipelineContext,
    account: &Account,
    request: &TransferRequest,
) -> Result<RawTransaction, AdapterError> {
    let to = parse_address(&request.to)?;
    let kind = TransferKind::from_contract(request.contract.clone());
    let amount = parse_positive(&request.amount, asset_decimals(ctx, &kind))?;
    if kind.contract().is_some() && request.extra.data.is_some() {
        return Err(AdapterError::ContractCallFailed(
            "extra calldata cannot be attached to a token transfer".into(),
        ));
    }

    let candidates = match &request.from {
        Some(from) => {
            let from = parse_address(from)?;
            if !account.holds(&from) {
                return Err(AdapterError::InvalidAddress(format!(
                    "{} is not an address of account {}",
                    checksum(&from),
                    account.account_id
                )));
            }
            vec![from]
        }
        None => account
            .addresses
            .iter()
            .map(|a| parse_address(a).map_err(AdapterError::from))
            .collect::<Result<Vec<_>, _>>()?,
    };
    if candidates.is_empty() {
        return Err(AdapterError::AccountNotFound(format!(
            "account {} has no addresses",
            account.account_id
        )));
    }

    let mut shortfall = None;
    for from in candidates {
        let transfer = Transfer {
            from,
            to,
            amount,
            kind: kind.clone(),
            fee_rate: request.fee_rate.clone(),
            extra: request.extra.clone(),
        };
        match build_transfer(ctx, account, &transfer).await {
            Err(e @ AdapterError::InsufficientBalance { .. }) => {
                tracing::debug!(account_id = %account.account_id, from = %checksum(&from), error = %e, "address cannot cover transfer");
                shortfall.get_or_insert(e);
            }
            other => return other,
        }
    }

    Err(shortfall.unwrap_or_else(|| AdapterError::AccountNotFound(account.account_id.clone())))
}

/// Builds an unsigned transfer from `transfer.from`, enforcing
/// `amount + fee <= balance` for native transfers and
/// `amount <= token balance`, `fee <= native balance` for tokens.
pub async fn build_transfer(
    ctx: &PipelineContext,
    account: &Account,
    transfer: &Transfer,
) -> Result<RawTransaction, AdapterError> {
    let nonce = match transfer.extra.nonce {
        Some(nonce) => nonce,
        None => {
            ctx.rpc(RpcMethod::GetTransactionCount, ctx.client.get_nonce(transfer.from))
                .await?
        }
    };
    let native = balance::native_balance(ctx, transfer.from).await?;

    if let Some(contract) = transfer.kind.contract() {
        let tokens = balance::token_balance(ctx, contract, transfer.from).await?;
        if transfer.amount.raw() > tokens {
            return Err(AdapterError::InsufficientBalance {
                address: checksum(&transfer.from),
                required: transfer.amount.to_string(),
                available: Amount::from_raw(tokens, contract.decimals).to_string(),
            });
        }
    }

    let call = transfer_call(ctx, transfer)?;
    let fee = FeeEstimator::new(ctx)
        .estimate(&call, transfer.fee_rate.as_deref(), &transfer.extra)
        .await?;

    let required = match transfer.kind {
        TransferKind::Native => transfer
            .amount
            .raw()
            .checked_add(fee.total())
            .ok_or_else(|| AdapterError::InvalidAmount("amount plus fee overflows".into()))?,
        TransferKind::Token(_) => fee.total(),
    };
    if required > native {
        return Err(AdapterError::InsufficientBalance {
            address: checksum(&transfer.from),
            required: Amount::from_raw(required, ctx.config.decimals).to_string(),
            available: Amount::from_raw(native, ctx.config.decimals).to_string(),
        });
    }

    Ok(assemble(ctx, account, transfer, call, fee, nonce))
}

/// The call a transfer makes on chain: a value transfer to the recipient, or
/// `transfer(to, amount)` on the token contract with zero value.
pub fn transfer_call(ctx: &PipelineContext, transfer: &Transfer) -> Result<CallMsg, AdapterError> {
    match &transfer.kind {
        TransferKind::Native => Ok(CallMsg {
            from: Some(transfer.from),
            to: transfer.to,
            value: transfer.amount.raw(),
            data: transfer.extra.data.clone().unwrap_or_default(),
        }),
        TransferKind::Token(contract) => {
            let data = ctx.abi.encode(
                ERC20_ABI,
                "transfer",
                &[lower_hex(&transfer.to), transfer.amount.raw().to_string()],
            )?;
            Ok(CallMsg {
                from: Some(transfer.from),
                to: parse_address(&contract.address)?,
                value: U256::ZERO,
                data,
            })
        }
    }
}

/// Freezes a transfer into an `Unsigned` transaction with its EIP-155
/// signing payload.
pub(crate) fn assemble(
    ctx: &PipelineContext,
    account: &Account,
    transfer: &Transfer,
    call: CallMsg,
    fee: Fee,
    nonce: u64,
) -> RawTransaction {
    let tx = LegacyTransaction {
        chain_id: ctx.config.chain_id,
        nonce,
        gas_price: fee.gas_price,
        gas_limit: fee.gas_limit,
        to: call.to,
        value: call.value,
        data: call.data,
    };
    let unsigned_payload = tx.encode_for_signing();
    let signing_hash = tx.signing_hash();

    let raw = RawTransaction {
        account: account.clone(),
        from: checksum(&transfer.from),
        to: checksum(&transfer.to),
        amount: transfer.amount.to_string(),
        fee_rate: Amount::from_raw(fee.gas_price, ctx.config.decimals).to_string(),
        kind: transfer.kind.clone(),
        extra: transfer.extra.clone(),
        fees: fee.total_amount(ctx.config.decimals).to_string(),
        tx,
        unsigned_payload,
        signing_hash,
        signatures: Vec::new(),
        status: TxStatus::Unsigned,
        tx_id: None,
        wx_id: None,
    };

    tracing::info!(
        account_id = %account.account_id,
        from = %raw.from,
        to = %raw.to,
        amount = %raw.amount,
        fees = %raw.fees,
        nonce,
        "transaction built"
    );
    raw
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_amounts_only() {
        assert_eq!(parse_positive("1.5", 18).unwrap().to_string(), "1.5");
        assert!(matches!(parse_positive("0", 18), Err(AdapterError::InvalidAmount(_))));
        assert!(matches!(parse_positive("0.000", 2), Err(AdapterError::InvalidAmount(_))));
        assert!(matches!(parse_positive("-1", 18), Err(AdapterError::InvalidAmount(_))));
        assert!(matches!(parse_positive("1.001", 2), Err(AdapterError::InvalidAmount(_))));
    }

    #[test]
    fn account_membership_ignores_case() {
        let account = Account::single(
            "w",
            "a",
            vec!["0x7e5f4552091a69125d5dfcb7b8c2659029395bdf".into()],
        );
        let address = parse_address("0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf").unwrap();
        assert!(account.holds(&address));
        assert!(!account.holds(&Address::ZERO));
    }
}
