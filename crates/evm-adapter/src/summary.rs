//! Sweeps: consolidating an account's addresses into one collection address.
//!
//! Every address in the window is planned independently and concurrently;
//! results come back in address order. Token sweeps from addresses that
//! cannot pay gas are paired with a sponsor transfer when a fee-support
//! account is configured.

use chain_evm::address::{checksum, parse_address};
use chain_evm::{Address, Amount, U256};
use futures::future::join_all;

use crate::balance;
use crate::builder::{asset_decimals, assemble, transfer_call, Transfer};
use crate::client::RpcMethod;
use crate::context::PipelineContext;
use crate::error::AdapterError;
use crate::fee::{self, Fee, FeeEstimator};
use crate::types::{
    Account, ExtraParams, FeesSupportAccount, RawTransaction, RawTransactionWithError, SummaryRequest, TransferKind,
};

/// Request fields shared by every address of a batch.
struct Sweep<'a> {
    account: &'a Account,
    summary_address: Address,
    kind: TransferKind,
    decimals: u8,
    min_transfer: Amount,
    retained: Amount,
    fee_rate: Option<&'a str>,
    sponsor: Option<Sponsor<'a>>,
}

/// Fee-support account of a batch and the address its transfers leave from.
#[derive(Clone, Copy)]
struct Sponsor<'a> {
    support: &'a FeesSupportAccount,
    account: &'a Account,
    address: Address,
}

/// Token sweep whose source cannot pay its own gas.
struct Unfunded {
    transfer: Transfer,
    fee: Fee,
    nonce: u64,
    native: U256,
}

enum Plan<'a> {
    Skip { transferable: Option<Amount> },
    Ready(RawTransaction),
    NeedsSupport { unfunded: Box<Unfunded>, sponsor: Sponsor<'a> },
}

/// Sponsor address state, threaded through the batch so sponsor transfers
/// get consecutive nonces and are paid from one running balance.
struct SponsorState {
    address: Address,
    next_nonce: u64,
    available: U256,
}

/// Plans a sweep of `account` into `request.summary_address`.
///
/// Returns one entry per address that has something to sweep. Addresses
/// whose `balance - retained_balance` is below `min_transfer` (or not
/// positive) are skipped without an entry. Per-address failures land in the
/// entry's `error`; only invalid request parameters fail the whole call.
/// The sponsor address may not be swept in the same batch, since its
/// transfers and a sweep from it would compete for the same nonces.
pub async fn create_summary_transactions(
    ctx: &PipelineContext,
    account: &Account,
    request: &SummaryRequest,
    sponsor: Option<&Account>,
) -> Result<Vec<RawTransactionWithError>, AdapterError> {
    let summary_address = parse_address(&request.summary_address)?;
    let kind = TransferKind::from_contract(request.contract.clone());
    let decimals = asset_decimals(ctx, &kind);
    let min_transfer = parse_threshold(&request.min_transfer, decimals)?;
    let retained = parse_threshold(&request.retained_balance, decimals)?;
    let fee_rate = request.fee_rate.as_deref().filter(|r| !r.trim().is_empty());
    if let Some(rate) = fee_rate {
        Amount::parse(rate, ctx.config.decimals)?;
    }

    let sponsor = match &request.fee_support {
        Some(support) => {
            support.validate()?;
            let account = sponsor.ok_or_else(|| AdapterError::AccountNotFound(support.account_id.clone()))?;
            Some(Sponsor {
                support,
                account,
                address: sponsor_address(account)?,
            })
        }
        None => None,
    };

    let sweep = Sweep {
        account,
        summary_address,
        kind,
        decimals,
        min_transfer,
        retained,
        fee_rate,
        sponsor,
    };

    let addresses = window(&account.addresses, request.start, request.limit);
    if let Some(sponsor) = &sweep.sponsor {
        let swept = addresses
            .iter()
            .any(|a| parse_address(a).map(|a| a == sponsor.address).unwrap_or(false));
        if swept {
            return Err(AdapterError::Config(format!(
                "fee support address {} is part of the swept addresses",
                checksum(&sponsor.address)
            )));
        }
    }
    let plans = join_all(addresses.iter().map(|address| plan_address(ctx, &sweep, address))).await;

    let mut sponsor_state: Option<Result<SponsorState, AdapterError>> = None;
    let mut entries = Vec::with_capacity(plans.len());
    for (address, plan) in addresses.iter().zip(plans) {
        match plan {
            Ok(Plan::Skip { transferable }) => {
                tracing::debug!(
                    account_id = %account.account_id,
                    address = %address,
                    transferable = %transferable.map(|t| t.to_string()).unwrap_or_else(|| "negative".into()),
                    "below sweep threshold"
                );
            }
            Ok(Plan::Ready(tx)) => entries.push(RawTransactionWithError::ok(address.clone(), tx, None)),
            Ok(Plan::NeedsSupport { unfunded, sponsor }) => {
                let mut state = match sponsor_state.take() {
                    Some(state) => state,
                    None => load_sponsor(ctx, sponsor.address).await,
                };
                let entry = match &mut state {
                    Ok(state) => sponsor_sweep(ctx, &sweep, sponsor, state, *unfunded).await,
                    Err(e) => Err(e.clone()),
                };
                sponsor_state = Some(state);
                match entry {
                    Ok((tx, support_tx)) => {
                        entries.push(RawTransactionWithError::ok(address.clone(), tx, Some(support_tx)))
                    }
                    Err(e) => {
                        tracing::warn!(account_id = %account.account_id, address = %address, error = %e, "sponsored sweep failed");
                        entries.push(RawTransactionWithError::failed(address.clone(), e));
                    }
                }
            }
            Err(e) => {
                tracing::warn!(account_id = %account.account_id, address = %address, error = %e, "sweep failed");
                entries.push(RawTransactionWithError::failed(address.clone(), e));
            }
        }
    }

    tracing::info!(
        account_id = %account.account_id,
        considered = entries.len(),
        failed = entries.iter().filter(|e| e.error.is_some()).count(),
        "summary batch planned"
    );
    Ok(entries)
}

async fn plan_address<'a>(ctx: &PipelineContext, sweep: &Sweep<'a>, address: &str) -> Result<Plan<'a>, AdapterError> {
    let from = parse_address(address)?;
    let native = balance::native_balance(ctx, from).await?;
    let held = match sweep.kind.contract() {
        Some(contract) => balance::token_balance(ctx, contract, from).await?,
        None => native,
    };

    let transferable = Amount::from_raw(held, sweep.decimals)
        .checked_sub(&sweep.retained)
        .filter(|t| !t.is_zero() && *t >= sweep.min_transfer);
    let Some(transferable) = transferable else {
        return Ok(Plan::Skip {
            transferable: Amount::from_raw(held, sweep.decimals).checked_sub(&sweep.retained),
        });
    };

    let nonce = ctx
        .rpc(RpcMethod::GetTransactionCount, ctx.client.get_nonce(from))
        .await?;
    let mut transfer = Transfer {
        from,
        to: sweep.summary_address,
        amount: transferable,
        kind: sweep.kind.clone(),
        fee_rate: sweep.fee_rate.map(String::from),
        extra: ExtraParams::default(),
    };
    let estimator = FeeEstimator::new(ctx);

    match sweep.kind {
        TransferKind::Native => {
            let call = transfer_call(ctx, &transfer)?;
            let fee = estimator.estimate(&call, sweep.fee_rate, &transfer.extra).await?;
            let amount = transferable
                .raw()
                .checked_sub(fee.total())
                .filter(|a| !a.is_zero())
                .ok_or_else(|| AdapterError::InsufficientBalance {
                    address: checksum(&from),
                    required: fee.total_amount(sweep.decimals).to_string(),
                    available: transferable.to_string(),
                })?;

            transfer.amount = Amount::from_raw(amount, sweep.decimals);
            let call = transfer_call(ctx, &transfer)?;
            Ok(Plan::Ready(assemble(ctx, sweep.account, &transfer, call, fee, nonce)))
        }
        TransferKind::Token(_) => {
            let call = transfer_call(ctx, &transfer)?;
            let fee = estimator.estimate(&call, sweep.fee_rate, &transfer.extra).await?;
            if fee.total() <= native {
                return Ok(Plan::Ready(assemble(ctx, sweep.account, &transfer, call, fee, nonce)));
            }
            let Some(sponsor) = sweep.sponsor else {
                return Err(AdapterError::InsufficientBalance {
                    address: checksum(&from),
                    required: fee.total_amount(ctx.config.decimals).to_string(),
                    available: Amount::from_raw(native, ctx.config.decimals).to_string(),
                });
            };
            Ok(Plan::NeedsSupport {
                unfunded: Box::new(Unfunded {
                    transfer,
                    fee,
                    nonce,
                    native,
                }),
                sponsor,
            })
        }
    }
}

/// First address of the fee-support account.
fn sponsor_address(sponsor: &Account) -> Result<Address, AdapterError> {
    let address = sponsor
        .addresses
        .first()
        .ok_or_else(|| AdapterError::AccountNotFound(format!("fee support account {} has no addresses", sponsor.account_id)))?;
    Ok(parse_address(address)?)
}

async fn load_sponsor(ctx: &PipelineContext, address: Address) -> Result<SponsorState, AdapterError> {
    let next_nonce = ctx
        .rpc(RpcMethod::GetTransactionCount, ctx.client.get_nonce(address))
        .await?;
    let available = balance::native_balance(ctx, address).await?;
    Ok(SponsorState {
        address,
        next_nonce,
        available,
    })
}

/// Builds the sponsor → source fee transfer and the sweep it funds, charging
/// the sponsor's running balance.
async fn sponsor_sweep(
    ctx: &PipelineContext,
    sweep: &Sweep<'_>,
    sponsor: Sponsor<'_>,
    state: &mut SponsorState,
    unfunded: Unfunded,
) -> Result<(RawTransaction, RawTransaction), AdapterError> {
    let native_decimals = ctx.config.decimals;
    let amount = fee::support_amount(&unfunded.fee, sponsor.support, native_decimals)?;

    let funded = unfunded.native.saturating_add(amount.raw());
    if funded < unfunded.fee.total() {
        return Err(AdapterError::InsufficientBalance {
            address: checksum(&unfunded.transfer.from),
            required: unfunded.fee.total_amount(native_decimals).to_string(),
            available: Amount::from_raw(funded, native_decimals).to_string(),
        });
    }

    let support_transfer = Transfer {
        from: state.address,
        to: unfunded.transfer.from,
        amount,
        kind: TransferKind::Native,
        fee_rate: sweep.fee_rate.map(String::from),
        extra: ExtraParams::default(),
    };
    let call = transfer_call(ctx, &support_transfer)?;
    let support_fee = FeeEstimator::new(ctx)
        .estimate(&call, sweep.fee_rate, &support_transfer.extra)
        .await?;

    let cost = amount.raw().saturating_add(support_fee.total());
    let remaining = state
        .available
        .checked_sub(cost)
        .ok_or_else(|| AdapterError::InsufficientBalance {
            address: checksum(&state.address),
            required: Amount::from_raw(cost, native_decimals).to_string(),
            available: Amount::from_raw(state.available, native_decimals).to_string(),
        })?;

    let support_tx = assemble(ctx, sponsor.account, &support_transfer, call, support_fee, state.next_nonce);
    state.next_nonce += 1;
    state.available = remaining;

    let sweep_call = transfer_call(ctx, &unfunded.transfer)?;
    let sweep_tx = assemble(ctx, sweep.account, &unfunded.transfer, sweep_call, unfunded.fee, unfunded.nonce);
    Ok((sweep_tx, support_tx))
}

/// Parses a threshold, treating an empty string as zero.
fn parse_threshold(value: &str, decimals: u8) -> Result<Amount, AdapterError> {
    if value.trim().is_empty() {
        return Ok(Amount::zero(decimals));
    }
    Ok(Amount::parse(value, decimals)?)
}

/// `addresses[start .. start + limit)`, clamped. `limit == 0` runs to the end.
fn window(addresses: &[String], start: usize, limit: usize) -> Vec<String> {
    if start >= addresses.len() {
        return Vec::new();
    }
    let end = if limit == 0 {
        addresses.len()
    } else {
        start.saturating_add(limit).min(addresses.len())
    };
    addresses[start..end].to_vec()
}
