//! Sign → verify → submit.
//!
//! ```text
//! Unsigned ─sign─▶ Signed ─verify─▶ Verified ─submit─▶ Submitted
//!              ▲ sign │                              │ rejected
//!              └──────┘                              ▼
//!                                                  Failed
//! ```
//!
//! Every operation checks the current state first and leaves the
//! transaction untouched when it fails, except a node rejection on submit,
//! which moves it to `Failed`.

use chain_evm::address::{checksum, parse_address};
use chain_evm::transaction::recover_signer;
use chain_evm::Address;
use secrecy::SecretString;
use sha3::{Digest, Keccak256};

use crate::client::RpcMethod;
use crate::context::PipelineContext;
use crate::error::AdapterError;
use crate::types::{Account, RawTransaction, TxSignature, TxStatus};

/// Adds the next missing signature: the sender's first, then each owner's.
///
/// `account` is the wallet store's current record, not the snapshot the
/// transaction carries.
pub fn sign_transaction(
    ctx: &PipelineContext,
    account: &Account,
    tx: &mut RawTransaction,
    password: &SecretString,
) -> Result<(), AdapterError> {
    if !matches!(tx.status, TxStatus::Unsigned | TxStatus::Signed) {
        return Err(AdapterError::InvalidState {
            operation: "sign",
            status: tx.status,
        });
    }

    let from = sender(account, tx)?;
    let signed = signed_by(tx);
    let signer = account
        .eligible_signers(from)?
        .into_iter()
        .find(|candidate| !signed.contains(candidate))
        .ok_or(AdapterError::InvalidState {
            operation: "sign",
            status: tx.status,
        })?;

    let signature = ctx
        .keys
        .sign_digest(&account.account_id, &signer, password, &tx.signing_hash.0)?;

    tx.signatures.push(TxSignature {
        signer: checksum(&signer),
        signature,
    });
    tx.status = TxStatus::Signed;

    tracing::info!(
        account_id = %account.account_id,
        from = %tx.from,
        signer = %checksum(&signer),
        signatures = tx.signatures.len(),
        required = account.required,
        "transaction signed"
    );
    Ok(())
}

/// Checks every signature recovers to its claimed, eligible signer and that
/// the threshold of the stored `account` is met.
pub fn verify_transaction(account: &Account, tx: &mut RawTransaction) -> Result<(), AdapterError> {
    if !matches!(tx.status, TxStatus::Signed | TxStatus::Verified) {
        return Err(AdapterError::InvalidState {
            operation: "verify",
            status: tx.status,
        });
    }

    let digest = Keccak256::digest(&tx.unsigned_payload);
    if digest.as_slice() != tx.signing_hash.as_slice() || tx.tx.signing_hash() != tx.signing_hash {
        return Err(AdapterError::SignatureInvalid(
            "signing hash does not match the transaction payload".into(),
        ));
    }

    let from = sender(account, tx)?;
    let eligible = account.eligible_signers(from)?;
    let mut seen: Vec<Address> = Vec::with_capacity(tx.signatures.len());
    for sig in &tx.signatures {
        let claimed = parse_address(&sig.signer)?;
        let recovered = recover_signer(&tx.signing_hash.0, &sig.signature)
            .map_err(|e| AdapterError::SignatureInvalid(e.to_string()))?;
        if recovered != claimed {
            return Err(AdapterError::SignatureInvalid(format!(
                "signature claims {} but recovers to {}",
                checksum(&claimed),
                checksum(&recovered)
            )));
        }
        if !eligible.contains(&recovered) {
            return Err(AdapterError::SignatureInvalid(format!(
                "{} may not sign for account {}",
                checksum(&recovered),
                account.account_id
            )));
        }
        if seen.contains(&recovered) {
            return Err(AdapterError::SignatureInvalid(format!(
                "duplicate signature from {}",
                checksum(&recovered)
            )));
        }
        seen.push(recovered);
    }

    let required = account.required.max(1);
    if seen.len() < usize::from(required) {
        return Err(AdapterError::ThresholdNotMet {
            required,
            present: seen.len(),
        });
    }
    if !seen.contains(&from) {
        return Err(AdapterError::SignatureInvalid(format!(
            "missing signature from sender {}",
            tx.from
        )));
    }

    tx.status = TxStatus::Verified;
    tracing::info!(account_id = %account.account_id, from = %tx.from, signatures = seen.len(), "transaction verified");
    Ok(())
}

/// Broadcasts a verified transaction and returns the node's hash.
///
/// Never retried: a rejected transaction must be rebuilt. A timeout or an
/// unreachable node leaves the transaction `Verified`.
pub async fn submit_transaction(
    ctx: &PipelineContext,
    account: &Account,
    tx: &mut RawTransaction,
) -> Result<String, AdapterError> {
    match tx.status {
        TxStatus::Verified => {}
        TxStatus::Submitted => {
            return Err(AdapterError::AlreadySubmitted(tx.tx_id.clone().unwrap_or_default()));
        }
        status => {
            return Err(AdapterError::InvalidState {
                operation: "submit",
                status,
            })
        }
    }

    let from = sender(account, tx)?;
    let sender_signature = tx
        .signatures
        .iter()
        .find(|s| parse_address(&s.signer).map(|a| a == from).unwrap_or(false))
        .ok_or_else(|| AdapterError::SignatureInvalid(format!("missing signature from sender {}", tx.from)))?;
    let signed = tx.tx.encode_signed(&sender_signature.signature)?;

    let tx_id = match ctx
        .rpc(RpcMethod::SendRawTransaction, ctx.client.send_raw_transaction(&signed.raw_tx))
        .await
    {
        Ok(tx_id) => tx_id,
        Err(AdapterError::BroadcastRejected(reason)) => {
            tx.status = TxStatus::Failed;
            tracing::warn!(account_id = %tx.account.account_id, from = %tx.from, nonce = tx.tx.nonce, reason = %reason, "broadcast rejected");
            return Err(AdapterError::BroadcastRejected(reason));
        }
        Err(e) => return Err(e),
    };

    if !tx_id.eq_ignore_ascii_case(&signed.tx_hash) {
        tracing::warn!(node = %tx_id, local = %signed.tx_hash, "node returned a different transaction hash");
    }

    let contract = tx.contract().map(|c| c.address.to_lowercase()).unwrap_or_default();
    tx.wx_id = Some(tracking_id(&tx_id, &ctx.config.symbol, &contract));
    tx.tx_id = Some(tx_id.clone());
    tx.status = TxStatus::Submitted;

    tracing::info!(account_id = %tx.account.account_id, from = %tx.from, to = %tx.to, nonce = tx.tx.nonce, tx_id = %tx_id, "transaction submitted");
    Ok(tx_id)
}

/// `keccak256("{tx_id}|{symbol}|{contract}")`, hex encoded.
pub fn tracking_id(tx_id: &str, symbol: &str, contract: &str) -> String {
    let digest = Keccak256::digest(format!("{tx_id}|{symbol}|{contract}").as_bytes());
    hex::encode(digest)
}

/// The transaction's sender, which must still be an address of `account`.
fn sender(account: &Account, tx: &RawTransaction) -> Result<Address, AdapterError> {
    if tx.account.wallet_id != account.wallet_id || tx.account.account_id != account.account_id {
        return Err(AdapterError::AccountNotFound(format!(
            "transaction belongs to {}/{}, not {}/{}",
            tx.account.wallet_id, tx.account.account_id, account.wallet_id, account.account_id
        )));
    }
    let from = parse_address(&tx.from)?;
    if !account.holds(&from) {
        return Err(AdapterError::AccountNotFound(format!(
            "{} is not an address of account {}",
            tx.from, account.account_id
        )));
    }
    Ok(from)
}

fn signed_by(tx: &RawTransaction) -> Vec<Address> {
    tx.signatures
        .iter()
        .filter_map(|s| parse_address(&s.signer).ok())
        .collect()
}
