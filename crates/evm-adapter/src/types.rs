use std::fmt;

use chain_evm::transaction::LegacyTransaction;
use chain_evm::{Address, B256};
use serde::{Deserialize, Serialize};

use crate::error::AdapterError;

/// A managed source of funds. Owned by the wallet store; transactions carry
/// a snapshot of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub wallet_id: String,
    pub account_id: String,
    #[serde(default)]
    pub alias: String,
    pub addresses: Vec<String>,
    /// Co-signers besides the sending address. Empty for single-signature
    /// accounts.
    #[serde(default)]
    pub owners: Vec<String>,
    /// Signatures needed before a transaction verifies.
    pub required: u8,
}

impl Account {
    pub fn single(wallet_id: impl Into<String>, account_id: impl Into<String>, addresses: Vec<String>) -> Self {
        Self {
            wallet_id: wallet_id.into(),
            account_id: account_id.into(),
            alias: String::new(),
            addresses,
            owners: Vec::new(),
            required: 1,
        }
    }

    pub fn multisig(
        wallet_id: impl Into<String>,
        account_id: impl Into<String>,
        addresses: Vec<String>,
        owners: Vec<String>,
        required: u8,
    ) -> Self {
        Self {
            owners,
            required,
            ..Self::single(wallet_id, account_id, addresses)
        }
    }

    pub fn is_multisig(&self) -> bool {
        !self.owners.is_empty() || self.required > 1
    }

    /// Addresses allowed to sign a transaction from `from`: the sender first,
    /// then each owner, without duplicates.
    pub fn eligible_signers(&self, from: Address) -> Result<Vec<Address>, AdapterError> {
        let mut signers = vec![from];
        for owner in &self.owners {
            let owner = chain_evm::address::parse_address(owner)?;
            if !signers.contains(&owner) {
                signers.push(owner);
            }
        }
        Ok(signers)
    }

    /// Whether `address` is one of the account's addresses, ignoring case.
    pub fn holds(&self, address: &Address) -> bool {
        self.addresses.iter().any(|a| {
            chain_evm::address::parse_address(a)
                .map(|parsed| parsed == *address)
                .unwrap_or(false)
        })
    }
}

/// An ERC-20 token descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SmartContract {
    pub address: String,
    pub symbol: String,
    pub name: String,
    /// Token ticker as shown to users.
    pub token: String,
    pub decimals: u8,
}

/// What a transaction moves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferKind {
    Native,
    Token(SmartContract),
}

impl TransferKind {
    pub fn from_contract(contract: Option<SmartContract>) -> Self {
        contract.map_or(TransferKind::Native, TransferKind::Token)
    }

    pub fn contract(&self) -> Option<&SmartContract> {
        match self {
            TransferKind::Native => None,
            TransferKind::Token(c) => Some(c),
        }
    }
}

/// Per-call overrides for building a transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraParams {
    /// Used instead of the configured or estimated gas limit.
    pub gas_limit: Option<u64>,
    /// Used instead of the chain's pending nonce.
    pub nonce: Option<u64>,
    /// Recorded on the transaction only.
    pub memo: Option<String>,
    /// Calldata attached to a native transfer. Rejected for token transfers.
    pub data: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TxStatus {
    Unsigned,
    Signed,
    Verified,
    Submitted,
    Failed,
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TxStatus::Unsigned => "unsigned",
            TxStatus::Signed => "signed",
            TxStatus::Verified => "verified",
            TxStatus::Submitted => "submitted",
            TxStatus::Failed => "failed",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxSignature {
    /// EIP-55 address of the signer.
    pub signer: String,
    /// `r || s || recovery_id`
    pub signature: [u8; 65],
}

/// A transaction moving through build → sign → verify → submit.
///
/// `status`, `tx_id` and `wx_id` only change through the lifecycle
/// functions. The owning account and sender are fixed at build time.
#[derive(Debug, Clone)]
pub struct RawTransaction {
    pub(crate) account: Account,
    pub(crate) from: String,
    /// Recipient of the value (not the token contract).
    pub to: String,
    /// Decimal amount at the asset's precision.
    pub amount: String,
    /// Gas price as a native decimal amount.
    pub fee_rate: String,
    pub kind: TransferKind,
    pub extra: ExtraParams,
    /// Total fee (`gas_price * gas_limit`) as a native decimal amount.
    pub fees: String,
    pub tx: LegacyTransaction,
    pub unsigned_payload: Vec<u8>,
    pub signing_hash: B256,
    pub signatures: Vec<TxSignature>,
    pub(crate) status: TxStatus,
    pub(crate) tx_id: Option<String>,
    pub(crate) wx_id: Option<String>,
}

impl RawTransaction {
    /// Snapshot of the account the transaction was built for.
    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn from(&self) -> &str {
        &self.from
    }

    pub fn status(&self) -> TxStatus {
        self.status
    }

    /// Hash the node returned on broadcast.
    pub fn tx_id(&self) -> Option<&str> {
        self.tx_id.as_deref()
    }

    /// Internal tracking id derived from the tx hash, symbol and contract.
    pub fn wx_id(&self) -> Option<&str> {
        self.wx_id.as_deref()
    }

    pub fn nonce(&self) -> u64 {
        self.tx.nonce
    }

    pub fn contract(&self) -> Option<&SmartContract> {
        self.kind.contract()
    }
}

/// One considered address of a sweep batch.
#[derive(Debug, Clone)]
pub struct RawTransactionWithError {
    pub address: String,
    pub raw_tx: Option<RawTransaction>,
    /// Sponsor → `address` native transfer covering the sweep's fee.
    pub fees_support_tx: Option<RawTransaction>,
    pub error: Option<AdapterError>,
}

impl RawTransactionWithError {
    pub(crate) fn ok(address: String, raw_tx: RawTransaction, fees_support_tx: Option<RawTransaction>) -> Self {
        Self {
            address,
            raw_tx: Some(raw_tx),
            fees_support_tx,
            error: None,
        }
    }

    pub(crate) fn failed(address: String, error: AdapterError) -> Self {
        Self {
            address,
            raw_tx: None,
            fees_support_tx: None,
            error: Some(error),
        }
    }
}

/// Sponsor for sweeps whose source cannot pay its own fee.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeesSupportAccount {
    pub account_id: String,
    /// Fixed native amount sent per sponsored address.
    pub fix_support_amount: Option<String>,
    /// Multiplier applied to the sweep's fee.
    pub fees_support_scale: Option<String>,
}

impl FeesSupportAccount {
    pub fn validate(&self) -> Result<(), AdapterError> {
        if self.fix_support_amount.is_some() && self.fees_support_scale.is_some() {
            return Err(AdapterError::Config(format!(
                "fee support account {} sets both fix_support_amount and fees_support_scale",
                self.account_id
            )));
        }
        Ok(())
    }

    /// Scale applied when no fixed amount is configured.
    pub fn scale(&self) -> &str {
        self.fees_support_scale.as_deref().unwrap_or("1")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub address: String,
    pub confirmed: String,
    pub unconfirmed: String,
    pub total: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBalance {
    pub contract: SmartContract,
    pub balance: Balance,
}

/// Inputs of a single transfer.
#[derive(Debug, Clone, Default)]
pub struct TransferRequest {
    /// Sending address. When unset the first of the account's addresses
    /// able to cover amount and fee is used.
    pub from: Option<String>,
    pub to: String,
    pub amount: String,
    /// Gas price override as a native decimal amount.
    pub fee_rate: Option<String>,
    pub contract: Option<SmartContract>,
    pub extra: ExtraParams,
}

/// Inputs of a sweep over `addresses[start .. start + limit)`.
#[derive(Debug, Clone, Default)]
pub struct SummaryRequest {
    pub summary_address: String,
    /// Smallest transferable amount worth sweeping. Empty means zero.
    pub min_transfer: String,
    /// Left behind on every address. Empty means zero.
    pub retained_balance: String,
    pub fee_rate: Option<String>,
    pub start: usize,
    /// `0` sweeps to the end of the address list.
    pub limit: usize,
    pub contract: Option<SmartContract>,
    pub fee_support: Option<FeesSupportAccount>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: &str = "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf";
    const B: &str = "0x2B5AD5c4795c026514f8317c7a215E218DcCD6cF";

    #[test]
    fn single_account_signers_are_sender_only() {
        let account = Account::single("w", "a", vec![A.into()]);
        let from = chain_evm::address::parse_address(A).unwrap();
        assert!(!account.is_multisig());
        assert_eq!(account.eligible_signers(from).unwrap(), vec![from]);
    }

    #[test]
    fn multisig_signers_put_sender_first_and_dedupe() {
        let account = Account::multisig("w", "a", vec![A.into()], vec![A.into(), B.into()], 2);
        let from = chain_evm::address::parse_address(A).unwrap();
        let signers = account.eligible_signers(from).unwrap();
        assert!(account.is_multisig());
        assert_eq!(signers.len(), 2);
        assert_eq!(signers[0], from);
    }

    #[test]
    fn fee_support_rejects_both_modes() {
        let support = FeesSupportAccount {
            account_id: "sponsor".into(),
            fix_support_amount: Some("0.01".into()),
            fees_support_scale: Some("1.5".into()),
        };
        assert!(matches!(support.validate(), Err(AdapterError::Config(_))));
    }

    #[test]
    fn fee_support_defaults_to_unit_scale() {
        let support = FeesSupportAccount {
            account_id: "sponsor".into(),
            ..Default::default()
        };
        assert!(support.validate().is_ok());
        assert_eq!(support.scale(), "1");
    }

    #[test]
    fn transfer_kind_from_contract() {
        assert_eq!(TransferKind::from_contract(None), TransferKind::Native);
        let token = SmartContract {
            address: B.into(),
            symbol: "ETH".into(),
            name: "Tether".into(),
            token: "USDT".into(),
            decimals: 6,
        };
        assert_eq!(TransferKind::from_contract(Some(token.clone())).contract(), Some(&token));
    }
}
