use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_rlp::{Encodable, RlpEncodable};
use k256::ecdsa::signature::hazmat::PrehashSigner;
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use sha3::{Digest, Keccak256};
use zeroize::Zeroize;

use crate::address::address_from_verifying_key;
use crate::error::EvmError;

/// An unsigned legacy transaction with EIP-155 replay protection.
///
/// The fee is `gas_price * gas_limit`, paid in the native asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyTransaction {
    pub chain_id: u64,
    pub nonce: u64,
    /// Wei per unit of gas.
    pub gas_price: U256,
    pub gas_limit: u64,
    pub to: Address,
    /// Native value in wei.
    pub value: U256,
    /// Calldata (empty for simple native transfers).
    pub data: Vec<u8>,
}

/// A signed transaction ready for broadcast.
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    /// RLP-encoded signed transaction bytes.
    pub raw_tx: Vec<u8>,
    /// Transaction hash as a 0x-prefixed hex string.
    pub tx_hash: String,
}

impl LegacyTransaction {
    /// The EIP-155 signing payload:
    /// `rlp([nonce, gas_price, gas_limit, to, value, data, chain_id, 0, 0])`.
    pub fn encode_for_signing(&self) -> Vec<u8> {
        let fields = UnsignedFields {
            nonce: self.nonce,
            gas_price: self.gas_price,
            gas_limit: self.gas_limit,
            to: self.to,
            value: self.value,
            data: Bytes::from(self.data.clone()),
            chain_id: self.chain_id,
            empty_r: 0,
            empty_s: 0,
        };

        let mut buf = Vec::with_capacity(fields.length());
        fields.encode(&mut buf);
        buf
    }

    /// Keccak-256 of [`encode_for_signing`](Self::encode_for_signing).
    pub fn signing_hash(&self) -> B256 {
        B256::from_slice(&Keccak256::digest(self.encode_for_signing()))
    }

    /// Assembles the broadcastable bytes from a 65-byte `r || s || recovery id`
    /// signature over [`signing_hash`](Self::signing_hash).
    pub fn encode_signed(&self, signature: &[u8; 65]) -> Result<SignedTransaction, EvmError> {
        let recovery = signature[64];
        if recovery > 1 {
            return Err(EvmError::InvalidSignature(format!(
                "recovery id must be 0 or 1, got {recovery}"
            )));
        }

        let v = self
            .chain_id
            .checked_mul(2)
            .and_then(|n| n.checked_add(35 + recovery as u64))
            .ok_or_else(|| EvmError::TransactionBuildError("chain id too large".into()))?;

        let fields = SignedFields {
            nonce: self.nonce,
            gas_price: self.gas_price,
            gas_limit: self.gas_limit,
            to: self.to,
            value: self.value,
            data: Bytes::from(self.data.clone()),
            v,
            r: U256::from_be_slice(&signature[..32]),
            s: U256::from_be_slice(&signature[32..64]),
        };

        let mut raw_tx = Vec::with_capacity(fields.length());
        fields.encode(&mut raw_tx);

        let tx_hash = format!("0x{}", hex::encode(Keccak256::digest(&raw_tx)));
        Ok(SignedTransaction { raw_tx, tx_hash })
    }
}

/// Signs a 32-byte digest, returning `r || s || recovery id` (recovery id is
/// 0 or 1, s is normalised to the lower half of the curve order).
pub fn sign_hash(hash: &[u8; 32], private_key: &[u8; 32]) -> Result<[u8; 65], EvmError> {
    let mut key_bytes = *private_key;
    let signing_key = SigningKey::from_bytes((&key_bytes).into())
        .map_err(|e| EvmError::InvalidPrivateKey(e.to_string()));
    key_bytes.zeroize();

    let (signature, recovery_id): (Signature, RecoveryId) = signing_key?
        .sign_prehash(hash)
        .map_err(|e| EvmError::SigningError(e.to_string()))?;

    let mut out = [0u8; 65];
    out[..32].copy_from_slice(&signature.r().to_bytes());
    out[32..64].copy_from_slice(&signature.s().to_bytes());
    out[64] = recovery_id.to_byte();
    Ok(out)
}

/// Recovers the address that produced `signature` over `hash`.
///
/// Accepts recovery ids 0/1 as well as the 27/28 form.
pub fn recover_signer(hash: &[u8; 32], signature: &[u8; 65]) -> Result<Address, EvmError> {
    let v = signature[64];
    let recovery = if v >= 27 { v - 27 } else { v };

    let sig = Signature::from_slice(&signature[..64])
        .map_err(|e| EvmError::InvalidSignature(e.to_string()))?;
    let recid = RecoveryId::from_byte(recovery)
        .ok_or_else(|| EvmError::InvalidSignature(format!("invalid recovery id {v}")))?;

    let key = VerifyingKey::recover_from_prehash(hash, &sig, recid)
        .map_err(|e| EvmError::InvalidSignature(format!("recovery failed: {e}")))?;
    address_from_verifying_key(&key)
}

// ---------------------------------------------------------------------------
// RLP-encodable structures
// ---------------------------------------------------------------------------

#[derive(RlpEncodable)]
struct UnsignedFields {
    nonce: u64,
    gas_price: U256,
    gas_limit: u64,
    to: Address,
    value: U256,
    data: Bytes,
    chain_id: u64,
    empty_r: u8,
    empty_s: u8,
}

#[derive(RlpEncodable)]
struct SignedFields {
    nonce: u64,
    gas_price: U256,
    gas_limit: u64,
    to: Address,
    value: U256,
    data: Bytes,
    v: u64,
    r: U256,
    s: U256,
}
