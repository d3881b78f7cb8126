use alloy_primitives::Address;
use k256::ecdsa::{SigningKey, VerifyingKey};
use sha3::{Digest, Keccak256};
use zeroize::Zeroize;

use crate::error::EvmError;

/// Parses a 0x-prefixed hex address.
///
/// All-lowercase and all-uppercase forms are accepted as-is. Mixed-case input
/// must carry a valid EIP-55 checksum.
pub fn parse_address(address: &str) -> Result<Address, EvmError> {
    let hex_part = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .ok_or_else(|| EvmError::InvalidAddress("address must start with 0x".into()))?;

    if hex_part.len() != 40 {
        return Err(EvmError::InvalidAddress(format!(
            "expected 40 hex characters, got {}",
            hex_part.len()
        )));
    }

    if !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(EvmError::InvalidAddress(
            "address contains non-hex characters".into(),
        ));
    }

    let bytes = hex::decode(hex_part)
        .map_err(|e| EvmError::InvalidAddress(format!("invalid hex: {e}")))?;
    let parsed = Address::from_slice(&bytes);

    let is_all_lower = hex_part.chars().all(|c| !c.is_ascii_uppercase());
    let is_all_upper = hex_part.chars().all(|c| !c.is_ascii_lowercase());
    if !is_all_lower && !is_all_upper && checksum(&parsed)[2..] != *hex_part {
        return Err(EvmError::InvalidAddress(format!(
            "checksum mismatch for {address}"
        )));
    }

    Ok(parsed)
}

/// EIP-55 mixed-case rendering of an address.
pub fn checksum(address: &Address) -> String {
    let lower = hex::encode(address.as_slice());
    let hash = Keccak256::digest(lower.as_bytes());

    let mut out = String::with_capacity(42);
    out.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        // Nibble i of the hash decides the case of character i.
        let byte = hash[i / 2];
        let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };
        if c.is_ascii_alphabetic() && nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Lowercase 0x-prefixed rendering, the form used as a lookup key.
pub fn lower_hex(address: &Address) -> String {
    format!("0x{}", hex::encode(address.as_slice()))
}

/// Derives the address of an uncompressed secp256k1 public key (65 bytes,
/// `0x04 || x || y`): the last 20 bytes of `keccak256(x || y)`.
pub fn address_from_pubkey(uncompressed_pubkey: &[u8]) -> Result<Address, EvmError> {
    if uncompressed_pubkey.len() != 65 || uncompressed_pubkey[0] != 0x04 {
        return Err(EvmError::InvalidPublicKey(
            "expected 65-byte uncompressed key starting with 0x04".into(),
        ));
    }

    let hash = Keccak256::digest(&uncompressed_pubkey[1..]);
    Ok(Address::from_slice(&hash[12..]))
}

pub fn address_from_verifying_key(key: &VerifyingKey) -> Result<Address, EvmError> {
    let point = key.to_encoded_point(false);
    address_from_pubkey(point.as_bytes())
}

/// Derives the address controlled by a raw 32-byte private key.
pub fn address_from_private_key(private_key: &[u8; 32]) -> Result<Address, EvmError> {
    let mut key_bytes = *private_key;
    let signing_key = SigningKey::from_bytes((&key_bytes).into())
        .map_err(|e| EvmError::InvalidPrivateKey(e.to_string()));
    key_bytes.zeroize();
    address_from_verifying_key(signing_key?.verifying_key())
}
