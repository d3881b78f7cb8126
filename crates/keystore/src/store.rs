use std::collections::HashMap;
use std::sync::RwLock;

use chain_evm::Address;
use rand::RngCore;
use rand_core::OsRng;
use secrecy::{ExposeSecret, SecretString};
use zeroize::Zeroizing;

use crate::error::KeyStoreError;
use crate::kdf::KdfParams;
use crate::sealed_key::SealedKey;

/// In-process store of sealed keys, indexed by account and address.
///
/// Keys stay sealed at rest. Each signature re-derives the password key,
/// opens the private key, signs and drops the plaintext.
#[derive(Debug, Default)]
pub struct LocalKeyStore {
    params: KdfParams,
    keys: RwLock<HashMap<(String, Address), SealedKey>>,
}

impl LocalKeyStore {
    pub fn new(params: KdfParams) -> Self {
        Self {
            params,
            keys: RwLock::new(HashMap::new()),
        }
    }

    /// Seals `private_key` under `password` and files it under `account_id`.
    /// Returns the address the key controls.
    pub fn import_key(
        &self,
        account_id: &str,
        private_key: &[u8; 32],
        password: &SecretString,
    ) -> Result<Address, KeyStoreError> {
        let sealed = SealedKey::seal(private_key, password.expose_secret().as_bytes(), self.params)?;
        let address = sealed.address;
        self.insert_sealed(account_id, sealed)?;
        Ok(address)
    }

    /// Generates a fresh key for `account_id`.
    pub fn generate_key(&self, account_id: &str, password: &SecretString) -> Result<Address, KeyStoreError> {
        let mut private_key = Zeroizing::new([0u8; 32]);
        // A random 32-byte string is outside the curve order with negligible
        // probability; retry rather than bias the key.
        loop {
            OsRng.fill_bytes(&mut *private_key);
            match self.import_key(account_id, &private_key, password) {
                Err(KeyStoreError::InvalidKey(_)) => continue,
                other => return other,
            }
        }
    }

    /// Files an already sealed key, e.g. one restored from JSON.
    pub fn insert_sealed(&self, account_id: &str, sealed: SealedKey) -> Result<(), KeyStoreError> {
        let mut keys = self.keys.write().map_err(|_| KeyStoreError::Poisoned)?;
        keys.insert((account_id.to_string(), sealed.address), sealed);
        Ok(())
    }

    pub fn sealed(&self, account_id: &str, address: &Address) -> Result<Option<SealedKey>, KeyStoreError> {
        let keys = self.keys.read().map_err(|_| KeyStoreError::Poisoned)?;
        Ok(keys.get(&(account_id.to_string(), *address)).cloned())
    }

    /// Addresses held for `account_id`, in no particular order.
    pub fn addresses(&self, account_id: &str) -> Result<Vec<Address>, KeyStoreError> {
        let keys = self.keys.read().map_err(|_| KeyStoreError::Poisoned)?;
        Ok(keys
            .keys()
            .filter(|(account, _)| account == account_id)
            .map(|(_, address)| *address)
            .collect())
    }

    /// Signs a 32-byte digest with the key for (`account_id`, `address`).
    /// Returns `r || s || recovery_id`.
    pub fn sign_digest(
        &self,
        account_id: &str,
        address: &Address,
        password: &SecretString,
        digest: &[u8; 32],
    ) -> Result<[u8; 65], KeyStoreError> {
        let sealed = self
            .sealed(account_id, address)?
            .ok_or_else(|| KeyStoreError::KeyNotFound {
                account_id: account_id.to_string(),
                address: chain_evm::address::checksum(address),
            })?;

        let private_key = sealed.open(password.expose_secret().as_bytes())?;
        Ok(chain_evm::transaction::sign_hash(digest, &private_key)?)
    }
}
