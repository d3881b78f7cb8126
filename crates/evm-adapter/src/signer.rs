//! The key-store seam.

use chain_evm::Address;
use keystore::LocalKeyStore;
use secrecy::SecretString;

use crate::error::AdapterError;

/// Signs 32-byte digests with keys held for an account.
pub trait KeyStore: Send + Sync {
    /// Unlocks the key for `address` under `account_id` with `password` and
    /// signs `digest`, returning `r || s || recovery_id`.
    ///
    /// A wrong password is [`AdapterError::AuthenticationFailed`].
    fn sign_digest(
        &self,
        account_id: &str,
        address: &Address,
        password: &SecretString,
        digest: &[u8; 32],
    ) -> Result<[u8; 65], AdapterError>;
}

impl KeyStore for LocalKeyStore {
    fn sign_digest(
        &self,
        account_id: &str,
        address: &Address,
        password: &SecretString,
        digest: &[u8; 32],
    ) -> Result<[u8; 65], AdapterError> {
        Ok(LocalKeyStore::sign_digest(self, account_id, address, password, digest)?)
    }
}
