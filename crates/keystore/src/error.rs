use thiserror::Error;

/// Key-store operation errors.
#[derive(Debug, Error)]
pub enum KeyStoreError {
    /// The password did not open the sealed key.
    #[error("authentication failed for {0}")]
    AuthenticationFailed(String),

    #[error("no key for account {account_id} address {address}")]
    KeyNotFound { account_id: String, address: String },

    #[error("key derivation failed: {0}")]
    KdfFailed(String),

    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("invalid key material: {0}")]
    InvalidKey(String),

    #[error("signing failed: {0}")]
    SigningFailed(String),

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("key store lock poisoned")]
    Poisoned,
}

impl From<chain_evm::EvmError> for KeyStoreError {
    fn from(e: chain_evm::EvmError) -> Self {
        match e {
            chain_evm::EvmError::InvalidPrivateKey(msg) => KeyStoreError::InvalidKey(msg),
            other => KeyStoreError::SigningFailed(other.to_string()),
        }
    }
}
