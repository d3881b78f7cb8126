use aes_gcm::aead::{Aead, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Key, KeyInit, Nonce};
use chain_evm::Address;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, Zeroizing};

use crate::error::KeyStoreError;
use crate::kdf::{self, KdfParams};

const NONCE_SIZE: usize = 12;

/// A secp256k1 private key sealed under a password.
///
/// `ciphertext` is `[nonce (12 bytes) | AES-256-GCM ciphertext + tag]`, hex
/// encoded along with the salt when serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedKey {
    pub address: Address,
    #[serde(with = "hex_bytes")]
    pub salt: Vec<u8>,
    #[serde(with = "hex_bytes")]
    pub ciphertext: Vec<u8>,
    pub kdf: KdfParams,
}

impl SealedKey {
    /// Seals `private_key`, recording the address it controls.
    pub fn seal(private_key: &[u8; 32], password: &[u8], params: KdfParams) -> Result<Self, KeyStoreError> {
        let address = chain_evm::address::address_from_private_key(private_key)?;

        let salt = kdf::generate_salt();
        let mut key = kdf::derive_key(password, &salt, &params)?;

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let sealed = cipher.encrypt(&nonce, private_key.as_slice());
        key.zeroize();
        let sealed = sealed.map_err(|e| KeyStoreError::EncryptionFailed(e.to_string()))?;

        let mut ciphertext = Vec::with_capacity(NONCE_SIZE + sealed.len());
        ciphertext.extend_from_slice(&nonce);
        ciphertext.extend_from_slice(&sealed);

        Ok(Self {
            address,
            salt: salt.to_vec(),
            ciphertext,
            kdf: params,
        })
    }

    /// Opens the key. A wrong password surfaces as
    /// [`KeyStoreError::AuthenticationFailed`].
    pub fn open(&self, password: &[u8]) -> Result<Zeroizing<[u8; 32]>, KeyStoreError> {
        let salt: [u8; 16] = self
            .salt
            .as_slice()
            .try_into()
            .map_err(|_| KeyStoreError::InvalidKey(format!("salt must be 16 bytes, got {}", self.salt.len())))?;
        if self.ciphertext.len() < NONCE_SIZE {
            return Err(KeyStoreError::InvalidKey(format!(
                "ciphertext too short: {} bytes",
                self.ciphertext.len()
            )));
        }

        let mut key = kdf::derive_key(password, &salt, &self.kdf)?;
        let (nonce_bytes, ciphertext) = self.ciphertext.split_at(NONCE_SIZE);
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
        let opened = cipher.decrypt(Nonce::from_slice(nonce_bytes), ciphertext);
        key.zeroize();

        let plaintext = Zeroizing::new(
            opened.map_err(|_| KeyStoreError::AuthenticationFailed(chain_evm::address::checksum(&self.address)))?,
        );
        let bytes: [u8; 32] = plaintext
            .as_slice()
            .try_into()
            .map_err(|_| KeyStoreError::InvalidKey(format!("sealed key is {} bytes", plaintext.len())))?;
        Ok(Zeroizing::new(bytes))
    }

    pub fn to_json(&self) -> Result<String, KeyStoreError> {
        serde_json::to_string(self).map_err(|e| KeyStoreError::Serialization(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, KeyStoreError> {
        serde_json::from_str(json).map_err(|e| KeyStoreError::Serialization(e.to_string()))
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}
