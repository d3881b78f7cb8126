//! # keystore
//!
//! Password-sealed secp256k1 keys for managed accounts. Each key is sealed
//! with Argon2id + AES-256-GCM and only opened for the duration of a single
//! signature.

pub mod error;
pub mod kdf;
pub mod sealed_key;
pub mod store;

pub use error::KeyStoreError;
pub use kdf::KdfParams;
pub use sealed_key::SealedKey;
pub use store::LocalKeyStore;
