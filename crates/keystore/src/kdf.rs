use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use rand_core::OsRng;
use serde::{Deserialize, Serialize};

use crate::error::KeyStoreError;

/// Argon2id cost parameters, stored alongside each sealed key so keys sealed
/// under older settings stay openable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Memory cost in KiB.
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for KdfParams {
    /// 64 MiB, 3 passes, 4 lanes.
    fn default() -> Self {
        Self {
            memory_kib: 65536,
            iterations: 3,
            parallelism: 4,
        }
    }
}

impl KdfParams {
    /// Minimal cost. Only for tests and throwaway keys.
    pub fn light() -> Self {
        Self {
            memory_kib: 256,
            iterations: 1,
            parallelism: 1,
        }
    }
}

/// Derives a 32-byte AES-256 key from `password` and `salt` using Argon2id.
pub fn derive_key(password: &[u8], salt: &[u8; 16], params: &KdfParams) -> Result<[u8; 32], KeyStoreError> {
    let argon_params = Params::new(params.memory_kib, params.iterations, params.parallelism, Some(32))
        .map_err(|e| KeyStoreError::KdfFailed(format!("invalid argon2 params: {e}")))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon_params);

    let mut output = [0u8; 32];
    argon2
        .hash_password_into(password, salt, &mut output)
        .map_err(|e| KeyStoreError::KdfFailed(format!("argon2 hash failed: {e}")))?;

    Ok(output)
}

pub fn generate_salt() -> [u8; 16] {
    let mut salt = [0u8; 16];
    OsRng.fill_bytes(&mut salt);
    salt
}
