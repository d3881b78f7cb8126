use thiserror::Error;

/// EVM chain operation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvmError {
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("transaction build error: {0}")]
    TransactionBuildError(String),

    #[error("signing error: {0}")]
    SigningError(String),

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("abi error: {0}")]
    AbiError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_invalid_address() {
        let err = EvmError::InvalidAddress("bad checksum".into());
        assert_eq!(err.to_string(), "invalid address: bad checksum");
    }

    #[test]
    fn display_invalid_amount() {
        let err = EvmError::InvalidAmount("exceeds 2 decimals".into());
        assert_eq!(err.to_string(), "invalid amount: exceeds 2 decimals");
    }

    #[test]
    fn display_abi_error() {
        let err = EvmError::AbiError("unknown method foo".into());
        assert_eq!(err.to_string(), "abi error: unknown method foo");
    }

    #[test]
    fn display_invalid_signature() {
        let err = EvmError::InvalidSignature("bad recovery id".into());
        assert_eq!(err.to_string(), "invalid signature: bad recovery id");
    }

    #[test]
    fn errors_compare_by_value() {
        assert_eq!(
            EvmError::SigningError("x".into()),
            EvmError::SigningError("x".into())
        );
        assert_ne!(
            EvmError::SigningError("x".into()),
            EvmError::EncodingError("x".into())
        );
    }
}
