//! Error types for ForgeChain

use std::fmt;

/// Recoverable reasons a transaction is rejected by `Transaction::validate`.
///
/// Each kind excludes only the offending transaction from the current round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum ValidationError {
    #[error("amount is null")]
    AmountNil,
    #[error("amount is negative")]
    AmountNegative,
    #[error("balance not enough")]
    BalanceInsufficient,
    #[error("nonce too low")]
    NonceTooLow,
    #[error("oversized payload")]
    PayloadOversized,
    #[error("signature missing")]
    SignatureMissing,
    #[error("hash mismatch")]
    HashMismatch,
    #[error("signature is invalid")]
    SignatureInvalid,
}

#[derive(Debug, Clone)]
pub enum ChainError {
    Validation(ValidationError),
    CryptoError(String),
    InvalidBlock(String),
    InvalidNonceRange(String),
    ConfigError(String),
    IoError(String),
    ApplyFailed(String),
    MempoolFull,
    DuplicateTransaction(String),
}

impl fmt::Display for ChainError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ChainError::Validation(kind) => write!(f, "Invalid transaction: {}", kind),
            ChainError::CryptoError(msg) => write!(f, "Cryptographic error: {}", msg),
            ChainError::InvalidBlock(msg) => write!(f, "Invalid block: {}", msg),
            ChainError::InvalidNonceRange(msg) => write!(f, "Invalid nonce range: {}", msg),
            ChainError::ConfigError(msg) => write!(f, "Config error: {}", msg),
            ChainError::IoError(msg) => write!(f, "IO error: {}", msg),
            ChainError::ApplyFailed(msg) => write!(f, "Failed to apply transaction: {}", msg),
            ChainError::MempoolFull => write!(f, "Mempool is full"),
            ChainError::DuplicateTransaction(hash) => {
                write!(f, "Transaction {} is already pending", hash)
            }
        }
    }
}

impl std::error::Error for ChainError {}

impl From<ValidationError> for ChainError {
    fn from(err: ValidationError) -> Self {
        ChainError::Validation(err)
    }
}

impl From<std::io::Error> for ChainError {
    fn from(err: std::io::Error) -> Self {
        ChainError::IoError(err.to_string())
    }
}

impl From<toml::de::Error> for ChainError {
    fn from(err: toml::de::Error) -> Self {
        ChainError::ConfigError(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ChainError>;
