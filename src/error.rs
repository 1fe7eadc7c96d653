//! Top-level error type returned by every engine flow.

use alloy::primitives::{TxHash, U256};
use thiserror::Error;

use crate::blockchain::types::{BroadcastError, ChainError};
use crate::keystore::KeyStoreError;

/// Errors surfaced to the caller of a wallet flow.
///
/// Variants up to and including `Signing` mean nothing left the process. The
/// `Broadcast*` variants are produced only after signed bytes were handed to
/// the network.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Recipient is not a 20-byte hex address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Amount is not a positive decimal with at most 18 fractional digits.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Transaction hash is not 32 bytes of hex.
    #[error("invalid transaction hash: {0}")]
    InvalidHash(String),

    #[error(transparent)]
    KeyStore(#[from] KeyStoreError),

    /// A read-only chain query failed. Safe to retry the whole flow.
    #[error("chain query failed: {0}")]
    ChainQuery(ChainError),

    /// Balance does not cover value plus maximum fee.
    #[error("insufficient funds: need {required} wei, have {available} wei")]
    InsufficientFunds { required: U256, available: U256 },

    /// Resolved gas price exceeds the configured ceiling.
    #[error("gas price too high: {current_gwei} gwei (max: {max_gwei} gwei)")]
    GasPriceTooHigh { current_gwei: u128, max_gwei: u64 },

    #[error("signing failed: {0}")]
    Signing(String),

    /// The node refused the transaction. It is not pending anywhere.
    #[error("transaction rejected: {0}")]
    BroadcastRejected(String),

    /// The send timed out; the transaction may or may not be pending.
    #[error("broadcast outcome unknown for {hash}: {reason}")]
    BroadcastAmbiguous { hash: TxHash, reason: String },

    /// No node could be reached after retrying the same payload.
    #[error("network error broadcasting {hash}: {reason}")]
    BroadcastNetwork { hash: TxHash, reason: String },

    /// Client, node or transaction belong to different networks.
    #[error("chain ID mismatch: expected {expected}, got {actual}")]
    ChainMismatch { expected: u64, actual: u64 },
}

/// Result type for engine flows.
pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    /// Whether the user supplied bad input (as opposed to an environment
    /// failure).
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            EngineError::InvalidAddress(_)
                | EngineError::InvalidAmount(_)
                | EngineError::InvalidHash(_)
                | EngineError::InsufficientFunds { .. }
                | EngineError::KeyStore(KeyStoreError::WeakPassphrase(_))
                | EngineError::KeyStore(KeyStoreError::InvalidKey(_))
        )
    }

    /// Whether a signed transaction may be pending despite the error. The
    /// caller must check status by hash before resending.
    pub fn outcome_unknown(&self) -> bool {
        matches!(
            self,
            EngineError::BroadcastAmbiguous { .. } | EngineError::BroadcastNetwork { .. }
        )
    }

    /// Hash of the signed transaction whose fate is unknown, if any.
    pub fn pending_hash(&self) -> Option<TxHash> {
        match self {
            EngineError::BroadcastAmbiguous { hash, .. }
            | EngineError::BroadcastNetwork { hash, .. } => Some(*hash),
            _ => None,
        }
    }
}

impl From<ChainError> for EngineError {
    fn from(err: ChainError) -> Self {
        match err {
            ChainError::ChainMismatch { expected, actual } => {
                EngineError::ChainMismatch { expected, actual }
            }
            other => EngineError::ChainQuery(other),
        }
    }
}

impl From<BroadcastError> for EngineError {
    fn from(err: BroadcastError) -> Self {
        match err {
            BroadcastError::Rejected(reason) => EngineError::BroadcastRejected(reason),
            BroadcastError::Ambiguous { hash, reason } => {
                EngineError::BroadcastAmbiguous { hash, reason }
            }
            BroadcastError::Network { hash, reason } => {
                EngineError::BroadcastNetwork { hash, reason }
            }
        }
    }
}
