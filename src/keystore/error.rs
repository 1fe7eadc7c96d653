//! Keystore error types

use thiserror::Error;

use crate::blockchain::types::Network;

/// Errors that can occur during keystore operations
#[derive(Error, Debug)]
pub enum KeyStoreError {
    /// No wallet file exists for the requested network
    #[error("no {0} wallet found; run `createWallet` first")]
    NotFound(Network),

    /// Refused to overwrite an existing wallet
    #[error("a {network} wallet already exists at {path}")]
    AlreadyExists { network: Network, path: String },

    /// Wrong passphrase or tampered wallet; the two are indistinguishable
    #[error("failed to decrypt wallet: wrong passphrase or corrupted wallet file")]
    Decryption,

    /// The OS random source failed
    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    /// Imported key is malformed or out of the curve's range
    #[error("invalid private key: {0}")]
    InvalidKey(String),

    /// Passphrase rejected for a new wallet
    #[error("passphrase too weak: {0}")]
    WeakPassphrase(String),

    /// Wallet file recorded for a different network than requested
    #[error("wallet file is for {found}, expected {expected}")]
    NetworkMismatch { expected: Network, found: Network },

    /// Wallet file could not be parsed or uses unsupported parameters
    #[error("wallet file is corrupted: {0}")]
    Corrupted(String),

    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for keystore operations
pub type KeyStoreResult<T> = Result<T, KeyStoreError>;
