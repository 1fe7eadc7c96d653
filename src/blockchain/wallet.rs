//! Keypair handling and hash signing.
//!
//! # Security
//! - The secret scalar lives inside alloy's local signer; its k256 signing key
//!   is zeroized when the `Keypair` is dropped
//! - Keys are never logged or serialized; `Debug` prints the address only
//! - Raw secret bytes handed in or out are wrapped in `Zeroizing`

use alloy::primitives::{keccak256, Address, Signature, B256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroizing;

use crate::keystore::error::{KeyStoreError, KeyStoreResult};

/// Length of a secp256k1 private key.
pub const PRIVATE_KEY_LEN: usize = 32;

/// Length of an uncompressed SEC1 public key.
pub const PUBLIC_KEY_LEN: usize = 65;

/// A decrypted secp256k1 keypair.
///
/// Only the keystore hands these out, and only for the duration of one
/// signing operation.
pub struct Keypair {
    signer: PrivateKeySigner,
}

impl Keypair {
    /// Generate a fresh keypair from the OS random source.
    ///
    /// Returns the keypair together with its secret bytes so the caller can
    /// encrypt them; the bytes are zeroized when dropped.
    pub fn generate() -> KeyStoreResult<(Self, Zeroizing<[u8; PRIVATE_KEY_LEN]>)> {
        let mut bytes = Zeroizing::new([0u8; PRIVATE_KEY_LEN]);
        // A uniformly random 32-byte string is outside [1, n) with
        // probability ~2^-128; a handful of draws is plenty.
        for _ in 0..4 {
            OsRng
                .try_fill_bytes(&mut bytes[..])
                .map_err(|e| KeyStoreError::KeyGeneration(e.to_string()))?;
            if let Ok(keypair) = Self::from_secret_bytes(&bytes[..]) {
                return Ok((keypair, bytes));
            }
        }
        Err(KeyStoreError::KeyGeneration(
            "random source produced no valid scalar".to_string(),
        ))
    }

    /// Build a keypair from raw secret bytes.
    ///
    /// Rejects anything that is not a 32-byte scalar in `[1, n)`.
    pub fn from_secret_bytes(bytes: &[u8]) -> KeyStoreResult<Self> {
        if bytes.len() != PRIVATE_KEY_LEN {
            return Err(KeyStoreError::InvalidKey(format!(
                "expected {} bytes, got {}",
                PRIVATE_KEY_LEN,
                bytes.len()
            )));
        }
        let signer = PrivateKeySigner::from_slice(bytes).map_err(|_| {
            KeyStoreError::InvalidKey("scalar is zero or not below the curve order".to_string())
        })?;
        Ok(Self { signer })
    }

    /// Account address derived from the public key.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Uncompressed SEC1 public key (`0x04 || X || Y`).
    pub fn public_key(&self) -> [u8; PUBLIC_KEY_LEN] {
        let point = self.signer.credential().verifying_key().to_encoded_point(false);
        let mut out = [0u8; PUBLIC_KEY_LEN];
        out.copy_from_slice(point.as_bytes());
        out
    }

    /// Sign a 32-byte prehash with RFC 6979 nonces. The result is low-s
    /// normalized and carries the recovery parity.
    pub fn sign_hash(&self, hash: &B256) -> Result<Signature, alloy::signers::Error> {
        self.signer.sign_hash_sync(hash)
    }
}

impl std::fmt::Debug for Keypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keypair")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

/// Derive the account address from an uncompressed public key: the last 20
/// bytes of `keccak256(X || Y)`.
pub fn address_from_public_key(public_key: &[u8; PUBLIC_KEY_LEN]) -> Address {
    let digest = keccak256(&public_key[1..]);
    Address::from_slice(&digest[12..])
}

/// Parse a user-supplied hex private key (with or without `0x`).
pub fn parse_private_key(input: &str) -> KeyStoreResult<Zeroizing<[u8; PRIVATE_KEY_LEN]>> {
    let trimmed = input.trim();
    let key_hex = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    if key_hex.len() != PRIVATE_KEY_LEN * 2 {
        return Err(KeyStoreError::InvalidKey(format!(
            "expected {} hex characters",
            PRIVATE_KEY_LEN * 2
        )));
    }

    let mut bytes = Zeroizing::new([0u8; PRIVATE_KEY_LEN]);
    hex::decode_to_slice(key_hex, &mut bytes[..])
        .map_err(|_| KeyStoreError::InvalidKey("not valid hex".to_string()))?;

    // Range check happens here so callers get InvalidKey before any I/O.
    Keypair::from_secret_bytes(&bytes[..])?;
    Ok(bytes)
}
