//! Persisted wallet format.
//!
//! ```json
//! {
//!   "version": 1,
//!   "id": "4f6c...",
//!   "network": "testnet",
//!   "address": "0x...",
//!   "created_at": 1760000000,
//!   "crypto": {
//!     "cipher": "chacha20-poly1305",
//!     "ciphertext": "<hex, tag appended>",
//!     "iv": "<hex, 12 bytes>",
//!     "kdf": "argon2id",
//!     "kdfparams": { "m_cost": 65536, "t_cost": 3, "p_cost": 4, "salt": "<hex>" }
//!   }
//! }
//! ```
//!
//! `version`, `network` and `address` are bound as associated data, so a file
//! edited to claim another network or address no longer decrypts.

use std::time::{SystemTime, UNIX_EPOCH};

use alloy::primitives::Address;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::cipher::{generate_nonce, open, seal};
use super::error::{KeyStoreError, KeyStoreResult};
use super::kdf::KdfParams;
use crate::blockchain::types::Network;
use crate::blockchain::wallet::{Keypair, PRIVATE_KEY_LEN};
use crate::config::KeystoreConfig;

/// Current wallet file format version
pub const WALLET_VERSION: u32 = 1;

/// Cipher identifier written to wallet files
pub const CIPHER_NAME: &str = "chacha20-poly1305";

/// KDF identifier written to wallet files
pub const KDF_NAME: &str = "argon2id";

/// Encrypted wallet as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EncryptedWallet {
    pub version: u32,
    pub id: Uuid,
    pub network: Network,
    pub address: Address,
    /// Unix timestamp (seconds)
    pub created_at: u64,
    pub crypto: CryptoParams,
}

/// Cipher and KDF parameters plus the sealed key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CryptoParams {
    pub cipher: String,
    /// Hex ciphertext with the Poly1305 tag appended
    pub ciphertext: String,
    /// Hex nonce
    pub iv: String,
    pub kdf: String,
    pub kdfparams: KdfParams,
}

impl EncryptedWallet {
    /// Encrypt a private key under `passphrase`.
    pub fn encrypt(
        secret: &[u8; PRIVATE_KEY_LEN],
        network: Network,
        passphrase: &SecretString,
        kdf_config: &KeystoreConfig,
    ) -> KeyStoreResult<Self> {
        let address = Keypair::from_secret_bytes(secret)?.address();
        let kdfparams = KdfParams::generate(kdf_config)?;
        let key = kdfparams.derive_key(passphrase)?;
        let nonce = generate_nonce()?;

        let aad = associated_data(WALLET_VERSION, network, &address);
        let ciphertext = seal(&key, &nonce, secret, &aad)?;

        let created_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();

        Ok(Self {
            version: WALLET_VERSION,
            id: Uuid::new_v4(),
            network,
            address,
            created_at,
            crypto: CryptoParams {
                cipher: CIPHER_NAME.to_string(),
                ciphertext: hex::encode(ciphertext),
                iv: hex::encode(nonce),
                kdf: KDF_NAME.to_string(),
                kdfparams,
            },
        })
    }

    /// Decrypt the private key.
    ///
    /// Wrong passphrases and tampered files, KDF salt and parameters
    /// included, all yield [`KeyStoreError::Decryption`]. Unknown versions and
    /// algorithm names yield `Corrupted`.
    pub fn decrypt(&self, passphrase: &SecretString) -> KeyStoreResult<Keypair> {
        self.check_format()?;

        let kdfparams = &self.crypto.kdfparams;
        kdfparams.validate().map_err(|_| KeyStoreError::Decryption)?;
        let key = kdfparams
            .derive_key(passphrase)
            .map_err(|_| KeyStoreError::Decryption)?;
        let nonce = hex::decode(&self.crypto.iv).map_err(|_| KeyStoreError::Decryption)?;
        let ciphertext =
            hex::decode(&self.crypto.ciphertext).map_err(|_| KeyStoreError::Decryption)?;

        let aad = associated_data(self.version, self.network, &self.address);
        let secret = open(&key, &nonce, &ciphertext, &aad)?;

        let keypair =
            Keypair::from_secret_bytes(&secret).map_err(|_| KeyStoreError::Decryption)?;
        if keypair.address() != self.address {
            return Err(KeyStoreError::Decryption);
        }
        Ok(keypair)
    }

    /// Reject versions and algorithms this build does not understand.
    pub fn check_format(&self) -> KeyStoreResult<()> {
        if self.version != WALLET_VERSION {
            return Err(KeyStoreError::Corrupted(format!(
                "unsupported wallet version {}",
                self.version
            )));
        }
        if self.crypto.cipher != CIPHER_NAME {
            return Err(KeyStoreError::Corrupted(format!(
                "unsupported cipher '{}'",
                self.crypto.cipher
            )));
        }
        if self.crypto.kdf != KDF_NAME {
            return Err(KeyStoreError::Corrupted(format!(
                "unsupported kdf '{}'",
                self.crypto.kdf
            )));
        }
        Ok(())
    }

    pub fn to_json(&self) -> KeyStoreResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| KeyStoreError::Corrupted(e.to_string()))
    }

    pub fn from_json(json: &str) -> KeyStoreResult<Self> {
        serde_json::from_str(json).map_err(|e| KeyStoreError::Corrupted(e.to_string()))
    }
}

fn associated_data(version: u32, network: Network, address: &Address) -> Vec<u8> {
    let mut aad = Vec::with_capacity(4 + 8 + 20);
    aad.extend_from_slice(&version.to_be_bytes());
    aad.extend_from_slice(network.as_str().as_bytes());
    aad.extend_from_slice(address.as_slice());
    aad
}
