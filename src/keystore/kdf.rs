//! Argon2id key derivation.
//!
//! Parameters are written into every wallet file and read back on unlock, so
//! changing the configured defaults never locks out existing wallets.

use argon2::{Algorithm, Argon2, Params, Version};
use rand::rngs::OsRng;
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::error::{KeyStoreError, KeyStoreResult};
use crate::config::KeystoreConfig;

/// Salt length in bytes
pub const SALT_LEN: usize = 16;

/// Derived key length (ChaCha20-Poly1305 key)
pub const KEY_LEN: usize = 32;

// Bounds accepted from config and from files on disk: 2 GiB memory, 64
// passes, 16 lanes.
pub const MAX_M_COST: u32 = 2 * 1024 * 1024;
pub const MAX_T_COST: u32 = 64;
pub const MAX_P_COST: u32 = 16;

/// Argon2id parameters as stored in the wallet file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KdfParams {
    /// Memory cost in KiB
    pub m_cost: u32,
    /// Iterations
    pub t_cost: u32,
    /// Lanes
    pub p_cost: u32,
    /// Salt as hex string
    pub salt: String,
}

impl KdfParams {
    /// Fresh parameters with a random salt.
    pub fn generate(config: &KeystoreConfig) -> KeyStoreResult<Self> {
        let mut salt = [0u8; SALT_LEN];
        OsRng
            .try_fill_bytes(&mut salt)
            .map_err(|e| KeyStoreError::KeyGeneration(e.to_string()))?;

        let params = Self {
            m_cost: config.m_cost,
            t_cost: config.t_cost,
            p_cost: config.p_cost,
            salt: hex::encode(salt),
        };
        params.validate()?;
        Ok(params)
    }

    /// Reject parameters argon2 cannot use or that exceed sane bounds.
    pub fn validate(&self) -> KeyStoreResult<()> {
        if self.t_cost == 0 || self.t_cost > MAX_T_COST {
            return Err(KeyStoreError::Corrupted(format!(
                "argon2 t_cost {} out of range",
                self.t_cost
            )));
        }
        if self.p_cost == 0 || self.p_cost > MAX_P_COST {
            return Err(KeyStoreError::Corrupted(format!(
                "argon2 p_cost {} out of range",
                self.p_cost
            )));
        }
        if self.m_cost < 8 * self.p_cost || self.m_cost > MAX_M_COST {
            return Err(KeyStoreError::Corrupted(format!(
                "argon2 m_cost {} out of range",
                self.m_cost
            )));
        }
        self.salt_bytes().map(|_| ())
    }

    fn salt_bytes(&self) -> KeyStoreResult<Vec<u8>> {
        let salt = hex::decode(&self.salt)
            .map_err(|e| KeyStoreError::Corrupted(format!("invalid salt hex: {}", e)))?;
        if salt.len() < argon2::RECOMMENDED_SALT_LEN {
            return Err(KeyStoreError::Corrupted(format!(
                "salt must be at least {} bytes",
                argon2::RECOMMENDED_SALT_LEN
            )));
        }
        Ok(salt)
    }

    /// Derive the wallet encryption key from a passphrase.
    pub fn derive_key(&self, passphrase: &SecretString) -> KeyStoreResult<Zeroizing<[u8; KEY_LEN]>> {
        let salt = self.salt_bytes()?;
        let params = Params::new(self.m_cost, self.t_cost, self.p_cost, Some(KEY_LEN))
            .map_err(|e| KeyStoreError::Corrupted(format!("argon2 params: {}", e)))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        argon2
            .hash_password_into(passphrase.expose_secret().as_bytes(), &salt, &mut key[..])
            .map_err(|e| KeyStoreError::Corrupted(format!("argon2: {}", e)))?;
        Ok(key)
    }
}
