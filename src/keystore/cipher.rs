//! ChaCha20-Poly1305 sealing of the private key.
//!
//! The Poly1305 tag is appended to the ciphertext. Any modified byte in the
//! ciphertext, tag, nonce or associated data makes `open` fail.

use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroizing;

use super::error::{KeyStoreError, KeyStoreResult};
use super::kdf::KEY_LEN;

/// Nonce length for ChaCha20-Poly1305
pub const NONCE_LEN: usize = 12;

/// Poly1305 tag length
pub const TAG_LEN: usize = 16;

/// Generate a random nonce.
pub fn generate_nonce() -> KeyStoreResult<[u8; NONCE_LEN]> {
    let mut nonce = [0u8; NONCE_LEN];
    OsRng
        .try_fill_bytes(&mut nonce)
        .map_err(|e| KeyStoreError::KeyGeneration(e.to_string()))?;
    Ok(nonce)
}

/// Encrypt and authenticate `plaintext`, binding `aad`.
pub fn seal(
    key: &[u8; KEY_LEN],
    nonce: &[u8; NONCE_LEN],
    plaintext: &[u8],
    aad: &[u8],
) -> KeyStoreResult<Vec<u8>> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
    cipher
        .encrypt(Nonce::from_slice(nonce), Payload { msg: plaintext, aad })
        .map_err(|_| KeyStoreError::KeyGeneration("encryption failed".to_string()))
}

/// Verify and decrypt. Every failure is reported as `Decryption`.
pub fn open(
    key: &[u8; KEY_LEN],
    nonce: &[u8],
    ciphertext: &[u8],
    aad: &[u8],
) -> KeyStoreResult<Zeroizing<Vec<u8>>> {
    if nonce.len() != NONCE_LEN || ciphertext.len() < TAG_LEN {
        return Err(KeyStoreError::Decryption);
    }
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
    cipher
        .decrypt(Nonce::from_slice(nonce), Payload { msg: ciphertext, aad })
        .map(Zeroizing::new)
        .map_err(|_| KeyStoreError::Decryption)
}
