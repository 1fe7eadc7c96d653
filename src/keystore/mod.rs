//! Encrypted key storage.
//!
//! # Data Flow
//! ```text
//! create/import
//!     → blockchain::wallet (keypair from OsRng or parsed hex)
//!     → kdf.rs (Argon2id: passphrase + salt → 32-byte key)
//!     → cipher.rs (ChaCha20-Poly1305 seal, AAD = version|network|address)
//!     → encrypted.rs (JSON record)
//!     → store.rs (locked, atomic write to wallet-<network>.json)
//!
//! unlock
//!     → store.rs (read) → kdf.rs → cipher.rs (open) → Keypair (scoped)
//! ```
//!
//! # Security Constraints
//! - The private key is never written unencrypted and never logged
//! - Wrong passphrase and tampered file are indistinguishable to callers
//! - Decrypted keys and derived keys are zeroized on drop

pub mod cipher;
pub mod encrypted;
pub mod error;
pub mod kdf;
pub mod store;

pub use encrypted::EncryptedWallet;
pub use error::{KeyStoreError, KeyStoreResult};
pub use kdf::KdfParams;
pub use store::KeyStore;
