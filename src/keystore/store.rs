//! File-backed wallet storage, one wallet per network.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use secrecy::{ExposeSecret, SecretString};
use tempfile::NamedTempFile;

use super::encrypted::EncryptedWallet;
use super::error::{KeyStoreError, KeyStoreResult};
use crate::blockchain::types::Network;
use crate::blockchain::wallet::{parse_private_key, Keypair};
use crate::config::KeystoreConfig;

/// Minimum passphrase length for new wallets
pub const MIN_PASSPHRASE_LENGTH: usize = 8;

const LOCK_FILE_NAME: &str = ".wallet.lock";

/// Encrypted key storage rooted at a data directory.
#[derive(Debug, Clone)]
pub struct KeyStore {
    dir: PathBuf,
    kdf: KeystoreConfig,
}

impl KeyStore {
    pub fn new(dir: impl Into<PathBuf>, kdf: KeystoreConfig) -> Self {
        Self {
            dir: dir.into(),
            kdf,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `<dir>/wallet-<network>.json`
    pub fn wallet_path(&self, network: Network) -> PathBuf {
        self.dir.join(format!("wallet-{}.json", network))
    }

    pub fn exists(&self, network: Network) -> bool {
        self.wallet_path(network).is_file()
    }

    /// Generate a fresh keypair and persist it encrypted.
    pub fn create(
        &self,
        network: Network,
        passphrase: &SecretString,
        force: bool,
    ) -> KeyStoreResult<EncryptedWallet> {
        check_passphrase(passphrase)?;
        let (_keypair, secret) = Keypair::generate()?;
        let wallet = EncryptedWallet::encrypt(&secret, network, passphrase, &self.kdf)?;
        self.store(&wallet, force)?;

        tracing::info!(
            network = %network,
            address = %wallet.address,
            "Wallet created"
        );
        Ok(wallet)
    }

    /// Persist an externally supplied private key.
    pub fn import(
        &self,
        network: Network,
        private_key: &SecretString,
        passphrase: &SecretString,
        force: bool,
    ) -> KeyStoreResult<EncryptedWallet> {
        let secret = parse_private_key(private_key.expose_secret())?;
        check_passphrase(passphrase)?;
        let wallet = EncryptedWallet::encrypt(&secret, network, passphrase, &self.kdf)?;
        self.store(&wallet, force)?;

        tracing::info!(
            network = %network,
            address = %wallet.address,
            "Wallet imported"
        );
        Ok(wallet)
    }

    /// Read the wallet for `network`.
    pub fn load(&self, network: Network) -> KeyStoreResult<EncryptedWallet> {
        let path = self.wallet_path(network);
        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(KeyStoreError::NotFound(network))
            }
            Err(e) => return Err(e.into()),
        };

        let wallet = EncryptedWallet::from_json(&json)?;
        if wallet.network != network {
            return Err(KeyStoreError::NetworkMismatch {
                expected: network,
                found: wallet.network,
            });
        }
        Ok(wallet)
    }

    /// Decrypt a wallet. The returned keypair zeroizes its key when dropped;
    /// prefer [`KeyStore::with_unlocked`] to bound its lifetime.
    pub fn unlock(
        &self,
        wallet: &EncryptedWallet,
        passphrase: &SecretString,
    ) -> KeyStoreResult<Keypair> {
        let keypair = wallet.decrypt(passphrase)?;
        tracing::debug!(address = %wallet.address, "Wallet unlocked");
        Ok(keypair)
    }

    /// Run `f` with the decrypted keypair, dropping it before returning on
    /// every path.
    pub fn with_unlocked<T, E, F>(
        &self,
        wallet: &EncryptedWallet,
        passphrase: &SecretString,
        f: F,
    ) -> Result<T, E>
    where
        F: FnOnce(&Keypair) -> Result<T, E>,
        E: From<KeyStoreError>,
    {
        let keypair = self.unlock(wallet, passphrase)?;
        let result = f(&keypair);
        drop(keypair);
        result
    }

    /// Atomically write `wallet`, holding the directory's writer lock.
    ///
    /// The previous file stays intact until the new one is fully flushed and
    /// renamed over it.
    fn store(&self, wallet: &EncryptedWallet, force: bool) -> KeyStoreResult<()> {
        ensure_dir(&self.dir)?;
        let _lock = self.lock()?;

        let path = self.wallet_path(wallet.network);
        if !force && path.exists() {
            return Err(KeyStoreError::AlreadyExists {
                network: wallet.network,
                path: path.display().to_string(),
            });
        }

        let json = wallet.to_json()?;
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.as_file().sync_all()?;
        restrict_permissions(tmp.path(), 0o600)?;
        tmp.persist(&path).map_err(|e| KeyStoreError::Io(e.error))?;

        #[cfg(unix)]
        File::open(&self.dir)?.sync_all()?;

        tracing::debug!(path = %path.display(), "Wallet file written");
        Ok(())
    }

    /// Exclusive advisory lock serializing writers across processes.
    fn lock(&self) -> KeyStoreResult<File> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.dir.join(LOCK_FILE_NAME))?;
        file.lock_exclusive()?;
        Ok(file)
    }
}

/// Reject passphrases too short to protect a key.
pub fn check_passphrase(passphrase: &SecretString) -> KeyStoreResult<()> {
    if passphrase.expose_secret().chars().count() < MIN_PASSPHRASE_LENGTH {
        return Err(KeyStoreError::WeakPassphrase(format!(
            "must be at least {} characters",
            MIN_PASSPHRASE_LENGTH
        )));
    }
    Ok(())
}

fn ensure_dir(dir: &Path) -> KeyStoreResult<()> {
    if !dir.exists() {
        fs::create_dir_all(dir)?;
        restrict_permissions(dir, 0o700)?;
    }
    Ok(())
}

#[cfg(unix)]
fn restrict_permissions(path: &Path, mode: u32) -> KeyStoreResult<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path, _mode: u32) -> KeyStoreResult<()> {
    Ok(())
}
