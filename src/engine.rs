//! Wallet flows: create, import, balance, transfer and status.
//!
//! Every call names its [`Network`]; the engine keeps one chain client per
//! network and never mixes them.

use std::collections::HashMap;
use std::sync::Arc;

use alloy::primitives::{Address, TxHash, U256};
use secrecy::SecretString;
use serde::Serialize;

use crate::blockchain::broadcast::Broadcaster;
use crate::blockchain::client::{ChainClient, RpcChainClient};
use crate::blockchain::signer::sign_transaction;
use crate::blockchain::status::StatusTracker;
use crate::blockchain::transaction::{parse_recipient, TransactionBuilder};
use crate::blockchain::types::{Network, TransactionReceipt};
use crate::blockchain::units::{format_rbtc, parse_rbtc};
use crate::config::WalletConfig;
use crate::error::{EngineError, EngineResult};
use crate::keystore::{EncryptedWallet, KeyStore};
use crate::lifecycle::Shutdown;
use crate::resilience::BackoffPolicy;

/// Balance of the wallet address on one network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceReport {
    pub address: Address,
    pub network: Network,
    pub wei: U256,
}

impl BalanceReport {
    /// Balance in rBTC without trailing zeros.
    pub fn rbtc(&self) -> String {
        format_rbtc(self.wei)
    }
}

/// What was sent. Returned as soon as the node accepted the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferReceipt {
    pub tx_hash: TxHash,
    pub network: Network,
    pub from: Address,
    pub to: Address,
    pub value: U256,
    pub nonce: u64,
    pub gas_price: u128,
    pub gas_limit: u64,
}

/// Orchestrates keystore, builder, signer, broadcaster and status tracker.
pub struct WalletEngine {
    config: WalletConfig,
    keystore: KeyStore,
    clients: HashMap<Network, Arc<dyn ChainClient>>,
    shutdown: Option<Shutdown>,
}

impl WalletEngine {
    /// Engine over `config`, storing wallets under `config.data_dir`.
    pub fn new(config: WalletConfig) -> Self {
        let dir = config
            .data_dir
            .clone()
            .unwrap_or_else(crate::config::loader::default_data_dir);
        let keystore = KeyStore::new(dir, config.keystore.clone());
        Self::with_keystore(config, keystore)
    }

    pub fn with_keystore(config: WalletConfig, keystore: KeyStore) -> Self {
        Self {
            config,
            keystore,
            clients: HashMap::new(),
            shutdown: None,
        }
    }

    /// Use `client` for its network instead of a JSON-RPC client built from
    /// configuration.
    pub fn with_client(mut self, client: Arc<dyn ChainClient>) -> Self {
        self.clients.insert(client.network(), client);
        self
    }

    /// Let `shutdown` cut confirmation polling short.
    pub fn with_shutdown(mut self, shutdown: Shutdown) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub fn config(&self) -> &WalletConfig {
        &self.config
    }

    pub fn keystore(&self) -> &KeyStore {
        &self.keystore
    }

    /// Generate and store a new wallet for `network`.
    pub fn create_wallet(
        &self,
        network: Network,
        passphrase: &SecretString,
        force: bool,
    ) -> EngineResult<EncryptedWallet> {
        Ok(self.keystore.create(network, passphrase, force)?)
    }

    /// Store an existing private key for `network`.
    pub fn import_wallet(
        &self,
        network: Network,
        private_key: &SecretString,
        passphrase: &SecretString,
        force: bool,
    ) -> EngineResult<EncryptedWallet> {
        Ok(self
            .keystore
            .import(network, private_key, passphrase, force)?)
    }

    /// Address of the stored wallet, without decrypting it.
    pub fn address(&self, network: Network) -> EngineResult<Address> {
        Ok(self.keystore.load(network)?.address)
    }

    pub async fn balance(&self, network: Network) -> EngineResult<BalanceReport> {
        let address = self.address(network)?;
        let client = self.client(network)?;
        let wei = client.get_balance(address).await?;

        tracing::debug!(network = %network, address = %address, wei = %wei, "Balance fetched");
        Ok(BalanceReport {
            address,
            network,
            wei,
        })
    }

    /// Send `amount` rBTC to `recipient`.
    ///
    /// Returns once the node has accepted the transaction. On
    /// `BroadcastAmbiguous` or `BroadcastNetwork` the transaction may still be
    /// pending; check [`WalletEngine::status`] with the reported hash before
    /// sending again.
    pub async fn transfer(
        &self,
        network: Network,
        recipient: &str,
        amount: &str,
        passphrase: &SecretString,
    ) -> EngineResult<TransferReceipt> {
        let to = parse_recipient(recipient)?;
        let value = parse_rbtc(amount)?;

        let wallet = self.keystore.load(network)?;
        let client = self.client(network)?;

        let unsigned = TransactionBuilder::new(client.as_ref(), &self.config.transactions)
            .build_transfer(wallet.address, to, value, network)
            .await?;

        // The keypair is dropped when the closure returns, before any network I/O.
        let signed = self
            .keystore
            .with_unlocked(&wallet, passphrase, |keypair| {
                sign_transaction(unsigned, keypair)
            })?;

        let broadcaster = Broadcaster::new(client.as_ref(), self.broadcast_policy());
        let tx_hash = broadcaster.send(&signed).await?;

        let tx = signed.transaction();
        tracing::info!(
            network = %network,
            tx_hash = %tx_hash,
            from = %signed.from(),
            to = %tx.to,
            value = %tx.value,
            nonce = tx.nonce,
            "Transfer submitted"
        );

        Ok(TransferReceipt {
            tx_hash,
            network,
            from: signed.from(),
            to: tx.to,
            value: tx.value,
            nonce: tx.nonce,
            gas_price: tx.gas_price,
            gas_limit: tx.gas_limit,
        })
    }

    /// Observe `hash`: once, or until settled when `wait` is set.
    pub async fn status(
        &self,
        network: Network,
        hash: TxHash,
        wait: bool,
    ) -> EngineResult<TransactionReceipt> {
        let client = self.client(network)?;
        let status = &self.config.status;
        let mut tracker = StatusTracker::new(
            client.as_ref(),
            BackoffPolicy::new(status.max_attempts, status.base_delay_ms, status.max_delay_ms),
            status.confirmation_blocks,
        );
        if let Some(shutdown) = &self.shutdown {
            tracker = tracker.with_shutdown(shutdown.clone());
        }

        let receipt = if wait {
            tracker.poll(hash).await?
        } else {
            tracker.check(hash).await?
        };
        Ok(receipt)
    }

    /// Block explorer page for a transaction.
    pub fn explorer_tx_url(&self, network: Network, hash: TxHash) -> String {
        format!(
            "{}/tx/{}",
            self.config.network(network).explorer_url(network),
            hash
        )
    }

    /// Block explorer page for an address.
    pub fn explorer_address_url(&self, network: Network, address: Address) -> String {
        format!(
            "{}/address/{}",
            self.config.network(network).explorer_url(network),
            address
        )
    }

    fn broadcast_policy(&self) -> BackoffPolicy {
        let b = &self.config.broadcast;
        BackoffPolicy::new(b.max_attempts, b.base_delay_ms, b.max_delay_ms)
    }

    fn client(&self, network: Network) -> EngineResult<Arc<dyn ChainClient>> {
        if let Some(client) = self.clients.get(&network) {
            return Ok(client.clone());
        }
        let client = RpcChainClient::new(network, self.config.network(network))?;
        Ok(Arc::new(client))
    }
}

/// Parse a transaction hash: optional `0x` followed by 64 hex digits.
pub fn parse_tx_hash(input: &str) -> EngineResult<TxHash> {
    let trimmed = input.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    if digits.len() != 64 {
        return Err(EngineError::InvalidHash(format!(
            "'{}': expected 64 hexadecimal characters",
            input
        )));
    }
    let mut bytes = [0u8; 32];
    hex::decode_to_slice(digits, &mut bytes)
        .map_err(|e| EngineError::InvalidHash(format!("'{}': {}", input, e)))?;
    Ok(TxHash::from(bytes))
}
