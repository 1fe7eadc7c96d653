//! Shared utilities for integration tests: an in-memory chain and engine setup.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use alloy::consensus::{Transaction, TxEnvelope};
use alloy::eips::eip2718::Decodable2718;
use alloy::primitives::{keccak256, Address, Bytes, TxHash, U256};
use async_trait::async_trait;
use secrecy::SecretString;
use tempfile::TempDir;

use rsk_wallet::blockchain::client::ChainClient;
use rsk_wallet::blockchain::types::{
    BroadcastError, ChainError, ChainId, ChainReceipt, ChainResult, GasEstimateRequest, Network,
};
use rsk_wallet::config::{KeystoreConfig, WalletConfig};
use rsk_wallet::{KeyStore, WalletEngine};

/// Anvil's first account.
pub const TEST_PRIVATE_KEY: &str =
    "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const TEST_ADDRESS: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";
pub const RECIPIENT: &str = "0x7986b3df570230288501eea3d890bd66948c9b79";
pub const PASSPHRASE: &str = "correct horse battery";

pub const ONE_RBTC: u128 = 1_000_000_000_000_000_000;
pub const GAS_PRICE: u128 = 60_000_000;
pub const GAS_USED: u64 = 21_000;

pub fn secret(s: &str) -> SecretString {
    SecretString::from(s.to_string())
}

pub fn rbtc(amount: u128) -> U256 {
    U256::from(amount * ONE_RBTC)
}

pub fn test_address() -> Address {
    TEST_ADDRESS.parse().unwrap()
}

pub fn recipient() -> Address {
    RECIPIENT.parse().unwrap()
}

/// Scripted outcome for the next `send_raw_transaction` call.
#[derive(Debug, Clone)]
pub enum SendFault {
    /// Connection failure before any node answered.
    Transport,
    /// The node took the payload but the connection dropped before the answer.
    DeliveredTransport,
    /// Request sent, no answer.
    Timeout,
    /// Node answers with an error message.
    Reject(String),
    /// Node accepts but reports this hash.
    WrongHash(TxHash),
}

#[derive(Debug, Clone)]
struct PendingTx {
    hash: TxHash,
    from: Address,
    to: Address,
    value: U256,
    gas_price: u128,
}

#[derive(Debug, Default)]
struct ChainState {
    head: u64,
    balances: HashMap<Address, U256>,
    nonces: HashMap<Address, u64>,
    pool: Vec<PendingTx>,
    receipts: HashMap<TxHash, ChainReceipt>,
    faults: VecDeque<SendFault>,
    sent: Vec<Bytes>,
    revert_next_block: bool,
}

/// In-memory node for one network.
///
/// Accepts canonical signed bytes, recovers the sender and enforces chain id,
/// nonce and balance the way a real node would. Blocks are mined on demand.
pub struct MockChain {
    network: Network,
    node_chain_id: ChainId,
    gas_price: u128,
    gas_estimate: Option<u64>,
    auto_mine: bool,
    state: Mutex<ChainState>,
    send_attempts: AtomicU32,
}

impl MockChain {
    pub fn new(network: Network) -> Self {
        Self {
            network,
            node_chain_id: network.chain_id(),
            gas_price: GAS_PRICE,
            gas_estimate: Some(GAS_USED),
            auto_mine: false,
            state: Mutex::new(ChainState::default()),
            send_attempts: AtomicU32::new(0),
        }
    }

    /// Node reports `chain_id` regardless of the network it was built for.
    pub fn with_node_chain_id(mut self, chain_id: u64) -> Self {
        self.node_chain_id = ChainId(chain_id);
        self
    }

    pub fn with_gas_price(mut self, gas_price: u128) -> Self {
        self.gas_price = gas_price;
        self
    }

    /// `None` makes `eth_estimateGas` fail.
    pub fn with_gas_estimate(mut self, estimate: Option<u64>) -> Self {
        self.gas_estimate = estimate;
        self
    }

    /// Mine a block before answering every receipt query.
    pub fn with_auto_mine(mut self) -> Self {
        self.auto_mine = true;
        self
    }

    pub fn fund(&self, address: Address, wei: U256) {
        self.state.lock().unwrap().balances.insert(address, wei);
    }

    pub fn balance(&self, address: Address) -> U256 {
        self.state
            .lock()
            .unwrap()
            .balances
            .get(&address)
            .copied()
            .unwrap_or_default()
    }

    pub fn push_fault(&self, fault: SendFault) {
        self.state.lock().unwrap().faults.push_back(fault);
    }

    /// Raw payloads that reached the node, including rejected ones.
    pub fn sent(&self) -> Vec<Bytes> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn send_attempts(&self) -> u32 {
        self.send_attempts.load(Ordering::SeqCst)
    }

    pub fn pool_len(&self) -> usize {
        self.state.lock().unwrap().pool.len()
    }

    pub fn head(&self) -> u64 {
        self.state.lock().unwrap().head
    }

    /// Evict a pending transaction without mining it.
    pub fn drop_pending(&self, hash: TxHash) {
        self.state.lock().unwrap().pool.retain(|tx| tx.hash != hash);
    }

    /// Transactions in the next mined block revert (fee charged, no transfer).
    pub fn revert_next_block(&self) {
        self.state.lock().unwrap().revert_next_block = true;
    }

    /// Mine one block containing the whole pool.
    pub fn mine(&self) {
        let mut state = self.state.lock().unwrap();
        Self::mine_block(&mut state);
    }

    /// Mine `n` empty blocks after the pool has been mined.
    pub fn advance(&self, n: u64) {
        let mut state = self.state.lock().unwrap();
        Self::mine_block(&mut state);
        state.head += n.saturating_sub(1);
    }

    fn mine_block(state: &mut ChainState) {
        state.head += 1;
        let block = state.head;
        let revert = std::mem::take(&mut state.revert_next_block);

        for tx in std::mem::take(&mut state.pool) {
            let fee = U256::from(tx.gas_price) * U256::from(GAS_USED);
            let debit = if revert { fee } else { tx.value + fee };

            let from_balance = state.balances.entry(tx.from).or_default();
            *from_balance -= debit;
            if !revert {
                *state.balances.entry(tx.to).or_default() += tx.value;
            }
            *state.nonces.entry(tx.from).or_default() += 1;

            state.receipts.insert(
                tx.hash,
                ChainReceipt {
                    tx_hash: tx.hash,
                    block_number: block,
                    success: !revert,
                    gas_used: GAS_USED,
                },
            );
        }
    }

    fn pending_nonce(state: &ChainState, address: Address) -> u64 {
        let mined = state.nonces.get(&address).copied().unwrap_or(0);
        let pending = state.pool.iter().filter(|tx| tx.from == address).count() as u64;
        mined + pending
    }

    fn pending_spend(state: &ChainState, address: Address) -> U256 {
        state
            .pool
            .iter()
            .filter(|tx| tx.from == address)
            .map(|tx| tx.value + U256::from(tx.gas_price) * U256::from(GAS_USED))
            .fold(U256::ZERO, |acc, v| acc + v)
    }

    fn accept(&self, raw: &[u8]) -> Result<TxHash, BroadcastError> {
        let mut state = self.state.lock().unwrap();
        let hash = keccak256(raw);

        let envelope = TxEnvelope::decode_2718(&mut &raw[..])
            .map_err(|e| BroadcastError::Rejected(format!("rlp: {}", e)))?;
        let signed = match envelope {
            TxEnvelope::Legacy(signed) => signed,
            _ => return Err(BroadcastError::Rejected("unsupported transaction type".into())),
        };

        if signed.tx().chain_id() != Some(self.node_chain_id.0) {
            return Err(BroadcastError::Rejected("invalid chain id for signer".into()));
        }

        let from = signed
            .signature()
            .recover_address_from_prehash(&signed.signature_hash())
            .map_err(|_| BroadcastError::Rejected("invalid sender".into()))?;

        if state.receipts.contains_key(&hash) || state.pool.iter().any(|tx| tx.hash == hash) {
            return Err(BroadcastError::Rejected("already known".into()));
        }

        let tx = signed.tx();
        let expected_nonce = Self::pending_nonce(&state, from);
        if tx.nonce < expected_nonce {
            return Err(BroadcastError::Rejected("nonce too low".into()));
        }
        if tx.nonce > expected_nonce {
            return Err(BroadcastError::Rejected("nonce too high".into()));
        }

        let balance = state.balances.get(&from).copied().unwrap_or_default();
        let cost = tx.value + U256::from(tx.gas_price) * U256::from(tx.gas_limit);
        if Self::pending_spend(&state, from) + cost > balance {
            return Err(BroadcastError::Rejected(
                "insufficient funds for gas * price + value".into(),
            ));
        }

        let to = tx.to.to().copied().unwrap_or_default();
        state.pool.push(PendingTx {
            hash,
            from,
            to,
            value: tx.value,
            gas_price: tx.gas_price,
        });
        Ok(hash)
    }
}

#[async_trait]
impl ChainClient for MockChain {
    fn network(&self) -> Network {
        self.network
    }

    async fn get_balance(&self, address: Address) -> ChainResult<U256> {
        Ok(self.balance(address))
    }

    async fn get_transaction_count(&self, address: Address) -> ChainResult<u64> {
        let state = self.state.lock().unwrap();
        Ok(Self::pending_nonce(&state, address))
    }

    async fn get_gas_price(&self) -> ChainResult<u128> {
        Ok(self.gas_price)
    }

    async fn estimate_gas(&self, _request: GasEstimateRequest) -> ChainResult<u64> {
        self.gas_estimate
            .ok_or_else(|| ChainError::Rpc("execution reverted".to_string()))
    }

    async fn send_raw_transaction(&self, raw: &[u8]) -> Result<TxHash, BroadcastError> {
        self.send_attempts.fetch_add(1, Ordering::SeqCst);
        let hash = keccak256(raw);

        let fault = {
            let mut state = self.state.lock().unwrap();
            state.sent.push(Bytes::copy_from_slice(raw));
            state.faults.pop_front()
        };

        match fault {
            Some(SendFault::Transport) => Err(BroadcastError::Network {
                hash,
                reason: "connection refused".to_string(),
            }),
            Some(SendFault::DeliveredTransport) => {
                let _ = self.accept(raw);
                Err(BroadcastError::Network {
                    hash,
                    reason: "connection reset by peer".to_string(),
                })
            }
            Some(SendFault::Timeout) => {
                // The node received it; only the answer was lost.
                let _ = self.accept(raw);
                Err(BroadcastError::Ambiguous {
                    hash,
                    reason: "no response within 10s".to_string(),
                })
            }
            Some(SendFault::Reject(message)) => Err(BroadcastError::Rejected(message)),
            Some(SendFault::WrongHash(other)) => self.accept(raw).map(|_| other),
            None => self.accept(raw),
        }
    }

    async fn get_transaction_receipt(&self, hash: TxHash) -> ChainResult<Option<ChainReceipt>> {
        let mut state = self.state.lock().unwrap();
        if self.auto_mine {
            Self::mine_block(&mut state);
        }
        Ok(state.receipts.get(&hash).cloned())
    }

    async fn get_block_number(&self) -> ChainResult<u64> {
        Ok(self.head())
    }

    async fn get_chain_id(&self) -> ChainResult<ChainId> {
        Ok(self.node_chain_id)
    }

    async fn transaction_known(&self, hash: TxHash) -> ChainResult<bool> {
        let state = self.state.lock().unwrap();
        Ok(state.receipts.contains_key(&hash) || state.pool.iter().any(|tx| tx.hash == hash))
    }
}

/// Wallet config with cheap key derivation and millisecond backoff.
pub fn test_config(dir: &TempDir) -> WalletConfig {
    let mut config = WalletConfig::default();
    config.data_dir = Some(dir.path().join("wallets"));
    config.keystore = KeystoreConfig {
        m_cost: 64,
        t_cost: 1,
        p_cost: 1,
    };
    config.broadcast.max_attempts = 3;
    config.broadcast.base_delay_ms = 1;
    config.broadcast.max_delay_ms = 5;
    config.status.max_attempts = 5;
    config.status.base_delay_ms = 1;
    config.status.max_delay_ms = 5;
    config.status.confirmation_blocks = 3;
    config
}

pub fn test_keystore(dir: &TempDir) -> KeyStore {
    let config = test_config(dir);
    KeyStore::new(dir.path().join("wallets"), config.keystore)
}

/// Engine whose `network` wallet holds the test key, talking to `chain`.
pub fn engine_with_wallet(dir: &TempDir, chain: Arc<MockChain>) -> WalletEngine {
    let network = chain.network();
    let engine = WalletEngine::new(test_config(dir)).with_client(chain);
    engine
        .import_wallet(network, &secret(TEST_PRIVATE_KEY), &secret(PASSPHRASE), false)
        .unwrap();
    engine
}
