//! Chain-specific types and error definitions.

use std::fmt;
use std::str::FromStr;

use alloy::primitives::{Address, TxHash, U256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rootstock mainnet chain id.
pub const MAINNET_CHAIN_ID: u64 = 30;

/// Rootstock testnet chain id.
pub const TESTNET_CHAIN_ID: u64 = 31;

/// Gas consumed by a plain value transfer.
pub const TRANSFER_GAS: u64 = 21_000;

/// The network a wallet, client or transaction belongs to.
///
/// Always passed explicitly; there is no process-wide selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Network {
    /// Select the network from the CLI's `--testnet` flag.
    pub fn from_testnet_flag(testnet: bool) -> Self {
        if testnet {
            Network::Testnet
        } else {
            Network::Mainnet
        }
    }

    /// EIP-155 chain id embedded in every signed transaction.
    pub fn chain_id(self) -> ChainId {
        match self {
            Network::Mainnet => ChainId(MAINNET_CHAIN_ID),
            Network::Testnet => ChainId(TESTNET_CHAIN_ID),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Network::Mainnet),
            "testnet" => Ok(Network::Testnet),
            other => Err(format!("unknown network '{}'", other)),
        }
    }
}

/// Chain ID type for strong typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChainId(pub u64);

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<ChainId> for u64 {
    fn from(id: ChainId) -> Self {
        id.0
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors from read-only chain queries.
///
/// Nothing irreversible has happened when one of these surfaces, so the whole
/// flow can be retried from scratch.
#[derive(Debug, Error)]
pub enum ChainError {
    /// RPC connection or request failed.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// RPC request timed out.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// Every configured endpoint failed for this call.
    #[error("All RPC providers failed to {0}")]
    AllProvidersFailed(&'static str),

    /// Chain configuration mismatch.
    #[error("Chain ID mismatch: expected {expected}, got {actual}")]
    ChainMismatch { expected: u64, actual: u64 },
}

/// Result type for chain queries.
pub type ChainResult<T> = Result<T, ChainError>;

/// Errors from submitting a signed transaction.
#[derive(Debug, Error)]
pub enum BroadcastError {
    /// The node answered and refused the payload (nonce too low, wrong chain,
    /// insufficient funds per node, ...). The transaction is not in the pool.
    #[error("transaction rejected by node: {0}")]
    Rejected(String),

    /// Transport failure before any node answered. Re-sending the same signed
    /// payload is safe.
    #[error("network error while broadcasting {hash}: {reason}")]
    Network { hash: TxHash, reason: String },

    /// The request may have reached the node; whether the transaction was
    /// accepted is unknown.
    #[error("broadcast of {hash} timed out; outcome unknown: {reason}")]
    Ambiguous { hash: TxHash, reason: String },
}

/// Receipt fields the engine consumes, independent of the RPC type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainReceipt {
    pub tx_hash: TxHash,
    pub block_number: u64,
    pub success: bool,
    pub gas_used: u64,
}

/// A transfer as submitted to `eth_estimateGas`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasEstimateRequest {
    pub from: Address,
    pub to: Address,
    pub value: U256,
}

/// Lifecycle of a broadcast transaction.
///
/// `Pending -> Included -> Finalized`, `Pending -> Dropped`, or `Failed` when
/// the transaction was mined but reverted. `Timeout` is returned when the
/// caller's wait budget ran out before a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Pending,
    Included,
    Finalized,
    Failed,
    Dropped,
    Timeout,
}

impl TxStatus {
    /// Finalized and failed receipts never change again.
    pub fn is_terminal(self) -> bool {
        matches!(self, TxStatus::Finalized | TxStatus::Failed)
    }
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TxStatus::Pending => "pending",
            TxStatus::Included => "included",
            TxStatus::Finalized => "finalized",
            TxStatus::Failed => "failed",
            TxStatus::Dropped => "dropped",
            TxStatus::Timeout => "timeout",
        };
        f.write_str(s)
    }
}

/// Observed state of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionReceipt {
    pub tx_hash: TxHash,
    pub status: TxStatus,
    pub block_number: Option<u64>,
    pub confirmations: u64,
    pub gas_used: Option<u64>,
}

impl TransactionReceipt {
    pub fn pending(tx_hash: TxHash) -> Self {
        Self {
            tx_hash,
            status: TxStatus::Pending,
            block_number: None,
            confirmations: 0,
            gas_used: None,
        }
    }
}
