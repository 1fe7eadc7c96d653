//! Chain-facing subsystem: keys, transactions and node access.
//!
//! # Data Flow
//! ```text
//! recipient + amount (user intent)
//!     → transaction.rs (validate, resolve nonce/gas/balance via client.rs)
//!     → signer.rs (EIP-155 signature with the unlocked wallet.rs keypair)
//!     → broadcast.rs (eth_sendRawTransaction, failure classification)
//!     → status.rs (receipt polling until finalized/failed/dropped/timeout)
//! ```
//!
//! # Security Constraints
//! - Never log private keys or sensitive data
//! - All RPC calls have configurable timeouts
//! - Every operation names its network explicitly

pub mod broadcast;
pub mod client;
pub mod signer;
pub mod status;
pub mod transaction;
pub mod types;
pub mod units;
pub mod wallet;

pub use broadcast::Broadcaster;
pub use client::{ChainClient, RpcChainClient};
pub use signer::{sign_transaction, SignedTransaction};
pub use status::StatusTracker;
pub use transaction::{TransactionBuilder, UnsignedTransaction};
pub use types::{
    BroadcastError, ChainError, ChainId, ChainReceipt, Network, TransactionReceipt, TxStatus,
};
pub use wallet::Keypair;
