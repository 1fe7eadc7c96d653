//! Rootstock wallet and transaction engine.
//!
//! ```text
//! keystore (encrypted key at rest)
//!     → blockchain::transaction (build) → blockchain::signer (sign)
//!     → blockchain::broadcast (send) → blockchain::status (track)
//! engine.rs ties these together per network; main.rs is the `rsk-cli` front end.
//! ```

pub mod blockchain;
pub mod config;
pub mod engine;
pub mod error;
pub mod keystore;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use blockchain::types::{Network, TransactionReceipt, TxStatus};
pub use config::WalletConfig;
pub use engine::{BalanceReport, TransferReceipt, WalletEngine};
pub use error::{EngineError, EngineResult};
pub use keystore::KeyStore;
pub use lifecycle::Shutdown;
