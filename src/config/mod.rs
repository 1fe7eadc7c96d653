//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (locate, parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → WalletConfig (validated, immutable for the invocation)
//! ```
//!
//! # Design Decisions
//! - All fields have defaults; running without any config file talks to the
//!   public Rootstock nodes
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, resolve_config, ConfigError};
pub use schema::{
    BroadcastConfig, KeystoreConfig, NetworkConfig, StatusConfig, TransactionConfig, WalletConfig,
};
