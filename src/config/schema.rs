//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the wallet.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::blockchain::types::{Network, TRANSFER_GAS};

/// Root configuration for the wallet engine.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct WalletConfig {
    /// Directory holding wallet files. Resolved at load time when unset.
    pub data_dir: Option<PathBuf>,

    /// Rootstock mainnet endpoints.
    pub mainnet: NetworkConfig,

    /// Rootstock testnet endpoints.
    pub testnet: NetworkConfig,

    /// Key derivation settings for newly written wallets.
    pub keystore: KeystoreConfig,

    /// Gas pricing policy for transfers.
    pub transactions: TransactionConfig,

    /// Broadcast retry policy.
    pub broadcast: BroadcastConfig,

    /// Confirmation polling policy.
    pub status: StatusConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl WalletConfig {
    /// Endpoint settings for the given network.
    pub fn network(&self, network: Network) -> &NetworkConfig {
        match network {
            Network::Mainnet => &self.mainnet,
            Network::Testnet => &self.testnet,
        }
    }
}

/// JSON-RPC endpoints for one network.
///
/// Unset URLs fall back to the public Rootstock nodes for that network.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// JSON-RPC endpoint URL.
    pub rpc_url: Option<String>,

    /// Failover JSON-RPC endpoint URLs.
    pub failover_urls: Vec<String>,

    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,

    /// Block explorer base URL used for links in CLI output.
    pub explorer_url: Option<String>,
}

impl NetworkConfig {
    /// Primary endpoint for `network`.
    pub fn rpc_url(&self, network: Network) -> &str {
        self.rpc_url.as_deref().unwrap_or(match network {
            Network::Mainnet => "https://public-node.rsk.co",
            Network::Testnet => "https://public-node.testnet.rsk.co",
        })
    }

    /// Explorer base URL for `network`, without a trailing slash.
    pub fn explorer_url(&self, network: Network) -> &str {
        self.explorer_url
            .as_deref()
            .unwrap_or(match network {
                Network::Mainnet => "https://explorer.rootstock.io",
                Network::Testnet => "https://explorer.testnet.rootstock.io",
            })
            .trim_end_matches('/')
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            rpc_url: None,
            failover_urls: Vec::new(),
            rpc_timeout_secs: 10,
            explorer_url: None,
        }
    }
}

/// Argon2id cost parameters for new wallets.
///
/// Existing wallets are always decrypted with the parameters stored in them.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct KeystoreConfig {
    /// Memory cost in KiB.
    pub m_cost: u32,

    /// Iterations.
    pub t_cost: u32,

    /// Lanes.
    pub p_cost: u32,
}

impl Default for KeystoreConfig {
    fn default() -> Self {
        Self {
            m_cost: 65536, // 64 MiB
            t_cost: 3,
            p_cost: 4,
        }
    }
}

/// Gas pricing policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransactionConfig {
    /// Gas price multiplier (1.0 = node price, 1.1 = 10% buffer).
    pub gas_price_multiplier: f64,

    /// Floor applied to the node's gas price, in wei.
    pub min_gas_price_wei: u128,

    /// Maximum gas price in gwei (protection against spikes).
    pub max_gas_price_gwei: u64,

    /// Gas limit used when the node cannot estimate a transfer.
    pub transfer_gas_limit: u64,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            gas_price_multiplier: 1.0,
            min_gas_price_wei: 0,
            max_gas_price_gwei: 100,
            transfer_gas_limit: TRANSFER_GAS,
        }
    }
}

/// Retry policy for re-sending an identical signed payload after a transport
/// failure.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BroadcastConfig {
    /// Total send attempts, including the first.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 4000,
        }
    }
}

/// Confirmation polling policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StatusConfig {
    /// Number of receipt lookups before giving up.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,

    /// Number of block confirmations required for finality.
    pub confirmation_blocks: u64,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            max_attempts: 20,
            base_delay_ms: 2000,
            max_delay_ms: 30_000,
            confirmation_blocks: 3,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WalletConfig::default();
        assert!(config.data_dir.is_none());
        assert_eq!(config.transactions.transfer_gas_limit, 21_000);
        assert_eq!(config.status.confirmation_blocks, 3);
        assert_eq!(config.keystore.m_cost, 65536);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: WalletConfig = toml::from_str(
            r#"
            [testnet]
            rpc_url = "http://localhost:4444"

            [status]
            confirmation_blocks = 6
            "#,
        )
        .unwrap();

        assert_eq!(config.testnet.rpc_url(Network::Testnet), "http://localhost:4444");
        assert_eq!(config.testnet.rpc_timeout_secs, 10);
        assert_eq!(
            config.testnet.explorer_url(Network::Testnet),
            "https://explorer.testnet.rootstock.io"
        );
        assert_eq!(config.mainnet.rpc_url(Network::Mainnet), "https://public-node.rsk.co");
        assert_eq!(config.status.confirmation_blocks, 6);
        assert_eq!(config.status.max_attempts, 20);
    }
}
