//! Node RPC access with timeout and failover handling.
//!
//! # Responsibilities
//! - Define the [`ChainClient`] seam the engine talks to
//! - Connect to JSON-RPC endpoints (primary + failovers) for one network
//! - Query chain state (balance, nonce, gas, receipts, head)
//! - Classify send failures so callers know whether the outcome is known

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use alloy::network::{ReceiptResponse, TransactionBuilder};
use alloy::primitives::{keccak256, Address, TxHash, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::transports::TransportResult;
use async_trait::async_trait;
use tokio::time::timeout;

use crate::blockchain::broadcast::settle_rejection;
use crate::blockchain::types::{
    BroadcastError, ChainError, ChainId, ChainReceipt, ChainResult, GasEstimateRequest, Network,
};
use crate::config::NetworkConfig;

/// Everything the engine needs from a node, bound to a single network.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Network this client was built for.
    fn network(&self) -> Network;

    async fn get_balance(&self, address: Address) -> ChainResult<U256>;

    /// Next nonce for `address`, counting transactions still in the pool.
    async fn get_transaction_count(&self, address: Address) -> ChainResult<u64>;

    /// Current gas price in wei.
    async fn get_gas_price(&self) -> ChainResult<u128>;

    async fn estimate_gas(&self, request: GasEstimateRequest) -> ChainResult<u64>;

    /// Submit canonical signed bytes and return the node's transaction hash.
    async fn send_raw_transaction(&self, raw: &[u8]) -> Result<TxHash, BroadcastError>;

    async fn get_transaction_receipt(&self, hash: TxHash) -> ChainResult<Option<ChainReceipt>>;

    async fn get_block_number(&self) -> ChainResult<u64>;

    async fn get_chain_id(&self) -> ChainResult<ChainId>;

    /// Whether the node knows the transaction at all (pool or chain).
    async fn transaction_known(&self, hash: TxHash) -> ChainResult<bool>;
}

type DynProvider = Arc<dyn Provider + Send + Sync>;

/// JSON-RPC [`ChainClient`] with failover across configured endpoints.
#[derive(Clone)]
pub struct RpcChainClient {
    network: Network,
    /// Primary first, then failovers.
    providers: Vec<DynProvider>,
    urls: Vec<String>,
    timeout_duration: Duration,
}

impl RpcChainClient {
    /// Build a client for `network`. No request is made here.
    pub fn new(network: Network, config: &NetworkConfig) -> ChainResult<Self> {
        let timeout_duration = Duration::from_secs(config.rpc_timeout_secs);
        let mut providers = Vec::new();
        let mut urls = Vec::new();

        let primary = config.rpc_url(network);
        let primary_url: url::Url = primary
            .parse()
            .map_err(|e| ChainError::Rpc(format!("Invalid RPC URL '{}': {}", primary, e)))?;
        providers.push(Arc::new(ProviderBuilder::new().connect_http(primary_url)) as DynProvider);
        urls.push(primary.to_string());

        for url_str in &config.failover_urls {
            match url_str.parse::<url::Url>() {
                Ok(url) => {
                    providers.push(Arc::new(ProviderBuilder::new().connect_http(url)) as DynProvider);
                    urls.push(url_str.clone());
                }
                Err(_) => tracing::warn!(url = %url_str, "Ignoring invalid failover RPC URL"),
            }
        }

        tracing::debug!(
            network = %network,
            rpc_url = %primary,
            failovers = providers.len() - 1,
            "RPC client initialized"
        );

        Ok(Self {
            network,
            providers,
            urls,
            timeout_duration,
        })
    }

    /// Run a read-only query against each provider in turn.
    ///
    /// Fails with `Timeout` when every provider timed out, otherwise with
    /// `AllProvidersFailed`.
    async fn query<T, F, Fut>(&self, op: &'static str, call: F) -> ChainResult<T>
    where
        F: Fn(DynProvider) -> Fut,
        Fut: Future<Output = TransportResult<T>>,
    {
        let mut all_timed_out = true;
        for (i, provider) in self.providers.iter().enumerate() {
            match timeout(self.timeout_duration, call(provider.clone())).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(e)) => {
                    all_timed_out = false;
                    tracing::warn!(provider_idx = i, op, error = %e, "RPC error, trying next provider");
                }
                Err(_) => {
                    tracing::warn!(provider_idx = i, op, "RPC timeout, trying next provider");
                }
            }
        }
        if all_timed_out {
            return Err(ChainError::Timeout(self.timeout_duration.as_secs()));
        }
        Err(ChainError::AllProvidersFailed(op))
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    fn network(&self) -> Network {
        self.network
    }

    async fn get_balance(&self, address: Address) -> ChainResult<U256> {
        self.query("get balance", |p| async move { p.get_balance(address).await })
            .await
    }

    async fn get_transaction_count(&self, address: Address) -> ChainResult<u64> {
        self.query("get transaction count", |p| async move {
            p.get_transaction_count(address).pending().await
        })
        .await
    }

    async fn get_gas_price(&self) -> ChainResult<u128> {
        self.query("get gas price", |p| async move { p.get_gas_price().await })
            .await
    }

    async fn estimate_gas(&self, request: GasEstimateRequest) -> ChainResult<u64> {
        let tx = TransactionRequest::default()
            .with_from(request.from)
            .with_to(request.to)
            .with_value(request.value);
        self.query("estimate gas", |p| {
            let tx = tx.clone();
            async move { p.estimate_gas(tx).await }
        })
        .await
    }

    /// A node that answers with an error ends the attempt; only transport
    /// failures move on to the next endpoint. A timeout is reported as
    /// ambiguous immediately since the payload may already be in a pool.
    /// A refusal from a failover endpoint is settled by hash lookup.
    async fn send_raw_transaction(&self, raw: &[u8]) -> Result<TxHash, BroadcastError> {
        let local_hash = keccak256(raw);
        let mut last_error = String::from("no RPC providers configured");

        for (i, provider) in self.providers.iter().enumerate() {
            match timeout(self.timeout_duration, provider.send_raw_transaction(raw)).await {
                Ok(Ok(pending)) => return Ok(*pending.tx_hash()),
                Ok(Err(e)) => {
                    if let Some(payload) = e.as_error_resp() {
                        let reason = payload.message.to_string();
                        if i > 0 {
                            return settle_rejection(self, local_hash, reason).await;
                        }
                        return Err(BroadcastError::Rejected(reason));
                    }
                    tracing::warn!(
                        provider_idx = i,
                        tx_hash = %local_hash,
                        error = %e,
                        "Transport error while sending, trying next provider"
                    );
                    last_error = e.to_string();
                }
                Err(_) => {
                    return Err(BroadcastError::Ambiguous {
                        hash: local_hash,
                        reason: format!(
                            "no response from {} within {}s",
                            self.urls[i],
                            self.timeout_duration.as_secs()
                        ),
                    });
                }
            }
        }

        Err(BroadcastError::Network {
            hash: local_hash,
            reason: last_error,
        })
    }

    async fn get_transaction_receipt(&self, hash: TxHash) -> ChainResult<Option<ChainReceipt>> {
        let receipt = self
            .query("get receipt", |p| async move {
                p.get_transaction_receipt(hash).await
            })
            .await?;

        Ok(receipt.and_then(|r| {
            // Receipts without a block number come from pending blocks.
            r.block_number().map(|block_number| ChainReceipt {
                tx_hash: r.transaction_hash(),
                block_number,
                success: r.status(),
                gas_used: r.gas_used(),
            })
        }))
    }

    async fn get_block_number(&self) -> ChainResult<u64> {
        self.query("get block number", |p| async move { p.get_block_number().await })
            .await
    }

    async fn get_chain_id(&self) -> ChainResult<ChainId> {
        self.query("get chain id", |p| async move { p.get_chain_id().await })
            .await
            .map(ChainId)
    }

    async fn transaction_known(&self, hash: TxHash) -> ChainResult<bool> {
        self.query("get transaction", |p| async move {
            p.get_transaction_by_hash(hash).await
        })
        .await
        .map(|tx| tx.is_some())
    }
}

impl std::fmt::Debug for RpcChainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcChainClient")
            .field("network", &self.network)
            .field("urls", &self.urls)
            .field("timeout_secs", &self.timeout_duration.as_secs())
            .finish()
    }
}
