//! Submission of signed transactions.
//!
//! # Failure Handling
//! - Node refuses the payload → `Rejected`, never retried
//! - Node reports the payload as already known → success with the local hash
//! - Transport error → the identical bytes are re-sent with backoff
//! - Timeout → `Ambiguous`, never retried or rebuilt here
//! - Refusal after an earlier transport error → success if the node knows the
//!   hash, otherwise `Ambiguous`; the first payload may have landed

use alloy::primitives::TxHash;

use crate::blockchain::client::ChainClient;
use crate::blockchain::signer::SignedTransaction;
use crate::blockchain::types::BroadcastError;
use crate::resilience::BackoffPolicy;

/// Node error fragments meaning the payload is already in the pool.
/// Geth-style wordings first, then RSKj's.
const KNOWN_TX_MESSAGES: &[&str] = &[
    "already known",
    "known transaction",
    "already imported",
    "transaction with same hash already exists",
    "transaction already exists",
];

/// Sends signed transactions through one network's client.
pub struct Broadcaster<'a> {
    client: &'a dyn ChainClient,
    policy: BackoffPolicy,
}

impl<'a> Broadcaster<'a> {
    pub fn new(client: &'a dyn ChainClient, policy: BackoffPolicy) -> Self {
        Self { client, policy }
    }

    /// Submit `tx` and return its hash.
    pub async fn send(&self, tx: &SignedTransaction) -> Result<TxHash, BroadcastError> {
        let local_hash = tx.hash();
        let network = self.client.network();
        if tx.chain_id() != network.chain_id() {
            return Err(BroadcastError::Rejected(format!(
                "transaction signed for chain {} cannot be sent to {} (chain {})",
                tx.chain_id(),
                network,
                network.chain_id()
            )));
        }

        let mut attempt = 1;
        let mut transport_failed = false;
        loop {
            match self.client.send_raw_transaction(tx.raw()).await {
                Ok(node_hash) => {
                    if node_hash != local_hash {
                        tracing::warn!(
                            local_hash = %local_hash,
                            node_hash = %node_hash,
                            "Node returned a different transaction hash"
                        );
                    }
                    tracing::info!(tx_hash = %local_hash, network = %network, attempt, "Transaction broadcast");
                    return Ok(local_hash);
                }
                Err(BroadcastError::Rejected(reason)) if is_known_transaction(&reason) => {
                    tracing::info!(tx_hash = %local_hash, "Transaction already in node pool");
                    return Ok(local_hash);
                }
                Err(BroadcastError::Rejected(reason)) if transport_failed => {
                    return settle_rejection(self.client, local_hash, reason).await;
                }
                Err(BroadcastError::Rejected(reason)) => {
                    tracing::warn!(tx_hash = %local_hash, reason = %reason, "Transaction rejected");
                    return Err(BroadcastError::Rejected(reason));
                }
                Err(BroadcastError::Ambiguous { reason, .. }) => {
                    tracing::error!(tx_hash = %local_hash, reason = %reason, "Broadcast outcome unknown");
                    return Err(BroadcastError::Ambiguous {
                        hash: local_hash,
                        reason,
                    });
                }
                Err(BroadcastError::Network { reason, .. }) => {
                    transport_failed = true;
                    if attempt >= self.policy.max_attempts {
                        tracing::error!(
                            tx_hash = %local_hash,
                            attempts = attempt,
                            reason = %reason,
                            "Broadcast failed after retries"
                        );
                        return Err(BroadcastError::Network {
                            hash: local_hash,
                            reason,
                        });
                    }

                    let delay = self.policy.delay_after(attempt);
                    tracing::warn!(
                        tx_hash = %local_hash,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        reason = %reason,
                        "Broadcast transport error, retrying same payload"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

pub(crate) fn is_known_transaction(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    KNOWN_TX_MESSAGES.iter().any(|m| lower.contains(m))
}

/// Classify a refusal that followed a transport failure for the same payload.
///
/// The earlier request may have delivered the bytes, so "nonce too low" or a
/// duplicate error can be the node describing our own transaction. Only a
/// node that knows `hash` turns this into success; a refusal alone never
/// becomes a definite rejection.
pub(crate) async fn settle_rejection(
    client: &dyn ChainClient,
    hash: TxHash,
    reason: String,
) -> Result<TxHash, BroadcastError> {
    if is_known_transaction(&reason) {
        tracing::info!(tx_hash = %hash, "Transaction already in node pool");
        return Ok(hash);
    }

    match client.transaction_known(hash).await {
        Ok(true) => {
            tracing::info!(tx_hash = %hash, reason = %reason, "Re-sent payload refused but node knows the transaction");
            Ok(hash)
        }
        Ok(false) => {
            tracing::error!(tx_hash = %hash, reason = %reason, "Re-sent payload refused; first attempt may still be pending");
            Err(BroadcastError::Ambiguous {
                hash,
                reason: format!("node refused re-sent payload after a transport error: {}", reason),
            })
        }
        Err(e) => {
            tracing::error!(tx_hash = %hash, reason = %reason, error = %e, "Could not look up transaction after refusal");
            Err(BroadcastError::Ambiguous {
                hash,
                reason: format!("{}; lookup failed: {}", reason, e),
            })
        }
    }
}
