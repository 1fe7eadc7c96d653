//! Confirmation tracking for broadcast transactions.
//!
//! # Status Rules
//! - No receipt → `pending` while the node knows the hash, `dropped` otherwise
//! - Receipt with reverted status → `failed`
//! - Receipt with `head - block + 1 >= depth` → `finalized`, else `included`
//! - Attempts exhausted: `dropped` if never included and the node no longer
//!   knows the hash, `timeout` otherwise

use alloy::primitives::TxHash;

use crate::blockchain::client::ChainClient;
use crate::blockchain::types::{ChainResult, TransactionReceipt, TxStatus};
use crate::lifecycle::Shutdown;
use crate::resilience::BackoffPolicy;

/// Observes a transaction on one network.
pub struct StatusTracker<'a> {
    client: &'a dyn ChainClient,
    policy: BackoffPolicy,
    confirmation_blocks: u64,
    shutdown: Option<Shutdown>,
}

impl<'a> StatusTracker<'a> {
    pub fn new(client: &'a dyn ChainClient, policy: BackoffPolicy, confirmation_blocks: u64) -> Self {
        Self {
            client,
            policy,
            confirmation_blocks: confirmation_blocks.max(1),
            shutdown: None,
        }
    }

    /// Stop polling early when `shutdown` triggers.
    pub fn with_shutdown(mut self, shutdown: Shutdown) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// One-shot observation.
    pub async fn check(&self, hash: TxHash) -> ChainResult<TransactionReceipt> {
        let receipt = match self.client.get_transaction_receipt(hash).await? {
            Some(receipt) => receipt,
            None if self.client.transaction_known(hash).await? => {
                return Ok(TransactionReceipt::pending(hash))
            }
            None => {
                return Ok(TransactionReceipt {
                    status: TxStatus::Dropped,
                    ..TransactionReceipt::pending(hash)
                })
            }
        };

        let head = self.client.get_block_number().await?;
        let confirmations = head.saturating_sub(receipt.block_number) + 1;

        let status = if !receipt.success {
            TxStatus::Failed
        } else if confirmations >= self.confirmation_blocks {
            TxStatus::Finalized
        } else {
            TxStatus::Included
        };

        Ok(TransactionReceipt {
            tx_hash: hash,
            status,
            block_number: Some(receipt.block_number),
            confirmations,
            gas_used: Some(receipt.gas_used),
        })
    }

    /// Poll until a terminal status, the attempt budget runs out, or shutdown.
    ///
    /// Query errors during polling are logged and count as an attempt.
    pub async fn poll(&self, hash: TxHash) -> ChainResult<TransactionReceipt> {
        let mut last = TransactionReceipt::pending(hash);
        let mut seen_included = false;

        for attempt in 1..=self.policy.max_attempts {
            match self.check(hash).await {
                Ok(receipt) if receipt.status.is_terminal() => {
                    tracing::info!(
                        tx_hash = %hash,
                        status = %receipt.status,
                        confirmations = receipt.confirmations,
                        "Transaction settled"
                    );
                    return Ok(receipt);
                }
                Ok(receipt) => {
                    if receipt.status == TxStatus::Included {
                        seen_included = true;
                    }
                    tracing::debug!(
                        tx_hash = %hash,
                        attempt,
                        status = %receipt.status,
                        confirmations = receipt.confirmations,
                        required = self.confirmation_blocks,
                        "Waiting for confirmations"
                    );
                    last = receipt;
                }
                Err(e) => {
                    tracing::warn!(tx_hash = %hash, attempt, error = %e, "Status query failed");
                }
            }

            if attempt == self.policy.max_attempts {
                break;
            }

            let delay = self.policy.delay_after(attempt);
            match &self.shutdown {
                Some(shutdown) => {
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = shutdown.triggered() => {
                            tracing::info!(tx_hash = %hash, status = %last.status, "Polling cancelled");
                            return Ok(last);
                        }
                    }
                }
                None => tokio::time::sleep(delay).await,
            }
        }

        if !seen_included {
            match self.client.transaction_known(hash).await {
                Ok(false) => {
                    tracing::warn!(tx_hash = %hash, "Transaction unknown to node, considered dropped");
                    return Ok(TransactionReceipt {
                        status: TxStatus::Dropped,
                        ..TransactionReceipt::pending(hash)
                    });
                }
                Ok(true) => {}
                Err(e) => tracing::warn!(tx_hash = %hash, error = %e, "Transaction lookup failed"),
            }
        }

        tracing::warn!(tx_hash = %hash, status = %last.status, "Gave up waiting for finality");
        Ok(TransactionReceipt {
            status: TxStatus::Timeout,
            ..last
        })
    }
}
