//! Broadcast failure classification against scripted node faults.

use std::sync::Arc;

use alloy::primitives::{Address, Bytes, TxHash, U256};
use rsk_wallet::blockchain::broadcast::Broadcaster;
use rsk_wallet::blockchain::signer::{sign_transaction, SignedTransaction};
use rsk_wallet::blockchain::transaction::UnsignedTransaction;
use rsk_wallet::blockchain::types::{BroadcastError, ChainId};
use rsk_wallet::blockchain::wallet::{parse_private_key, Keypair};
use rsk_wallet::resilience::BackoffPolicy;
use rsk_wallet::{EngineError, Network};
use tempfile::TempDir;

mod common;
use common::*;

fn keypair() -> Keypair {
    let bytes = parse_private_key(TEST_PRIVATE_KEY).unwrap();
    Keypair::from_secret_bytes(&bytes[..]).unwrap()
}

fn signed_transfer(network: Network, nonce: u64) -> SignedTransaction {
    let tx = UnsignedTransaction {
        to: recipient(),
        value: rbtc(1),
        nonce,
        gas_price: GAS_PRICE,
        gas_limit: 21_000,
        chain_id: network.chain_id(),
        data: Bytes::new(),
    };
    sign_transaction(tx, &keypair()).unwrap()
}

fn funded_chain(network: Network) -> MockChain {
    let chain = MockChain::new(network);
    chain.fund(test_address(), rbtc(5));
    chain
}

fn policy() -> BackoffPolicy {
    BackoffPolicy::new(3, 1, 5)
}

#[tokio::test]
async fn test_transport_errors_resend_identical_payload() {
    let chain = funded_chain(Network::Testnet);
    chain.push_fault(SendFault::Transport);
    chain.push_fault(SendFault::Transport);
    let tx = signed_transfer(Network::Testnet, 0);

    let hash = Broadcaster::new(&chain, policy()).send(&tx).await.unwrap();

    assert_eq!(hash, tx.hash());
    assert_eq!(chain.send_attempts(), 3);
    assert!(chain.sent().iter().all(|raw| raw == tx.raw()));
    assert_eq!(chain.pool_len(), 1);
}

#[tokio::test]
async fn test_transport_errors_exhaust_to_network_error() {
    let chain = funded_chain(Network::Testnet);
    for _ in 0..3 {
        chain.push_fault(SendFault::Transport);
    }
    let tx = signed_transfer(Network::Testnet, 0);

    let err = Broadcaster::new(&chain, policy()).send(&tx).await.unwrap_err();
    match err {
        BroadcastError::Network { hash, .. } => assert_eq!(hash, tx.hash()),
        other => panic!("expected network error, got {:?}", other),
    }
    assert_eq!(chain.send_attempts(), 3);
}

#[tokio::test]
async fn test_timeout_is_ambiguous_and_not_retried() {
    let chain = funded_chain(Network::Testnet);
    chain.push_fault(SendFault::Timeout);
    let tx = signed_transfer(Network::Testnet, 0);

    let err = Broadcaster::new(&chain, policy()).send(&tx).await.unwrap_err();
    assert!(matches!(err, BroadcastError::Ambiguous { hash, .. } if hash == tx.hash()));
    assert_eq!(chain.send_attempts(), 1);
    // The node did receive it.
    assert_eq!(chain.pool_len(), 1);
}

#[tokio::test]
async fn test_already_known_counts_as_success() {
    let chain = funded_chain(Network::Testnet);
    let tx = signed_transfer(Network::Testnet, 0);
    let broadcaster = Broadcaster::new(&chain, policy());

    let first = broadcaster.send(&tx).await.unwrap();
    let second = broadcaster.send(&tx).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(chain.pool_len(), 1);
}

#[tokio::test]
async fn test_node_rejection_is_final() {
    let chain = funded_chain(Network::Testnet);
    chain.push_fault(SendFault::Reject("nonce too low".to_string()));
    let tx = signed_transfer(Network::Testnet, 0);

    let err = Broadcaster::new(&chain, policy()).send(&tx).await.unwrap_err();
    assert!(matches!(err, BroadcastError::Rejected(ref msg) if msg == "nonce too low"));
    assert_eq!(chain.send_attempts(), 1);
}

#[tokio::test]
async fn test_stale_nonce_rejected_by_node() {
    let chain = funded_chain(Network::Testnet);
    let broadcaster = Broadcaster::new(&chain, policy());
    broadcaster.send(&signed_transfer(Network::Testnet, 0)).await.unwrap();
    chain.mine();

    let replay = signed_transfer(Network::Testnet, 0);
    let mut bumped = replay.transaction().clone();
    bumped.value = rbtc(2);
    let conflicting = sign_transaction(bumped, &keypair()).unwrap();

    let err = broadcaster.send(&conflicting).await.unwrap_err();
    assert!(matches!(err, BroadcastError::Rejected(ref msg) if msg.contains("nonce too low")));
}

#[tokio::test]
async fn test_duplicate_after_dropped_connection_is_success() {
    let chain = funded_chain(Network::Testnet);
    chain.push_fault(SendFault::DeliveredTransport);
    chain.push_fault(SendFault::Reject(
        "pending transaction with same hash already exists".to_string(),
    ));
    let tx = signed_transfer(Network::Testnet, 0);

    let hash = Broadcaster::new(&chain, policy()).send(&tx).await.unwrap();
    assert_eq!(hash, tx.hash());
    assert_eq!(chain.send_attempts(), 2);
    assert_eq!(chain.pool_len(), 1);
}

#[tokio::test]
async fn test_nonce_too_low_after_dropped_connection_checks_node() {
    let chain = funded_chain(Network::Testnet);
    chain.push_fault(SendFault::DeliveredTransport);
    // The first payload already holds nonce 0, so the retry looks stale.
    chain.push_fault(SendFault::Reject("nonce too low".to_string()));
    let tx = signed_transfer(Network::Testnet, 0);

    let hash = Broadcaster::new(&chain, policy()).send(&tx).await.unwrap();
    assert_eq!(hash, tx.hash());
}

#[tokio::test]
async fn test_refusal_after_transport_error_is_ambiguous() {
    let chain = funded_chain(Network::Testnet);
    chain.push_fault(SendFault::Transport);
    chain.push_fault(SendFault::Reject("nonce too low".to_string()));
    let tx = signed_transfer(Network::Testnet, 0);

    let err = Broadcaster::new(&chain, policy()).send(&tx).await.unwrap_err();
    match err {
        BroadcastError::Ambiguous { hash, reason } => {
            assert_eq!(hash, tx.hash());
            assert!(reason.contains("nonce too low"));
        }
        other => panic!("expected ambiguous outcome, got {:?}", other),
    }
    assert_eq!(chain.send_attempts(), 2);
}

#[tokio::test]
async fn test_engine_never_reports_rejection_after_transport_error() {
    let dir = TempDir::new().unwrap();
    let chain = Arc::new(funded_chain(Network::Testnet));
    chain.push_fault(SendFault::Transport);
    chain.push_fault(SendFault::Reject("insufficient funds".to_string()));
    let engine = engine_with_wallet(&dir, chain);

    let err = engine
        .transfer(Network::Testnet, RECIPIENT, "1", &secret(PASSPHRASE))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::BroadcastAmbiguous { .. }));
    assert!(err.outcome_unknown());
    assert!(err.pending_hash().is_some());
}

#[tokio::test]
async fn test_node_hash_mismatch_returns_local_hash() {
    let chain = funded_chain(Network::Testnet);
    chain.push_fault(SendFault::WrongHash(TxHash::repeat_byte(0xee)));
    let tx = signed_transfer(Network::Testnet, 0);

    let hash = Broadcaster::new(&chain, policy()).send(&tx).await.unwrap();
    assert_eq!(hash, tx.hash());
}

#[tokio::test]
async fn test_chain_id_guard_blocks_cross_network_send() {
    let chain = funded_chain(Network::Mainnet);
    let tx = signed_transfer(Network::Testnet, 0);

    let err = Broadcaster::new(&chain, policy()).send(&tx).await.unwrap_err();
    assert!(matches!(err, BroadcastError::Rejected(_)));
    assert_eq!(chain.send_attempts(), 0);
}

#[tokio::test]
async fn test_node_enforces_chain_id() {
    // A mainnet node receiving testnet-signed bytes refuses them.
    let chain = MockChain::new(Network::Testnet).with_node_chain_id(30);
    chain.fund(test_address(), rbtc(5));
    let tx = signed_transfer(Network::Testnet, 0);

    let err = Broadcaster::new(&chain, policy()).send(&tx).await.unwrap_err();
    assert!(matches!(err, BroadcastError::Rejected(ref msg) if msg.contains("chain id")));
}

#[tokio::test]
async fn test_engine_reports_unknown_outcome_with_hash() {
    let dir = TempDir::new().unwrap();
    let chain = Arc::new(funded_chain(Network::Testnet));
    chain.push_fault(SendFault::Timeout);
    let engine = engine_with_wallet(&dir, chain.clone());

    let err = engine
        .transfer(Network::Testnet, RECIPIENT, "1", &secret(PASSPHRASE))
        .await
        .unwrap_err();
    assert!(err.outcome_unknown());
    let hash = err.pending_hash().unwrap();

    // Checking by hash finds the transaction the node did receive.
    chain.mine();
    let status = engine.status(Network::Testnet, hash, false).await.unwrap();
    assert_eq!(status.block_number, Some(1));
}

#[tokio::test]
async fn test_engine_reports_rejection() {
    let dir = TempDir::new().unwrap();
    let chain = Arc::new(funded_chain(Network::Testnet));
    chain.push_fault(SendFault::Reject("insufficient funds".to_string()));
    let engine = engine_with_wallet(&dir, chain);

    let err = engine
        .transfer(Network::Testnet, RECIPIENT, "1", &secret(PASSPHRASE))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::BroadcastRejected(_)));
    assert!(!err.outcome_unknown());
}

#[test]
fn test_signed_fields() {
    let tx = signed_transfer(Network::Mainnet, 3);
    assert_eq!(tx.chain_id(), ChainId(30));
    assert_eq!(tx.from(), test_address());
    assert_ne!(tx.from(), Address::ZERO);
    assert!(tx.r() > U256::ZERO);
}
