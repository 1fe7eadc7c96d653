//! Transaction signing.
//!
//! Signatures are deterministic (RFC 6979) and low-s normalized, so the same
//! transaction and key always produce the same bytes and hash.

use alloy::consensus::{SignableTransaction, TxEnvelope};
use alloy::eips::eip2718::Encodable2718;
use alloy::primitives::{Address, Bytes, Signature, TxHash, U256};

use crate::blockchain::transaction::UnsignedTransaction;
use crate::blockchain::types::ChainId;
use crate::blockchain::wallet::Keypair;
use crate::error::{EngineError, EngineResult};

/// A signed transfer with its canonical encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedTransaction {
    tx: UnsignedTransaction,
    signature: Signature,
    from: Address,
    raw: Bytes,
    hash: TxHash,
}

impl SignedTransaction {
    pub fn transaction(&self) -> &UnsignedTransaction {
        &self.tx
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn r(&self) -> U256 {
        self.signature.r()
    }

    pub fn s(&self) -> U256 {
        self.signature.s()
    }

    /// EIP-155 `v`: `chain_id * 2 + 35 + parity`.
    pub fn v(&self) -> u64 {
        self.tx.chain_id.0 * 2 + 35 + u64::from(self.signature.v())
    }

    pub fn chain_id(&self) -> ChainId {
        self.tx.chain_id
    }

    pub fn from(&self) -> Address {
        self.from
    }

    /// Canonical EIP-2718 bytes, as passed to `eth_sendRawTransaction`.
    pub fn raw(&self) -> &Bytes {
        &self.raw
    }

    /// `keccak256(raw)`.
    pub fn hash(&self) -> TxHash {
        self.hash
    }

    /// Recover the signer from the signature over the signing hash.
    pub fn recover_signer(&self) -> EngineResult<Address> {
        self.signature
            .recover_address_from_prehash(&self.tx.signing_hash())
            .map_err(|e| EngineError::Signing(format!("signature recovery failed: {}", e)))
    }
}

/// Sign `tx` with `keypair`.
///
/// Fails if the signature does not recover to the keypair's address.
pub fn sign_transaction(
    tx: UnsignedTransaction,
    keypair: &Keypair,
) -> EngineResult<SignedTransaction> {
    let legacy = tx.to_legacy();
    let signing_hash = legacy.signature_hash();

    let signature = keypair
        .sign_hash(&signing_hash)
        .map_err(|e| EngineError::Signing(e.to_string()))?;

    let from = keypair.address();
    let recovered = signature
        .recover_address_from_prehash(&signing_hash)
        .map_err(|e| EngineError::Signing(format!("signature recovery failed: {}", e)))?;
    if recovered != from {
        return Err(EngineError::Signing(format!(
            "signature recovers to {} instead of {}",
            recovered, from
        )));
    }

    let envelope = TxEnvelope::Legacy(legacy.into_signed(signature));
    let hash = *envelope.tx_hash();
    let raw = Bytes::from(envelope.encoded_2718());

    tracing::debug!(tx_hash = %hash, from = %from, nonce = tx.nonce, "Transaction signed");

    Ok(SignedTransaction {
        tx,
        signature,
        from,
        raw,
        hash,
    })
}
