//! Transfer construction from user intent plus live chain state.
//!
//! # Responsibilities
//! - Validate recipient and amount before any I/O
//! - Resolve nonce, gas price and gas limit from the node
//! - Refuse transfers the balance cannot cover

use alloy::consensus::{SignableTransaction, TxLegacy};
use alloy::primitives::{Address, Bytes, TxKind, B256, U256};

use crate::blockchain::client::ChainClient;
use crate::blockchain::types::{ChainId, GasEstimateRequest, Network, TRANSFER_GAS};
use crate::blockchain::units::parse_rbtc;
use crate::config::TransactionConfig;
use crate::error::{EngineError, EngineResult};

const WEI_PER_GWEI: u128 = 1_000_000_000;

/// A fully resolved legacy (EIP-155) transfer, ready for signing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTransaction {
    pub to: Address,
    /// Amount in wei.
    pub value: U256,
    pub nonce: u64,
    /// Gas price in wei.
    pub gas_price: u128,
    pub gas_limit: u64,
    pub chain_id: ChainId,
    pub data: Bytes,
}

impl UnsignedTransaction {
    /// `value + gas_price * gas_limit`, the most this transaction can debit.
    pub fn max_cost(&self) -> U256 {
        self.value
            .saturating_add(U256::from(self.gas_price).saturating_mul(U256::from(self.gas_limit)))
    }

    pub fn to_legacy(&self) -> TxLegacy {
        TxLegacy {
            chain_id: Some(self.chain_id.0),
            nonce: self.nonce,
            gas_price: self.gas_price,
            gas_limit: self.gas_limit,
            to: TxKind::Call(self.to),
            value: self.value,
            input: self.data.clone(),
        }
    }

    /// EIP-155 signing hash.
    pub fn signing_hash(&self) -> B256 {
        self.to_legacy().signature_hash()
    }
}

/// Parse a recipient address: optional `0x`, exactly 40 hex digits, not the
/// zero address. Mixed case is accepted without checksum validation since
/// Rootstock checksums (EIP-1191) differ from Ethereum's.
pub fn parse_recipient(input: &str) -> EngineResult<Address> {
    let trimmed = input.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if digits.len() != 40 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(EngineError::InvalidAddress(format!(
            "'{}': expected 40 hexadecimal characters",
            input
        )));
    }

    let mut bytes = [0u8; 20];
    hex::decode_to_slice(digits, &mut bytes)
        .map_err(|e| EngineError::InvalidAddress(format!("'{}': {}", input, e)))?;
    let address = Address::from(bytes);
    if address.is_zero() {
        return Err(EngineError::InvalidAddress(
            "refusing to send to the zero address".to_string(),
        ));
    }
    Ok(address)
}

/// Apply floor, multiplier and ceiling to the node's gas price.
pub fn resolve_gas_price(node_price: u128, config: &TransactionConfig) -> EngineResult<u128> {
    let floored = node_price.max(config.min_gas_price_wei);

    // Basis points keep the arithmetic integral.
    let multiplier_bps = (config.gas_price_multiplier * 10_000.0).round() as u128;
    let adjusted = floored.saturating_mul(multiplier_bps) / 10_000;

    let max_wei = u128::from(config.max_gas_price_gwei).saturating_mul(WEI_PER_GWEI);
    if adjusted > max_wei {
        return Err(EngineError::GasPriceTooHigh {
            current_gwei: adjusted / WEI_PER_GWEI,
            max_gwei: config.max_gas_price_gwei,
        });
    }
    Ok(adjusted)
}

/// Builds transfers against a single network's client.
pub struct TransactionBuilder<'a> {
    client: &'a dyn ChainClient,
    config: &'a TransactionConfig,
}

impl<'a> TransactionBuilder<'a> {
    pub fn new(client: &'a dyn ChainClient, config: &'a TransactionConfig) -> Self {
        Self { client, config }
    }

    /// Validate `recipient` and `amount`, then resolve the rest from the
    /// chain.
    pub async fn build(
        &self,
        sender: Address,
        recipient: &str,
        amount: &str,
        network: Network,
    ) -> EngineResult<UnsignedTransaction> {
        let to = parse_recipient(recipient)?;
        let value = parse_rbtc(amount)?;
        self.build_transfer(sender, to, value, network).await
    }

    /// Resolve nonce, gas and balance for an already validated transfer.
    pub async fn build_transfer(
        &self,
        sender: Address,
        to: Address,
        value: U256,
        network: Network,
    ) -> EngineResult<UnsignedTransaction> {
        let chain_id = network.chain_id();
        let client_chain_id = self.client.network().chain_id();
        if client_chain_id != chain_id {
            return Err(EngineError::ChainMismatch {
                expected: chain_id.0,
                actual: client_chain_id.0,
            });
        }

        let (balance, node_gas_price, node_chain_id) = tokio::try_join!(
            self.client.get_balance(sender),
            self.client.get_gas_price(),
            self.client.get_chain_id()
        )?;
        if node_chain_id != chain_id {
            return Err(EngineError::ChainMismatch {
                expected: chain_id.0,
                actual: node_chain_id.0,
            });
        }

        let gas_price = resolve_gas_price(node_gas_price, self.config)?;
        let gas_limit = self.resolve_gas_limit(sender, to, value).await;
        let nonce = self.client.get_transaction_count(sender).await?;

        let tx = UnsignedTransaction {
            to,
            value,
            nonce,
            gas_price,
            gas_limit,
            chain_id,
            data: Bytes::new(),
        };

        let required = tx.max_cost();
        if required > balance {
            return Err(EngineError::InsufficientFunds {
                required,
                available: balance,
            });
        }

        tracing::debug!(
            network = %network,
            from = %sender,
            to = %to,
            nonce,
            gas_price,
            gas_limit,
            "Transfer built"
        );
        Ok(tx)
    }

    async fn resolve_gas_limit(&self, from: Address, to: Address, value: U256) -> u64 {
        let request = GasEstimateRequest { from, to, value };
        match self.client.estimate_gas(request).await {
            Ok(estimate) => estimate.max(TRANSFER_GAS),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    fallback = self.config.transfer_gas_limit,
                    "Gas estimation failed, using configured transfer limit"
                );
                self.config.transfer_gas_limit
            }
        }
    }
}
