//! Configuration validation.
//!
//! Serde handles syntax; this checks value ranges and URL shapes. Every
//! problem is reported, not just the first.

use std::fmt;

use crate::blockchain::types::Network;
use crate::config::schema::WalletConfig;
use crate::keystore::kdf::{MAX_M_COST, MAX_P_COST, MAX_T_COST};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field, e.g. `testnet.rpc_url`.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &WalletConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for network in [Network::Mainnet, Network::Testnet] {
        let net = config.network(network);
        check_url(&mut errors, format!("{}.rpc_url", network), net.rpc_url(network));
        for (i, url) in net.failover_urls.iter().enumerate() {
            check_url(&mut errors, format!("{}.failover_urls[{}]", network, i), url);
        }
        if net.rpc_timeout_secs == 0 {
            errors.push(ValidationError::new(
                format!("{}.rpc_timeout_secs", network),
                "must be greater than 0",
            ));
        }
    }

    let ks = &config.keystore;
    if !(1..=MAX_T_COST).contains(&ks.t_cost) {
        errors.push(ValidationError::new(
            "keystore.t_cost",
            format!("must be between 1 and {}", MAX_T_COST),
        ));
    }
    if !(1..=MAX_P_COST).contains(&ks.p_cost) {
        errors.push(ValidationError::new(
            "keystore.p_cost",
            format!("must be between 1 and {}", MAX_P_COST),
        ));
    }
    // Argon2 requires m_cost >= 8 * p_cost.
    let min_m_cost = ks.p_cost.clamp(1, MAX_P_COST) * 8;
    if !(min_m_cost..=MAX_M_COST).contains(&ks.m_cost) {
        errors.push(ValidationError::new(
            "keystore.m_cost",
            format!("must be between {} (8 * p_cost) and {} KiB", min_m_cost, MAX_M_COST),
        ));
    }

    let tx = &config.transactions;
    if !(tx.gas_price_multiplier.is_finite() && tx.gas_price_multiplier >= 1.0) {
        errors.push(ValidationError::new(
            "transactions.gas_price_multiplier",
            "must be a finite value >= 1.0",
        ));
    }
    if tx.max_gas_price_gwei == 0 {
        errors.push(ValidationError::new(
            "transactions.max_gas_price_gwei",
            "must be greater than 0",
        ));
    }
    if tx.transfer_gas_limit < crate::blockchain::types::TRANSFER_GAS {
        errors.push(ValidationError::new(
            "transactions.transfer_gas_limit",
            "must be at least 21000",
        ));
    }

    if config.broadcast.max_attempts == 0 {
        errors.push(ValidationError::new("broadcast.max_attempts", "must be at least 1"));
    }
    if config.status.max_attempts == 0 {
        errors.push(ValidationError::new("status.max_attempts", "must be at least 1"));
    }
    if config.status.base_delay_ms > config.status.max_delay_ms {
        errors.push(ValidationError::new(
            "status.base_delay_ms",
            "must not exceed status.max_delay_ms",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_url(errors: &mut Vec<ValidationError>, field: String, value: &str) {
    match url::Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => errors.push(ValidationError::new(
            field,
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new(field, format!("invalid URL: {}", e))),
    }
}
