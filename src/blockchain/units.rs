//! rBTC amount parsing and formatting (18 decimals).

use alloy::primitives::U256;

use crate::error::{EngineError, EngineResult};

/// Decimal places of the native coin.
pub const RBTC_DECIMALS: usize = 18;

/// Parse a decimal rBTC amount such as `"1"`, `"0.5"` or `"1.000000000000000001"`
/// into wei. Signs, exponents, separators and zero are rejected.
pub fn parse_rbtc(input: &str) -> EngineResult<U256> {
    let invalid = |reason: &str| EngineError::InvalidAmount(format!("'{}': {}", input, reason));

    let trimmed = input.trim();
    let (whole, fraction) = match trimmed.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (trimmed, ""),
    };

    if whole.is_empty() || (trimmed.contains('.') && fraction.is_empty()) {
        return Err(invalid("expected a decimal number"));
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !fraction.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(invalid("expected a decimal number"));
    }
    if fraction.len() > RBTC_DECIMALS {
        return Err(invalid("more than 18 decimal places"));
    }

    let scale = U256::from(10u64).pow(U256::from(RBTC_DECIMALS));
    let whole_wei = U256::from_str_radix(whole, 10)
        .ok()
        .and_then(|w| w.checked_mul(scale))
        .ok_or_else(|| invalid("too large"))?;

    let padded = format!("{:0<width$}", fraction, width = RBTC_DECIMALS);
    let fraction_wei =
        U256::from_str_radix(&padded, 10).map_err(|_| invalid("expected a decimal number"))?;

    let wei = whole_wei
        .checked_add(fraction_wei)
        .ok_or_else(|| invalid("too large"))?;
    if wei.is_zero() {
        return Err(invalid("must be greater than zero"));
    }
    Ok(wei)
}

/// Format wei as rBTC without trailing zeros.
pub fn format_rbtc(wei: U256) -> String {
    let digits = wei.to_string();
    let (whole, fraction) = if digits.len() > RBTC_DECIMALS {
        let split = digits.len() - RBTC_DECIMALS;
        (digits[..split].to_string(), digits[split..].to_string())
    } else {
        (
            "0".to_string(),
            format!("{:0>width$}", digits, width = RBTC_DECIMALS),
        )
    };

    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        whole
    } else {
        format!("{}.{}", whole, fraction)
    }
}
