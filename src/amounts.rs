//! Wei arithmetic, unit conversion and gas tables shared by the tools

use once_cell::sync::Lazy;
use serde_json::Value;
use std::collections::HashMap;

use crate::error::{ToolError, ToolResult};

pub const WEI_PER_GWEI: u128 = 1_000_000_000;
pub const WEI_PER_ETH: u128 = 1_000_000_000_000_000_000;

/// Decimals assumed for tokens not in [`TOKEN_DECIMALS`]
pub const DEFAULT_DECIMALS: u32 = 18;

/// Gas assumed for actions not in [`ACTION_GAS`]
pub const DEFAULT_ACTION_GAS: u64 = 200_000;

/// ETH price used for rough USD estimates
pub const ASSUMED_ETH_PRICE_USD: f64 = 2000.0;

static TOKEN_DECIMALS: Lazy<HashMap<&'static str, u32>> =
    Lazy::new(|| HashMap::from([("USDC", 6), ("USDT", 6), ("DAI", 18), ("ETH", 18)]));

static ACTION_GAS: Lazy<HashMap<&'static str, u64>> = Lazy::new(|| {
    HashMap::from([
        ("shield", 200_000),
        ("unshield", 180_000),
        ("swap", 300_000),
        ("send", 150_000),
        ("private_send", 180_000),
    ])
});

pub fn token_decimals(symbol: &str) -> u32 {
    TOKEN_DECIMALS
        .get(symbol.to_ascii_uppercase().as_str())
        .copied()
        .unwrap_or(DEFAULT_DECIMALS)
}

/// Typical gas used by an action (case-insensitive)
pub fn action_gas(action: &str) -> u64 {
    ACTION_GAS
        .get(action.to_ascii_lowercase().as_str())
        .copied()
        .unwrap_or(DEFAULT_ACTION_GAS)
}

pub fn parse_wei(raw: &str) -> ToolResult<u128> {
    raw.trim()
        .parse::<u128>()
        .map_err(|_| ToolError::invalid_params(format!("Invalid wei amount: '{}'", raw)))
}

/// Read an integer amount the API may send as a string or a number.
///
/// Non-integral numbers are truncated toward zero.
pub fn value_to_wei(value: &Value) -> Option<u128> {
    match value {
        Value::String(s) => s.trim().parse::<u128>().ok().or_else(|| {
            s.trim()
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite() && *f >= 0.0)
                .map(|f| f as u128)
        }),
        Value::Number(n) => n
            .as_u64()
            .map(u128::from)
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u128)),
        _ => None,
    }
}

/// Like [`value_to_wei`] but a missing or unreadable value is a decode error
pub fn require_wei(value: &Value, what: &str) -> ToolResult<u128> {
    value_to_wei(value).ok_or_else(|| ToolError::decode(format!("invalid {}: {}", what, value)))
}

/// Convert a human amount like `"12.5"` into base units with exact decimal arithmetic.
///
/// Digits beyond `decimals` are dropped.
pub fn parse_units(amount: &str, decimals: u32) -> ToolResult<u128> {
    let invalid = || ToolError::invalid_params(format!("Invalid amount: '{}'", amount));

    let amount = amount.trim();
    let (whole, fraction) = amount.split_once('.').unwrap_or((amount, ""));
    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid());
    }
    if !whole.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }

    let scale = 10u128.checked_pow(decimals).ok_or_else(invalid)?;
    let whole: u128 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| invalid())?
    };

    let kept: String = fraction.chars().take(decimals as usize).collect();
    let fraction: u128 = if kept.is_empty() {
        0
    } else {
        let padding = 10u128.pow(decimals - kept.len() as u32);
        kept.parse::<u128>().map_err(|_| invalid())? * padding
    };

    whole
        .checked_mul(scale)
        .and_then(|w| w.checked_add(fraction))
        .ok_or_else(invalid)
}

/// Base units to a floating point display value
pub fn format_units(amount: u128, decimals: u32) -> f64 {
    amount as f64 / 10f64.powi(decimals as i32)
}

pub fn wei_to_eth(wei: u128) -> f64 {
    format_units(wei, 18)
}

pub fn wei_to_gwei(wei: u128) -> f64 {
    wei as f64 / WEI_PER_GWEI as f64
}

/// Split `total` evenly across `parts` recipients.
///
/// Each share is `total / parts` rounded down; the remainder is not distributed.
pub fn split_equal(total: u128, parts: usize) -> ToolResult<Vec<u128>> {
    if parts == 0 {
        return Err(ToolError::invalid_params(
            "At least one destination wallet is required",
        ));
    }
    let share = total / parts as u128;
    Ok(vec![share; parts])
}
