use alloy_primitives::U256;
use alloy_primitives::utils::format_units;

/// Every amount is scaled as an 18-decimal token before pricing
pub const DEFAULT_DECIMALS: u8 = 18;

/// Scale a raw token amount down to a decimal value
pub fn to_decimal(amount: U256) -> f64 {
    format_units(amount, DEFAULT_DECIMALS)
        .ok()
        .and_then(|formatted| formatted.parse::<f64>().ok())
        .unwrap_or(f64::NAN)
}

/// Price of the non-reference side expressed in the reference side:
/// `reference_reserve / token_reserve`. `None` when the pool is empty.
pub fn price_ratio(reference_reserve: f64, token_reserve: f64) -> Option<f64> {
    if token_reserve > 0.0 && reference_reserve.is_finite() {
        Some(reference_reserve / token_reserve)
    } else {
        None
    }
}

pub fn total_value_locked(price0: f64, reserve0: f64, price1: f64, reserve1: f64) -> f64 {
    price0 * reserve0 + price1 * reserve1
}
