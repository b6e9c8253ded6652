//! Fixed-point conversion helpers.
//!
//! Raw on-chain amounts are unsigned integers at a token's native decimal
//! precision. Everything here converts them to `BigDecimal` and truncates
//! toward zero — excess precision is discarded, never rounded up.

use alloy::primitives::U256;
use bigdecimal::num_bigint::{BigInt, Sign};
use bigdecimal::{BigDecimal, One, RoundingMode};

/// Decimal precision of cToken receipt tokens (the Compound convention).
pub const RECEIPT_TOKEN_DECIMALS: u32 = 8;

/// 10^decimals as a `BigDecimal`.
pub fn exponent_to_big_decimal(decimals: u32) -> BigDecimal {
    let mut result = BigDecimal::one();
    let ten = BigDecimal::from(10);
    for _ in 0..decimals {
        result = result * &ten;
    }
    result
}

/// Exact conversion of an unsigned 256-bit integer.
pub fn big_decimal_from_u256(value: &U256) -> BigDecimal {
    let int = BigInt::from_bytes_be(Sign::Plus, &value.to_be_bytes::<32>());
    BigDecimal::from(int)
}

/// Truncate toward zero to at most `decimals` fractional digits.
pub fn truncate(value: &BigDecimal, decimals: u32) -> BigDecimal {
    value.with_scale_round(i64::from(decimals), RoundingMode::Down)
}

/// Convert a raw integer amount to a decimal at `decimals` precision:
/// divide by 10^decimals, then truncate to `decimals` places.
pub fn scale_down(raw: &U256, decimals: u32) -> BigDecimal {
    let scaled = big_decimal_from_u256(raw) / exponent_to_big_decimal(decimals);
    truncate(&scaled, decimals)
}
