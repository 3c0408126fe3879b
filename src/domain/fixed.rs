//! Fixed-point (1e8) codec for on-chain amounts.
//!
//! The chain program and the backend API exchange all monetary values as
//! integers scaled by 100_000_000. User-facing amounts are `Decimal`;
//! encoding floors toward zero, matching the original contract tooling.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use thiserror::Error;

/// Scale factor for fixed-point amounts (1e8).
pub const SCALE: u64 = 100_000_000;

/// Errors from fixed-point conversion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FixedPointError {
    /// Negative amounts cannot be encoded as u64 arguments.
    #[error("amount must not be negative: {0}")]
    Negative(Decimal),
    /// Scaled value exceeds the u64 range.
    #[error("amount overflows fixed-point range: {0}")]
    Overflow(Decimal),
    /// Backend-supplied fixed-point string failed to parse.
    #[error("malformed fixed-point value: {0:?}")]
    Malformed(String),
}

/// Encode a decimal amount as a 1e8 fixed-point integer.
///
/// Floors fractional sub-units below 1e-8, so `0.123456789` encodes
/// as `12345678`.
pub fn to_fixed(value: Decimal) -> Result<u64, FixedPointError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(FixedPointError::Negative(value));
    }
    let scaled = value
        .checked_mul(Decimal::from(SCALE))
        .ok_or(FixedPointError::Overflow(value))?;
    scaled
        .floor()
        .to_u64()
        .ok_or(FixedPointError::Overflow(value))
}

/// Decode a 1e8 fixed-point integer back to a decimal amount.
pub fn from_fixed(raw: u64) -> Decimal {
    Decimal::from(raw) / Decimal::from(SCALE)
}

/// Decode a signed fixed-point integer (PnL and funding can be negative).
pub fn from_fixed_signed(raw: i64) -> Decimal {
    Decimal::from(raw) / Decimal::from(SCALE)
}

/// Parse a backend-supplied fixed-point string into a decimal amount.
///
/// The backend serializes every scaled field as a string to avoid JSON
/// number precision loss.
pub fn parse_fixed(raw: &str) -> Result<Decimal, FixedPointError> {
    let units: i64 = raw
        .trim()
        .parse()
        .map_err(|_| FixedPointError::Malformed(raw.to_string()))?;
    Ok(from_fixed_signed(units))
}

/// Encode a decimal amount directly as the string form used in
/// entry-function argument lists.
pub fn to_fixed_string(value: Decimal) -> Result<String, FixedPointError> {
    Ok(to_fixed(value)?.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_encode_worked_example() {
        // leverage 10 => 1_000_000_000
        assert_eq!(to_fixed(dec!(10)).unwrap(), 1_000_000_000);
        assert_eq!(to_fixed(dec!(100)).unwrap(), 10_000_000_000);
    }

    #[test]
    fn test_encode_floors_sub_units() {
        assert_eq!(to_fixed(dec!(0.123456789)).unwrap(), 12_345_678);
    }

    #[test]
    fn test_decode_round_trip() {
        let amount = dec!(1234.56789);
        let raw = to_fixed(amount).unwrap();
        assert_eq!(from_fixed(raw), amount);
    }

    #[test]
    fn test_negative_rejected() {
        assert_eq!(
            to_fixed(dec!(-1)),
            Err(FixedPointError::Negative(dec!(-1)))
        );
    }

    #[test]
    fn test_parse_fixed_signed() {
        assert_eq!(parse_fixed("1000000000").unwrap(), dec!(10));
        assert_eq!(parse_fixed("-500000").unwrap(), dec!(-0.005));
        assert!(parse_fixed("not-a-number").is_err());
    }

    #[test]
    fn test_zero_is_fine() {
        assert_eq!(to_fixed(Decimal::ZERO).unwrap(), 0);
        assert_eq!(from_fixed(0), Decimal::ZERO);
    }
}
