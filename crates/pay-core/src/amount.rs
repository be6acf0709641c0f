//! # Amount Normalization
//!
//! Converts decimal currency amounts into the integer minor-unit values the
//! gateway expects. Arithmetic stays in `Decimal` so `19.99` is always `1999`.

use crate::error::{PaymentError, PaymentResult};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Currencies with no minor unit: one whole unit is the smallest amount.
///
/// `PYGI` is accepted alongside `PYG` because stored payment data written by
/// older checkouts uses it.
pub const ZERO_DECIMAL_CURRENCIES: &[&str] = &[
    "MGA", "BIF", "PYG", "PYGI", "XAF", "XPF", "CLP", "KMF", "RWF", "DJF", "KRW", "GNF", "JPY",
    "VUV", "VND", "XOF",
];

/// Currency used when a payment carries an empty currency code
pub const DEFAULT_CURRENCY: &str = "usd";

/// Returns true if the currency has no minor unit (case-insensitive)
pub fn is_zero_decimal(currency: &str) -> bool {
    let code = currency.trim().to_uppercase();
    ZERO_DECIMAL_CURRENCIES.contains(&code.as_str())
}

/// Convert a decimal amount into gateway minor units.
///
/// Zero-decimal currencies are rounded to whole units, everything else is
/// multiplied by 100 first. Halves round away from zero.
pub fn normalize(amount: Decimal, currency: &str) -> PaymentResult<i64> {
    let scaled = if is_zero_decimal(currency) {
        amount
    } else {
        amount
            .checked_mul(Decimal::ONE_HUNDRED)
            .ok_or_else(|| PaymentError::InvalidAmount {
                message: format!("{amount} {currency} overflows minor units"),
            })?
    };

    scaled
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or_else(|| PaymentError::InvalidAmount {
            message: format!("{amount} {currency} does not fit the gateway amount field"),
        })
}

/// Lowercased currency code, falling back to [`DEFAULT_CURRENCY`]
pub fn currency_or_default(currency: &str) -> String {
    let code = currency.trim().to_lowercase();
    if code.is_empty() {
        DEFAULT_CURRENCY.to_string()
    } else {
        code
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_two_decimal_currency() {
        assert_eq!(normalize(dec!(19.99), "usd").unwrap(), 1999);
        assert_eq!(normalize(dec!(10), "AUD").unwrap(), 1000);
        assert_eq!(normalize(dec!(0.01), "eur").unwrap(), 1);
    }

    #[test]
    fn test_zero_decimal_currency() {
        assert_eq!(normalize(dec!(500), "JPY").unwrap(), 500);
        assert_eq!(normalize(dec!(500), "jpy").unwrap(), 500);
        assert_eq!(normalize(dec!(1500.4), "KRW").unwrap(), 1500);
        assert_eq!(normalize(dec!(1500.5), "vnd").unwrap(), 1501);
    }

    #[test]
    fn test_rounding_is_exact() {
        // 0.1 + 0.2 style drift must not leak through
        assert_eq!(normalize(dec!(0.1) + dec!(0.2), "usd").unwrap(), 30);
        assert_eq!(normalize(dec!(1.005), "usd").unwrap(), 101);
        assert_eq!(normalize(dec!(1.004), "usd").unwrap(), 100);
    }

    #[test]
    fn test_zero_decimal_set() {
        for code in ZERO_DECIMAL_CURRENCIES {
            assert!(is_zero_decimal(code));
            assert!(is_zero_decimal(&code.to_lowercase()));
        }
        assert!(!is_zero_decimal("usd"));
        assert!(!is_zero_decimal(""));
    }

    #[test]
    fn test_overflow_is_an_error() {
        let err = normalize(Decimal::MAX, "usd").unwrap_err();
        assert!(matches!(err, PaymentError::InvalidAmount { .. }));
    }

    #[test]
    fn test_currency_default() {
        assert_eq!(currency_or_default("AUD"), "aud");
        assert_eq!(currency_or_default(""), "usd");
    }
}
