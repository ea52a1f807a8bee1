//! Fixed-point monetary arithmetic.
//!
//! All monetary amounts (prices, costs, tax, totals, valuation) use
//! `rust_decimal::Decimal`. Floating point is never used for money.

use rust_decimal::{Decimal, RoundingStrategy};

/// Round a monetary amount to 2 decimal places (half away from zero, the
/// convention used on GST invoices).
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Apply a percentage rate (e.g. `9` for 9%) to an amount, rounded to money.
pub fn percent_of(amount: Decimal, rate: Decimal) -> Decimal {
    round_money(amount * rate / Decimal::ONE_HUNDRED)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn rounds_midpoints_away_from_zero() {
        assert_eq!(round_money(d("1.005")), d("1.01"));
        assert_eq!(round_money(d("-1.005")), d("-1.01"));
        assert_eq!(round_money(d("2.344")), d("2.34"));
    }

    #[test]
    fn percent_of_computes_gst_components() {
        // 9% CGST on 250.00
        assert_eq!(percent_of(d("250.00"), d("9")), d("22.50"));
        // 2.5% on 99.99 rounds at the second decimal
        assert_eq!(percent_of(d("99.99"), d("2.5")), d("2.50"));
    }
}
