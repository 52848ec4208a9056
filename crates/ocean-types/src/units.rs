//! Integer currency arithmetic on top of [`Decimal`].
//!
//! Every balance, share, and fee is a whole number of base units. Values
//! are carried as [`Decimal`] so they serialize as strings and never touch
//! floating point. Basis-point and divisor math can produce fractions;
//! those are always floored, so fees and rewards never exceed what the
//! formula allows.

use rust_decimal::Decimal;

/// Denominator for basis-point percentages (100% = 10,000 bps).
pub const BPS_DENOMINATOR: u32 = 10_000;

/// Whether `amount` is a non-negative whole number of base units.
pub fn is_whole_units(amount: Decimal) -> bool {
    !amount.is_sign_negative() && amount.fract().is_zero()
}

/// Whether `amount` is a strictly positive whole number of base units.
pub fn is_positive_units(amount: Decimal) -> bool {
    is_whole_units(amount) && !amount.is_zero()
}

/// Take `bps` basis points of `amount`, rounded down.
///
/// Returns `None` on overflow.
pub fn apply_bps(amount: Decimal, bps: u32) -> Option<Decimal> {
    amount
        .checked_mul(Decimal::from(bps))?
        .checked_div(Decimal::from(BPS_DENOMINATOR))
        .map(|v| v.floor())
}

/// Divide `amount` by `divisor`, rounded down.
///
/// Returns `None` when `divisor` is zero.
pub fn div_floor(amount: Decimal, divisor: u32) -> Option<Decimal> {
    if divisor == 0 {
        return None;
    }
    amount.checked_div(Decimal::from(divisor)).map(|v| v.floor())
}

/// Convert a configured unit count into a [`Decimal`].
pub fn units(value: u64) -> Decimal {
    Decimal::from(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_units_reject_fractions_and_negatives() {
        assert!(is_whole_units(Decimal::new(20_000_000, 0)));
        assert!(is_whole_units(Decimal::ZERO));
        assert!(!is_whole_units(Decimal::new(15, 1)));
        assert!(!is_whole_units(Decimal::new(-5, 0)));
        assert!(!is_positive_units(Decimal::ZERO));
    }

    #[test]
    fn bps_rounds_down() {
        // 10% of 9,000,000
        assert_eq!(
            apply_bps(units(9_000_000), 1_000),
            Some(units(900_000))
        );
        // 10% of 15 is 1.5 -> 1
        assert_eq!(apply_bps(units(15), 1_000), Some(units(1)));
    }

    #[test]
    fn div_floor_handles_zero_divisor() {
        assert_eq!(div_floor(units(20_000_000), 10), Some(units(2_000_000)));
        assert_eq!(div_floor(units(7), 2), Some(units(3)));
        assert_eq!(div_floor(units(7), 0), None);
    }
}
