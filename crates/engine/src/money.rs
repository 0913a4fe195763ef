use std::{
    fmt,
    iter::Sum,
    ops::{Add, Sub},
};

use serde::{Deserialize, Serialize};

use crate::EngineError;

/// Money amount represented as **integer cents**.
///
/// Every receipt total, deduction target and selection sum in the engine is a
/// `MoneyCents`, so sums and the "within one cent" comparisons never suffer
/// floating-point drift.
///
/// # Examples
///
/// ```rust
/// use engine::MoneyCents;
///
/// let amount = MoneyCents::new(12_34);
/// assert_eq!(amount.cents(), 1234);
/// assert_eq!(amount.to_string(), "$12.34");
/// ```
///
/// Receipt totals are bounded, so any sum of them stays far from overflow:
///
/// ```rust
/// use engine::MoneyCents;
///
/// assert!(MoneyCents::new(24_99).ensure_receipt_total().is_ok());
/// assert!(MoneyCents::new(-1).ensure_receipt_total().is_err());
/// assert!(MoneyCents::new(i64::MAX).ensure_receipt_total().is_err());
/// ```
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
#[repr(transparent)]
pub struct MoneyCents(i64);

impl MoneyCents {
    pub const ZERO: MoneyCents = MoneyCents(0);

    /// Largest total a single receipt may carry: one billion dollars.
    pub const MAX_TOTAL: MoneyCents = MoneyCents(100_000_000_000);

    /// Creates a new amount from integer cents.
    #[must_use]
    pub const fn new(cents: i64) -> Self {
        Self(cents)
    }

    /// Returns the raw value in cents.
    #[must_use]
    pub const fn cents(self) -> i64 {
        self.0
    }

    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Returns `self` if it is a valid receipt total: not negative and not
    /// above [`MoneyCents::MAX_TOTAL`].
    pub fn ensure_receipt_total(self) -> Result<Self, EngineError> {
        if self.is_negative() {
            return Err(EngineError::InvalidAmount(format!(
                "total {self} must not be negative"
            )));
        }
        if self > Self::MAX_TOTAL {
            return Err(EngineError::InvalidAmount(format!(
                "total {self} exceeds the maximum of {}",
                Self::MAX_TOTAL
            )));
        }
        Ok(self)
    }

    /// Converts a dollar amount coming from an external JSON producer (the OCR
    /// service reports totals as plain numbers) into cents, rounding to the
    /// nearest cent.
    pub fn from_dollars(dollars: f64) -> Result<Self, EngineError> {
        if !dollars.is_finite() {
            return Err(EngineError::InvalidAmount(format!(
                "amount is not a number: {dollars}"
            )));
        }
        if dollars < 0.0 {
            return Err(EngineError::InvalidAmount(format!(
                "amount must not be negative: {dollars}"
            )));
        }
        let cents = (dollars * 100.0).round();
        if cents > Self::MAX_TOTAL.0 as f64 {
            return Err(EngineError::InvalidAmount(format!(
                "amount {dollars} exceeds the maximum of {}",
                Self::MAX_TOTAL
            )));
        }
        Ok(Self(cents as i64))
    }

    /// Absolute distance between two amounts.
    #[must_use]
    pub fn abs_diff(self, other: MoneyCents) -> MoneyCents {
        MoneyCents(self.0.abs_diff(other.0).min(i64::MAX as u64) as i64)
    }
}

impl fmt::Display for MoneyCents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let dollars = abs / 100;
        let cents = abs % 100;
        write!(f, "{sign}${dollars}.{cents:02}")
    }
}

impl Add for MoneyCents {
    type Output = MoneyCents;

    fn add(self, rhs: MoneyCents) -> Self::Output {
        MoneyCents(self.0 + rhs.0)
    }
}

impl Sub for MoneyCents {
    type Output = MoneyCents;

    fn sub(self, rhs: MoneyCents) -> Self::Output {
        MoneyCents(self.0 - rhs.0)
    }
}

impl Sum for MoneyCents {
    fn sum<I: Iterator<Item = MoneyCents>>(iter: I) -> Self {
        iter.fold(MoneyCents::ZERO, |acc, amount| acc + amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_formats_usd() {
        assert_eq!(MoneyCents::new(0).to_string(), "$0.00");
        assert_eq!(MoneyCents::new(1).to_string(), "$0.01");
        assert_eq!(MoneyCents::new(1975).to_string(), "$19.75");
        assert_eq!(MoneyCents::new(-1050).to_string(), "-$10.50");
    }

    #[test]
    fn from_dollars_rounds_to_nearest_cent() {
        assert_eq!(MoneyCents::from_dollars(24.99).unwrap().cents(), 2499);
        assert_eq!(MoneyCents::from_dollars(0.125).unwrap().cents(), 13);
        assert_eq!(MoneyCents::from_dollars(19.999).unwrap().cents(), 2000);
        assert_eq!(MoneyCents::from_dollars(0.0).unwrap(), MoneyCents::ZERO);
    }

    #[test]
    fn from_dollars_rejects_negative_and_nan() {
        assert!(MoneyCents::from_dollars(-1.0).is_err());
        assert!(MoneyCents::from_dollars(f64::NAN).is_err());
        assert!(MoneyCents::from_dollars(f64::INFINITY).is_err());
    }

    #[test]
    fn receipt_totals_are_bounded() {
        assert_eq!(
            MoneyCents::MAX_TOTAL.ensure_receipt_total(),
            Ok(MoneyCents::MAX_TOTAL)
        );
        assert!(MoneyCents::new(100_000_000_001).ensure_receipt_total().is_err());
        assert!(MoneyCents::from_dollars(1_000_000_000.0).is_ok());
        assert!(MoneyCents::from_dollars(1_000_000_000.01).is_err());
        // Saturating float conversion can no longer produce i64::MAX.
        assert!(MoneyCents::from_dollars(1e300).is_err());
    }

    #[test]
    fn sum_and_abs_diff() {
        let total: MoneyCents = [1250, 725].into_iter().map(MoneyCents::new).sum();
        assert_eq!(total, MoneyCents::new(1975));
        assert_eq!(
            MoneyCents::new(100).abs_diff(MoneyCents::new(150)),
            MoneyCents::new(50)
        );
    }
}
