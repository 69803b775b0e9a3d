use std::{
    fmt,
    iter::Sum,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};

/// Signed money amount represented as **integer cents**.
///
/// Use this type for **all** monetary values in the engine (balances, debt
/// records, settlement amounts) to avoid floating-point drift. Amounts are
/// already normalized to the ledger unit, so no currency is attached.
///
/// The value is signed. For member balances:
/// - positive = the member owes the group
/// - negative = the group owes the member
///
/// # Examples
///
/// ```rust
/// use engine::MoneyCents;
///
/// let amount = MoneyCents::new(12_34);
/// assert_eq!(amount.cents(), 1234);
/// assert_eq!(amount.to_string(), "12.34");
/// ```
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
#[repr(transparent)]
pub struct MoneyCents(i64);

/// Smallest amount that is considered real money (one cent, `0.01`).
///
/// Balances whose magnitude is below this are rounding noise and never
/// produce a settlement.
pub const EPSILON: MoneyCents = MoneyCents(1);

impl MoneyCents {
    pub const ZERO: MoneyCents = MoneyCents(0);

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

    /// Returns `true` if the amount is 0.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if the amount is positive.
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Returns `true` if the amount is negative.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Absolute value.
    #[must_use]
    pub const fn abs(self) -> Self {
        Self(self.0.abs())
    }

    /// Returns `true` when the magnitude is at least [`EPSILON`].
    #[must_use]
    pub const fn is_significant(self) -> bool {
        self.0.abs() >= EPSILON.0
    }

    /// Checked addition (returns `None` on overflow).
    #[must_use]
    pub fn checked_add(self, rhs: MoneyCents) -> Option<MoneyCents> {
        self.0.checked_add(rhs.0).map(MoneyCents)
    }

    /// Checked subtraction (returns `None` on overflow).
    #[must_use]
    pub fn checked_sub(self, rhs: MoneyCents) -> Option<MoneyCents> {
        self.0.checked_sub(rhs.0).map(MoneyCents)
    }

    /// Splits the amount into `parts` shares that sum back to `self` exactly.
    ///
    /// Every share gets `self / parts`; the remainder cents go one each to the
    /// leading shares, so a 100 split three ways is `[34, 33, 33]`. Returns an
    /// empty vector when `parts == 0`.
    #[must_use]
    pub fn split_evenly(self, parts: usize) -> Vec<MoneyCents> {
        if parts == 0 {
            return Vec::new();
        }
        let parts_i64 = parts as i64;
        let base = self.0 / parts_i64;
        let remainder = self.0 % parts_i64;
        let step = remainder.signum();
        let extra = remainder.unsigned_abs() as usize;
        (0..parts)
            .map(|idx| {
                if idx < extra {
                    MoneyCents(base + step)
                } else {
                    MoneyCents(base)
                }
            })
            .collect()
    }
}

impl fmt::Display for MoneyCents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let units = abs / 100;
        let cents = abs % 100;
        write!(f, "{sign}{units}.{cents:02}")
    }
}

impl From<i64> for MoneyCents {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<MoneyCents> for i64 {
    fn from(value: MoneyCents) -> Self {
        value.0
    }
}

impl Add for MoneyCents {
    type Output = MoneyCents;

    fn add(self, rhs: MoneyCents) -> Self::Output {
        MoneyCents(self.0 + rhs.0)
    }
}

impl AddAssign for MoneyCents {
    fn add_assign(&mut self, rhs: MoneyCents) {
        self.0 += rhs.0;
    }
}

impl Sub for MoneyCents {
    type Output = MoneyCents;

    fn sub(self, rhs: MoneyCents) -> Self::Output {
        MoneyCents(self.0 - rhs.0)
    }
}

impl SubAssign for MoneyCents {
    fn sub_assign(&mut self, rhs: MoneyCents) {
        self.0 -= rhs.0;
    }
}

impl Neg for MoneyCents {
    type Output = MoneyCents;

    fn neg(self) -> Self::Output {
        MoneyCents(-self.0)
    }
}

impl Sum for MoneyCents {
    fn sum<I: Iterator<Item = MoneyCents>>(iter: I) -> Self {
        iter.fold(MoneyCents::ZERO, |acc, value| acc + value)
    }
}

impl<'a> Sum<&'a MoneyCents> for MoneyCents {
    fn sum<I: Iterator<Item = &'a MoneyCents>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_formats_two_decimals() {
        assert_eq!(MoneyCents::new(0).to_string(), "0.00");
        assert_eq!(MoneyCents::new(1).to_string(), "0.01");
        assert_eq!(MoneyCents::new(10).to_string(), "0.10");
        assert_eq!(MoneyCents::new(1050).to_string(), "10.50");
        assert_eq!(MoneyCents::new(-1050).to_string(), "-10.50");
    }

    #[test]
    fn split_evenly_hands_remainder_to_leading_shares() {
        let shares = MoneyCents::new(100).split_evenly(3);
        assert_eq!(
            shares,
            vec![MoneyCents::new(34), MoneyCents::new(33), MoneyCents::new(33)]
        );
        assert_eq!(shares.iter().sum::<MoneyCents>(), MoneyCents::new(100));
    }

    #[test]
    fn split_evenly_handles_negative_and_zero_parts() {
        let shares = MoneyCents::new(-100).split_evenly(3);
        assert_eq!(shares.iter().sum::<MoneyCents>(), MoneyCents::new(-100));
        assert!(MoneyCents::new(500).split_evenly(0).is_empty());
    }

    #[test]
    fn epsilon_is_one_cent() {
        assert!(!MoneyCents::ZERO.is_significant());
        assert!(MoneyCents::new(1).is_significant());
        assert!(MoneyCents::new(-1).is_significant());
    }
}
