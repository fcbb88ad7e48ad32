use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;
use thiserror::Error;

/// Number of fractional digits every [`Money`] value carries.
pub const SCALE: u32 = 2;

/// Errors arising from parsing or constructing amounts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("`{0}` is not a valid amount")]
    Parse(String),
    #[error("{0} exceeds the largest supported amount {max}", max = Money::MAX)]
    OutOfRange(Decimal),
}

/// A fixed-precision monetary amount with exactly two fractional digits.
///
/// All ledger arithmetic runs on this type, so sums of allocations and
/// settlement payments are exact. Dividing an amount never loses a unit:
/// [`Money::split_evenly`] hands the leftover smallest units out one by one.
///
/// # Examples
///
/// ```
/// use splitter::core::money::Money;
/// use rust_decimal_macros::dec;
///
/// let pot = Money::from_decimal(dec!(10));
/// let shares = pot.split_evenly(3);
/// assert_eq!(shares, vec![
///     Money::from_cents(334),
///     Money::from_cents(333),
///     Money::from_cents(333),
/// ]);
/// assert_eq!(shares.into_iter().sum::<Money>(), pot);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::from_parts(0, 0, 0, false, SCALE));

    /// Largest magnitude accepted from outside: 999,999,999,999,999.99.
    pub const MAX: Money = Money(Decimal::from_parts(0x5d89_ffff, 0x0163_4578, 0, false, SCALE));

    /// Build an amount from an arbitrary decimal, rounding half away from zero
    /// to two fractional digits.
    ///
    /// Meant for values already known to be in range; use
    /// [`Money::try_from_decimal`] for anything coming from a user.
    pub fn from_decimal(amount: Decimal) -> Self {
        let mut value = amount.round_dp_with_strategy(SCALE, RoundingStrategy::MidpointAwayFromZero);
        value.rescale(SCALE);
        Self(value)
    }

    /// Like [`Money::from_decimal`], but rejects magnitudes above [`Money::MAX`].
    pub fn try_from_decimal(amount: Decimal) -> Result<Self, MoneyError> {
        let rounded = amount.round_dp_with_strategy(SCALE, RoundingStrategy::MidpointAwayFromZero);
        if rounded.abs() > Self::MAX.0 {
            return Err(MoneyError::OutOfRange(amount));
        }
        Ok(Self::from_decimal(rounded))
    }

    /// True if the magnitude does not exceed [`Money::MAX`].
    pub fn is_within_limit(self) -> bool {
        self.0.abs() <= Self::MAX.0
    }

    /// Build an amount from a count of smallest units (cents).
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, SCALE))
    }

    fn from_units(units: i128) -> Self {
        Self(Decimal::from_i128_with_scale(units, SCALE))
    }

    /// The amount expressed in smallest units.
    pub fn cents(self) -> i128 {
        let mut value = self.0;
        value.rescale(SCALE);
        value.mantissa()
    }

    pub fn as_decimal(self) -> Decimal {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn is_negative(self) -> bool {
        self.0 < Decimal::ZERO
    }

    pub fn abs(self) -> Self {
        Self(self.0.abs())
    }

    /// `percent`% of this amount, truncated toward zero to whole cents.
    ///
    /// Returns `None` if the result exceeds [`Money::MAX`].
    pub fn percent(self, percent: Decimal) -> Option<Self> {
        let exact = self.0.checked_mul(percent)?.checked_div(Decimal::ONE_HUNDRED)?;
        if exact.abs() > Self::MAX.0 {
            return None;
        }
        let mut value = exact.round_dp_with_strategy(SCALE, RoundingStrategy::ToZero);
        value.rescale(SCALE);
        Some(Self(value))
    }

    /// Divide into `parts` shares that sum exactly to `self`.
    ///
    /// Every share gets the truncated quotient; the leftover units are given
    /// one each to the leading shares. Negative amounts split symmetrically.
    pub fn split_evenly(self, parts: usize) -> Vec<Money> {
        if parts == 0 {
            return Vec::new();
        }
        let units = self.cents();
        let count = parts as i128;
        let base = units / count;
        let step = (units % count).signum();
        let mut leftover = (units % count).abs();

        (0..parts)
            .map(|_| {
                if leftover > 0 {
                    leftover -= 1;
                    Money::from_units(base + step)
                } else {
                    Money::from_units(base)
                }
            })
            .collect()
    }
}

impl TryFrom<Decimal> for Money {
    type Error = MoneyError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::try_from_decimal(value)
    }
}

impl From<Money> for Decimal {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl FromStr for Money {
    type Err = MoneyError;

    /// Accepts `.` or `,` as decimal separator.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace(',', ".");
        if normalized.is_empty() {
            return Err(MoneyError::Parse(s.to_string()));
        }
        let amount = normalized
            .parse::<Decimal>()
            .map_err(|_| MoneyError::Parse(s.to_string()))?;
        Self::try_from_decimal(amount)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self::from_decimal(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self::from_decimal(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, |acc, m| acc + *m)
    }
}
