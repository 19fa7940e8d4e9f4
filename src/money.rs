//! Exact fixed-point money amounts.
//!
//! All monetary values in the app are [Amount]s: decimals with exactly two
//! fraction digits. Amounts are stored in the database as integer cents, which
//! lets the database do exact arithmetic on them.

use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Sub},
    str::FromStr,
};

use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use serde_json::Value;

/// The number of fraction digits kept for monetary amounts.
pub const DECIMAL_PLACES: u32 = 2;
/// The maximum number of digits (whole and fraction) a user supplied amount may have.
pub const MAX_DIGITS: u32 = 10;

/// The reasons a value cannot be used as an [Amount].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AmountError {
    /// The value is not a number, or a string that can be parsed as a number.
    #[error("A valid number is required.")]
    NotANumber,

    /// The value has more fraction digits than a cent can represent.
    #[error("Ensure that there are no more than 2 decimal places.")]
    TooManyDecimalPlaces,

    /// The value is too large.
    #[error("Ensure that there are no more than 10 digits in total.")]
    TooManyDigits,
}

/// An exact amount of money with two fraction digits, e.g. `1234.50`.
///
/// Serializes as a decimal string, e.g. `"1234.50"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(Decimal);

impl Amount {
    /// An amount of zero.
    pub const ZERO: Amount = Amount(Decimal::from_parts(0, 0, 0, false, DECIMAL_PLACES));
    /// The smallest positive amount.
    pub const ONE_CENT: Amount = Amount(Decimal::from_parts(1, 0, 0, false, DECIMAL_PLACES));

    /// Create an amount from a decimal.
    ///
    /// Trailing zeros are ignored, so `1.500` is accepted as `1.50`.
    ///
    /// # Errors
    /// Returns an error if `value` has more than two significant fraction
    /// digits or more than [MAX_DIGITS] digits in total.
    pub fn new(value: Decimal) -> Result<Self, AmountError> {
        let mut value = value.normalize();

        if value.scale() > DECIMAL_PLACES {
            return Err(AmountError::TooManyDecimalPlaces);
        }

        value.rescale(DECIMAL_PLACES);

        if value.mantissa().unsigned_abs() >= 10u128.pow(MAX_DIGITS) {
            return Err(AmountError::TooManyDigits);
        }

        Ok(Self(value))
    }

    /// Create an amount from a whole number of cents.
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, DECIMAL_PLACES))
    }

    /// Parse an amount from a JSON value, accepting both numbers and numeric strings.
    ///
    /// # Errors
    /// Returns [AmountError::NotANumber] for any other JSON value or for
    /// strings that do not contain a number.
    pub fn from_json(value: &Value) -> Result<Self, AmountError> {
        match value {
            Value::String(text) => text.parse(),
            Value::Number(number) => number.to_string().parse(),
            _ => Err(AmountError::NotANumber),
        }
    }

    /// The amount as a whole number of cents, or `None` if it does not fit in an `i64`.
    ///
    /// Only sums built with `+` or [Sum] can be that large.
    pub fn cents(&self) -> Option<i64> {
        // Amounts always have a scale of two, so the mantissa is the number of cents.
        i64::try_from(self.0.mantissa()).ok()
    }

    /// The amount as a decimal.
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Whether the amount is greater than zero.
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Whether the amount is less than zero.
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// Add two amounts, checking the result still fits in [MAX_DIGITS] digits.
    ///
    /// # Errors
    /// Returns [AmountError::TooManyDigits] if the sum is too large.
    pub fn checked_add(self, other: Amount) -> Result<Self, AmountError> {
        Self::new(self.0 + other.0)
    }

    /// `self - other`, or zero if `other` is larger than `self`.
    pub fn saturating_sub(self, other: Amount) -> Self {
        if other >= self {
            Amount::ZERO
        } else {
            self - other
        }
    }

    /// Format the amount as a dollar string with thousands separators, e.g. `$1,234.50`.
    pub fn formatted(&self) -> String {
        let digits = to_two_places(self.0.abs());
        let (whole, fraction) = digits.split_once('.').unwrap_or((&digits, "00"));

        let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
        for (i, digit) in whole.chars().enumerate() {
            if i > 0 && (whole.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(digit);
        }

        if self.is_negative() {
            format!("-${grouped}.{fraction}")
        } else {
            format!("${grouped}.{fraction}")
        }
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let text = text.trim();
        let value = Decimal::from_str(text)
            .or_else(|_| Decimal::from_scientific(text))
            .map_err(|_| AmountError::NotANumber)?;

        Self::new(value)
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Self) -> Self::Output {
        Amount(self.0 + rhs.0)
    }
}

impl Sub for Amount {
    type Output = Amount;

    fn sub(self, rhs: Self) -> Self::Output {
        Amount(self.0 - rhs.0)
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Amount::ZERO, |total, amount| total + amount)
    }
}

impl<'a> Sum<&'a Amount> for Amount {
    fn sum<I: Iterator<Item = &'a Amount>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&to_two_places(self.0))
    }
}

impl ToSql for Amount {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        self.cents().map(ToSqlOutput::from).ok_or_else(|| {
            rusqlite::Error::ToSqlConversionFailure(Box::new(AmountError::TooManyDigits))
        })
    }
}

impl FromSql for Amount {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        i64::column_result(value).map(Amount::from_cents)
    }
}

/// Round `value` to two decimal places and render it with exactly two fraction digits.
pub fn to_two_places(value: Decimal) -> String {
    let mut value = value.round_dp(DECIMAL_PLACES);
    value.rescale(DECIMAL_PLACES);
    value.to_string()
}

/// Serialize a decimal as a string rounded to two decimal places.
///
/// Intended for `#[serde(serialize_with = "...")]` on derived values such as
/// percentages and averages, which are only rounded for presentation.
pub fn serialize_two_places<S: Serializer>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&to_two_places(*value))
}
