//! Fixed-point integer amounts and conversion to/from human-readable decimals.

use super::Decimal;
use rust_decimal::{Decimal as RustDecimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Largest scale rust_decimal can represent.
pub const MAX_DECIMALS: u32 = 28;

/// Amount in the asset's smallest denomination.
///
/// Serialized as a decimal string so JSON consumers never lose precision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Units(pub u128);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnitsError {
    #[error("amount must not be negative: {0}")]
    Negative(String),
    #[error("unsupported decimal places: {0}")]
    UnsupportedDecimals(u32),
    #[error("amount out of range: {0}")]
    Overflow(String),
    #[error("invalid integer amount: {0}")]
    Parse(String),
}

impl Units {
    pub fn new(value: u128) -> Self {
        Units(value)
    }

    pub fn zero() -> Self {
        Units(0)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(&self, rhs: Units) -> Option<Units> {
        self.0.checked_add(rhs.0).map(Units)
    }

    pub fn saturating_sub(&self, rhs: Units) -> Units {
        Units(self.0.saturating_sub(rhs.0))
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Units {
    type Err = UnitsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u128>()
            .map(Units)
            .map_err(|_| UnitsError::Parse(s.to_string()))
    }
}

impl Serialize for Units {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Units {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(u64),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Text(s) => Units::from_str(&s).map_err(serde::de::Error::custom),
            Raw::Number(n) => Ok(Units(n as u128)),
        }
    }
}

/// Convert a human-readable amount to integer units, rounding half-up at the
/// unit boundary.
pub fn to_units(amount: Decimal, decimals: u32) -> Result<Units, UnitsError> {
    if decimals > MAX_DECIMALS {
        return Err(UnitsError::UnsupportedDecimals(decimals));
    }
    if amount.is_negative() {
        return Err(UnitsError::Negative(amount.to_canonical_string()));
    }

    let rounded = amount
        .inner()
        .round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero);
    // round_dp leaves smaller scales untouched, so scale <= decimals here.
    let mantissa = u128::try_from(rounded.mantissa())
        .map_err(|_| UnitsError::Negative(amount.to_canonical_string()))?;
    let factor = 10u128
        .checked_pow(decimals - rounded.scale())
        .ok_or_else(|| UnitsError::Overflow(amount.to_canonical_string()))?;

    mantissa
        .checked_mul(factor)
        .map(Units)
        .ok_or_else(|| UnitsError::Overflow(amount.to_canonical_string()))
}

/// Convert integer units back to an exact human-readable amount.
pub fn from_units(units: Units, decimals: u32) -> Result<Decimal, UnitsError> {
    if decimals > MAX_DECIMALS {
        return Err(UnitsError::UnsupportedDecimals(decimals));
    }
    let mantissa =
        i128::try_from(units.0).map_err(|_| UnitsError::Overflow(units.to_string()))?;
    RustDecimal::try_from_i128_with_scale(mantissa, decimals)
        .map(Decimal::new)
        .map_err(|_| UnitsError::Overflow(units.to_string()))
}

/// Render units with exactly `decimals` fractional digits (`50000000`, 6 → `"50.000000"`).
///
/// Pure string arithmetic, so it works for any `u128`.
pub fn format_units(units: Units, decimals: u32) -> String {
    let digits = units.0.to_string();
    if decimals == 0 {
        return digits;
    }
    let width = decimals as usize + 1;
    let padded = format!("{:0>width$}", digits, width = width);
    let (int_part, frac_part) = padded.split_at(padded.len() - decimals as usize);
    format!("{}.{}", int_part, frac_part)
}
