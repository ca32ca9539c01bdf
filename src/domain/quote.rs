//! Swap quotes and slippage tolerance.

use super::{from_units, Address, Asset, Decimal, Units, UnitsError};
use rust_decimal::Decimal as RustDecimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Finest slippage precision accepted (1e-18). Keeps the min-output
/// computation inside u128 without intermediate overflow.
const MAX_SLIPPAGE_SCALE: u32 = 18;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlippageError {
    #[error("slippage tolerance must be within [0, 1], got {0}")]
    OutOfRange(String),
    #[error("slippage tolerance has too many decimal places: {0}")]
    TooPrecise(String),
}

/// Maximum fractional price deterioration accepted, as a fraction in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct SlippageTolerance(Decimal);

impl SlippageTolerance {
    pub fn new(fraction: Decimal) -> Result<Self, SlippageError> {
        if fraction.is_negative() || fraction > Decimal::one() {
            return Err(SlippageError::OutOfRange(fraction.to_canonical_string()));
        }
        let normalized = fraction.inner().normalize();
        if normalized.scale() > MAX_SLIPPAGE_SCALE {
            return Err(SlippageError::TooPrecise(fraction.to_canonical_string()));
        }
        Ok(Self(Decimal::new(normalized)))
    }

    /// Build from a percentage (`1` means 1%).
    pub fn from_percent(percent: Decimal) -> Result<Self, SlippageError> {
        let fraction = percent
            .checked_div(Decimal::hundred())
            .ok_or_else(|| SlippageError::OutOfRange(percent.to_canonical_string()))?;
        Self::new(fraction)
    }

    pub fn fraction(&self) -> Decimal {
        self.0
    }

    pub fn as_percent(&self) -> Decimal {
        self.0 * Decimal::hundred()
    }

    /// `floor(ask_units * (1 - tolerance))`, exact in integer arithmetic.
    ///
    /// Returns `None` only when the product cannot be represented in u128.
    pub fn min_output(&self, ask_units: Units) -> Option<Units> {
        let keep: RustDecimal = (Decimal::one() - self.0).inner().normalize();
        let numerator = u128::try_from(keep.mantissa()).ok()?;
        let denominator = 10u128.checked_pow(keep.scale())?;

        let whole = ask_units.0 / denominator;
        let rest = ask_units.0 % denominator;
        let min = whole
            .checked_mul(numerator)?
            .checked_add(rest.checked_mul(numerator)? / denominator)?;
        Some(Units(min))
    }
}

impl TryFrom<Decimal> for SlippageTolerance {
    type Error = SlippageError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SlippageTolerance> for Decimal {
    fn from(value: SlippageTolerance) -> Self {
        value.0
    }
}

/// Router contract information embedded in a simulation result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouterDescriptor {
    pub address: Address,
    pub major_version: u32,
    pub minor_version: u32,
    /// Proxy contract standing in for the native asset on the router.
    pub pton_master_address: Option<Address>,
    /// Router-owned proxy wallet, when the directory already resolved it.
    pub pton_wallet_address: Option<Address>,
}

/// A priced swap, produced per request and consumed exactly once by the
/// transaction builder. Intentionally not `Clone`: re-using a quote across
/// legs would submit stale pricing.
#[derive(Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapQuote {
    pub offer: Asset,
    pub ask: Asset,
    pub offer_units: Units,
    pub ask_units: Units,
    pub min_ask_units: Units,
    pub slippage: SlippageTolerance,
    pub router: RouterDescriptor,
}

impl SwapQuote {
    /// Expected output in ask-asset units of account.
    pub fn expected_out(&self) -> Result<Decimal, UnitsError> {
        from_units(self.ask_units, self.ask.decimals)
    }

    pub fn min_out(&self) -> Result<Decimal, UnitsError> {
        from_units(self.min_ask_units, self.ask.decimals)
    }

    /// Worst-case shortfall allowed by the tolerance (`expected - min`).
    pub fn slippage_buffer(&self) -> Result<Decimal, UnitsError> {
        from_units(
            self.ask_units.saturating_sub(self.min_ask_units),
            self.ask.decimals,
        )
    }
}
