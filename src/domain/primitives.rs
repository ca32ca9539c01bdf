//! Domain primitives: Address, AssetKind, LiquidityTag, Side.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Account or contract address.
///
/// Accepts the raw `workchain:hex` form and the 48-character user-friendly
/// base64url form. The string is kept verbatim; no re-encoding happens.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid address: {0}")]
pub struct AddressParseError(pub String);

impl Address {
    /// Create an Address without validation.
    pub fn new(addr: String) -> Self {
        Address(addr)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if is_raw_address(s) || is_friendly_address(s) {
            Ok(Address(s.to_string()))
        } else {
            Err(AddressParseError(s.to_string()))
        }
    }
}

fn is_raw_address(s: &str) -> bool {
    match s.split_once(':') {
        Some((wc, hash)) => {
            wc.parse::<i32>().is_ok()
                && hash.len() == 64
                && hash.chars().all(|c| c.is_ascii_hexdigit())
        }
        None => false,
    }
}

fn is_friendly_address(s: &str) -> bool {
    s.len() == 48
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+' | '/'))
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether an asset is the chain's native currency or a token contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Native,
    Token,
}

impl AssetKind {
    /// Map the directory's `kind` string ("Ton", "Jetton", "Wton", ...).
    pub fn from_directory_kind(kind: &str) -> Self {
        if kind.eq_ignore_ascii_case("ton") {
            AssetKind::Native
        } else {
            AssetKind::Token
        }
    }
}

/// Liquidity bucket reported by the asset directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiquidityTag {
    Unknown,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl LiquidityTag {
    /// Pick the strongest liquidity tag out of a directory tag list.
    pub fn from_tags<S: AsRef<str>>(tags: &[S]) -> Self {
        tags.iter()
            .filter_map(|t| Self::from_tag(t.as_ref()))
            .max()
            .unwrap_or(LiquidityTag::Unknown)
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag.rsplit(':').next().unwrap_or(tag) {
            "liquidity_very_high" => Some(LiquidityTag::VeryHigh),
            "liquidity_high" => Some(LiquidityTag::High),
            "liquidity_medium" => Some(LiquidityTag::Medium),
            "liquidity_low" => Some(LiquidityTag::Low),
            _ => None,
        }
    }

    /// Directory tag string, as used in asset query conditions.
    pub fn as_tag(&self) -> &'static str {
        match self {
            LiquidityTag::VeryHigh => "asset:liquidity_very_high",
            LiquidityTag::High => "asset:liquidity_high",
            LiquidityTag::Medium => "asset:liquidity_medium",
            LiquidityTag::Low => "asset:liquidity_low",
            LiquidityTag::Unknown => "asset:liquidity_no",
        }
    }
}

/// Leg direction within a cycle: buy the token with the stable asset, or sell it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}
