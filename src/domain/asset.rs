use super::{Address, AssetKind, Decimal, LiquidityTag};
use serde::{Deserialize, Serialize};

/// A fungible token or the chain's native currency, as listed by the asset directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub contract_address: Address,
    pub symbol: String,
    pub display_name: Option<String>,
    pub decimals: u32,
    pub kind: AssetKind,
    pub liquidity: LiquidityTag,
    pub price_usd: Option<Decimal>,
}

impl Asset {
    pub fn new(
        contract_address: Address,
        symbol: impl Into<String>,
        decimals: u32,
        kind: AssetKind,
    ) -> Self {
        Self {
            contract_address,
            symbol: symbol.into(),
            display_name: None,
            decimals,
            kind,
            liquidity: LiquidityTag::Unknown,
            price_usd: None,
        }
    }

    pub fn with_liquidity(mut self, liquidity: LiquidityTag) -> Self {
        self.liquidity = liquidity;
        self
    }

    /// Label used in event log lines.
    pub fn label(&self) -> &str {
        if !self.symbol.is_empty() {
            &self.symbol
        } else {
            self.display_name.as_deref().unwrap_or("Token")
        }
    }
}
