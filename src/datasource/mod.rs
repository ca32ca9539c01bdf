//! Asset directory abstraction: asset listings and remote swap simulation.

use crate::domain::{
    Address, Asset, LiquidityTag, RouterDescriptor, SlippageTolerance, Units,
};
use async_trait::async_trait;
use std::fmt;

pub mod catalog;
pub mod mock;
pub mod stonfi;

pub use catalog::AssetCatalog;
pub use mock::MockAssetDirectory;
pub use stonfi::StonFiDataSource;

/// Remote asset directory and price-simulation service.
///
/// Implementations must handle retry/backoff for transient failures and
/// report exhausted rate limiting as [`DataSourceError::RateLimited`].
#[async_trait]
pub trait AssetDirectory: Send + Sync + fmt::Debug {
    /// List assets whose liquidity is at least `min_liquidity`.
    async fn list_assets(&self, min_liquidity: LiquidityTag)
        -> Result<Vec<Asset>, DataSourceError>;

    /// Simulate a swap of `offer_units` of the offer asset into the ask asset.
    async fn simulate_swap(
        &self,
        request: &SimulationRequest,
    ) -> Result<SwapSimulation, DataSourceError>;
}

/// Highest referral fee the router accepts, in basis points.
pub const MAX_REFERRAL_FEE_BPS: u16 = 100;

/// Referral fee routing forwarded with simulations and swap payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Referral {
    pub address: Address,
    /// 1 bps = 0.01%. At most [`MAX_REFERRAL_FEE_BPS`].
    pub fee_bps: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationRequest {
    pub offer_address: Address,
    pub ask_address: Address,
    pub offer_units: Units,
    pub slippage: SlippageTolerance,
    pub referral: Option<Referral>,
}

/// Raw simulation result as reported by the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapSimulation {
    pub offer_address: Address,
    pub ask_address: Address,
    pub offer_units: Units,
    pub ask_units: Units,
    pub min_ask_units: Units,
    pub router: RouterDescriptor,
}

/// Error type for data source operations.
#[derive(Debug, Clone)]
pub enum DataSourceError {
    /// Network error (e.g., connection timeout, DNS failure)
    NetworkError(String),
    /// HTTP error (e.g., 4xx client error, 5xx server error)
    HttpError { status: u16, message: String },
    /// Parsing error (invalid JSON or malformed response)
    ParseError(String),
    /// Rate limit exceeded (caller should implement backoff)
    RateLimited,
}

impl fmt::Display for DataSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSourceError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            DataSourceError::HttpError { status, message } => {
                write!(f, "HTTP error {}: {}", status, message)
            }
            DataSourceError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            DataSourceError::RateLimited => write!(f, "Rate limited"),
        }
    }
}

impl std::error::Error for DataSourceError {}
