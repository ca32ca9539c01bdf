//! Mock asset directory for testing without network calls.

use super::{AssetDirectory, DataSourceError, SimulationRequest, SwapSimulation};
use crate::domain::{Address, Asset, LiquidityTag, RouterDescriptor, Units};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// Mock directory with fixed unit exchange rates and scripted failures.
#[derive(Debug)]
pub struct MockAssetDirectory {
    assets: Vec<Asset>,
    rates: HashMap<(Address, Address), (u128, u128)>,
    router: RouterDescriptor,
    failures: Mutex<HashMap<usize, DataSourceError>>,
    requests: Mutex<Vec<SimulationRequest>>,
}

impl MockAssetDirectory {
    pub fn new() -> Self {
        Self {
            assets: Vec::new(),
            rates: HashMap::new(),
            router: RouterDescriptor {
                address: Address::new("EQmock_router".to_string()),
                major_version: 2,
                minor_version: 1,
                pton_master_address: Some(Address::new("EQmock_pton".to_string())),
                pton_wallet_address: Some(Address::new("EQmock_router_pton_wallet".to_string())),
            },
            failures: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_asset(mut self, asset: Asset) -> Self {
        self.assets.push(asset);
        self
    }

    /// `ask_units = offer_units * numerator / denominator` for offer → ask.
    pub fn with_rate(
        mut self,
        offer: &Address,
        ask: &Address,
        numerator: u128,
        denominator: u128,
    ) -> Self {
        self.rates
            .insert((offer.clone(), ask.clone()), (numerator, denominator));
        self
    }

    /// Make the `call_index`-th simulation (0-based, counting every attempt) fail.
    pub fn fail_simulation_at(self, call_index: usize, error: DataSourceError) -> Self {
        self.failures
            .lock()
            .expect("mock failures lock")
            .insert(call_index, error);
        self
    }

    /// Every simulation request received, including failed attempts.
    pub fn requests(&self) -> Vec<SimulationRequest> {
        self.requests.lock().expect("mock requests lock").clone()
    }
}

impl Default for MockAssetDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AssetDirectory for MockAssetDirectory {
    async fn list_assets(
        &self,
        min_liquidity: LiquidityTag,
    ) -> Result<Vec<Asset>, DataSourceError> {
        Ok(self
            .assets
            .iter()
            .filter(|a| a.liquidity >= min_liquidity)
            .cloned()
            .collect())
    }

    async fn simulate_swap(
        &self,
        request: &SimulationRequest,
    ) -> Result<SwapSimulation, DataSourceError> {
        let call_index = {
            let mut requests = self.requests.lock().expect("mock requests lock");
            requests.push(request.clone());
            requests.len() - 1
        };

        if let Some(err) = self
            .failures
            .lock()
            .expect("mock failures lock")
            .remove(&call_index)
        {
            return Err(err);
        }

        let (numerator, denominator) = self
            .rates
            .get(&(request.offer_address.clone(), request.ask_address.clone()))
            .copied()
            .ok_or_else(|| DataSourceError::HttpError {
                status: 400,
                message: "Pool not found".to_string(),
            })?;

        let ask_units = Units(request.offer_units.0 * numerator / denominator);
        let min_ask_units = request.slippage.min_output(ask_units).unwrap_or(ask_units);

        Ok(SwapSimulation {
            offer_address: request.offer_address.clone(),
            ask_address: request.ask_address.clone(),
            offer_units: request.offer_units,
            ask_units,
            min_ask_units,
            router: self.router.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AssetKind, Decimal, SlippageTolerance};

    fn request(offer: &str, ask: &str, units: u128) -> SimulationRequest {
        SimulationRequest {
            offer_address: Address::new(offer.to_string()),
            ask_address: Address::new(ask.to_string()),
            offer_units: Units(units),
            slippage: SlippageTolerance::new(Decimal::from_str_canonical("0.01").unwrap())
                .unwrap(),
            referral: None,
        }
    }

    #[tokio::test]
    async fn test_mock_simulates_with_rate() {
        let usdt = Address::new("EQusdt".to_string());
        let tok = Address::new("EQtok".to_string());
        let mock = MockAssetDirectory::new().with_rate(&usdt, &tok, 1, 2);

        let sim = mock
            .simulate_swap(&request("EQusdt", "EQtok", 100_000_000))
            .await
            .unwrap();
        assert_eq!(sim.ask_units, Units(50_000_000));
        assert_eq!(sim.min_ask_units, Units(49_500_000));
        assert_eq!(mock.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_mock_scripted_failure_applies_once() {
        let usdt = Address::new("EQusdt".to_string());
        let tok = Address::new("EQtok".to_string());
        let mock = MockAssetDirectory::new()
            .with_rate(&usdt, &tok, 1, 1)
            .fail_simulation_at(0, DataSourceError::RateLimited);

        let first = mock.simulate_swap(&request("EQusdt", "EQtok", 10)).await;
        assert!(matches!(first, Err(DataSourceError::RateLimited)));
        let second = mock.simulate_swap(&request("EQusdt", "EQtok", 10)).await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn test_mock_list_assets_filters_liquidity() {
        let mock = MockAssetDirectory::new()
            .with_asset(
                Asset::new(Address::new("EQa".into()), "A", 9, AssetKind::Token)
                    .with_liquidity(LiquidityTag::High),
            )
            .with_asset(
                Asset::new(Address::new("EQb".into()), "B", 9, AssetKind::Token)
                    .with_liquidity(LiquidityTag::Low),
            );

        let assets = mock.list_assets(LiquidityTag::Medium).await.unwrap();
        assert_eq!(assets.len(), 1);
        assert_eq!(assets[0].symbol, "A");
    }
}
