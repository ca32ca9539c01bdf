//! STON.fi public REST API client.

use super::{AssetDirectory, DataSourceError, SimulationRequest, SwapSimulation};
use crate::domain::{
    Address, Asset, AssetKind, Decimal, LiquidityTag, RouterDescriptor, Units,
};
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use reqwest::Client;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

/// Decimals assumed when the directory omits them (native asset precision).
const DEFAULT_DECIMALS: u32 = 9;

/// Asset directory backed by the STON.fi v1 API.
#[derive(Debug, Clone)]
pub struct StonFiDataSource {
    client: Client,
    base_url: String,
}

impl StonFiDataSource {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn post(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<serde_json::Value, DataSourceError> {
        let url = format!("{}{}", self.base_url, path);
        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(30)),
            ..Default::default()
        };

        retry(backoff, || async {
            let response = self
                .client
                .post(&url)
                .query(query)
                .send()
                .await
                .map_err(|e| {
                    backoff::Error::transient(DataSourceError::NetworkError(e.to_string()))
                })?;

            let status = response.status();
            if status == 429 {
                warn!("STON.fi rate limited request to {}", path);
                return Err(backoff::Error::transient(DataSourceError::RateLimited));
            }
            if status.is_server_error() {
                return Err(backoff::Error::transient(DataSourceError::HttpError {
                    status: status.as_u16(),
                    message: "Server error".to_string(),
                }));
            }
            if !status.is_success() {
                let message = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Client error".to_string());
                return Err(backoff::Error::permanent(DataSourceError::HttpError {
                    status: status.as_u16(),
                    message,
                }));
            }

            response
                .json::<serde_json::Value>()
                .await
                .map_err(|e| backoff::Error::permanent(DataSourceError::ParseError(e.to_string())))
        })
        .await
    }
}

#[async_trait]
impl AssetDirectory for StonFiDataSource {
    async fn list_assets(
        &self,
        min_liquidity: LiquidityTag,
    ) -> Result<Vec<Asset>, DataSourceError> {
        let condition = liquidity_condition(min_liquidity);
        debug!("Querying assets with condition: {}", condition);

        let response = self
            .post("/v1/assets/query", &[("condition", condition)])
            .await?;

        let assets_json = response
            .get("asset_list")
            .and_then(|v| v.as_array())
            .ok_or_else(|| DataSourceError::ParseError("Missing asset_list".to_string()))?;

        let mut assets = Vec::with_capacity(assets_json.len());
        for asset_json in assets_json {
            match parse_asset(asset_json) {
                Ok(asset) => assets.push(asset),
                Err(e) => {
                    warn!("Failed to parse asset: {}", e);
                }
            }
        }

        Ok(assets)
    }

    async fn simulate_swap(
        &self,
        request: &SimulationRequest,
    ) -> Result<SwapSimulation, DataSourceError> {
        debug!(
            "Simulating swap offer={}, ask={}, units={}, slippage={}",
            request.offer_address,
            request.ask_address,
            request.offer_units,
            request.slippage.fraction()
        );

        let mut query = vec![
            ("offer_address", request.offer_address.to_string()),
            ("ask_address", request.ask_address.to_string()),
            ("units", request.offer_units.to_string()),
            (
                "slippage_tolerance",
                request.slippage.fraction().to_canonical_string(),
            ),
        ];
        if let Some(referral) = &request.referral {
            query.push(("referral_address", referral.address.to_string()));
            query.push(("referral_fee_bps", referral.fee_bps.to_string()));
        }

        let response = self.post("/v1/swap/simulate", &query).await?;
        parse_simulation(&response)
    }
}

/// Directory query condition matching every bucket at or above `min`.
fn liquidity_condition(min: LiquidityTag) -> String {
    [
        LiquidityTag::VeryHigh,
        LiquidityTag::High,
        LiquidityTag::Medium,
        LiquidityTag::Low,
    ]
    .iter()
    .filter(|tag| **tag >= min)
    .map(|tag| tag.as_tag())
    .collect::<Vec<_>>()
    .join(" | ")
}

fn str_field<'a>(json: &'a serde_json::Value, key: &str) -> Result<&'a str, DataSourceError> {
    json.get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| DataSourceError::ParseError(format!("Missing {} field", key)))
}

fn address_field(json: &serde_json::Value, key: &str) -> Result<Address, DataSourceError> {
    Ok(Address::new(str_field(json, key)?.to_string()))
}

fn units_field(json: &serde_json::Value, key: &str) -> Result<Units, DataSourceError> {
    let raw = str_field(json, key)?;
    Units::from_str(raw).map_err(|e| DataSourceError::ParseError(format!("Invalid {}: {}", key, e)))
}

fn parse_asset(asset_json: &serde_json::Value) -> Result<Asset, DataSourceError> {
    let contract_address = address_field(asset_json, "contract_address")?;
    let meta = asset_json.get("meta");
    let lookup = |key: &str| {
        meta.and_then(|m| m.get(key))
            .or_else(|| asset_json.get(key))
            .filter(|v| !v.is_null())
    };

    let symbol = lookup("symbol")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    let display_name = lookup("display_name")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());
    let decimals = lookup("decimals")
        .and_then(|v| v.as_u64())
        .map(|d| d as u32)
        .unwrap_or(DEFAULT_DECIMALS);
    let kind = asset_json
        .get("kind")
        .and_then(|v| v.as_str())
        .map(AssetKind::from_directory_kind)
        .unwrap_or(AssetKind::Token);
    let tags: Vec<&str> = asset_json
        .get("tags")
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(|t| t.as_str()).collect())
        .unwrap_or_default();
    let price_usd = asset_json
        .get("dex_price_usd")
        .or_else(|| asset_json.get("third_party_price_usd"))
        .and_then(|v| v.as_str())
        .and_then(|s| Decimal::from_str_canonical(s).ok());

    Ok(Asset {
        contract_address,
        symbol,
        display_name,
        decimals,
        kind,
        liquidity: LiquidityTag::from_tags(&tags),
        price_usd,
    })
}

fn parse_router(router_json: &serde_json::Value) -> Result<RouterDescriptor, DataSourceError> {
    let optional_address = |key: &str| {
        router_json
            .get(key)
            .and_then(|v| v.as_str())
            .map(|s| Address::new(s.to_string()))
    };

    Ok(RouterDescriptor {
        address: address_field(router_json, "address")?,
        major_version: router_json
            .get("major_version")
            .and_then(|v| v.as_u64())
            .unwrap_or(1) as u32,
        minor_version: router_json
            .get("minor_version")
            .and_then(|v| v.as_u64())
            .unwrap_or(0) as u32,
        pton_master_address: optional_address("pton_master_address"),
        pton_wallet_address: optional_address("pton_wallet_address"),
    })
}

fn parse_simulation(json: &serde_json::Value) -> Result<SwapSimulation, DataSourceError> {
    let router = match json.get("router") {
        Some(router_json) if router_json.is_object() => parse_router(router_json)?,
        _ => RouterDescriptor {
            address: address_field(json, "router_address")?,
            major_version: 1,
            minor_version: 0,
            pton_master_address: None,
            pton_wallet_address: None,
        },
    };

    Ok(SwapSimulation {
        offer_address: address_field(json, "offer_address")?,
        ask_address: address_field(json, "ask_address")?,
        offer_units: units_field(json, "offer_units")?,
        ask_units: units_field(json, "ask_units")?,
        min_ask_units: units_field(json, "min_ask_units")?,
        router,
    })
}
