use axum::extract::State;
use axum::Json;
use serde::Serialize;

use super::AppState;
use crate::domain::{Asset, AssetKind, Decimal, LiquidityTag};
use crate::error::AppError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetsResponse {
    pub assets: Vec<AssetDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetDto {
    pub contract_address: String,
    pub symbol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub decimals: u32,
    pub kind: AssetKind,
    pub liquidity: LiquidityTag,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_usd: Option<Decimal>,
}

impl From<&Asset> for AssetDto {
    fn from(asset: &Asset) -> Self {
        Self {
            contract_address: asset.contract_address.as_str().to_string(),
            symbol: asset.symbol.clone(),
            display_name: asset.display_name.clone(),
            decimals: asset.decimals,
            kind: asset.kind,
            liquidity: asset.liquidity,
            price_usd: asset.price_usd,
        }
    }
}

/// Liquid assets, sorted by symbol.
pub async fn list_assets(State(state): State<AppState>) -> Result<Json<AssetsResponse>, AppError> {
    let assets = state
        .catalog
        .assets()
        .await
        .map_err(|e| AppError::BadGateway(e.to_string()))?;

    let mut assets: Vec<AssetDto> = assets.iter().map(AssetDto::from).collect();
    assets.sort_by(|a, b| a.symbol.cmp(&b.symbol));
    Ok(Json(AssetsResponse { assets }))
}
