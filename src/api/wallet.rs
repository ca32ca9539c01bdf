use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::AppState;
use crate::error::AppError;

#[derive(Deserialize)]
pub struct ImportRequest {
    pub mnemonic: String,
}

impl fmt::Debug for ImportRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ImportRequest { mnemonic: [REDACTED] }")
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletResponse {
    pub loaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
}

fn configured_address(state: &AppState) -> Option<String> {
    state.session.address().map(|a| a.as_str().to_string())
}

pub async fn get_wallet(State(state): State<AppState>) -> Result<Json<WalletResponse>, AppError> {
    Ok(Json(WalletResponse {
        loaded: state.session.is_loaded().await?,
        address: configured_address(&state),
        public_key: None,
    }))
}

pub async fn import_wallet(
    State(state): State<AppState>,
    Json(req): Json<ImportRequest>,
) -> Result<Json<WalletResponse>, AppError> {
    let _lease = state.runs.claim_wallet()?;
    let public_key = state.session.import(&req.mnemonic).await?;
    state.log.success("Wallet imported and encrypted");

    Ok(Json(WalletResponse {
        loaded: true,
        address: configured_address(&state),
        public_key: Some(public_key),
    }))
}

pub async fn delete_wallet(State(state): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let _lease = state.runs.claim_wallet().map_err(|_| {
        AppError::Conflict("Cannot remove the wallet while it is in use".to_string())
    })?;
    let removed = state.session.clear().await?;
    if removed {
        state.log.info("Wallet removed");
    }
    Ok(Json(serde_json::json!({ "removed": removed })))
}
