use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use super::AppState;
use crate::domain::{Decimal, SlippageTolerance};
use crate::error::{AppError, SwapError};
use crate::orchestration::{CycleConfig, RunHandle, RunStatus};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartCyclesRequest {
    pub token_address: String,
    /// Stable asset spent per cycle, in units of account.
    pub amount_per_cycle: Decimal,
    pub cycle_count: u32,
    /// Pause between legs and between cycles. Raised to the configured floor.
    pub delay_seconds: Option<u64>,
    /// Fraction, e.g. 0.01 for 1%.
    pub slippage: Option<Decimal>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelResponse {
    pub cancelled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<Uuid>,
}

pub async fn start_cycles(
    State(state): State<AppState>,
    Json(req): Json<StartCyclesRequest>,
) -> Result<(StatusCode, Json<RunHandle>), AppError> {
    let slippage = match req.slippage {
        Some(fraction) => SlippageTolerance::new(fraction).map_err(SwapError::from)?,
        None => state.config.default_slippage,
    };
    if state.runs.status().await.active {
        return Err(AppError::Conflict("A run is already in progress".to_string()));
    }
    if state.runs.wallet_busy() {
        return Err(SwapError::WalletBusy("a swap is in progress".to_string()).into());
    }
    if !state.session.is_loaded().await? {
        return Err(SwapError::WalletNotLoaded.into());
    }
    state.session.require_address()?;

    let token = state.resolve_asset(&req.token_address).await?;
    let stable_asset = state
        .resolve_asset(state.config.stable_asset_address.as_str())
        .await?;

    let config = CycleConfig {
        token,
        stable_asset,
        amount_per_cycle: req.amount_per_cycle,
        cycle_count: req.cycle_count,
        inter_op_delay: req
            .delay_seconds
            .map(Duration::from_secs)
            .unwrap_or(state.config.min_inter_op_delay),
        slippage,
    };

    let handle = state.runs.start(config).await?;
    Ok((StatusCode::ACCEPTED, Json(handle)))
}

pub async fn get_status(State(state): State<AppState>) -> Json<RunStatus> {
    Json(state.runs.status().await)
}

pub async fn cancel_cycles(State(state): State<AppState>) -> Json<CancelResponse> {
    let run_id = state.runs.cancel().await;
    Json(CancelResponse {
        cancelled: run_id.is_some(),
        run_id,
    })
}
