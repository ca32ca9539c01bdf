use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::domain::{
    Address, Asset, Decimal, SlippageTolerance, SwapQuote, Units, WalletConnectRequest,
};
use crate::engine::{CancelFlag, LegResult};
use crate::error::{AppError, SwapError};

/// External wallets must sign within this window.
const WALLET_REQUEST_TTL_SECS: i64 = 300;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapRequest {
    pub offer_address: String,
    pub ask_address: String,
    pub amount: Decimal,
    /// Fraction, e.g. 0.01 for 1%. Defaults to the configured tolerance.
    pub slippage: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrepareRequest {
    #[serde(flatten)]
    pub swap: SwapRequest,
    /// Wallet that will sign; defaults to the configured wallet address.
    pub sender: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponse {
    pub offer_symbol: String,
    pub ask_symbol: String,
    pub offer_units: Units,
    pub ask_units: Units,
    pub min_ask_units: Units,
    pub expected_out: String,
    pub min_out: String,
    pub slippage_buffer: String,
    pub slippage_percent: String,
    pub router_address: String,
}

impl QuoteResponse {
    fn from_quote(quote: &SwapQuote) -> Result<Self, SwapError> {
        Ok(Self {
            offer_symbol: quote.offer.label().to_string(),
            ask_symbol: quote.ask.label().to_string(),
            offer_units: quote.offer_units,
            ask_units: quote.ask_units,
            min_ask_units: quote.min_ask_units,
            expected_out: quote.expected_out()?.to_fixed(quote.ask.decimals),
            min_out: quote.min_out()?.to_fixed(quote.ask.decimals),
            slippage_buffer: quote.slippage_buffer()?.to_fixed(quote.ask.decimals),
            slippage_percent: quote.slippage.as_percent().to_canonical_string(),
            router_address: quote.router.address.as_str().to_string(),
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrepareResponse {
    pub quote: QuoteResponse,
    pub request: WalletConnectRequest,
}

async fn resolve_pair(
    state: &AppState,
    req: &SwapRequest,
) -> Result<(Asset, Asset, SlippageTolerance), AppError> {
    let slippage = match req.slippage {
        Some(fraction) => SlippageTolerance::new(fraction).map_err(SwapError::from)?,
        None => state.config.default_slippage,
    };
    let offer = state.resolve_asset(&req.offer_address).await?;
    let ask = state.resolve_asset(&req.ask_address).await?;
    Ok((offer, ask, slippage))
}

pub async fn quote(
    State(state): State<AppState>,
    Json(req): Json<SwapRequest>,
) -> Result<Json<QuoteResponse>, AppError> {
    let (offer, ask, slippage) = resolve_pair(&state, &req).await?;
    let quote = state
        .runs
        .orchestrator()
        .executor()
        .quotes()
        .get_quote(&offer, &ask, req.amount, slippage)
        .await?;

    Ok(Json(QuoteResponse::from_quote(&quote)?))
}

/// Quote and build a swap for an external wallet to confirm and sign.
pub async fn prepare(
    State(state): State<AppState>,
    Json(req): Json<PrepareRequest>,
) -> Result<Json<PrepareResponse>, AppError> {
    let sender = match req.sender.as_deref().map(str::trim) {
        Some(s) if !s.is_empty() => Address::new(s.to_string()),
        _ => state.session.require_address()?.clone(),
    };
    let (offer, ask, slippage) = resolve_pair(&state, &req.swap).await?;

    let executor = state.runs.orchestrator().executor();
    let quote = executor
        .quotes()
        .get_quote(&offer, &ask, req.swap.amount, slippage)
        .await?;
    let summary = QuoteResponse::from_quote(&quote)?;
    let tx = executor.builder().build_transaction(quote, &sender).await?;

    let valid_until = chrono::Utc::now().timestamp() + WALLET_REQUEST_TTL_SECS;
    Ok(Json(PrepareResponse {
        quote: summary,
        request: WalletConnectRequest::single(&tx, valid_until),
    }))
}

/// Execute one leg with the stored wallet, waiting for confirmation.
///
/// Holds the wallet lease for the whole leg; refused with 409 while a cycle
/// run or another swap is signing.
pub async fn execute(
    State(state): State<AppState>,
    Json(req): Json<SwapRequest>,
) -> Result<Json<LegResult>, AppError> {
    let _lease = state.runs.claim_wallet()?;
    let (offer, ask, slippage) = resolve_pair(&state, &req).await?;

    let leg = state
        .runs
        .orchestrator()
        .executor()
        .execute_leg(&offer, &ask, req.amount, slippage, &CancelFlag::new())
        .await?;

    Ok(Json(leg))
}
