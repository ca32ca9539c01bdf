use crate::datasource::{AssetDirectory, Referral, SimulationRequest};
use crate::domain::{format_units, to_units, Asset, Decimal, SlippageTolerance, SwapQuote};
use crate::error::SwapError;
use std::sync::Arc;
use tracing::debug;

/// Turns human amounts into priced quotes via the remote simulator.
#[derive(Debug, Clone)]
pub struct QuoteAdapter {
    directory: Arc<dyn AssetDirectory>,
    referral: Option<Referral>,
}

impl QuoteAdapter {
    pub fn new(directory: Arc<dyn AssetDirectory>, referral: Option<Referral>) -> Self {
        Self {
            directory,
            referral,
        }
    }

    /// Quote `amount` of `offer` into `ask`.
    ///
    /// Input is validated before any network call. The minimum output is
    /// recomputed locally from the tolerance rather than trusted from the
    /// simulator.
    pub async fn get_quote(
        &self,
        offer: &Asset,
        ask: &Asset,
        amount: Decimal,
        slippage: SlippageTolerance,
    ) -> Result<SwapQuote, SwapError> {
        if offer.contract_address == ask.contract_address {
            return Err(SwapError::ValidationError(
                "Offer and ask assets must differ".to_string(),
            ));
        }
        if !amount.is_positive() {
            return Err(SwapError::ValidationError(format!(
                "Amount must be positive, got {}",
                amount
            )));
        }

        let offer_units = to_units(amount, offer.decimals)?;
        if offer_units.is_zero() {
            return Err(SwapError::ValidationError(format!(
                "Amount {} is below the smallest unit of {}",
                amount,
                offer.label()
            )));
        }

        let request = SimulationRequest {
            offer_address: offer.contract_address.clone(),
            ask_address: ask.contract_address.clone(),
            offer_units,
            slippage,
            referral: self.referral.clone(),
        };
        let simulation = self.directory.simulate_swap(&request).await?;

        if simulation.ask_units.is_zero() {
            return Err(SwapError::QuoteUnavailable(format!(
                "Simulation returned no output for {} → {}",
                offer.label(),
                ask.label()
            )));
        }

        let min_ask_units = slippage.min_output(simulation.ask_units).ok_or_else(|| {
            SwapError::QuoteUnavailable("Simulated output too large".to_string())
        })?;
        if min_ask_units != simulation.min_ask_units {
            debug!(
                "Remote min output {} differs from local {} ({} → {})",
                simulation.min_ask_units,
                min_ask_units,
                offer.label(),
                ask.label()
            );
        }

        debug!(
            "Quote {} {} → {} {} (min {})",
            format_units(offer_units, offer.decimals),
            offer.label(),
            format_units(simulation.ask_units, ask.decimals),
            ask.label(),
            format_units(min_ask_units, ask.decimals)
        );

        Ok(SwapQuote {
            offer: offer.clone(),
            ask: ask.clone(),
            offer_units,
            ask_units: simulation.ask_units,
            min_ask_units,
            slippage,
            router: simulation.router,
        })
    }
}
