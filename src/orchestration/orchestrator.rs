use super::state::{CycleState, CycleStep, RunPhase};
use crate::domain::{Asset, Decimal, EventLog, Severity, Side, SlippageTolerance};
use crate::engine::{with_backoff, CancelFlag, LegResult, RetryPolicy, SwapExecutor};
use crate::error::SwapError;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::sleep;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

/// Parameters of one cycle run.
#[derive(Debug, Clone)]
pub struct CycleConfig {
    pub token: Asset,
    pub stable_asset: Asset,
    pub amount_per_cycle: Decimal,
    pub cycle_count: u32,
    pub inter_op_delay: Duration,
    pub slippage: SlippageTolerance,
}

impl CycleConfig {
    pub fn validate(&self) -> Result<(), SwapError> {
        if !self.amount_per_cycle.is_positive() {
            return Err(SwapError::ValidationError(
                "Amount per cycle must be positive".to_string(),
            ));
        }
        if self.cycle_count == 0 {
            return Err(SwapError::ValidationError(
                "Cycle count must be at least 1".to_string(),
            ));
        }
        if self.token.contract_address == self.stable_asset.contract_address {
            return Err(SwapError::ValidationError(
                "Token and stable asset must differ".to_string(),
            ));
        }
        Ok(())
    }
}

/// Process-wide pacing and retry limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorSettings {
    /// Floor applied to the requested inter-operation delay.
    pub min_inter_op_delay: Duration,
    pub rate_limit_cooldown: Duration,
    /// Total rate-limit retries allowed across a whole run.
    pub max_rate_limit_retries: u32,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            min_inter_op_delay: Duration::from_secs(15),
            rate_limit_cooldown: Duration::from_secs(30),
            max_rate_limit_retries: 10,
        }
    }
}

/// One executed leg, as reported in the run summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegRecord {
    pub cycle: u32,
    pub side: Side,
    pub offer_symbol: String,
    pub ask_symbol: String,
    pub amount_in: Decimal,
    pub expected_out: Decimal,
    pub min_out: Decimal,
    pub seqno_before: u64,
    pub confirmed_seqno: u64,
    pub message_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleSummary {
    pub outcome: RunPhase,
    pub start_amount: Decimal,
    pub end_amount: Decimal,
    pub difference: Decimal,
    pub difference_percent: Decimal,
    pub total_slippage_buffer: Decimal,
    pub completed_cycles: u32,
    pub total_cycles: u32,
    pub rate_limit_retries: u32,
    pub error: Option<String>,
    /// Cycle index at the time of failure.
    pub failed_cycle: Option<u32>,
    pub legs: Vec<LegRecord>,
}

impl CycleSummary {
    fn from_state(
        state: &CycleState,
        start_amount: Decimal,
        failure: Option<(u32, SwapError)>,
        legs: Vec<LegRecord>,
    ) -> Self {
        let difference = state.running_amount - start_amount;
        let difference_percent = (difference * Decimal::hundred())
            .checked_div(start_amount)
            .unwrap_or_default();
        let (failed_cycle, error) = match failure {
            Some((cycle, err)) => (Some(cycle), Some(err.to_string())),
            None => (None, None),
        };

        Self {
            outcome: state.phase,
            start_amount,
            end_amount: state.running_amount,
            difference,
            difference_percent,
            total_slippage_buffer: state.accumulated_slippage_buffer,
            completed_cycles: state.completed_cycles,
            total_cycles: state.total_cycles,
            rate_limit_retries: state.rate_limit_retries,
            error,
            failed_cycle,
            legs,
        }
    }

    pub fn legs_executed(&self) -> usize {
        self.legs.len()
    }
}

/// Drives buy/sell cycles strictly sequentially, chaining each leg's output
/// into the next leg's input.
///
/// Progress is published on a watch channel; the orchestrator is its only
/// writer.
#[derive(Debug)]
pub struct CycleOrchestrator {
    executor: SwapExecutor,
    settings: OrchestratorSettings,
    state: watch::Sender<CycleState>,
}

impl CycleOrchestrator {
    pub fn new(executor: SwapExecutor, settings: OrchestratorSettings) -> Self {
        let (state, _) = watch::channel(CycleState::default());
        Self {
            executor,
            settings,
            state,
        }
    }

    pub fn executor(&self) -> &SwapExecutor {
        &self.executor
    }

    pub fn log(&self) -> &Arc<EventLog> {
        self.executor.log()
    }

    pub fn state(&self) -> CycleState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<CycleState> {
        self.state.subscribe()
    }

    fn transition(&self, f: impl FnOnce(CycleState) -> CycleState) -> CycleState {
        let next = f(self.state());
        self.state.send_replace(next.clone());
        next
    }

    /// Run `config.cycle_count` buy/sell cycles.
    ///
    /// Only an invalid config is returned as an error, before anything
    /// happens. Failures during the run end it and are reported in the
    /// summary together with the progress made so far.
    pub async fn run_cycles(
        &self,
        config: &CycleConfig,
        cancel: &CancelFlag,
    ) -> Result<CycleSummary, SwapError> {
        config.validate()?;
        let log = self.log();
        let token = config.token.label();
        let stable = config.stable_asset.label();
        let pause = config.inter_op_delay.max(self.settings.min_inter_op_delay);

        log.info(RULE);
        log.success("Starting cyclic swap");
        log.info(format!("Token: {}", token));
        log.info(format!("Amount: {} {}", config.amount_per_cycle, stable));
        log.info(format!("Cycles: {}", config.cycle_count));
        log.info(format!("Delay: {}s", pause.as_secs()));
        log.info(RULE);

        self.transition(|_| CycleState::start(config.cycle_count, config.amount_per_cycle));

        let legs = Mutex::new(Vec::new());
        let mut failure = None;
        let mut cycle = 1;

        while cycle <= config.cycle_count {
            let state = self.transition(|s| s.begin_cycle(cycle));
            let amount = state.running_amount;
            let remaining_retries = self
                .settings
                .max_rate_limit_retries
                .saturating_sub(state.rate_limit_retries);
            let policy = RetryPolicy::fixed(remaining_retries, self.settings.rate_limit_cooldown);

            let result = with_backoff(
                &policy,
                |_| self.run_cycle(cycle, config, amount, pause, cancel, &legs),
                |e: &SwapError| e.is_rate_limited() && !cancel.is_cancelled(),
                |e, _, delay| {
                    log.error(format!("Cycle {} failed: {}", cycle, e));
                    log.warning(format!("Rate limit hit. Waiting {}s...", delay.as_secs()));
                    self.transition(|s| s.rate_limited());
                },
            )
            .await;

            match result {
                Ok((end_amount, buffer)) => {
                    self.transition(|s| s.complete_cycle(end_amount, buffer));
                    log.info(format!(
                        "Cycle {} complete. Balance: {} {}",
                        cycle,
                        end_amount.to_fixed(4),
                        stable
                    ));

                    if cycle < config.cycle_count {
                        log.info(format!("Pausing {}s before next cycle...", pause.as_secs()));
                        self.transition(|s| s.enter_step(CycleStep::Waiting));
                        if let Err(e) = pause_unless_cancelled(pause, cancel).await {
                            failure = Some((cycle, e));
                            break;
                        }
                    }
                    cycle += 1;
                }
                Err(e) => {
                    log.error(format!("Cycle {} failed: {}", cycle, e));
                    if e.is_rate_limited() && !cancel.is_cancelled() {
                        log.error(format!(
                            "Rate limit retries exhausted ({} per run)",
                            self.settings.max_rate_limit_retries
                        ));
                    }
                    failure = Some((cycle, e));
                    break;
                }
            }
        }

        let legs = legs.into_inner().unwrap_or_else(|e| e.into_inner());
        let summary = match failure {
            None => {
                let state = self.transition(CycleState::finish);
                let summary = CycleSummary::from_state(&state, config.amount_per_cycle, None, legs);
                log.info(RULE);
                log.success("Cyclic swap completed!");
                self.log_totals(&summary, config);
                log.info(RULE);
                summary
            }
            Some((failed_cycle, err)) => {
                let state = self.transition(CycleState::abort);
                log.error(format!("Error at cycle {}: {}", failed_cycle, err));
                let summary = CycleSummary::from_state(
                    &state,
                    config.amount_per_cycle,
                    Some((failed_cycle, err)),
                    legs,
                );
                self.log_totals(&summary, config);
                summary
            }
        };

        Ok(summary)
    }

    /// Buy, pause, sell. Returns the sell output and its slippage buffer.
    async fn run_cycle(
        &self,
        cycle: u32,
        config: &CycleConfig,
        amount: Decimal,
        pause: Duration,
        cancel: &CancelFlag,
        legs: &Mutex<Vec<LegRecord>>,
    ) -> Result<(Decimal, Decimal), SwapError> {
        if cancel.is_cancelled() {
            return Err(SwapError::Cancelled);
        }
        let log = self.log();
        let total = config.cycle_count;

        log.info(format!(
            "[Cycle {}/{}] Step 1: Buying {}",
            cycle,
            total,
            config.token.label()
        ));
        self.transition(|s| s.enter_step(CycleStep::Buying));
        let buy = self
            .executor
            .execute_leg(&config.stable_asset, &config.token, amount, config.slippage, cancel)
            .await?;
        self.record_leg(legs, cycle, Side::Buy, config, &buy);
        log.success(format!(
            "Bought {} {}",
            buy.expected_out.to_fixed(4),
            config.token.label()
        ));

        log.info(format!("Pausing {}s before next swap...", pause.as_secs()));
        self.transition(|s| s.enter_step(CycleStep::Waiting));
        pause_unless_cancelled(pause, cancel).await?;

        log.info(format!(
            "[Cycle {}/{}] Step 2: Selling back to {}",
            cycle,
            total,
            config.stable_asset.label()
        ));
        self.transition(|s| s.enter_step(CycleStep::Selling));
        let sell = self
            .executor
            .execute_leg(
                &config.token,
                &config.stable_asset,
                buy.expected_out,
                config.slippage,
                cancel,
            )
            .await?;
        self.record_leg(legs, cycle, Side::Sell, config, &sell);
        log.success(format!(
            "Sold for {} {}",
            sell.expected_out.to_fixed(4),
            config.stable_asset.label()
        ));

        Ok((sell.expected_out, sell.slippage_buffer))
    }

    fn record_leg(
        &self,
        legs: &Mutex<Vec<LegRecord>>,
        cycle: u32,
        side: Side,
        config: &CycleConfig,
        leg: &LegResult,
    ) {
        let (offer, ask) = match side {
            Side::Buy => (&config.stable_asset, &config.token),
            Side::Sell => (&config.token, &config.stable_asset),
        };
        let record = LegRecord {
            cycle,
            side,
            offer_symbol: offer.label().to_string(),
            ask_symbol: ask.label().to_string(),
            amount_in: leg.amount_in,
            expected_out: leg.expected_out,
            min_out: leg.min_out,
            seqno_before: leg.receipt.seqno_before,
            confirmed_seqno: leg.confirmed_seqno,
            message_hash: leg.receipt.message_hash.clone(),
        };
        legs.lock().unwrap_or_else(|e| e.into_inner()).push(record);
        self.transition(CycleState::leg_executed);
    }

    fn log_totals(&self, summary: &CycleSummary, config: &CycleConfig) {
        let log = self.log();
        let stable = config.stable_asset.label();
        let sign = if summary.difference.is_negative() { "" } else { "+" };

        log.info(format!(
            "Started with: {} {}",
            summary.start_amount.to_fixed(4),
            stable
        ));
        log.info(format!("Ended with: {} {}", summary.end_amount.to_fixed(4), stable));
        log.append(
            if summary.difference.is_negative() {
                Severity::Warning
            } else {
                Severity::Success
            },
            format!(
                "Difference: {}{} {} ({}{}%)",
                sign,
                summary.difference.to_fixed(4),
                stable,
                sign,
                summary.difference_percent.to_fixed(2)
            ),
        );
        log.info(format!(
            "Total slippage buffer on {} legs ({}% each): up to {} {} could be lost to price moves within tolerance.",
            stable,
            config.slippage.as_percent().to_canonical_string(),
            summary.total_slippage_buffer.to_fixed(4),
            stable
        ));
    }
}

async fn pause_unless_cancelled(pause: Duration, cancel: &CancelFlag) -> Result<(), SwapError> {
    if cancel.is_cancelled() {
        return Err(SwapError::Cancelled);
    }
    sleep(pause).await;
    if cancel.is_cancelled() {
        return Err(SwapError::Cancelled);
    }
    Ok(())
}
