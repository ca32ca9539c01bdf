//! Cycle run state machine.
//!
//! `Idle -> Running{cycle 1..N, step} -> {Completed, Aborted}`. Every
//! transition is a function consuming the current state and returning the
//! next one; the orchestrator is the only caller.

use crate::domain::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CycleStep {
    #[default]
    Idle,
    Buying,
    Waiting,
    Selling,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunPhase {
    #[default]
    Idle,
    Running,
    Completed,
    Aborted,
}

impl RunPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunPhase::Idle => "idle",
            RunPhase::Running => "running",
            RunPhase::Completed => "completed",
            RunPhase::Aborted => "aborted",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunPhase::Completed | RunPhase::Aborted)
    }
}

impl FromStr for RunPhase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(RunPhase::Idle),
            "running" => Ok(RunPhase::Running),
            "completed" => Ok(RunPhase::Completed),
            "aborted" => Ok(RunPhase::Aborted),
            other => Err(format!("unknown run phase: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleState {
    pub phase: RunPhase,
    /// 1-based index of the cycle in progress; 0 before the first cycle.
    pub cycle_index: u32,
    pub total_cycles: u32,
    pub step: CycleStep,
    pub running_amount: Decimal,
    pub accumulated_slippage_buffer: Decimal,
    pub completed_cycles: u32,
    pub legs_executed: u32,
    pub rate_limit_retries: u32,
}

impl CycleState {
    pub fn start(total_cycles: u32, amount: Decimal) -> Self {
        Self {
            phase: RunPhase::Running,
            total_cycles,
            running_amount: amount,
            ..Self::default()
        }
    }

    pub fn begin_cycle(self, cycle_index: u32) -> Self {
        Self {
            cycle_index,
            step: CycleStep::Buying,
            ..self
        }
    }

    pub fn enter_step(self, step: CycleStep) -> Self {
        Self { step, ..self }
    }

    pub fn leg_executed(self) -> Self {
        Self {
            legs_executed: self.legs_executed + 1,
            ..self
        }
    }

    /// Carry the sell output forward and add the stable leg's buffer.
    pub fn complete_cycle(self, running_amount: Decimal, slippage_buffer: Decimal) -> Self {
        Self {
            running_amount,
            accumulated_slippage_buffer: self.accumulated_slippage_buffer + slippage_buffer,
            completed_cycles: self.completed_cycles + 1,
            ..self
        }
    }

    /// The current cycle hit a rate limit and will be re-run at the same index.
    pub fn rate_limited(self) -> Self {
        Self {
            step: CycleStep::Waiting,
            rate_limit_retries: self.rate_limit_retries + 1,
            ..self
        }
    }

    pub fn finish(self) -> Self {
        Self {
            phase: RunPhase::Completed,
            step: CycleStep::Idle,
            ..self
        }
    }

    pub fn abort(self) -> Self {
        Self {
            phase: RunPhase::Aborted,
            step: CycleStep::Idle,
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    #[test]
    fn test_happy_path_transitions() {
        let s = CycleState::start(2, d("100"));
        assert_eq!(s.phase, RunPhase::Running);
        assert_eq!(s.cycle_index, 0);

        let s = s
            .begin_cycle(1)
            .leg_executed()
            .enter_step(CycleStep::Waiting)
            .enter_step(CycleStep::Selling)
            .leg_executed()
            .complete_cycle(d("99.5"), d("0.25"));
        assert_eq!(s.cycle_index, 1);
        assert_eq!(s.completed_cycles, 1);
        assert_eq!(s.legs_executed, 2);
        assert_eq!(s.running_amount, d("99.5"));

        let s = s.begin_cycle(2).complete_cycle(d("99"), d("0.25")).finish();
        assert_eq!(s.phase, RunPhase::Completed);
        assert_eq!(s.step, CycleStep::Idle);
        assert_eq!(s.accumulated_slippage_buffer, d("0.5"));
        assert!(s.phase.is_terminal());
    }

    #[test]
    fn test_rate_limit_keeps_cycle_index() {
        let s = CycleState::start(3, d("10")).begin_cycle(1).rate_limited();
        assert_eq!(s.cycle_index, 1);
        assert_eq!(s.completed_cycles, 0);
        assert_eq!(s.rate_limit_retries, 1);
        assert_eq!(s.step, CycleStep::Waiting);
    }

    #[test]
    fn test_abort_keeps_partial_progress() {
        let s = CycleState::start(3, d("10"))
            .begin_cycle(1)
            .complete_cycle(d("9.9"), d("0.1"))
            .begin_cycle(2)
            .abort();
        assert_eq!(s.phase, RunPhase::Aborted);
        assert_eq!(s.completed_cycles, 1);
        assert_eq!(s.running_amount, d("9.9"));
    }

    #[test]
    fn test_serializes_lowercase_enums() {
        let json = serde_json::to_value(CycleState::start(1, d("1")).begin_cycle(1)).unwrap();
        assert_eq!(json["phase"], "running");
        assert_eq!(json["step"], "buying");
        assert_eq!(json["cycleIndex"], 1);
    }
}
