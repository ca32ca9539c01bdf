//! Cycle orchestration: the run state machine, the buy/sell loop, and the
//! background run manager behind the HTTP control surface.

pub mod orchestrator;
pub mod runs;
pub mod state;

pub use orchestrator::{
    CycleConfig, CycleOrchestrator, CycleSummary, LegRecord, OrchestratorSettings,
};
pub use runs::{RunHandle, RunManager, RunStatus, WalletLease};
pub use state::{CycleState, CycleStep, RunPhase};
