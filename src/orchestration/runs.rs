use super::{CycleConfig, CycleOrchestrator, CycleState, CycleSummary};
use crate::db::Repository;
use crate::engine::CancelFlag;
use crate::error::SwapError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Identifies a started run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunHandle {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStatus {
    pub run_id: Option<Uuid>,
    pub active: bool,
    pub state: CycleState,
    pub last_summary: Option<CycleSummary>,
}

#[derive(Debug)]
struct ActiveRun {
    handle: RunHandle,
    cancel: CancelFlag,
    task: JoinHandle<Option<CycleSummary>>,
}

type LastRun = Arc<StdMutex<Option<(Uuid, CycleSummary)>>>;

/// Exclusive right to sign with the stored wallet. Released on drop.
///
/// Confirmation is read off the account's sequence number, so two signers
/// sharing it would each take the other's transaction as their own.
#[derive(Debug)]
pub struct WalletLease {
    _guard: OwnedMutexGuard<()>,
}

/// Runs at most one cycle run at a time on a background task and records
/// its outcome.
///
/// Also hands out the [`WalletLease`]: a run holds it for its whole
/// duration and manual swaps hold it for one leg.
#[derive(Debug)]
pub struct RunManager {
    orchestrator: Arc<CycleOrchestrator>,
    repo: Option<Repository>,
    active: Mutex<Option<ActiveRun>>,
    last: LastRun,
    wallet: Arc<Mutex<()>>,
}

impl RunManager {
    pub fn new(orchestrator: Arc<CycleOrchestrator>, repo: Option<Repository>) -> Self {
        Self {
            orchestrator,
            repo,
            active: Mutex::new(None),
            last: Arc::new(StdMutex::new(None)),
            wallet: Arc::new(Mutex::new(())),
        }
    }

    /// Take the wallet for one operation, or fail with [`SwapError::WalletBusy`]
    /// while a run or another swap holds it.
    pub fn claim_wallet(&self) -> Result<WalletLease, SwapError> {
        self.wallet
            .clone()
            .try_lock_owned()
            .map(|guard| WalletLease { _guard: guard })
            .map_err(|_| {
                SwapError::WalletBusy("another operation is signing with the wallet".to_string())
            })
    }

    pub fn wallet_busy(&self) -> bool {
        self.wallet.try_lock().is_err()
    }

    pub fn orchestrator(&self) -> &Arc<CycleOrchestrator> {
        &self.orchestrator
    }

    /// Validate `config` and start it on a background task.
    ///
    /// Fails with a validation error while another run is still in progress,
    /// and with [`SwapError::WalletBusy`] while a manual swap is signing.
    pub async fn start(&self, config: CycleConfig) -> Result<RunHandle, SwapError> {
        config.validate()?;

        let mut active = self.active.lock().await;
        if active.as_ref().is_some_and(|run| !run.task.is_finished()) {
            return Err(SwapError::ValidationError(
                "A run is already in progress".to_string(),
            ));
        }
        let lease = self.claim_wallet()?;

        let handle = RunHandle {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
        };
        if let Some(repo) = &self.repo {
            repo.insert_run(handle.id, &config, handle.started_at)
                .await
                .map_err(|e| SwapError::Storage(e.to_string()))?;
        }

        let cancel = CancelFlag::new();
        let task = tokio::spawn(drive_run(
            lease,
            self.orchestrator.clone(),
            self.repo.clone(),
            self.last.clone(),
            handle,
            config,
            cancel.clone(),
        ));

        info!(run_id = %handle.id, "Cycle run started");
        *active = Some(ActiveRun {
            handle,
            cancel,
            task,
        });
        Ok(handle)
    }

    /// Request cancellation of the active run. Returns its id, or `None`
    /// when nothing is running.
    pub async fn cancel(&self) -> Option<Uuid> {
        let active = self.active.lock().await;
        let run = active.as_ref().filter(|run| !run.task.is_finished())?;
        run.cancel.cancel();
        self.orchestrator
            .log()
            .warning("Cancellation requested. Stopping after the current step...");
        info!(run_id = %run.handle.id, "Cycle run cancellation requested");
        Some(run.handle.id)
    }

    pub async fn status(&self) -> RunStatus {
        let active = self.active.lock().await;
        let running = active.as_ref().filter(|run| !run.task.is_finished());
        let last = self.last.lock().unwrap_or_else(|e| e.into_inner()).clone();

        RunStatus {
            run_id: running
                .map(|run| run.handle.id)
                .or_else(|| last.as_ref().map(|(id, _)| *id)),
            active: running.is_some(),
            state: self.orchestrator.state(),
            last_summary: last.map(|(_, summary)| summary),
        }
    }

    /// Wait for the current run, if any, to finish.
    pub async fn wait(&self) -> Option<CycleSummary> {
        let run = self.active.lock().await.take()?;
        match run.task.await {
            Ok(summary) => summary,
            Err(e) => {
                error!(run_id = %run.handle.id, error = %e, "Cycle run task failed");
                None
            }
        }
    }
}

async fn drive_run(
    _lease: WalletLease,
    orchestrator: Arc<CycleOrchestrator>,
    repo: Option<Repository>,
    last: LastRun,
    handle: RunHandle,
    config: CycleConfig,
    cancel: CancelFlag,
) -> Option<CycleSummary> {
    let summary = match orchestrator.run_cycles(&config, &cancel).await {
        Ok(summary) => summary,
        Err(e) => {
            orchestrator.log().error(format!("Run rejected: {}", e));
            return None;
        }
    };
    info!(
        run_id = %handle.id,
        outcome = summary.outcome.as_str(),
        completed_cycles = summary.completed_cycles,
        "Cycle run finished"
    );

    if let Some(repo) = &repo {
        if let Err(e) = repo.finish_run(handle.id, &summary, Utc::now()).await {
            warn!(run_id = %handle.id, error = %e, "Failed to persist run summary");
        }
        let entries: Vec<_> = orchestrator
            .log()
            .snapshot()
            .into_iter()
            .filter(|entry| entry.timestamp >= handle.started_at)
            .collect();
        if let Err(e) = repo.insert_run_logs(handle.id, &entries).await {
            warn!(run_id = %handle.id, error = %e, "Failed to persist run log");
        }
    }

    *last.lock().unwrap_or_else(|e| e.into_inner()) = Some((handle.id, summary.clone()));
    Some(summary)
}
