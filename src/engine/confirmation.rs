use super::CancelFlag;
use crate::chain::ChainRpc;
use crate::domain::{Address, EventLog};
use crate::error::SwapError;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};

pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(90);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Terminal outcome of a confirmation wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum Confirmation {
    Confirmed { seqno: u64 },
    #[serde(rename_all = "camelCase")]
    TimedOut { last_seen: Option<u64> },
}

/// Waits for a wallet's sequence number to move past a known value.
#[derive(Debug, Clone)]
pub struct ConfirmationWatcher {
    chain: Arc<dyn ChainRpc>,
    log: Arc<EventLog>,
    timeout: Duration,
    poll_interval: Duration,
}

impl ConfirmationWatcher {
    pub fn new(chain: Arc<dyn ChainRpc>, log: Arc<EventLog>) -> Self {
        Self {
            chain,
            log,
            timeout: DEFAULT_CONFIRMATION_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_timing(mut self, timeout: Duration, poll_interval: Duration) -> Self {
        self.timeout = timeout;
        self.poll_interval = poll_interval.max(Duration::from_millis(1));
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Poll every interval until the sequence number exceeds `seqno_before`
    /// or the timeout elapses. Poll errors are logged and the wait goes on.
    /// A poll still in flight at the deadline is abandoned.
    ///
    /// Cancellation is honoured between polls and surfaces as
    /// [`SwapError::Cancelled`].
    pub async fn await_confirmation(
        &self,
        account: &Address,
        seqno_before: u64,
        cancel: &CancelFlag,
    ) -> Result<Confirmation, SwapError> {
        let deadline = Instant::now() + self.timeout;
        let max_attempts = (self.timeout.as_millis() / self.poll_interval.as_millis()).max(1);
        let mut attempts = 0u128;
        let mut last_seen = None;

        while Instant::now() < deadline {
            let remaining = deadline.saturating_duration_since(Instant::now());
            sleep(self.poll_interval.min(remaining)).await;
            if cancel.is_cancelled() {
                return Err(SwapError::Cancelled);
            }
            attempts += 1;

            let remaining = deadline.saturating_duration_since(Instant::now());
            let poll = match timeout(remaining, self.chain.get_sequence_number(account)).await {
                Ok(poll) => poll,
                Err(_) => break,
            };
            match poll {
                Ok(seqno) if seqno > seqno_before => {
                    self.log
                        .success(format!("Transaction confirmed! New seqno: {}", seqno));
                    return Ok(Confirmation::Confirmed { seqno });
                }
                Ok(seqno) => {
                    last_seen = Some(seqno);
                    self.log.info(format!(
                        "Waiting... (seqno still {}, attempt {}/{})",
                        seqno, attempts, max_attempts
                    ));
                }
                Err(e) => {
                    self.log.warning(format!("Error checking seqno: {}", e));
                }
            }
        }

        self.log.error(format!(
            "Transaction not confirmed within {}s!",
            self.timeout.as_secs()
        ));
        Ok(Confirmation::TimedOut { last_seen })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{ChainError, MockChainRpc};
    use crate::domain::Severity;

    fn account() -> Address {
        Address::new("EQwallet".into())
    }

    fn watcher(chain: Arc<MockChainRpc>) -> (Arc<EventLog>, ConfirmationWatcher) {
        let log = Arc::new(EventLog::new());
        (log.clone(), ConfirmationWatcher::new(chain, log))
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_when_seqno_never_advances() {
        let chain = Arc::new(MockChainRpc::new().with_seqno(&account(), 5));
        let (log, watcher) = watcher(chain.clone());

        let started = Instant::now();
        let outcome = watcher
            .await_confirmation(&account(), 5, &CancelFlag::new())
            .await
            .unwrap();

        assert_eq!(outcome, Confirmation::TimedOut { last_seen: Some(5) });
        assert_eq!(started.elapsed(), Duration::from_secs(90));
        assert_eq!(chain.seqno_reads(), 18);
        assert_eq!(log.snapshot().last().unwrap().severity, Severity::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirms_on_first_advanced_poll() {
        let chain = Arc::new(
            MockChainRpc::new()
                .with_seqno(&account(), 5)
                .with_pending_message(&account(), 0),
        );
        let (_, watcher) = watcher(chain.clone());

        let started = Instant::now();
        let outcome = watcher
            .await_confirmation(&account(), 5, &CancelFlag::new())
            .await
            .unwrap();

        assert_eq!(outcome, Confirmation::Confirmed { seqno: 6 });
        assert_eq!(started.elapsed(), Duration::from_secs(5));
        assert_eq!(chain.seqno_reads(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_errors_do_not_abort() {
        let chain = Arc::new(
            MockChainRpc::new()
                .with_seqno(&account(), 9)
                .fail_next_polls(3, ChainError::Network("timeout".into())),
        );
        let (log, watcher) = watcher(chain.clone());
        let watcher = watcher.with_timing(Duration::from_secs(20), Duration::from_secs(5));

        let outcome = watcher
            .await_confirmation(&account(), 8, &CancelFlag::new())
            .await
            .unwrap();

        assert_eq!(outcome, Confirmation::Confirmed { seqno: 9 });
        assert_eq!(chain.seqno_reads(), 4);
        let warnings = log
            .snapshot()
            .iter()
            .filter(|e| e.severity == Severity::Warning)
            .count();
        assert_eq!(warnings, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_poll_does_not_overrun_deadline() {
        let chain = Arc::new(
            MockChainRpc::new()
                .with_seqno(&account(), 3)
                .with_read_latency(Duration::from_secs(20)),
        );
        let (log, watcher) = watcher(chain.clone());
        let watcher = watcher.with_timing(Duration::from_secs(30), Duration::from_secs(5));

        let started = Instant::now();
        let outcome = watcher
            .await_confirmation(&account(), 3, &CancelFlag::new())
            .await
            .unwrap();

        // Reads at 5s (answers at 25s) and 30s (cut off at the deadline).
        assert_eq!(outcome, Confirmation::TimedOut { last_seen: Some(3) });
        assert_eq!(started.elapsed(), Duration::from_secs(30));
        assert_eq!(chain.seqno_reads(), 1);
        assert_eq!(log.snapshot().last().unwrap().severity, Severity::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_between_polls() {
        let chain = Arc::new(MockChainRpc::new().never_confirm());
        let (_, watcher) = watcher(chain);
        let cancel = CancelFlag::new();
        cancel.cancel();

        let err = watcher
            .await_confirmation(&account(), 0, &cancel)
            .await
            .unwrap_err();
        assert_eq!(err, SwapError::Cancelled);
    }
}
