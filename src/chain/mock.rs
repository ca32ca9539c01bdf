//! In-memory chain for tests: accepts submissions and advances the sender's
//! sequence number after a configurable number of polls.

use super::{ChainError, ChainRpc, SignedMessage, SubmitAck};
use crate::domain::Address;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Default)]
struct MockChainState {
    seqnos: HashMap<Address, u64>,
    /// Accounts with a submitted message, and polls left before it lands.
    pending: HashMap<Address, u32>,
    confirm_after_polls: u32,
    never_confirm: bool,
    poll_failures: VecDeque<ChainError>,
    submit_failures: VecDeque<ChainError>,
    submissions: Vec<SignedMessage>,
    seqno_reads: usize,
    read_latency: Duration,
}

#[derive(Debug, Default)]
pub struct MockChainRpc {
    state: Mutex<MockChainState>,
}

impl MockChainRpc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seqno(self, account: &Address, seqno: u64) -> Self {
        self.lock().seqnos.insert(account.clone(), seqno);
        self
    }

    /// Number of sequence-number reads after a submission that still report
    /// the old value. `0` means the first read after submitting sees it land.
    pub fn confirm_after_polls(self, polls: u32) -> Self {
        self.lock().confirm_after_polls = polls;
        self
    }

    /// Accept submissions but never advance the sequence number.
    pub fn never_confirm(self) -> Self {
        self.lock().never_confirm = true;
        self
    }

    /// Fail the next sequence-number reads with `error`, once per queued entry.
    pub fn fail_next_polls(self, count: usize, error: ChainError) -> Self {
        {
            let mut state = self.lock();
            for _ in 0..count {
                state.poll_failures.push_back(error.clone());
            }
        }
        self
    }

    /// Pretend a message from `account` is already in flight and lands
    /// after `polls` further reads.
    pub fn with_pending_message(self, account: &Address, polls: u32) -> Self {
        self.lock().pending.insert(account.clone(), polls);
        self
    }

    /// Make every sequence-number read take `latency` before answering.
    pub fn with_read_latency(self, latency: Duration) -> Self {
        self.lock().read_latency = latency;
        self
    }

    pub fn fail_next_submit(self, error: ChainError) -> Self {
        self.lock().submit_failures.push_back(error);
        self
    }

    pub fn submissions(&self) -> Vec<SignedMessage> {
        self.lock().submissions.clone()
    }

    pub fn seqno(&self, account: &Address) -> u64 {
        self.lock().seqnos.get(account).copied().unwrap_or(0)
    }

    pub fn seqno_reads(&self) -> usize {
        self.lock().seqno_reads
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockChainState> {
        self.state.lock().expect("mock chain lock")
    }
}

#[async_trait]
impl ChainRpc for MockChainRpc {
    async fn get_sequence_number(&self, account: &Address) -> Result<u64, ChainError> {
        let latency = self.lock().read_latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.lock();
        state.seqno_reads += 1;
        if let Some(err) = state.poll_failures.pop_front() {
            return Err(err);
        }

        if let Some(remaining) = state.pending.get(account).copied() {
            if remaining == 0 {
                state.pending.remove(account);
                *state.seqnos.entry(account.clone()).or_insert(0) += 1;
            } else {
                state.pending.insert(account.clone(), remaining - 1);
            }
        }

        Ok(state.seqnos.get(account).copied().unwrap_or(0))
    }

    async fn submit(&self, message: &SignedMessage) -> Result<SubmitAck, ChainError> {
        let mut state = self.lock();
        if let Some(err) = state.submit_failures.pop_front() {
            return Err(err);
        }

        let message_hash = message.hash()?;
        state.submissions.push(message.clone());
        if !state.never_confirm {
            let polls = state.confirm_after_polls;
            state.pending.insert(message.body.wallet.clone(), polls);
        }
        Ok(SubmitAck { message_hash })
    }

    async fn jetton_wallet_address(
        &self,
        minter: &Address,
        owner: &Address,
    ) -> Result<Address, ChainError> {
        Ok(Address::new(format!("jw:{}:{}", minter, owner)))
    }
}
