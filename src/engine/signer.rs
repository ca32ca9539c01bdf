use super::retry::{with_backoff, RetryPolicy};
use crate::chain::message::MESSAGE_TTL_SECS;
use crate::chain::{ChainError, ChainRpc, ExternalMessage};
use crate::domain::{Address, EventLog, TransactionDescriptor};
use crate::error::SwapError;
use crate::wallet::WalletSession;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Outcome of a broadcast: which wallet sent it and the sequence number it
/// was signed against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    pub wallet: Address,
    pub seqno_before: u64,
    pub message_hash: String,
}

/// Signs transactions with the session's wallet and broadcasts them.
#[derive(Debug, Clone)]
pub struct WalletSigner {
    session: WalletSession,
    chain: Arc<dyn ChainRpc>,
    log: Arc<EventLog>,
    submit_policy: RetryPolicy,
}

impl WalletSigner {
    pub fn new(session: WalletSession, chain: Arc<dyn ChainRpc>, log: Arc<EventLog>) -> Self {
        Self {
            session,
            chain,
            log,
            submit_policy: RetryPolicy::exponential(3, Duration::from_secs(3)),
        }
    }

    pub fn session(&self) -> &WalletSession {
        &self.session
    }

    /// Sign `tx` against the wallet's current sequence number and broadcast it.
    ///
    /// The broadcast is only repeated when the RPC explicitly refused it for
    /// rate limiting; any other failure leaves the outcome to the caller.
    pub async fn sign_and_submit(
        &self,
        tx: TransactionDescriptor,
    ) -> Result<SubmissionReceipt, SwapError> {
        let keys = self.session.load().await?;
        let wallet = self.session.require_address()?.clone();

        let seqno = self.chain.get_sequence_number(&wallet).await?;
        self.log.info(format!("Current seqno: {}", seqno));

        let valid_until = Utc::now().timestamp() + MESSAGE_TTL_SECS;
        let signed = ExternalMessage::new(wallet.clone(), &keys.public_key(), seqno, valid_until, tx)
            .sign(keys.signing_key());
        drop(keys);

        self.log.info("Sending transaction to blockchain...");
        let max_retries = self.submit_policy.max_retries;
        let ack = with_backoff(
            &self.submit_policy,
            |_| self.chain.submit(&signed),
            |e: &ChainError| *e == ChainError::RateLimited,
            |_, retry, delay| {
                self.log.warning(format!(
                    "Rate limited. Retrying in {}ms... (attempt {}/{})",
                    delay.as_millis(),
                    retry,
                    max_retries
                ));
            },
        )
        .await
        .map_err(|e| match e {
            ChainError::RateLimited => {
                SwapError::RateLimited("transaction submission".to_string())
            }
            other => SwapError::SubmissionError(other.to_string()),
        })?;

        debug!("Message {} accepted for seqno {}", ack.message_hash, seqno);
        self.log.success("Transaction sent to mempool!");
        self.log.info(format!("Wallet: {}", wallet));

        Ok(SubmissionReceipt {
            wallet,
            seqno_before: seqno,
            message_hash: ack.message_hash,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::MockChainRpc;
    use crate::domain::Units;
    use crate::wallet::MemorySecretStore;

    const PHRASE: &str = "abandon ability able about above absent absorb abstract absurd abuse access accident";

    fn wallet() -> Address {
        Address::new("EQwallet".into())
    }

    fn tx() -> TransactionDescriptor {
        TransactionDescriptor {
            destination: Address::new("EQdest".into()),
            native_value: Units(300_000_000),
            payload: vec![1, 2, 3],
        }
    }

    async fn signer(chain: Arc<MockChainRpc>, import: bool) -> WalletSigner {
        let session =
            WalletSession::new(Arc::new(MemorySecretStore::new()), "pw", Some(wallet())).unwrap();
        if import {
            session.import(PHRASE).await.unwrap();
        }
        WalletSigner::new(session, chain, Arc::new(EventLog::new()))
    }

    #[tokio::test]
    async fn test_signs_with_current_seqno() {
        let chain = Arc::new(MockChainRpc::new().with_seqno(&wallet(), 41));
        let signer = signer(chain.clone(), true).await;

        let receipt = signer.sign_and_submit(tx()).await.unwrap();
        assert_eq!(receipt.seqno_before, 41);
        assert_eq!(receipt.wallet, wallet());

        let submissions = chain.submissions();
        assert_eq!(submissions.len(), 1);
        assert!(submissions[0].verify());
        assert_eq!(submissions[0].body.seqno, 41);
        assert_eq!(submissions[0].hash().unwrap(), receipt.message_hash);
    }

    #[tokio::test]
    async fn test_without_wallet_is_not_loaded() {
        let chain = Arc::new(MockChainRpc::new());
        let signer = signer(chain.clone(), false).await;
        let err = signer.sign_and_submit(tx()).await.unwrap_err();
        assert_eq!(err, SwapError::WalletNotLoaded);
        assert!(chain.submissions().is_empty());
    }

    #[tokio::test]
    async fn test_rejection_is_submission_error_without_retry() {
        let chain = Arc::new(
            MockChainRpc::new().fail_next_submit(ChainError::Rejected("bad seqno".into())),
        );
        let signer = signer(chain.clone(), true).await;
        let err = signer.sign_and_submit(tx()).await.unwrap_err();
        assert!(matches!(err, SwapError::SubmissionError(_)));
        assert!(chain.submissions().is_empty());
    }

    #[tokio::test]
    async fn test_network_failure_is_not_retried() {
        let chain = Arc::new(
            MockChainRpc::new()
                .fail_next_submit(ChainError::Network("reset".into()))
                .fail_next_submit(ChainError::Network("reset".into())),
        );
        let signer = signer(chain.clone(), true).await;
        assert!(signer.sign_and_submit(tx()).await.is_err());
        // The second scripted failure is still queued.
        assert!(signer.sign_and_submit(tx()).await.is_err());
        assert!(signer.sign_and_submit(tx()).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_submit_is_retried() {
        let chain = Arc::new(
            MockChainRpc::new()
                .fail_next_submit(ChainError::RateLimited)
                .fail_next_submit(ChainError::RateLimited),
        );
        let signer = signer(chain.clone(), true).await;
        let receipt = signer.sign_and_submit(tx()).await.unwrap();
        assert_eq!(receipt.seqno_before, 0);
        assert_eq!(chain.submissions().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistent_rate_limit_surfaces_as_rate_limited() {
        let mut chain = MockChainRpc::new();
        for _ in 0..4 {
            chain = chain.fail_next_submit(ChainError::RateLimited);
        }
        let signer = signer(Arc::new(chain), true).await;
        let err = signer.sign_and_submit(tx()).await.unwrap_err();
        assert!(err.is_rate_limited());
    }
}
