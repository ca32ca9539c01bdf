use super::{
    CancelFlag, Confirmation, ConfirmationWatcher, QuoteAdapter, SubmissionReceipt,
    TransactionBuilder, WalletSigner,
};
use crate::domain::{Asset, Decimal, EventLog, SlippageTolerance};
use crate::error::SwapError;
use serde::Serialize;
use std::sync::Arc;

/// A confirmed leg: what was offered, what the quote promised, and where it
/// landed on chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegResult {
    pub amount_in: Decimal,
    pub expected_out: Decimal,
    pub min_out: Decimal,
    pub slippage_buffer: Decimal,
    pub receipt: SubmissionReceipt,
    pub confirmed_seqno: u64,
}

/// Runs one automatic swap end to end:
/// quote → build → sign → submit → confirm.
#[derive(Debug, Clone)]
pub struct SwapExecutor {
    quotes: QuoteAdapter,
    builder: TransactionBuilder,
    signer: WalletSigner,
    watcher: ConfirmationWatcher,
    log: Arc<EventLog>,
}

impl SwapExecutor {
    pub fn new(
        quotes: QuoteAdapter,
        builder: TransactionBuilder,
        signer: WalletSigner,
        watcher: ConfirmationWatcher,
        log: Arc<EventLog>,
    ) -> Self {
        Self {
            quotes,
            builder,
            signer,
            watcher,
            log,
        }
    }

    pub fn quotes(&self) -> &QuoteAdapter {
        &self.quotes
    }

    pub fn builder(&self) -> &TransactionBuilder {
        &self.builder
    }

    pub fn log(&self) -> &Arc<EventLog> {
        &self.log
    }

    /// Swap `amount` of `offer` into `ask` and wait for confirmation.
    ///
    /// A leg that is not confirmed within the watcher's timeout fails with
    /// [`SwapError::ConfirmationTimeout`].
    pub async fn execute_leg(
        &self,
        offer: &Asset,
        ask: &Asset,
        amount: Decimal,
        slippage: SlippageTolerance,
        cancel: &CancelFlag,
    ) -> Result<LegResult, SwapError> {
        let session = self.signer.session();
        let sender = session.require_address()?.clone();
        if !session.is_loaded().await? {
            return Err(SwapError::WalletNotLoaded);
        }

        let quote = self.quotes.get_quote(offer, ask, amount, slippage).await?;
        let expected_out = quote.expected_out()?;
        let min_out = quote.min_out()?;
        let slippage_buffer = quote.slippage_buffer()?;

        self.log.info(format!(
            "Swap: {} {} → {} {}",
            amount.to_fixed(2),
            offer.label(),
            expected_out.to_fixed(4),
            ask.label()
        ));
        self.log.info(format!(
            "Slippage buffer ({}%): may get as low as {} {} (buffer {})",
            slippage.as_percent().to_canonical_string(),
            min_out.to_fixed(4),
            ask.label(),
            slippage_buffer.to_fixed(4)
        ));

        let tx = self.builder.build_transaction(quote, &sender).await?;

        if cancel.is_cancelled() {
            return Err(SwapError::Cancelled);
        }
        self.log.info("Auto-signing transaction...");
        let receipt = self.signer.sign_and_submit(tx).await?;

        self.log.info("Waiting for transaction confirmation...");
        match self
            .watcher
            .await_confirmation(&receipt.wallet, receipt.seqno_before, cancel)
            .await?
        {
            Confirmation::Confirmed { seqno } => Ok(LegResult {
                amount_in: amount,
                expected_out,
                min_out,
                slippage_buffer,
                receipt,
                confirmed_seqno: seqno,
            }),
            Confirmation::TimedOut { last_seen } => {
                self.log.warning(format!(
                    "Please check the transaction status for wallet {}",
                    receipt.wallet
                ));
                Err(SwapError::ConfirmationTimeout {
                    timeout_ms: self.watcher.timeout().as_millis() as u64,
                    last_seen,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::MockChainRpc;
    use crate::datasource::MockAssetDirectory;
    use crate::domain::{Address, AssetKind, Units};
    use crate::wallet::{MemorySecretStore, WalletSession};
    use std::time::Duration;

    const PHRASE: &str = "abandon ability able about above absent absorb abstract absurd abuse access accident";

    fn usdt() -> Asset {
        Asset::new(Address::new("EQusdt".into()), "USDT", 6, AssetKind::Token)
    }

    fn ton() -> Asset {
        Asset::new(Address::new("EQton".into()), "TON", 9, AssetKind::Native)
    }

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn wallet() -> Address {
        Address::new("EQwallet".into())
    }

    async fn executor(chain: Arc<MockChainRpc>, import: bool) -> SwapExecutor {
        let log = Arc::new(EventLog::new());
        let directory = MockAssetDirectory::new()
            // 1 USDT (1e6 units) → 0.5 TON (5e8 units)
            .with_rate(&usdt().contract_address, &ton().contract_address, 500, 1);
        let session =
            WalletSession::new(Arc::new(MemorySecretStore::new()), "pw", Some(wallet())).unwrap();
        if import {
            session.import(PHRASE).await.unwrap();
        }
        SwapExecutor::new(
            QuoteAdapter::new(Arc::new(directory), None),
            TransactionBuilder::new(chain.clone(), None),
            WalletSigner::new(session, chain.clone(), log.clone()),
            ConfirmationWatcher::new(chain, log.clone()),
            log,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_leg_confirms() {
        let chain = Arc::new(MockChainRpc::new().with_seqno(&wallet(), 3));
        let exec = executor(chain.clone(), true).await;

        let leg = exec
            .execute_leg(&usdt(), &ton(), d("10"), slippage(), &CancelFlag::new())
            .await
            .unwrap();

        assert_eq!(leg.expected_out, d("5"));
        assert_eq!(leg.min_out, d("4.95"));
        assert_eq!(leg.slippage_buffer, d("0.05"));
        assert_eq!(leg.receipt.seqno_before, 3);
        assert_eq!(leg.confirmed_seqno, 4);
        assert_eq!(chain.submissions()[0].body.messages[0].value, Units(300_000_000));

        let messages: Vec<String> = exec.log().snapshot().into_iter().map(|e| e.message).collect();
        assert!(messages.contains(&"Swap: 10.00 USDT → 5.0000 TON".to_string()));
        assert!(messages
            .iter()
            .any(|m| m.starts_with("Slippage buffer (1%): may get as low as 4.9500 TON")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unconfirmed_leg_is_timeout() {
        let chain = Arc::new(MockChainRpc::new().never_confirm());
        let exec = executor(chain, true).await;

        let err = exec
            .execute_leg(&usdt(), &ton(), d("10"), slippage(), &CancelFlag::new())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            SwapError::ConfirmationTimeout {
                timeout_ms: Duration::from_secs(90).as_millis() as u64,
                last_seen: Some(0),
            }
        );
    }

    #[tokio::test]
    async fn test_no_wallet_fails_before_quoting() {
        let chain = Arc::new(MockChainRpc::new());
        let exec = executor(chain.clone(), false).await;

        let err = exec
            .execute_leg(&usdt(), &ton(), d("10"), slippage(), &CancelFlag::new())
            .await
            .unwrap_err();
        assert_eq!(err, SwapError::WalletNotLoaded);
        assert!(chain.submissions().is_empty());
    }

    fn slippage() -> SlippageTolerance {
        SlippageTolerance::new(d("0.01")).unwrap()
    }
}
