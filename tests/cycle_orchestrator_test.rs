use std::sync::Arc;
use std::time::Duration;
use swapcycler::chain::MockChainRpc;
use swapcycler::datasource::{DataSourceError, MockAssetDirectory};
use swapcycler::domain::{
    Address, Asset, AssetKind, Decimal, EventLog, Side, SlippageTolerance, Units,
};
use swapcycler::engine::{
    CancelFlag, ConfirmationWatcher, QuoteAdapter, SwapExecutor, TransactionBuilder, WalletSigner,
};
use swapcycler::error::SwapError;
use swapcycler::orchestration::{
    CycleConfig, CycleOrchestrator, CycleStep, OrchestratorSettings, RunManager, RunPhase,
};
use swapcycler::wallet::{MemorySecretStore, WalletSession};

const PHRASE: &str =
    "abandon ability able about above absent absorb abstract absurd abuse access accident";

fn d(s: &str) -> Decimal {
    Decimal::from_str_canonical(s).unwrap()
}

fn usdt() -> Asset {
    Asset::new(Address::new("EQusdt".into()), "USDT", 6, AssetKind::Token)
}

fn ton() -> Asset {
    Asset::new(Address::new("EQton".into()), "TON", 9, AssetKind::Native)
}

fn wallet() -> Address {
    Address::new("EQwallet".into())
}

/// 1 USDT buys 0.5 TON; 1 TON sells for 1.98 USDT, so each cycle loses 1%.
fn directory() -> MockAssetDirectory {
    MockAssetDirectory::new()
        .with_rate(&usdt().contract_address, &ton().contract_address, 500, 1)
        .with_rate(&ton().contract_address, &usdt().contract_address, 99, 50_000)
}

fn config(cycles: u32) -> CycleConfig {
    CycleConfig {
        token: ton(),
        stable_asset: usdt(),
        amount_per_cycle: d("10"),
        cycle_count: cycles,
        inter_op_delay: Duration::from_secs(20),
        slippage: SlippageTolerance::new(d("0.01")).unwrap(),
    }
}

struct Harness {
    orchestrator: CycleOrchestrator,
    directory: Arc<MockAssetDirectory>,
    chain: Arc<MockChainRpc>,
    log: Arc<EventLog>,
}

async fn harness(directory: MockAssetDirectory, settings: OrchestratorSettings) -> Harness {
    let directory = Arc::new(directory);
    let chain = Arc::new(MockChainRpc::new());
    let log = Arc::new(EventLog::new());
    let session =
        WalletSession::new(Arc::new(MemorySecretStore::new()), "pw", Some(wallet())).unwrap();
    session.import(PHRASE).await.unwrap();

    let executor = SwapExecutor::new(
        QuoteAdapter::new(directory.clone(), None),
        TransactionBuilder::new(chain.clone(), None),
        WalletSigner::new(session, chain.clone(), log.clone()),
        ConfirmationWatcher::new(chain.clone(), log.clone()),
        log.clone(),
    );

    Harness {
        orchestrator: CycleOrchestrator::new(executor, settings),
        directory,
        chain,
        log,
    }
}

fn messages(log: &EventLog) -> Vec<String> {
    log.snapshot().into_iter().map(|e| e.message).collect()
}

#[tokio::test(start_paused = true)]
async fn test_three_cycles_chain_six_alternating_legs() {
    let h = harness(directory(), OrchestratorSettings::default()).await;
    let mut progress = h.orchestrator.subscribe();

    let summary = h
        .orchestrator
        .run_cycles(&config(3), &CancelFlag::new())
        .await
        .unwrap();

    assert_eq!(summary.outcome, RunPhase::Completed);
    assert_eq!(summary.completed_cycles, 3);
    assert_eq!(summary.legs_executed(), 6);
    assert!(summary.error.is_none());

    let sides: Vec<Side> = summary.legs.iter().map(|l| l.side).collect();
    assert_eq!(
        sides,
        vec![Side::Buy, Side::Sell, Side::Buy, Side::Sell, Side::Buy, Side::Sell]
    );

    // Each leg's input is the previous leg's expected output.
    for pair in summary.legs.windows(2) {
        assert_eq!(pair[1].amount_in, pair[0].expected_out);
    }
    let offered: Vec<Units> = h.directory.requests().iter().map(|r| r.offer_units).collect();
    assert_eq!(
        offered,
        vec![
            Units(10_000_000),
            Units(5_000_000_000),
            Units(9_900_000),
            Units(4_950_000_000),
            Units(9_801_000),
            Units(4_900_500_000),
        ]
    );

    assert_eq!(summary.start_amount, d("10"));
    assert_eq!(summary.end_amount, d("9.70299"));
    assert_eq!(summary.difference, d("-0.29701"));
    assert_eq!(summary.difference_percent, d("-2.9701"));
    // Sum of expected - min on the three stable legs.
    assert_eq!(summary.total_slippage_buffer, d("0.29404"));

    assert_eq!(h.chain.submissions().len(), 6);
    assert_eq!(h.chain.seqno(&wallet()), 6);

    let state = progress.borrow_and_update().clone();
    assert_eq!(state.phase, RunPhase::Completed);
    assert_eq!(state.step, CycleStep::Idle);
    assert_eq!(state.legs_executed, 6);

    let log = messages(&h.log);
    assert!(log.contains(&"[Cycle 1/3] Step 1: Buying TON".to_string()));
    assert!(log.contains(&"[Cycle 3/3] Step 2: Selling back to USDT".to_string()));
    assert!(log.contains(&"Cycle 2 complete. Balance: 9.8010 USDT".to_string()));
    assert!(log.contains(&"Started with: 10.0000 USDT".to_string()));
    assert!(log.contains(&"Ended with: 9.7030 USDT".to_string()));
    assert!(log.iter().any(|m| m.starts_with("Difference: -0.2970 USDT")));
}

#[tokio::test(start_paused = true)]
async fn test_inter_op_delay_has_a_floor() {
    let h = harness(directory(), OrchestratorSettings::default()).await;
    let mut config = config(2);
    config.inter_op_delay = Duration::from_secs(1);

    h.orchestrator
        .run_cycles(&config, &CancelFlag::new())
        .await
        .unwrap();

    let log = messages(&h.log);
    assert!(log.contains(&"Delay: 15s".to_string()));
    assert!(log.contains(&"Pausing 15s before next swap...".to_string()));
    assert!(log.contains(&"Pausing 15s before next cycle...".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_retries_cycle_without_counting_it() {
    // Call 1 is the sell quote of cycle 1.
    let directory = directory().fail_simulation_at(1, DataSourceError::RateLimited);
    let h = harness(directory, OrchestratorSettings::default()).await;

    let started = tokio::time::Instant::now();
    let summary = h
        .orchestrator
        .run_cycles(&config(3), &CancelFlag::new())
        .await
        .unwrap();

    assert_eq!(summary.outcome, RunPhase::Completed);
    assert_eq!(summary.completed_cycles, 3);
    assert_eq!(summary.rate_limit_retries, 1);
    assert!(started.elapsed() >= Duration::from_secs(30));

    // The retried cycle re-runs from the buy with the same input amount.
    let requests = h.directory.requests();
    assert_eq!(requests[2].offer_units, Units(10_000_000));
    assert_eq!(requests[2].offer_address, usdt().contract_address);
    assert_eq!(summary.end_amount, d("9.70299"));

    // The buy executed before the rate limit stays on record.
    assert_eq!(summary.legs_executed(), 7);
    assert_eq!(
        summary.legs.iter().filter(|l| l.cycle == 1).count(),
        3
    );

    let log = messages(&h.log);
    assert!(log.contains(&"Rate limit hit. Waiting 30s...".to_string()));
    assert!(log
        .iter()
        .any(|m| m.starts_with("Cycle 1 failed: Rate limit hit")));
}

#[tokio::test(start_paused = true)]
async fn test_other_errors_abort_with_partial_summary() {
    // Call 2 is the buy quote of cycle 2.
    let directory = directory().fail_simulation_at(
        2,
        DataSourceError::HttpError {
            status: 500,
            message: "Internal error".into(),
        },
    );
    let h = harness(directory, OrchestratorSettings::default()).await;

    let summary = h
        .orchestrator
        .run_cycles(&config(3), &CancelFlag::new())
        .await
        .unwrap();

    assert_eq!(summary.outcome, RunPhase::Aborted);
    assert_eq!(summary.completed_cycles, 1);
    assert_eq!(summary.failed_cycle, Some(2));
    assert_eq!(summary.legs_executed(), 2);
    assert_eq!(summary.end_amount, d("9.9"));
    assert!(summary.error.unwrap().starts_with("Quote unavailable"));
    assert_eq!(h.orchestrator.state().phase, RunPhase::Aborted);

    let log = messages(&h.log);
    assert!(log.iter().any(|m| m.starts_with("Error at cycle 2:")));
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_retries_are_capped_per_run() {
    let directory = directory()
        .fail_simulation_at(0, DataSourceError::RateLimited)
        .fail_simulation_at(1, DataSourceError::RateLimited)
        .fail_simulation_at(2, DataSourceError::RateLimited);
    let settings = OrchestratorSettings {
        max_rate_limit_retries: 2,
        ..OrchestratorSettings::default()
    };
    let h = harness(directory, settings).await;

    let summary = h
        .orchestrator
        .run_cycles(&config(2), &CancelFlag::new())
        .await
        .unwrap();

    assert_eq!(summary.outcome, RunPhase::Aborted);
    assert_eq!(summary.rate_limit_retries, 2);
    assert_eq!(summary.completed_cycles, 0);
    assert_eq!(summary.failed_cycle, Some(1));
    assert_eq!(h.directory.requests().len(), 3);
    assert!(h.chain.submissions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_run_stops_before_any_leg() {
    let h = harness(directory(), OrchestratorSettings::default()).await;
    let cancel = CancelFlag::new();
    cancel.cancel();

    let summary = h.orchestrator.run_cycles(&config(3), &cancel).await.unwrap();

    assert_eq!(summary.outcome, RunPhase::Aborted);
    assert_eq!(summary.legs_executed(), 0);
    assert_eq!(summary.error.as_deref(), Some("Run cancelled"));
    assert!(h.directory.requests().is_empty());
}

#[tokio::test]
async fn test_invalid_config_is_rejected_before_running() {
    let h = harness(directory(), OrchestratorSettings::default()).await;
    let mut config = config(0);

    assert!(h
        .orchestrator
        .run_cycles(&config, &CancelFlag::new())
        .await
        .is_err());

    config.cycle_count = 1;
    config.amount_per_cycle = Decimal::zero();
    assert!(h
        .orchestrator
        .run_cycles(&config, &CancelFlag::new())
        .await
        .is_err());
    assert!(h.log.is_empty());
    assert_eq!(h.orchestrator.state().phase, RunPhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_run_manager_allows_one_run_at_a_time() {
    let h = harness(directory(), OrchestratorSettings::default()).await;
    let manager = RunManager::new(Arc::new(h.orchestrator), None);

    let first = manager.start(config(2)).await.unwrap();
    let err = manager.start(config(1)).await.unwrap_err();
    assert_eq!(
        err,
        SwapError::ValidationError("A run is already in progress".to_string())
    );
    assert!(manager.status().await.active);

    let summary = manager.wait().await.unwrap();
    assert_eq!(summary.completed_cycles, 2);

    let status = manager.status().await;
    assert!(!status.active);
    assert_eq!(status.run_id, Some(first.id));
    assert_eq!(status.last_summary.unwrap().completed_cycles, 2);

    let second = manager.start(config(1)).await.unwrap();
    assert_ne!(second.id, first.id);
    assert_eq!(manager.wait().await.unwrap().completed_cycles, 1);
}

#[tokio::test(start_paused = true)]
async fn test_run_manager_cancel() {
    let h = harness(directory(), OrchestratorSettings::default()).await;
    let manager = RunManager::new(Arc::new(h.orchestrator), None);

    assert_eq!(manager.cancel().await, None);
    let run = manager.start(config(3)).await.unwrap();
    assert_eq!(manager.cancel().await, Some(run.id));

    let summary = manager.wait().await.unwrap();
    assert_eq!(summary.outcome, RunPhase::Aborted);
    assert_eq!(summary.error.as_deref(), Some("Run cancelled"));
    assert!(h.chain.submissions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_run_manager_wallet_lease_is_exclusive() {
    let h = harness(directory(), OrchestratorSettings::default()).await;
    let manager = RunManager::new(Arc::new(h.orchestrator), None);

    let lease = manager.claim_wallet().unwrap();
    assert!(manager.wallet_busy());
    assert!(matches!(manager.claim_wallet(), Err(SwapError::WalletBusy(_))));
    assert!(matches!(
        manager.start(config(1)).await,
        Err(SwapError::WalletBusy(_))
    ));
    assert!(!manager.status().await.active);
    drop(lease);

    manager.start(config(1)).await.unwrap();
    assert!(matches!(manager.claim_wallet(), Err(SwapError::WalletBusy(_))));

    assert_eq!(manager.wait().await.unwrap().completed_cycles, 1);
    assert!(!manager.wallet_busy());
    assert!(manager.claim_wallet().is_ok());
}
