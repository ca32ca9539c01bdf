pub mod assets;
pub mod cycles;
pub mod health;
pub mod logs;
pub mod swap;
pub mod wallet;

use crate::chain::ChainRpc;
use crate::config::Config;
use crate::datasource::{AssetCatalog, AssetDirectory};
use crate::db::Repository;
use crate::domain::{Address, Asset, EventLog};
use crate::engine::{
    ConfirmationWatcher, QuoteAdapter, SwapExecutor, TransactionBuilder, WalletSigner,
};
use crate::error::AppError;
use crate::orchestration::{CycleOrchestrator, OrchestratorSettings, RunManager};
use crate::wallet::{SecretStore, VaultError, WalletSession};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub config: Config,
    pub catalog: Arc<AssetCatalog>,
    pub session: WalletSession,
    pub runs: Arc<RunManager>,
    pub log: Arc<EventLog>,
}

impl AppState {
    pub fn new(
        repo: Arc<Repository>,
        config: Config,
        catalog: Arc<AssetCatalog>,
        session: WalletSession,
        runs: Arc<RunManager>,
    ) -> Self {
        let log = runs.orchestrator().log().clone();
        Self {
            repo,
            config,
            catalog,
            session,
            runs,
            log,
        }
    }

    /// Wire the swap pipeline, orchestrator and run manager from `config`
    /// on top of the given directory and chain clients.
    pub fn from_config(
        config: Config,
        repo: Arc<Repository>,
        directory: Arc<dyn AssetDirectory>,
        chain: Arc<dyn ChainRpc>,
    ) -> Result<Self, VaultError> {
        let log = Arc::new(EventLog::with_capacity(config.event_log_capacity));
        let store: Arc<dyn SecretStore> = repo.clone();
        let session = WalletSession::new(
            store,
            &config.wallet_encryption_key,
            config.wallet_address.clone(),
        )?;

        let executor = SwapExecutor::new(
            QuoteAdapter::new(directory.clone(), config.referral.clone()),
            TransactionBuilder::new(chain.clone(), config.referral.clone()),
            WalletSigner::new(session.clone(), chain.clone(), log.clone()),
            ConfirmationWatcher::new(chain, log.clone())
                .with_timing(config.confirmation_timeout, config.confirmation_poll),
            log,
        );
        let settings = OrchestratorSettings {
            min_inter_op_delay: config.min_inter_op_delay,
            rate_limit_cooldown: config.rate_limit_cooldown,
            max_rate_limit_retries: config.max_rate_limit_retries,
        };
        let orchestrator = Arc::new(CycleOrchestrator::new(executor, settings));
        let runs = Arc::new(RunManager::new(orchestrator, Some(repo.as_ref().clone())));
        let catalog = Arc::new(AssetCatalog::new(directory, config.asset_cache_ttl));

        Ok(Self::new(repo, config, catalog, session, runs))
    }

    /// Look up a tradable asset by contract address.
    pub async fn resolve_asset(&self, address: &str) -> Result<Asset, AppError> {
        let address = Address::new(address.trim().to_string());
        self.catalog
            .find(&address)
            .await
            .map_err(|e| AppError::BadGateway(e.to_string()))?
            .ok_or_else(|| AppError::NotFound(format!("Unknown asset {}", address)))
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/assets", get(assets::list_assets))
        .route("/v1/quote", post(swap::quote))
        .route("/v1/swap/prepare", post(swap::prepare))
        .route("/v1/swap/execute", post(swap::execute))
        .route(
            "/v1/wallet",
            get(wallet::get_wallet).delete(wallet::delete_wallet),
        )
        .route("/v1/wallet/import", post(wallet::import_wallet))
        .route("/v1/cycles", post(cycles::start_cycles))
        .route("/v1/cycles/status", get(cycles::get_status))
        .route("/v1/cycles/cancel", post(cycles::cancel_cycles))
        .route("/v1/logs", get(logs::get_logs).delete(logs::clear_logs))
        .route("/v1/runs", get(logs::list_runs))
        .route("/v1/runs/:id", get(logs::get_run))
        .route("/v1/runs/:id/logs", get(logs::get_run_logs))
        .layer(cors)
        .with_state(state)
}
