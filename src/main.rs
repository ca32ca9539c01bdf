use swapcycler::chain::{ChainRpc, TonCenterRpc};
use swapcycler::datasource::{AssetDirectory, StonFiDataSource};
use swapcycler::{api, config::Config, db::init_db, Repository};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };
    if config.uses_placeholder_key() {
        tracing::warn!(
            "WALLET_ENCRYPTION_KEY is the sample placeholder value; set a unique key before storing a real wallet"
        );
    }
    if config.wallet_address.is_none() {
        tracing::warn!("WALLET_ADDRESS is not set; automatic swaps are disabled");
    }

    let port = config.port;

    // Initialize database and dependencies
    let pool = match init_db(&config.database_path).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to initialize database: {}", e);
            std::process::exit(1);
        }
    };

    let repo = Arc::new(Repository::new(pool));
    match repo.abort_interrupted_runs().await {
        Ok(0) => {}
        Ok(n) => tracing::warn!("Marked {} interrupted run(s) as aborted", n),
        Err(e) => tracing::warn!("Failed to mark interrupted runs: {}", e),
    }

    let directory: Arc<dyn AssetDirectory> =
        Arc::new(StonFiDataSource::new(config.ston_api_url.clone()));
    let chain: Arc<dyn ChainRpc> = Arc::new(TonCenterRpc::new(
        config.chain_rpc_url.clone(),
        config.chain_rpc_api_key.clone(),
    ));

    let state = match api::AppState::from_config(config, repo, directory, chain) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to initialize wallet session: {}", e);
            std::process::exit(1);
        }
    };
    state.log.success("System initialized. Ready for operations.");

    // Create router
    let app = api::create_router(state);

    // Bind to address
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!("Server listening on {}", addr);

    // Run server
    if let Err(e) = axum::serve(listener, app).await {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}
