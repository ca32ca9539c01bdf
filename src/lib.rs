pub mod api;
pub mod chain;
pub mod config;
pub mod datasource;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;
pub mod wallet;

pub use chain::{ChainError, ChainRpc, MockChainRpc, TonCenterRpc};
pub use config::Config;
pub use datasource::{
    AssetCatalog, AssetDirectory, DataSourceError, MockAssetDirectory, StonFiDataSource,
};
pub use db::{init_db, Repository};
pub use domain::{Address, Asset, AssetKind, Decimal, EventLog, LogEntry, Severity, Units};
pub use engine::{CancelFlag, SwapExecutor};
pub use error::{AppError, SwapError};
pub use orchestration::{CycleConfig, CycleOrchestrator, CycleSummary, RunManager};
pub use wallet::WalletSession;
