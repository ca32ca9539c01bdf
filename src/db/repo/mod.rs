//! Repository layer for database operations.
//!
//! Methods are organized across submodules by domain:
//! - `secrets.rs` - Key-value storage backing the wallet vault
//! - `runs.rs` - Cycle run history and per-run event logs

mod runs;
mod secrets;

use crate::domain::Decimal;
use crate::orchestration::RunPhase;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::SqlitePool;
use std::str::FromStr;
use tracing::warn;
use uuid::Uuid;

/// A persisted cycle run, as listed in the run history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
    pub id: Uuid,
    pub token_address: String,
    pub token_symbol: String,
    pub stable_address: String,
    pub stable_symbol: String,
    pub amount_per_cycle: Decimal,
    pub cycle_count: u32,
    pub slippage: Decimal,
    pub status: RunPhase,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub end_amount: Option<Decimal>,
    pub total_slippage_buffer: Option<Decimal>,
    pub completed_cycles: u32,
    pub rate_limit_retries: u32,
    pub error: Option<String>,
    pub failed_cycle: Option<u32>,
    /// Full run summary; only populated when a single run is fetched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<serde_json::Value>,
}

/// Repository for database operations.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn parse_decimal(column: &str, raw: &str) -> Decimal {
    Decimal::from_str(raw).unwrap_or_else(|e| {
        warn!(
            column = %column,
            value = %raw,
            error = %e,
            "Failed to parse stored decimal, using default"
        );
        Decimal::default()
    })
}

fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(ms).unwrap_or_default()
}
