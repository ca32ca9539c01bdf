//! Cycle run history and per-run event logs.

use crate::domain::{LogEntry, Severity};
use crate::orchestration::{CycleConfig, CycleSummary, RunPhase};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::str::FromStr;
use tracing::warn;
use uuid::Uuid;

use super::{from_millis, parse_decimal, Repository, RunRecord};

const RUN_COLUMNS: &str = r#"
    id, token_address, token_symbol, stable_address, stable_symbol,
    amount_per_cycle, cycle_count, slippage, status, started_at, finished_at,
    end_amount, total_slippage_buffer, completed_cycles, rate_limit_retries,
    error, failed_cycle
"#;

impl Repository {
    /// Record a run that has just started.
    pub async fn insert_run(
        &self,
        id: Uuid,
        config: &CycleConfig,
        started_at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO cycle_runs (
                id, token_address, token_symbol, stable_address, stable_symbol,
                amount_per_cycle, cycle_count, slippage, status, started_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(config.token.contract_address.as_str())
        .bind(config.token.label())
        .bind(config.stable_asset.contract_address.as_str())
        .bind(config.stable_asset.label())
        .bind(config.amount_per_cycle.to_canonical_string())
        .bind(config.cycle_count as i64)
        .bind(config.slippage.fraction().to_canonical_string())
        .bind(RunPhase::Running.as_str())
        .bind(started_at.timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Store the terminal outcome of a run.
    pub async fn finish_run(
        &self,
        id: Uuid,
        summary: &CycleSummary,
        finished_at: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let summary_json = serde_json::to_string(summary)
            .map_err(|e| warn!(run_id = %id, error = %e, "Failed to serialize run summary"))
            .ok();

        let result = sqlx::query(
            r#"
            UPDATE cycle_runs SET
                status = ?,
                finished_at = ?,
                end_amount = ?,
                total_slippage_buffer = ?,
                completed_cycles = ?,
                rate_limit_retries = ?,
                error = ?,
                failed_cycle = ?,
                summary_json = ?
            WHERE id = ?
            "#,
        )
        .bind(summary.outcome.as_str())
        .bind(finished_at.timestamp_millis())
        .bind(summary.end_amount.to_canonical_string())
        .bind(summary.total_slippage_buffer.to_canonical_string())
        .bind(summary.completed_cycles as i64)
        .bind(summary.rate_limit_retries as i64)
        .bind(summary.error.as_deref())
        .bind(summary.failed_cycle.map(i64::from))
        .bind(summary_json)
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Mark runs left in `running` by a previous process as aborted.
    ///
    /// Returns the number of rows touched.
    pub async fn abort_interrupted_runs(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE cycle_runs SET status = ?, finished_at = ?, error = ?
            WHERE status = ?
            "#,
        )
        .bind(RunPhase::Aborted.as_str())
        .bind(Utc::now().timestamp_millis())
        .bind("Interrupted by service restart")
        .bind(RunPhase::Running.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Most recent runs first.
    pub async fn list_runs(&self, limit: u32) -> Result<Vec<RunRecord>, sqlx::Error> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM cycle_runs ORDER BY started_at DESC, id ASC LIMIT ?",
            RUN_COLUMNS
        ))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(run_from_row).collect())
    }

    pub async fn get_run(&self, id: Uuid) -> Result<Option<RunRecord>, sqlx::Error> {
        let row = sqlx::query(&format!(
            "SELECT {}, summary_json FROM cycle_runs WHERE id = ?",
            RUN_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| {
            let mut record = run_from_row(&row);
            let summary_json: Option<String> = row.get("summary_json");
            record.summary = summary_json.and_then(|raw| serde_json::from_str(&raw).ok());
            record
        }))
    }

    /// Append a run's event log entries in one transaction, preserving order.
    pub async fn insert_run_logs(
        &self,
        run_id: Uuid,
        entries: &[LogEntry],
    ) -> Result<usize, sqlx::Error> {
        if entries.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let offset: i64 =
            sqlx::query("SELECT COALESCE(MAX(seq) + 1, 0) AS next FROM run_logs WHERE run_id = ?")
                .bind(run_id.to_string())
                .fetch_one(&mut *tx)
                .await?
                .get("next");

        let mut inserted = 0usize;
        for (i, entry) in entries.iter().enumerate() {
            let result = sqlx::query(
                r#"
                INSERT INTO run_logs (id, run_id, seq, timestamp_ms, severity, message)
                VALUES (?, ?, ?, ?, ?, ?)
                ON CONFLICT(id) DO NOTHING
                "#,
            )
            .bind(entry.id.to_string())
            .bind(run_id.to_string())
            .bind(offset + i as i64)
            .bind(entry.timestamp.timestamp_millis())
            .bind(entry.severity.as_str())
            .bind(entry.message.as_str())
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() > 0 {
                inserted += 1;
            }
        }

        tx.commit().await?;
        Ok(inserted)
    }

    pub async fn query_run_logs(&self, run_id: Uuid) -> Result<Vec<LogEntry>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, timestamp_ms, severity, message
            FROM run_logs
            WHERE run_id = ?
            ORDER BY seq ASC
            "#,
        )
        .bind(run_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        let entries = rows
            .iter()
            .map(|row| {
                let id: String = row.get("id");
                let severity: String = row.get("severity");
                LogEntry {
                    id: Uuid::parse_str(&id).unwrap_or_default(),
                    timestamp: from_millis(row.get("timestamp_ms")),
                    severity: Severity::from_str(&severity).unwrap_or_else(|e| {
                        warn!(error = %e, "Unknown stored severity, using info");
                        Severity::Info
                    }),
                    message: row.get("message"),
                }
            })
            .collect();

        Ok(entries)
    }
}

fn run_from_row(row: &SqliteRow) -> RunRecord {
    let id: String = row.get("id");
    let status: String = row.get("status");
    let end_amount: Option<String> = row.get("end_amount");
    let total_slippage_buffer: Option<String> = row.get("total_slippage_buffer");
    let finished_at: Option<i64> = row.get("finished_at");
    let failed_cycle: Option<i64> = row.get("failed_cycle");

    RunRecord {
        id: Uuid::parse_str(&id).unwrap_or_default(),
        token_address: row.get("token_address"),
        token_symbol: row.get("token_symbol"),
        stable_address: row.get("stable_address"),
        stable_symbol: row.get("stable_symbol"),
        amount_per_cycle: parse_decimal(
            "amount_per_cycle",
            &row.get::<String, _>("amount_per_cycle"),
        ),
        cycle_count: row.get::<i64, _>("cycle_count") as u32,
        slippage: parse_decimal("slippage", &row.get::<String, _>("slippage")),
        status: RunPhase::from_str(&status).unwrap_or_else(|e| {
            warn!(run_id = %id, error = %e, "Unknown stored run status");
            RunPhase::Aborted
        }),
        started_at: from_millis(row.get("started_at")),
        finished_at: finished_at.map(from_millis),
        end_amount: end_amount.map(|raw| parse_decimal("end_amount", &raw)),
        total_slippage_buffer: total_slippage_buffer
            .map(|raw| parse_decimal("total_slippage_buffer", &raw)),
        completed_cycles: row.get::<i64, _>("completed_cycles") as u32,
        rate_limit_retries: row.get::<i64, _>("rate_limit_retries") as u32,
        error: row.get("error"),
        failed_cycle: failed_cycle.map(|c| c as u32),
        summary: None,
    }
}
