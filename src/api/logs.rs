use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AppState;
use crate::db::RunRecord;
use crate::domain::LogEntry;
use crate::error::AppError;

const DEFAULT_RUN_LIMIT: u32 = 50;
const MAX_RUN_LIMIT: u32 = 500;

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    /// Position of the first entry to return.
    pub since: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogsResponse {
    pub entries: Vec<LogEntry>,
    /// Position after the last entry returned; pass back as `since` to resume.
    pub next: usize,
}

#[derive(Debug, Deserialize)]
pub struct RunsQuery {
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct RunsResponse {
    pub runs: Vec<RunRecord>,
}

pub async fn get_logs(
    Query(params): Query<LogsQuery>,
    State(state): State<AppState>,
) -> Json<LogsResponse> {
    let (entries, next) = state.log.since(params.since.unwrap_or(0));
    Json(LogsResponse { entries, next })
}

pub async fn clear_logs(State(state): State<AppState>) -> StatusCode {
    state.log.clear();
    StatusCode::NO_CONTENT
}

pub async fn list_runs(
    Query(params): Query<RunsQuery>,
    State(state): State<AppState>,
) -> Result<Json<RunsResponse>, AppError> {
    let limit = params.limit.unwrap_or(DEFAULT_RUN_LIMIT).clamp(1, MAX_RUN_LIMIT);
    let runs = state.repo.list_runs(limit).await?;
    Ok(Json(RunsResponse { runs }))
}

pub async fn get_run(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<RunRecord>, AppError> {
    state
        .repo
        .get_run(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Run {} not found", id)))
}

pub async fn get_run_logs(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<LogsResponse>, AppError> {
    if state.repo.get_run(id).await?.is_none() {
        return Err(AppError::NotFound(format!("Run {} not found", id)));
    }
    let entries = state.repo.query_run_logs(id).await?;
    let next = entries.len();
    Ok(Json(LogsResponse { entries, next }))
}
