use crate::chain::ChainError;
use crate::datasource::DataSourceError;
use crate::domain::{SlippageError, UnitsError};
use crate::wallet::{StoreError, VaultError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failure kinds of the swap pipeline (quote, build, sign, submit, confirm, cycle).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SwapError {
    #[error("Quote unavailable: {0}")]
    QuoteUnavailable(String),
    /// Remote side asked us to slow down; callers back off instead of failing.
    #[error("Rate limit hit (429): {0}")]
    RateLimited(String),
    #[error("Unsupported pair: {0}")]
    UnsupportedPair(String),
    #[error("Wallet not imported")]
    WalletNotLoaded,
    #[error("Failed to decrypt wallet. Password may be incorrect or data corrupted.")]
    DecryptionError,
    #[error("Transaction send failed: {0}")]
    SubmissionError(String),
    #[error("Transaction not confirmed within {timeout_ms}ms")]
    ConfirmationTimeout { timeout_ms: u64, last_seen: Option<u64> },
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Chain RPC error: {0}")]
    Chain(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Run cancelled")]
    Cancelled,
    #[error("Wallet busy: {0}")]
    WalletBusy(String),
}

impl SwapError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, SwapError::RateLimited(_))
    }
}

impl From<DataSourceError> for SwapError {
    fn from(err: DataSourceError) -> Self {
        match err {
            DataSourceError::RateLimited => SwapError::RateLimited("quote service".to_string()),
            DataSourceError::HttpError { status: 429, message } => SwapError::RateLimited(message),
            other => SwapError::QuoteUnavailable(other.to_string()),
        }
    }
}

impl From<ChainError> for SwapError {
    fn from(err: ChainError) -> Self {
        match err {
            ChainError::RateLimited => SwapError::RateLimited("chain rpc".to_string()),
            other => SwapError::Chain(other.to_string()),
        }
    }
}

impl From<UnitsError> for SwapError {
    fn from(err: UnitsError) -> Self {
        SwapError::ValidationError(err.to_string())
    }
}

impl From<SlippageError> for SwapError {
    fn from(err: SlippageError) -> Self {
        SwapError::ValidationError(err.to_string())
    }
}

impl From<VaultError> for SwapError {
    fn from(err: VaultError) -> Self {
        match err {
            VaultError::EmptyPassword => SwapError::ValidationError(err.to_string()),
            VaultError::InvalidMnemonic(msg) => SwapError::ValidationError(msg),
            VaultError::Decryption | VaultError::Encoding(_) => SwapError::DecryptionError,
        }
    }
}

impl From<StoreError> for SwapError {
    fn from(err: StoreError) -> Self {
        SwapError::Storage(err.to_string())
    }
}

/// HTTP-facing error type.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Internal server error: {0}")]
    Internal(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Too many requests: {0}")]
    TooManyRequests(String),
    #[error("Bad gateway: {0}")]
    BadGateway(String),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<SwapError> for AppError {
    fn from(err: SwapError) -> Self {
        let msg = err.to_string();
        match err {
            SwapError::ValidationError(_) | SwapError::UnsupportedPair(_) => {
                AppError::BadRequest(msg)
            }
            SwapError::WalletNotLoaded | SwapError::Cancelled | SwapError::WalletBusy(_) => {
                AppError::Conflict(msg)
            }
            SwapError::RateLimited(_) => AppError::TooManyRequests(msg),
            SwapError::QuoteUnavailable(_)
            | SwapError::SubmissionError(_)
            | SwapError::Chain(_)
            | SwapError::ConfirmationTimeout { .. } => AppError::BadGateway(msg),
            SwapError::DecryptionError | SwapError::Storage(_) => AppError::Internal(msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::TooManyRequests(msg) => (StatusCode::TOO_MANY_REQUESTS, msg),
            AppError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
