//! Application error types

use serde::Serialize;
use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("No trading dates available")]
    NoTradingDates,

    #[error("No stocks with signals in the lookback window")]
    NoSignals,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Serializable error response for callers
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl From<AppError> for ErrorResponse {
    fn from(err: AppError) -> Self {
        let (code, message) = match &err {
            AppError::Database(_) => ("DATABASE_ERROR", err.to_string()),
            AppError::Serialization(_) => ("SERIALIZATION_ERROR", err.to_string()),
            AppError::NoTradingDates => ("NO_TRADING_DATES", err.to_string()),
            AppError::NoSignals => ("NO_SIGNALS", err.to_string()),
            AppError::NotFound(_) => ("NOT_FOUND", err.to_string()),
            AppError::Config(_) => ("CONFIG_ERROR", err.to_string()),
            AppError::Io(_) => ("IO_ERROR", err.to_string()),
            AppError::Internal(_) => ("INTERNAL_ERROR", err.to_string()),
        };

        ErrorResponse {
            code: code.to_string(),
            message,
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_codes() {
        let resp = ErrorResponse::from(AppError::NoTradingDates);
        assert_eq!(resp.code, "NO_TRADING_DATES");

        let resp = ErrorResponse::from(AppError::NotFound("000001.SZ".to_string()));
        assert_eq!(resp.code, "NOT_FOUND");
        assert!(resp.message.contains("000001.SZ"));
    }

    #[test]
    fn test_error_response_serializes() {
        let resp = ErrorResponse::from(AppError::NoSignals);
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["code"], "NO_SIGNALS");
    }
}
