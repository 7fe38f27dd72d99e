//! Error types for stock forecasting operations

use thiserror::Error;

/// Stock forecasting specific errors
#[derive(Debug, Error)]
pub enum StockError {
    /// API request failed
    #[error("API error: {0}")]
    ApiError(String),

    /// Invalid stock symbol provided
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    /// Data not available for the requested symbol
    #[error("No data found for {symbol}. {reason}")]
    DataUnavailable {
        symbol: String,
        reason: String,
    },

    /// Historical download failed outright
    #[error("Failed to download stock data: {0}")]
    DownloadFailed(String),

    /// History exists but is too short to build a single training window
    #[error("Not enough data to train.")]
    InsufficientData {
        rows: usize,
        required: usize,
    },

    /// Network or HTTP error
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Yahoo Finance API error
    #[error("Yahoo Finance error: {0}")]
    YahooFinanceError(String),

    /// Technical indicator calculation error
    #[error("Technical indicator error: {0}")]
    IndicatorError(String),

    /// Model construction, training or persistence error
    #[error("Model error: {0}")]
    ModelError(String),

    /// Filesystem error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Result type alias for stock operations
pub type Result<T> = std::result::Result<T, StockError>;

impl From<bincode::Error> for StockError {
    fn from(err: bincode::Error) -> Self {
        StockError::ModelError(err.to_string())
    }
}

impl From<tokio::task::JoinError> for StockError {
    fn from(err: tokio::task::JoinError) -> Self {
        StockError::Other(format!("Background task failed: {err}"))
    }
}
