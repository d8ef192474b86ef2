use thiserror::Error;

/// Error types for broker, market data and storage operations
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Parse error: {message}")]
    Parse { message: String },

    #[error("API error: {message} (status: {status_code})")]
    Api { status_code: u16, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Insufficient history for {symbol}: {bars} bar(s), need at least 2")]
    InsufficientHistory { symbol: String, bars: usize },

    #[error("No data available for {symbol}")]
    NoData { symbol: String },

    #[error("Timeout error: operation took longer than {timeout_seconds}s")]
    Timeout { timeout_seconds: u64 },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for data operations
pub type DataResult<T> = Result<T, DataError>;

impl DataError {
    /// Map a transport failure, keeping timeouts distinct from other network errors
    pub fn from_transport(err: reqwest::Error, timeout_seconds: u64) -> Self {
        if err.is_timeout() {
            DataError::Timeout { timeout_seconds }
        } else {
            DataError::Network(err)
        }
    }

    /// Create a parse error with context
    pub fn parse_error<S: Into<String>>(message: S) -> Self {
        DataError::Parse {
            message: message.into(),
        }
    }

    /// Create an API error with status code
    pub fn api_error<S: Into<String>>(status_code: u16, message: S) -> Self {
        DataError::Api {
            status_code,
            message: message.into(),
        }
    }

    /// Per-symbol failures that leave the rest of a batch untouched
    pub fn is_symbol_scoped(&self) -> bool {
        matches!(
            self,
            DataError::InsufficientHistory { .. } | DataError::NoData { .. } | DataError::Api { .. }
        )
    }
}
