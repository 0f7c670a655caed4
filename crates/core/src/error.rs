//! Error types for the basket-bars system.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the basket-bars system.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Timestamp outside the trading session.
    #[error("Out of session: {0}")]
    OutOfSession(String),

    /// Malformed caller input.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A required ticker set has no stored bars.
    #[error("No data: {0}")]
    NoData(String),

    /// Dataset empty after cleaning.
    #[error("Empty dataset: {0}")]
    EmptyDataset(String),

    /// Insert conflict on the (ticker, date, minute_index) unique key.
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// Storage backend error.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Market-data fetch error.
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parse error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create an out-of-session error.
    pub fn out_of_session(msg: impl Into<String>) -> Self {
        Error::OutOfSession(msg.into())
    }

    /// Create an invalid argument error.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    /// Create a no-data error.
    pub fn no_data(msg: impl Into<String>) -> Self {
        Error::NoData(msg.into())
    }

    /// Create an empty-dataset error.
    pub fn empty_dataset(msg: impl Into<String>) -> Self {
        Error::EmptyDataset(msg.into())
    }

    /// Create a duplicate-key error.
    pub fn duplicate_key(msg: impl Into<String>) -> Self {
        Error::DuplicateKey(msg.into())
    }

    /// Create a storage error.
    pub fn storage(msg: impl Into<String>) -> Self {
        Error::Storage(msg.into())
    }

    /// Create a fetch error.
    pub fn fetch(msg: impl Into<String>) -> Self {
        Error::Fetch(msg.into())
    }
}
