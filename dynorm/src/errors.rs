//! Error types for dynorm

use thiserror::Error;

/// Result type alias using dynorm Error
pub type Result<T> = std::result::Result<T, Error>;

/// dynorm error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Point lookup found no item for the key
    #[error("Item not found")]
    ItemNotFound,

    /// Expression could not be built
    #[error("Expression build error: {0}")]
    Build(String),

    /// DynamoDB request failed
    #[error("Database error: {0}")]
    Database(String),

    /// Item could not be marshaled to or from attribute values
    #[error("DynamoDB serialization error: {0}")]
    DynamoSerialization(String),

    /// Pagination cursor could not be encoded or decoded
    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),

    /// Bounded exhaustive scan ran out of pages before the table did
    #[error("Scan exceeded the limit of {0} pages")]
    PageLimitExceeded(usize),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Returns a stable machine-readable code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Error::ItemNotFound => "item_not_found",
            Error::Build(_) => "build_error",
            Error::Database(_) => "database_error",
            Error::DynamoSerialization(_) => "serialization_error",
            Error::InvalidCursor(_) => "invalid_cursor",
            Error::PageLimitExceeded(_) => "page_limit_exceeded",
            Error::Config(_) => "config_error",
        }
    }

    /// True for the point-get miss sentinel
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::ItemNotFound)
    }
}

impl From<serde_dynamo::Error> for Error {
    fn from(err: serde_dynamo::Error) -> Self {
        Error::DynamoSerialization(err.to_string())
    }
}
