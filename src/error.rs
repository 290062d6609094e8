use std::fmt;

use thiserror::Error;

use crate::types::BindValues;

/// Native failure reported by a driver: an optional vendor code plus its message.
#[derive(Debug, Clone, PartialEq, Error)]
pub struct DriverError {
    pub code: Option<String>,
    pub message: String,
}

impl DriverError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
        }
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "[{}] {}", code, self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Error type for sqlfetch operations
#[derive(Debug, Error)]
pub enum SqlFetchError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(#[source] DriverError),

    #[error("Query failed: {source} (statement: {statement})")]
    QueryFailed {
        #[source]
        source: DriverError,
        statement: String,
        values: BindValues,
    },

    /// A caller-supplied row transform failed. The partially accumulated
    /// result is discarded; do not rely on partial results.
    #[error("Row transform failed: {0}")]
    Transform(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Cannot construct fetched object: {0}")]
    ShapeConstruction(String),

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SqlFetchError {
    /// The statement text, for errors raised while running one.
    pub fn statement(&self) -> Option<&str> {
        match self {
            SqlFetchError::QueryFailed { statement, .. } => Some(statement),
            _ => None,
        }
    }

    /// The native driver error behind a connection or query failure.
    pub fn driver_error(&self) -> Option<&DriverError> {
        match self {
            SqlFetchError::ConnectionFailed(e) | SqlFetchError::QueryFailed { source: e, .. } => {
                Some(e)
            }
            _ => None,
        }
    }
}

/// Result type alias for sqlfetch operations
pub type Result<T> = std::result::Result<T, SqlFetchError>;
