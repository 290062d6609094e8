use std::sync::Arc;

use async_trait::async_trait;

use crate::error::DriverError;
use crate::types::{RawQueryResult, SqlValue};

/// Positional placeholder syntax a driver expects after named placeholders
/// have been rewritten.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// `$1, $2, ...` (PostgreSQL)
    #[default]
    Dollar,
    /// `?, ?, ...`
    Question,
}

impl PlaceholderStyle {
    /// Renders the placeholder for a 1-based parameter position.
    pub fn render(&self, position: usize) -> String {
        match self {
            PlaceholderStyle::Dollar => format!("${}", position),
            PlaceholderStyle::Question => "?".to_string(),
        }
    }
}

/// Trait for an established database connection.
/// Drivers are responsible for:
/// - Converting SqlValue parameters to native types
/// - Executing queries and converting results to RawQueryResult
/// - Reporting failures as native code/message pairs
#[async_trait]
pub trait DatabaseDriver: Send + Sync {
    /// Execute a SQL query with the given positional parameters.
    async fn execute(&self, sql: &str, params: &[SqlValue])
        -> Result<RawQueryResult, DriverError>;

    /// Apply a connection attribute. Called once per configured attribute,
    /// right after the connection is established.
    async fn set_attribute(&self, name: &str, value: &str) -> Result<(), DriverError>;

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Dollar
    }
}

/// Opens driver connections from a DSN. Held by the client until the first
/// query needs a live connection.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, dsn: &str) -> Result<Arc<dyn DatabaseDriver>, DriverError>;
}
