//! sqlfetch - A lazily connecting, driver-agnostic query and result-shaping layer
//!
//! # Example
//! ```ignore
//! use sqlfetch::{BindValues, ConnectionConfig, FetchClient};
//!
//! // Nothing is opened until the first query
//! let mut client = FetchClient::postgres(ConnectionConfig::new("postgres://localhost/mydb"));
//!
//! // Staged values are merged into the next query only
//! client.bind_value("status", "active");
//! let ids = client
//!     .fetch_col("SELECT id FROM users WHERE status = :status", BindValues::new())
//!     .await?;
//!
//! let names = client
//!     .fetch_pairs("SELECT id, name FROM users WHERE id IN (:ids)", [("ids", vec![1, 2, 3])])
//!     .await?;
//! ```

pub mod drivers;
pub mod error;
pub mod profilers;
pub mod statement;
pub mod traits;
pub mod types;

mod client;
mod config;
mod connection;
mod fetch;

// Re-export main types for convenient access
pub use client::FetchClient;
pub use config::{BindType, ConnectionConfig};
pub use connection::Connection;
pub use error::{DriverError, Result, SqlFetchError};
pub use traits::{Connector, DatabaseDriver, FetchObject, NoopProfiler, PlaceholderStyle, Profiler};
pub use types::{
    BindValues, FetchResult, FetchShape, FromSqlValue, OrderedMap, RawQueryResult, Row, SqlValue,
};
