use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::DriverError;
use crate::traits::{Connector, DatabaseDriver, PlaceholderStyle};
use crate::types::{RawQueryResult, SqlValue};

/// A recorded query execution for verification.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedQuery {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

#[derive(Default)]
struct State {
    responses: VecDeque<Result<RawQueryResult, DriverError>>,
    recorded_queries: Vec<RecordedQuery>,
    attributes: Vec<(String, String)>,
}

/// An in-memory database driver for testing.
///
/// Allows configuring expected responses and failures and verifying executed
/// queries. It is also its own [`Connector`]: every connection it hands out
/// shares the same responses and recordings, so a clone kept by the test can
/// inspect what a client did.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use sqlfetch::drivers::{InMemoryTestDriver, InMemoryTestResponseBuilder};
/// use sqlfetch::{ConnectionConfig, FetchClient};
///
/// let driver = InMemoryTestDriver::new().with_response(
///     InMemoryTestResponseBuilder::new()
///         .columns(&["id", "name"])
///         .row(vec![1.into(), "Alice".into()])
///         .build(),
/// );
/// let client = FetchClient::new(ConnectionConfig::new("memory:"), Arc::new(driver.clone()));
/// assert!(!client.is_connected());
/// ```
#[derive(Clone)]
pub struct InMemoryTestDriver {
    state: Arc<Mutex<State>>,
    default_response: RawQueryResult,
    placeholder_style: PlaceholderStyle,
    connect_error: Option<DriverError>,
    attribute_error: Option<DriverError>,
    connect_count: Arc<AtomicUsize>,
}

impl InMemoryTestDriver {
    /// Create a new in-memory test driver with no pre-configured responses.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
            default_response: RawQueryResult::empty(),
            placeholder_style: PlaceholderStyle::Dollar,
            connect_error: None,
            attribute_error: None,
            connect_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Add a response to be returned by the next query.
    /// Responses and errors are returned in FIFO order.
    pub fn with_response(self, response: RawQueryResult) -> Self {
        self.state.lock().responses.push_back(Ok(response));
        self
    }

    /// Add multiple responses to be returned by subsequent queries.
    pub fn with_responses(self, responses: impl IntoIterator<Item = RawQueryResult>) -> Self {
        self.state
            .lock()
            .responses
            .extend(responses.into_iter().map(Ok));
        self
    }

    /// Make the next query fail with `error`.
    pub fn with_error(self, error: DriverError) -> Self {
        self.state.lock().responses.push_back(Err(error));
        self
    }

    /// Set a default response to use when no queued responses remain.
    pub fn with_default_response(mut self, response: RawQueryResult) -> Self {
        self.default_response = response;
        self
    }

    pub fn with_placeholder_style(mut self, style: PlaceholderStyle) -> Self {
        self.placeholder_style = style;
        self
    }

    /// Make every connection attempt fail with `error`.
    pub fn with_connect_error(mut self, error: DriverError) -> Self {
        self.connect_error = Some(error);
        self
    }

    /// Make every `set_attribute` call fail with `error`.
    pub fn with_attribute_error(mut self, error: DriverError) -> Self {
        self.attribute_error = Some(error);
        self
    }

    /// Number of successful connections handed out.
    pub fn connect_count(&self) -> usize {
        self.connect_count.load(Ordering::SeqCst)
    }

    /// Attributes applied so far, in order.
    pub fn attributes(&self) -> Vec<(String, String)> {
        self.state.lock().attributes.clone()
    }

    /// Get all recorded queries that have been executed.
    pub fn recorded_queries(&self) -> Vec<RecordedQuery> {
        self.state.lock().recorded_queries.clone()
    }

    /// Get the last recorded query, if any.
    pub fn last_query(&self) -> Option<RecordedQuery> {
        self.state.lock().recorded_queries.last().cloned()
    }

    /// Clear all recorded queries.
    pub fn clear_recorded_queries(&self) {
        self.state.lock().recorded_queries.clear();
    }

    /// Assert that the last query matches the expected SQL and parameters.
    pub fn assert_last_query(&self, expected_sql: &str, expected_params: &[SqlValue]) {
        let last = self.last_query().expect("No queries were recorded");
        assert_eq!(
            last.sql, expected_sql,
            "SQL mismatch.\nExpected: {}\nActual: {}",
            expected_sql, last.sql
        );
        assert_eq!(
            last.params, expected_params,
            "Parameters mismatch.\nExpected: {:?}\nActual: {:?}",
            expected_params, last.params
        );
    }

    /// Assert that exactly n queries were executed.
    pub fn assert_query_count(&self, expected: usize) {
        let actual = self.state.lock().recorded_queries.len();
        assert_eq!(
            actual, expected,
            "Query count mismatch. Expected: {}, Actual: {}",
            expected, actual
        );
    }
}

impl Default for InMemoryTestDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseDriver for InMemoryTestDriver {
    async fn execute(
        &self,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<RawQueryResult, DriverError> {
        let mut state = self.state.lock();

        // Record the query
        state.recorded_queries.push(RecordedQuery {
            sql: sql.to_string(),
            params: params.to_vec(),
        });

        // Return next queued response or default
        state
            .responses
            .pop_front()
            .unwrap_or_else(|| Ok(self.default_response.clone()))
    }

    async fn set_attribute(&self, name: &str, value: &str) -> Result<(), DriverError> {
        if let Some(error) = &self.attribute_error {
            return Err(error.clone());
        }
        self.state
            .lock()
            .attributes
            .push((name.to_string(), value.to_string()));
        Ok(())
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        self.placeholder_style
    }
}

#[async_trait]
impl Connector for InMemoryTestDriver {
    async fn connect(&self, _dsn: &str) -> Result<Arc<dyn DatabaseDriver>, DriverError> {
        if let Some(error) = &self.connect_error {
            return Err(error.clone());
        }
        self.connect_count.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(self.clone()))
    }
}

/// Builder for creating test responses easily.
pub struct InMemoryTestResponseBuilder {
    columns: Vec<String>,
    rows: Vec<Vec<SqlValue>>,
}

impl InMemoryTestResponseBuilder {
    pub fn new() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Set the column names for the response.
    pub fn columns(mut self, cols: &[&str]) -> Self {
        self.columns = cols.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Add a row of values, in column order.
    pub fn row(mut self, values: Vec<SqlValue>) -> Self {
        self.rows.push(values);
        self
    }

    /// Build the RawQueryResult.
    pub fn build(self) -> RawQueryResult {
        RawQueryResult::new(self.columns, self.rows)
    }
}

impl Default for InMemoryTestResponseBuilder {
    fn default() -> Self {
        Self::new()
    }
}
