//! Statement execution and result shaping.
//!
//! Every fetch operation runs the same core: merge the staged values with
//! the call-site values, make sure the connection is open, prepare, bind and
//! execute, then consume the cursor once into the requested shape.
//!
//! Staged values are cleared by every operation, whether it succeeds or not.
//!
//! Transforms are applied in cursor order as rows are consumed. A failing
//! transform aborts the operation with [`SqlFetchError::Transform`]; the
//! rows accumulated so far are dropped.

use std::collections::HashMap;
use std::convert::Infallible;
use std::error::Error;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use crate::client::FetchClient;
use crate::config::BindType;
use crate::error::{DriverError, Result, SqlFetchError};
use crate::statement::PreparedStatement;
use crate::traits::{DatabaseDriver, FetchObject};
use crate::types::{
    BindValues, FetchResult, FetchShape, OrderedMap, RawQueryResult, Row, SqlValue,
};

/// Runs an observer callback; a panic inside it is logged and swallowed so
/// it can never turn into a query failure.
fn notify(event: &str, callback: impl FnOnce()) {
    if panic::catch_unwind(AssertUnwindSafe(callback)).is_err() {
        log::warn!("profiler panicked during {}, ignoring", event);
    }
}

fn transform_error<E: Into<Box<dyn Error + Send + Sync>>>(error: E) -> SqlFetchError {
    SqlFetchError::Transform(error.into())
}

fn first_column(row: &Row) -> Result<SqlValue> {
    row.get_index(0)
        .cloned()
        .ok_or_else(|| SqlFetchError::ColumnNotFound("first column".to_string()))
}

fn materialize<T: FetchObject>(row: Row, args: &T::Args) -> Result<T> {
    let mut object = T::default();
    for (column, value) in row.iter() {
        object.assign(column, value.clone())?;
    }
    object.construct(args)?;
    Ok(object)
}

async fn execute_prepared(
    driver: &Arc<dyn DatabaseDriver>,
    statement: &str,
    values: &BindValues,
    bind_types: &HashMap<String, BindType>,
) -> std::result::Result<RawQueryResult, DriverError> {
    let mut prepared = PreparedStatement::prepare(statement)?;
    prepared.bind_all(values, bind_types)?;
    let (sql, params) = prepared.render(driver.placeholder_style())?;

    log::debug!("executing {} with {} parameter(s)", sql, params.len());
    driver.execute(&sql, &params).await
}

impl FetchClient {
    /// The shared execution core. Returns the raw cursor.
    async fn run(&mut self, statement: &str, values: BindValues) -> Result<RawQueryResult> {
        let values = std::mem::take(&mut self.bind_values).merge(values);
        let driver = self.connection.connect().await?;
        let profiler = Arc::clone(&self.profiler);

        notify("before", || profiler.on_before(statement, &values));
        let started = Instant::now();
        let outcome = execute_prepared(
            &driver,
            statement,
            &values,
            &self.connection.config().bind_types,
        )
        .await;
        let duration = started.elapsed();

        match outcome {
            Ok(raw) => {
                notify("success", || profiler.on_success(statement, &values, duration));
                Ok(raw)
            }
            Err(source) => {
                let error = SqlFetchError::QueryFailed {
                    source,
                    statement: statement.to_string(),
                    values: values.clone(),
                };
                notify("failure", || {
                    profiler.on_failure(statement, &values, duration, &error)
                });
                Err(error)
            }
        }
    }

    /// Execute a statement and return the unshaped result.
    pub async fn perform(
        &mut self,
        statement: &str,
        values: impl Into<BindValues>,
    ) -> Result<RawQueryResult> {
        self.run(statement, values.into()).await
    }

    /// Fetch using the configured default shape.
    pub async fn fetch(
        &mut self,
        statement: &str,
        values: impl Into<BindValues>,
    ) -> Result<FetchResult> {
        let values = values.into();
        let result = match self.connection.config().default_shape {
            FetchShape::All => FetchResult::All(self.fetch_all(statement, values).await?),
            FetchShape::Assoc => FetchResult::Assoc(self.fetch_assoc(statement, values).await?),
            FetchShape::Col => FetchResult::Col(self.fetch_col(statement, values).await?),
            FetchShape::Pairs => FetchResult::Pairs(self.fetch_pairs(statement, values).await?),
            FetchShape::One => FetchResult::One(self.fetch_one(statement, values).await?),
            FetchShape::Value => FetchResult::Value(self.fetch_value(statement, values).await?),
        };
        Ok(result)
    }

    /// Fetch all rows, in cursor order.
    pub async fn fetch_all(
        &mut self,
        statement: &str,
        values: impl Into<BindValues>,
    ) -> Result<Vec<Row>> {
        self.fetch_all_with(statement, values, Ok::<_, Infallible>).await
    }

    /// Fetch all rows, passing each one through `transform`.
    pub async fn fetch_all_with<U, E, F>(
        &mut self,
        statement: &str,
        values: impl Into<BindValues>,
        mut transform: F,
    ) -> Result<Vec<U>>
    where
        F: FnMut(Row) -> std::result::Result<U, E>,
        E: Into<Box<dyn Error + Send + Sync>>,
    {
        let raw = self.run(statement, values.into()).await?;
        raw.into_rows()
            .map(|row| transform(row).map_err(transform_error))
            .collect()
    }

    /// Fetch rows keyed by their first column. A later row with the same
    /// key replaces the earlier one.
    pub async fn fetch_assoc(
        &mut self,
        statement: &str,
        values: impl Into<BindValues>,
    ) -> Result<OrderedMap<SqlValue, Row>> {
        self.fetch_assoc_with(statement, values, Ok::<_, Infallible>).await
    }

    /// Like `fetch_assoc`, passing each row through `transform`. The key is
    /// read from the row before it is transformed.
    pub async fn fetch_assoc_with<U, E, F>(
        &mut self,
        statement: &str,
        values: impl Into<BindValues>,
        mut transform: F,
    ) -> Result<OrderedMap<SqlValue, U>>
    where
        F: FnMut(Row) -> std::result::Result<U, E>,
        E: Into<Box<dyn Error + Send + Sync>>,
    {
        let raw = self.run(statement, values.into()).await?;
        let mut map = OrderedMap::new();
        for row in raw.into_rows() {
            let key = first_column(&row)?;
            map.insert(key, transform(row).map_err(transform_error)?);
        }
        Ok(map)
    }

    /// Fetch the first column of every row.
    pub async fn fetch_col(
        &mut self,
        statement: &str,
        values: impl Into<BindValues>,
    ) -> Result<Vec<SqlValue>> {
        self.fetch_col_with(statement, values, Ok::<_, Infallible>).await
    }

    /// Like `fetch_col`, passing each first-column value through `transform`.
    pub async fn fetch_col_with<U, E, F>(
        &mut self,
        statement: &str,
        values: impl Into<BindValues>,
        mut transform: F,
    ) -> Result<Vec<U>>
    where
        F: FnMut(SqlValue) -> std::result::Result<U, E>,
        E: Into<Box<dyn Error + Send + Sync>>,
    {
        let raw = self.run(statement, values.into()).await?;
        raw.into_rows()
            .map(|row| transform(first_column(&row)?).map_err(transform_error))
            .collect()
    }

    /// Fetch a map of first column to second column.
    pub async fn fetch_pairs(
        &mut self,
        statement: &str,
        values: impl Into<BindValues>,
    ) -> Result<OrderedMap<SqlValue, SqlValue>> {
        self.fetch_pairs_with(statement, values, Ok::<_, Infallible>).await
    }

    /// Like `fetch_pairs`, passing each second-column value through
    /// `transform` before it is stored. Duplicate keys keep the last value.
    pub async fn fetch_pairs_with<U, E, F>(
        &mut self,
        statement: &str,
        values: impl Into<BindValues>,
        mut transform: F,
    ) -> Result<OrderedMap<SqlValue, U>>
    where
        F: FnMut(SqlValue) -> std::result::Result<U, E>,
        E: Into<Box<dyn Error + Send + Sync>>,
    {
        let raw = self.run(statement, values.into()).await?;
        let mut map = OrderedMap::new();
        for row in raw.into_rows() {
            let mut columns = row.into_values().into_iter();
            let (Some(key), Some(value)) = (columns.next(), columns.next()) else {
                return Err(SqlFetchError::ColumnNotFound("second column".to_string()));
            };
            map.insert(key, transform(value).map_err(transform_error)?);
        }
        Ok(map)
    }

    /// Fetch the first row as a `T`, or `None` when there are no rows.
    ///
    /// Column values are assigned before `T::construct` runs; see [`FetchObject`].
    pub async fn fetch_object<T: FetchObject>(
        &mut self,
        statement: &str,
        values: impl Into<BindValues>,
        args: &T::Args,
    ) -> Result<Option<T>> {
        let raw = self.run(statement, values.into()).await?;
        raw.into_rows()
            .next()
            .map(|row| materialize(row, args))
            .transpose()
    }

    /// Fetch every row as a `T`.
    pub async fn fetch_objects<T: FetchObject>(
        &mut self,
        statement: &str,
        values: impl Into<BindValues>,
        args: &T::Args,
    ) -> Result<Vec<T>> {
        let raw = self.run(statement, values.into()).await?;
        raw.into_rows().map(|row| materialize(row, args)).collect()
    }

    /// Fetch the first row, or `None` when there are no rows.
    pub async fn fetch_one(
        &mut self,
        statement: &str,
        values: impl Into<BindValues>,
    ) -> Result<Option<Row>> {
        let raw = self.run(statement, values.into()).await?;
        Ok(raw.into_rows().next())
    }

    /// Fetch the first column of the first row, or `None` when there are no rows.
    pub async fn fetch_value(
        &mut self,
        statement: &str,
        values: impl Into<BindValues>,
    ) -> Result<Option<SqlValue>> {
        let raw = self.run(statement, values.into()).await?;
        raw.into_rows().next().map(|row| first_column(&row)).transpose()
    }
}
