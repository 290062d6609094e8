use std::error::Error;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, NoTls};

use super::pg_value::PgValue;
use crate::error::DriverError;
use crate::traits::{Connector, DatabaseDriver, PlaceholderStyle};
use crate::types::{RawQueryResult, SqlValue};

/// Opens [`TokioPostgresDriver`] connections.
///
/// Accepts anything tokio-postgres accepts (`postgres://...` URLs or
/// `key=value` strings) as well as `pgsql:host=...;dbname=...` DSNs.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioPostgresConnector;

/// Converts a `pgsql:`-prefixed DSN into a tokio-postgres `key=value` string.
fn connection_string(dsn: &str) -> String {
    match dsn.strip_prefix("pgsql:") {
        Some(params) => params
            .split(';')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
        None => dsn.to_string(),
    }
}

#[async_trait]
impl Connector for TokioPostgresConnector {
    async fn connect(&self, dsn: &str) -> Result<Arc<dyn DatabaseDriver>, DriverError> {
        let driver = TokioPostgresDriver::connect(&connection_string(dsn)).await?;
        Ok(Arc::new(driver))
    }
}

/// PostgreSQL driver implementation using tokio-postgres.
pub struct TokioPostgresDriver {
    client: Client,
}

impl TokioPostgresDriver {
    /// Connect to a PostgreSQL database.
    pub async fn connect(connection_string: &str) -> Result<Self, DriverError> {
        let (client, connection) = tokio_postgres::connect(connection_string, NoTls)
            .await
            .map_err(native_error)?;

        // Spawn the connection handler
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                log::error!("PostgreSQL connection error: {}", e);
            }
        });

        Ok(Self { client })
    }
}

#[async_trait]
impl DatabaseDriver for TokioPostgresDriver {
    async fn execute(
        &self,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<RawQueryResult, DriverError> {
        // Each value is converted to the parameter type the server inferred
        let values: Vec<PgValue> = params.iter().cloned().map(PgValue).collect();
        let param_refs: Vec<&(dyn ToSql + Sync)> = values
            .iter()
            .map(|v| v as &(dyn ToSql + Sync))
            .collect();

        // Prepare first so column names are known even when no rows come back
        let statement = self.client.prepare(sql).await.map_err(native_error)?;
        let columns: Vec<String> = statement
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();

        let rows = self
            .client
            .query(&statement, &param_refs)
            .await
            .map_err(native_error)?;

        let result_rows = rows
            .iter()
            .map(|row| {
                (0..row.len())
                    .map(|i| {
                        row.try_get::<_, PgValue>(i)
                            .map(|value| value.0)
                            .map_err(native_error)
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RawQueryResult::new(columns, result_rows))
    }

    async fn set_attribute(&self, name: &str, value: &str) -> Result<(), DriverError> {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
        if !valid {
            return Err(DriverError::new(format!("invalid attribute name {:?}", name)));
        }
        let sql = format!("SET {} TO '{}'", name, value.replace('\'', "''"));
        self.client.batch_execute(&sql).await.map_err(native_error)
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Dollar
    }
}

/// Renders an error followed by each of its sources, skipping a source whose
/// text the message already contains.
fn error_chain(error: &dyn Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

/// Split a tokio-postgres error into its SQLSTATE code and message.
fn native_error(error: tokio_postgres::Error) -> DriverError {
    match error.as_db_error() {
        Some(db) => DriverError::with_code(db.code().code(), db.message()),
        None => DriverError::new(error_chain(&error)),
    }
}
