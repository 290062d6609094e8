use std::fmt;
use std::sync::Arc;

use crate::config::ConnectionConfig;
use crate::error::{Result, SqlFetchError};
use crate::traits::{Connector, DatabaseDriver};

/// Owns the single driver handle of a client and opens it on first use.
pub struct Connection {
    config: ConnectionConfig,
    connector: Option<Arc<dyn Connector>>,
    driver: Option<Arc<dyn DatabaseDriver>>,
}

impl Connection {
    /// A connection that will be opened through `connector` when first needed.
    pub fn lazy(config: ConnectionConfig, connector: Arc<dyn Connector>) -> Self {
        Self {
            config,
            connector: Some(connector),
            driver: None,
        }
    }

    /// A connection wrapping a driver that is already connected.
    /// Configured attributes are not applied to it.
    pub fn established(config: ConnectionConfig, driver: Arc<dyn DatabaseDriver>) -> Self {
        Self {
            config,
            connector: None,
            driver: Some(driver),
        }
    }

    /// Opens the connection if it is not open yet and applies the configured
    /// attributes. Idempotent: once connected, returns the same driver.
    ///
    /// A failure while applying attributes leaves the connection closed.
    pub async fn connect(&mut self) -> Result<Arc<dyn DatabaseDriver>> {
        if let Some(driver) = &self.driver {
            return Ok(Arc::clone(driver));
        }
        let connector = self.connector.as_ref().ok_or_else(|| {
            SqlFetchError::InvalidConfig("connection has no connector".to_string())
        })?;

        log::debug!("connecting to {} database", self.config.driver_name());
        let driver = connector
            .connect(&self.config.dsn)
            .await
            .map_err(SqlFetchError::ConnectionFailed)?;

        for (name, value) in &self.config.attributes {
            log::debug!("setting connection attribute {} = {}", name, value);
            driver
                .set_attribute(name, value)
                .await
                .map_err(SqlFetchError::ConnectionFailed)?;
        }

        self.driver = Some(Arc::clone(&driver));
        Ok(driver)
    }

    pub fn is_connected(&self) -> bool {
        self.driver.is_some()
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn dsn(&self) -> &str {
        &self.config.dsn
    }

    /// The driver identifier derived from the DSN; available before connecting.
    pub fn driver_name(&self) -> &str {
        self.config.driver_name()
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("dsn", &self.config.dsn)
            .field("connected", &self.is_connected())
            .finish()
    }
}
