//! Connection factory and the statement-level seam used by cleaning sequences.
//!
//! Cleaning sequences never see a driver type. They talk to a
//! [`MaintenanceConnection`], which exposes exactly what a sequence needs:
//! discovery queries returning text rows, a single-integer size query, and
//! statement execution. The `mysql` and `postgresql` features provide sqlx
//! implementations; tests provide recording mocks.
//!
//! # Module Structure
//! - `data_source`: engine-specific connection descriptors
//! - `dry_run`: wrapper that logs maintenance statements instead of running them
//! - `mysql` / `postgres`: sqlx-backed single connections (feature-gated)

use crate::{ConnectionConfig, DatabaseEngine, Result};
use async_trait::async_trait;

mod data_source;
mod dry_run;

#[cfg(feature = "mysql")]
pub mod mysql;

#[cfg(feature = "postgresql")]
pub mod postgres;

pub use data_source::DataSource;
pub use dry_run::DryRunConnection;

/// One live database connection, driven strictly sequentially.
///
/// Every method awaits completion of its statement before returning, so at
/// most one statement is ever in flight.
///
/// # Object Safety
/// This trait is object-safe; the dispatcher holds a
/// `Box<dyn MaintenanceConnection>`.
#[async_trait]
pub trait MaintenanceConnection: Send {
    /// Verifies the server is reachable on this connection.
    ///
    /// # Errors
    /// Returns a connection error if the server does not answer
    async fn ping(&mut self) -> Result<()>;

    /// Runs a discovery query and returns every row as its text columns, in
    /// the order the engine produced them.
    ///
    /// # Errors
    /// Returns a query error if the query fails or a column is not text
    async fn fetch_rows(&mut self, sql: &str) -> Result<Vec<Vec<String>>>;

    /// Runs a size query that yields a single integer.
    ///
    /// # Errors
    /// Returns a query error if the query fails or yields no row
    async fn fetch_size(&mut self, sql: &str) -> Result<i64>;

    /// Executes one maintenance statement, discarding any result rows.
    ///
    /// # Errors
    /// Returns an exec error carrying the statement text
    async fn execute(&mut self, sql: &str) -> Result<()>;

    /// Closes the connection.
    ///
    /// # Errors
    /// Returns a connection error if the driver reports a failed shutdown
    async fn close(self: Box<Self>) -> Result<()>;
}

/// Opens connections for the dispatcher.
///
/// Separated from [`MaintenanceConnection`] so a run can be exercised
/// without a server, including the case where no connection may be opened.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Opens a connection for `engine` and verifies it is live.
    ///
    /// # Errors
    /// Returns a connection error if the open or the liveness check fails
    async fn connect(
        &self,
        engine: DatabaseEngine,
        config: &ConnectionConfig,
    ) -> Result<Box<dyn MaintenanceConnection>>;
}

/// [`Connector`] backed by the compiled-in sqlx drivers.
#[derive(Debug, Clone, Copy, Default)]
pub struct DriverConnector;

#[async_trait]
impl Connector for DriverConnector {
    async fn connect(
        &self,
        engine: DatabaseEngine,
        config: &ConnectionConfig,
    ) -> Result<Box<dyn MaintenanceConnection>> {
        open_connection(engine, config).await
    }
}

/// Builds the data source for `engine`, opens one connection and pings it.
///
/// # Errors
/// Returns error if:
/// - The port is not a valid number
/// - The engine's driver feature is not compiled in
/// - The server cannot be reached or rejects the credentials
pub async fn open_connection(
    engine: DatabaseEngine,
    config: &ConnectionConfig,
) -> Result<Box<dyn MaintenanceConnection>> {
    let source = DataSource::for_engine(engine, config)?;
    tracing::info!("Connecting to {} at {}", engine, source.redacted());

    let opened: Result<Box<dyn MaintenanceConnection>> = match engine {
        #[cfg(feature = "mysql")]
        DatabaseEngine::MySql | DatabaseEngine::MariaDb => {
            mysql::MySqlMaintenanceConnection::connect(&source, config.options.connect_timeout())
                .await
                .map(|conn| Box::new(conn) as Box<dyn MaintenanceConnection>)
        }
        #[cfg(not(feature = "mysql"))]
        DatabaseEngine::MySql | DatabaseEngine::MariaDb => {
            Err(crate::error::DbCleanerError::unsupported_feature(
                "MySQL driver",
                "Compile with --features mysql to enable MySQL and MariaDB support",
            ))
        }
        #[cfg(feature = "postgresql")]
        DatabaseEngine::PostgreSql => {
            postgres::PgMaintenanceConnection::connect(&source, config.options.connect_timeout())
                .await
                .map(|conn| Box::new(conn) as Box<dyn MaintenanceConnection>)
        }
        #[cfg(not(feature = "postgresql"))]
        DatabaseEngine::PostgreSql => Err(crate::error::DbCleanerError::unsupported_feature(
            "PostgreSQL driver",
            "Compile with --features postgresql to enable PostgreSQL support",
        )),
    };

    let mut connection = opened?;
    connection.ping().await?;
    tracing::debug!("Liveness check passed for {}", source.redacted());
    Ok(connection)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::DbCleanerError;

    #[tokio::test]
    async fn test_invalid_port_fails_before_any_driver_is_used() {
        let config = ConnectionConfig::new("mysql", "localhost").with_port("not-a-port");
        let result = open_connection(DatabaseEngine::MySql, &config).await;
        assert!(matches!(result, Err(DbCleanerError::Configuration { .. })));
    }

    #[cfg(not(feature = "postgresql"))]
    #[tokio::test]
    async fn test_missing_postgres_driver_is_unsupported_feature() {
        let config = ConnectionConfig::new("postgresql", "localhost");
        let result = open_connection(DatabaseEngine::PostgreSql, &config).await;
        assert!(matches!(result, Err(DbCleanerError::UnsupportedFeature { .. })));
    }

    #[cfg(not(feature = "mysql"))]
    #[tokio::test]
    async fn test_missing_mysql_driver_is_unsupported_feature() {
        let config = ConnectionConfig::new("mariadb", "localhost");
        let result = open_connection(DatabaseEngine::MariaDb, &config).await;
        assert!(matches!(result, Err(DbCleanerError::UnsupportedFeature { .. })));
    }
}
