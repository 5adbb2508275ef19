//! MySQL/MariaDB single-connection driver.
//!
//! Statements are sent as plain `&str` through `sqlx::Executor`, which uses the
//! text protocol. Administrative statements such as `FLUSH`, `PURGE BINARY
//! LOGS` and `RESET MASTER` are not accepted by the prepared-statement
//! protocol.

use super::{DataSource, MaintenanceConnection};
use crate::Result;
use crate::error::DbCleanerError;
use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::{ConnectOptions, Connection, Executor, Row};
use std::str::FromStr;
use std::time::Duration;

/// One MySQL or MariaDB connection held for the duration of a run.
pub struct MySqlMaintenanceConnection {
    conn: MySqlConnection,
}

impl std::fmt::Debug for MySqlMaintenanceConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MySqlMaintenanceConnection")
            .finish_non_exhaustive()
    }
}

impl MySqlMaintenanceConnection {
    /// Opens a connection to the server described by `source`.
    ///
    /// # Errors
    /// Returns a connection error if the descriptor is rejected, the server
    /// is unreachable within `timeout`, or authentication fails
    pub async fn connect(source: &DataSource, timeout: Duration) -> Result<Self> {
        let options = MySqlConnectOptions::from_str(source.url()).map_err(|e| {
            DbCleanerError::connection_failed(
                format!("Invalid MySQL data source {}", source.redacted()),
                e,
            )
        })?;

        let conn = match tokio::time::timeout(timeout, options.connect()).await {
            Ok(Ok(conn)) => conn,
            Ok(Err(e)) => {
                return Err(DbCleanerError::connection_failed(
                    format!("Failed to connect to {}", source.redacted()),
                    e,
                ));
            }
            Err(elapsed) => {
                return Err(DbCleanerError::connection_failed(
                    format!(
                        "Timed out after {}s connecting to {}",
                        timeout.as_secs(),
                        source.redacted()
                    ),
                    elapsed,
                ));
            }
        };

        Ok(Self { conn })
    }
}

fn text_columns(row: &MySqlRow, sql: &str) -> Result<Vec<String>> {
    (0..row.len())
        .map(|index| {
            row.try_get::<String, _>(index).map_err(|e| {
                DbCleanerError::query_failed(
                    format!("Column {index} of discovery query is not text: {sql}"),
                    e,
                )
            })
        })
        .collect()
}

#[async_trait]
impl MaintenanceConnection for MySqlMaintenanceConnection {
    async fn ping(&mut self) -> Result<()> {
        self.conn
            .ping()
            .await
            .map_err(|e| DbCleanerError::connection_failed("MySQL liveness check failed", e))
    }

    async fn fetch_rows(&mut self, sql: &str) -> Result<Vec<Vec<String>>> {
        let rows = self
            .conn
            .fetch_all(sql)
            .await
            .map_err(|e| DbCleanerError::query_failed(format!("Discovery query failed: {sql}"), e))?;

        rows.iter().map(|row| text_columns(row, sql)).collect()
    }

    async fn fetch_size(&mut self, sql: &str) -> Result<i64> {
        let row = self
            .conn
            .fetch_optional(sql)
            .await
            .map_err(|e| DbCleanerError::query_failed("Size query failed", e))?
            .ok_or_else(|| {
                DbCleanerError::query_failed(
                    "Size query returned no row",
                    std::io::Error::new(std::io::ErrorKind::UnexpectedEof, sql.to_string()),
                )
            })?;

        row.try_get::<i64, _>(0)
            .map_err(|e| DbCleanerError::query_failed("Size query returned a non-integer value", e))
    }

    async fn execute(&mut self, sql: &str) -> Result<()> {
        self.conn
            .execute(sql)
            .await
            .map(|_| ())
            .map_err(|e| DbCleanerError::exec_failed(sql, e))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.conn
            .close()
            .await
            .map_err(|e| DbCleanerError::connection_failed("Failed to close MySQL connection", e))
    }
}
