//! PostgreSQL single-connection driver.
//!
//! Statements go through the simple query protocol (`&str` executor), which
//! `VACUUM` and `REINDEX DATABASE` require: neither may run inside a
//! transaction block.

use super::{DataSource, MaintenanceConnection};
use crate::Result;
use crate::error::DbCleanerError;
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgConnection, PgRow};
use sqlx::{ConnectOptions, Connection, Executor, Row};
use std::str::FromStr;
use std::time::Duration;

/// One PostgreSQL connection held for the duration of a run.
pub struct PgMaintenanceConnection {
    conn: PgConnection,
}

impl std::fmt::Debug for PgMaintenanceConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgMaintenanceConnection")
            .finish_non_exhaustive()
    }
}

impl PgMaintenanceConnection {
    /// Opens a connection to the database described by `source`.
    ///
    /// # Errors
    /// Returns a connection error if the descriptor is rejected, the server
    /// is unreachable within `timeout`, or authentication fails
    pub async fn connect(source: &DataSource, timeout: Duration) -> Result<Self> {
        let options = PgConnectOptions::from_str(source.url()).map_err(|e| {
            DbCleanerError::connection_failed(
                format!("Invalid PostgreSQL data source {}", source.redacted()),
                e,
            )
        })?;

        let conn = tokio::time::timeout(timeout, options.connect())
            .await
            .map_err(|elapsed| {
                DbCleanerError::connection_failed(
                    format!(
                        "Timed out after {}s connecting to {}",
                        timeout.as_secs(),
                        source.redacted()
                    ),
                    elapsed,
                )
            })?
            .map_err(|e| {
                DbCleanerError::connection_failed(
                    format!("Failed to connect to {}", source.redacted()),
                    e,
                )
            })?;

        Ok(Self { conn })
    }
}

fn text_columns(row: &PgRow, sql: &str) -> Result<Vec<String>> {
    let mut columns = Vec::with_capacity(row.len());
    for index in 0..row.len() {
        let value: String = row.try_get(index).map_err(|e| {
            DbCleanerError::query_failed(
                format!("Column {index} of discovery query is not text: {sql}"),
                e,
            )
        })?;
        columns.push(value);
    }
    Ok(columns)
}

#[async_trait]
impl MaintenanceConnection for PgMaintenanceConnection {
    async fn ping(&mut self) -> Result<()> {
        self.conn
            .ping()
            .await
            .map_err(|e| DbCleanerError::connection_failed("PostgreSQL liveness check failed", e))
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
        let Some(row) = self
            .conn
            .fetch_optional(sql)
            .await
            .map_err(|e| DbCleanerError::query_failed("Size query failed", e))?
        else {
            return Err(DbCleanerError::query_failed(
                "Size query returned no row",
                std::io::Error::new(std::io::ErrorKind::UnexpectedEof, sql.to_string()),
            ));
        };

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
        self.conn.close().await.map_err(|e| {
            DbCleanerError::connection_failed("Failed to close PostgreSQL connection", e)
        })
    }
}
