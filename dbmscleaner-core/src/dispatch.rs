//! Run orchestration: driver lookup, connection, cleaning, reporting.
//!
//! The driver name is resolved before any connection is opened, so an
//! unrecognized driver never touches the network or the report log.

use crate::cleaner::Cleaner;
use crate::connection::{Connector, DryRunConnection, MaintenanceConnection};
use crate::models::{CleaningReport, DatabaseEngine};
use crate::report::ReportLog;
use crate::{ConnectionConfig, Result};
use std::time::Instant;

/// Runs one cleaning pass for `config`.
///
/// Flow: select cleaner, connect, measure, run stages, measure, close, append
/// the report line. The connection is closed on every path once opened. A
/// dry run writes no report line. A failed report write is logged as a
/// warning, recorded in [`CleaningReport::report_log_error`], and the run
/// still succeeds.
///
/// # Errors
/// Returns error if:
/// - The driver name matches no cleaner
/// - The connection or liveness check fails
/// - Any size query, discovery query or statement fails
pub async fn run(
    config: &ConnectionConfig,
    connector: &dyn Connector,
    report_log: &ReportLog,
) -> Result<CleaningReport> {
    let started = Instant::now();
    let cleaner = Cleaner::from_config(config)?;
    let engine = cleaner.engine();
    let dry_run = config.options.dry_run;

    let conn = connector.connect(engine, config).await?;
    let mut conn: Box<dyn MaintenanceConnection> = if dry_run {
        tracing::info!("Dry run: maintenance statements will be logged, not executed");
        Box::new(DryRunConnection::new(conn))
    } else {
        conn
    };

    let outcome = cleaner.clean(conn.as_mut()).await;
    close_quietly(conn).await;
    let mut report = outcome?;

    report.dry_run = dry_run;
    report.elapsed = started.elapsed();

    if dry_run {
        tracing::info!("Dry run: report log left untouched");
    } else if let Err(e) = report_log.append(&report.sizes).await {
        tracing::warn!("{e}");
        report.report_log_error = Some(e.to_string());
    }

    tracing::info!(
        "{} cleaning finished: {} statement(s), {} bytes reclaimed in {:.2?}",
        engine,
        report.statements_issued,
        report.sizes.delta_bytes(),
        report.elapsed
    );
    Ok(report)
}

/// Connects and measures the current size without running any stage.
///
/// # Errors
/// Returns error if the driver name is unknown, the connection fails or the
/// size query fails
pub async fn check(
    config: &ConnectionConfig,
    connector: &dyn Connector,
) -> Result<(DatabaseEngine, i64)> {
    let cleaner = Cleaner::from_config(config)?;
    let engine = cleaner.engine();

    let mut conn = connector.connect(engine, config).await?;
    let size = conn.fetch_size(cleaner.size_query()).await;
    close_quietly(conn).await;

    Ok((engine, size?))
}

async fn close_quietly(conn: Box<dyn MaintenanceConnection>) {
    if let Err(e) = conn.close().await {
        tracing::warn!("{e}");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::DbCleanerError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct RefusingConnector {
        attempts: AtomicUsize,
    }

    #[async_trait]
    impl Connector for RefusingConnector {
        async fn connect(
            &self,
            _engine: DatabaseEngine,
            _config: &ConnectionConfig,
        ) -> Result<Box<dyn MaintenanceConnection>> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(DbCleanerError::connection_failed(
                "refused",
                std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
            ))
        }
    }

    #[tokio::test]
    async fn test_unknown_driver_never_connects() {
        let connector = RefusingConnector {
            attempts: AtomicUsize::new(0),
        };
        let config = ConnectionConfig::new("sqlite", "localhost");
        let dir = tempfile::TempDir::new().unwrap();
        let log = ReportLog::new(dir.path().join("DBMSCleaner.log"));

        let result = run(&config, &connector, &log).await;

        assert!(matches!(result, Err(DbCleanerError::UnsupportedDriver { .. })));
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 0);
        assert!(!log.path().exists());
    }

    #[tokio::test]
    async fn test_connection_failure_writes_no_report() {
        let connector = RefusingConnector {
            attempts: AtomicUsize::new(0),
        };
        let config = ConnectionConfig::new("postgresql", "localhost");
        let dir = tempfile::TempDir::new().unwrap();
        let log = ReportLog::new(dir.path().join("DBMSCleaner.log"));

        let result = run(&config, &connector, &log).await;

        assert!(matches!(result, Err(DbCleanerError::Connection { .. })));
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 1);
        assert!(!log.path().exists());
    }
}
