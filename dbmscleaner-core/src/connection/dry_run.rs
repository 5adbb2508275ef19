//! Dry-run wrapper around a live connection.

use super::MaintenanceConnection;
use crate::Result;
use async_trait::async_trait;

/// Passes discovery queries and size queries through to the wrapped
/// connection but only logs maintenance statements.
///
/// A dry run therefore shows the exact statement list a real run would issue
/// against the current server state, without changing it.
pub struct DryRunConnection {
    inner: Box<dyn MaintenanceConnection>,
    skipped: Vec<String>,
}

impl DryRunConnection {
    /// Wraps `inner`.
    pub fn new(inner: Box<dyn MaintenanceConnection>) -> Self {
        Self {
            inner,
            skipped: Vec::new(),
        }
    }

    /// Statements that would have been executed, in order.
    pub fn skipped_statements(&self) -> &[String] {
        &self.skipped
    }
}

#[async_trait]
impl MaintenanceConnection for DryRunConnection {
    async fn ping(&mut self) -> Result<()> {
        self.inner.ping().await
    }

    async fn fetch_rows(&mut self, sql: &str) -> Result<Vec<Vec<String>>> {
        self.inner.fetch_rows(sql).await
    }

    async fn fetch_size(&mut self, sql: &str) -> Result<i64> {
        self.inner.fetch_size(sql).await
    }

    async fn execute(&mut self, sql: &str) -> Result<()> {
        tracing::info!("[dry run] {sql}");
        self.skipped.push(sql.to_string());
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.inner.close().await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Minimal inner connection that records what reaches it.
    struct Recorder {
        executed: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl MaintenanceConnection for Recorder {
        async fn ping(&mut self) -> Result<()> {
            Ok(())
        }

        async fn fetch_rows(&mut self, _sql: &str) -> Result<Vec<Vec<String>>> {
            Ok(vec![vec!["shop".to_string(), "orders".to_string()]])
        }

        async fn fetch_size(&mut self, _sql: &str) -> Result<i64> {
            Ok(4096)
        }

        async fn execute(&mut self, sql: &str) -> Result<()> {
            self.executed.lock().unwrap().push(sql.to_string());
            Ok(())
        }

        async fn close(self: Box<Self>) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_dry_run_never_reaches_inner_execute() {
        let executed = Arc::new(Mutex::new(Vec::new()));
        let inner = Recorder {
            executed: Arc::clone(&executed),
        };
        let mut dry_run = DryRunConnection::new(Box::new(inner));

        dry_run.execute("OPTIMIZE TABLE `shop`.`orders`").await.unwrap();
        dry_run.execute("FLUSH LOGS").await.unwrap();

        assert!(executed.lock().unwrap().is_empty());
        assert_eq!(
            dry_run.skipped_statements(),
            ["OPTIMIZE TABLE `shop`.`orders`", "FLUSH LOGS"]
        );
    }

    #[tokio::test]
    async fn test_dry_run_passes_reads_through() {
        let inner = Recorder {
            executed: Arc::new(Mutex::new(Vec::new())),
        };
        let mut dry_run = DryRunConnection::new(Box::new(inner));

        assert_eq!(dry_run.fetch_size("SELECT 1").await.unwrap(), 4096);
        assert_eq!(dry_run.fetch_rows("SELECT 1").await.unwrap().len(), 1);
        Box::new(dry_run).close().await.unwrap();
    }
}
