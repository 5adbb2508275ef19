//! Append-only report log of size reductions.
//!
//! One line per successful run:
//!
//! ```text
//! 2026-03-14 02:00:07: FROM [1048576] bytes TO [917504] bytes | OPTIMIZATION [131072] bytes
//! ```
//!
//! The file is created if absent and never truncated or read back.

use crate::Result;
use crate::error::DbCleanerError;
use crate::models::SizeReport;
use chrono::{Local, NaiveDateTime};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Default report log file name, relative to the working directory
pub const DEFAULT_LOG_PATH: &str = "DBMSCleaner.log";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Formats one report line, without the trailing newline.
///
/// # Example
/// ```rust
/// use chrono::NaiveDate;
/// use dbmscleaner_core::models::SizeReport;
/// use dbmscleaner_core::report::format_line;
///
/// let at = NaiveDate::from_ymd_opt(2026, 3, 14)
///     .and_then(|d| d.and_hms_opt(2, 0, 7))
///     .unwrap();
/// assert_eq!(
///     format_line(at, &SizeReport::new(300, 100)),
///     "2026-03-14 02:00:07: FROM [300] bytes TO [100] bytes | OPTIMIZATION [200] bytes"
/// );
/// ```
pub fn format_line(at: NaiveDateTime, sizes: &SizeReport) -> String {
    format!(
        "{}: FROM [{}] bytes TO [{}] bytes | OPTIMIZATION [{}] bytes",
        at.format(TIMESTAMP_FORMAT),
        sizes.start_bytes,
        sizes.end_bytes,
        sizes.delta_bytes()
    )
}

/// Handle to the report log file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportLog {
    path: PathBuf,
}

impl Default for ReportLog {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_PATH)
    }
}

impl ReportLog {
    /// Report log at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends a line for `sizes`, stamped with the current local time.
    ///
    /// # Errors
    /// Returns [`DbCleanerError::LogWrite`] if the file cannot be opened or
    /// written
    pub async fn append(&self, sizes: &SizeReport) -> Result<()> {
        let line = format_line(Local::now().naive_local(), sizes);
        self.append_line(&line).await
    }

    async fn append_line(&self, line: &str) -> Result<()> {
        let to_log_error = |source: std::io::Error| DbCleanerError::LogWrite {
            path: self.path.clone(),
            source,
        };

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(to_log_error)?;

        file.write_all(format!("{line}\n").as_bytes())
            .await
            .map_err(to_log_error)?;
        file.flush().await.map_err(to_log_error)?;

        tracing::debug!("Report line appended to {}", self.path.display());
        Ok(())
    }
}
