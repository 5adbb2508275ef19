//! Engine identifiers and per-run measurement records.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Relational engines a cleaning sequence exists for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DatabaseEngine {
    /// Oracle MySQL
    MySql,
    /// MariaDB
    MariaDb,
    /// PostgreSQL
    PostgreSql,
}

impl DatabaseEngine {
    /// Every supported engine, in the order `list` prints them.
    pub const ALL: [Self; 3] = [Self::MySql, Self::MariaDb, Self::PostgreSql];

    /// Resolves a configured driver name.
    ///
    /// Surrounding whitespace is ignored and letters are compared without
    /// regard to ASCII case; `postgres` is accepted as an alias of
    /// `postgresql`.
    ///
    /// ```rust
    /// use dbmscleaner_core::DatabaseEngine;
    ///
    /// assert_eq!(DatabaseEngine::from_driver_name("mariadb"), Some(DatabaseEngine::MariaDb));
    /// assert_eq!(DatabaseEngine::from_driver_name(" MySQL "), Some(DatabaseEngine::MySql));
    /// assert_eq!(DatabaseEngine::from_driver_name("oracle"), None);
    /// ```
    pub fn from_driver_name(driver: &str) -> Option<Self> {
        match driver.trim().to_ascii_lowercase().as_str() {
            "mysql" => Some(Self::MySql),
            "mariadb" => Some(Self::MariaDb),
            "postgresql" | "postgres" => Some(Self::PostgreSql),
            _ => None,
        }
    }

    /// Canonical driver name as written in configuration files.
    pub const fn driver_name(self) -> &'static str {
        match self {
            Self::MySql => "mysql",
            Self::MariaDb => "mariadb",
            Self::PostgreSql => "postgresql",
        }
    }

    /// MySQL and MariaDB share a wire protocol and driver.
    pub const fn uses_mysql_protocol(self) -> bool {
        matches!(self, Self::MySql | Self::MariaDb)
    }
}

impl std::fmt::Display for DatabaseEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MySql => write!(f, "MySQL"),
            Self::MariaDb => write!(f, "MariaDB"),
            Self::PostgreSql => write!(f, "PostgreSQL"),
        }
    }
}

/// Total occupied storage before and after a cleaning run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeReport {
    /// Bytes reported by the size query before the first stage
    pub start_bytes: i64,
    /// Bytes reported by the size query after the last stage
    pub end_bytes: i64,
}

impl SizeReport {
    /// Creates a report from the two size readings.
    pub const fn new(start_bytes: i64, end_bytes: i64) -> Self {
        Self {
            start_bytes,
            end_bytes,
        }
    }

    /// Bytes reclaimed by the run (`start - end`).
    ///
    /// Negative when the instance grew during the run.
    pub const fn delta_bytes(&self) -> i64 {
        self.start_bytes.saturating_sub(self.end_bytes)
    }
}

/// Outcome of a completed cleaning run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleaningReport {
    /// Engine whose sequence ran
    pub engine: DatabaseEngine,
    /// Size measurements around the sequence
    pub sizes: SizeReport,
    /// Number of maintenance statements issued (discovery queries excluded)
    pub statements_issued: usize,
    /// True when statements were logged instead of executed
    pub dry_run: bool,
    /// Wall-clock time of the run
    pub elapsed: Duration,
    /// Why the report line could not be appended, when it could not
    pub report_log_error: Option<String>,
}
