//! Per-engine cleaning sequences.
//!
//! A sequence is an ordered list of [`Stage`]s bracketed by two size queries.
//! Stages are either fixed statement lists or discovery-then-apply stages
//! that run a metadata query and derive statements from each returned row.
//! Every statement is awaited before the next is issued and the first error
//! aborts the run; statements already applied stay in effect.
//!
//! # Module Structure
//! - `mysql`: MySQL and MariaDB sequences (shared wire protocol)
//! - `postgres`: PostgreSQL sequence

use crate::connection::MaintenanceConnection;
use crate::error::DbCleanerError;
use crate::models::{CleaningReport, DatabaseEngine, SizeReport};
use crate::{ConnectionConfig, MaintenanceOptions, Result};
use std::time::Instant;

mod mysql;
mod postgres;

pub use mysql::MySqlCleaner;
pub use postgres::PostgresCleaner;

/// Derives the statements to issue for one discovery row.
pub type DeriveFn = fn(&[String]) -> Result<Vec<String>>;

/// One step of a cleaning sequence.
#[derive(Debug, Clone)]
pub enum Stage {
    /// Fixed statements executed in order
    Statements {
        /// Progress label
        name: &'static str,
        /// Statements, issued exactly as written
        statements: Vec<String>,
    },
    /// Metadata query whose rows each yield one statement group
    Discover {
        /// Progress label
        name: &'static str,
        /// Query returning text columns that name the target object
        query: String,
        /// Builds the statement group for a single row
        derive: DeriveFn,
    },
}

impl Stage {
    /// Builds a fixed-statement stage from string literals.
    pub fn statements(name: &'static str, statements: &[&str]) -> Self {
        Self::Statements {
            name,
            statements: statements.iter().map(ToString::to_string).collect(),
        }
    }

    /// Builds a discovery-then-apply stage.
    pub fn discover(name: &'static str, query: impl Into<String>, derive: DeriveFn) -> Self {
        Self::Discover {
            name,
            query: query.into(),
            derive,
        }
    }

    /// Progress label shown when the stage starts.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Statements { name, .. } | Self::Discover { name, .. } => name,
        }
    }
}

/// Behaviour shared by every engine's sequence.
pub trait CleaningSequence {
    /// Engine the sequence is written for
    fn engine(&self) -> DatabaseEngine;

    /// Aggregate query returning total occupied bytes as one integer
    fn size_query(&self) -> &'static str;

    /// Ordered stages between the two size queries
    fn stages(&self) -> Vec<Stage>;
}

/// Runs `stages` in order and returns how many statements were issued.
///
/// Discovery rows are fully fetched before the first derived statement is
/// issued, and derived groups follow the row order the engine returned.
///
/// # Errors
/// Returns the first discovery, derivation or statement error; nothing after
/// it is issued
pub async fn run_stages(conn: &mut dyn MaintenanceConnection, stages: &[Stage]) -> Result<usize> {
    let mut issued: usize = 0;

    for stage in stages {
        tracing::info!("{}...", stage.name());
        match stage {
            Stage::Statements { statements, .. } => {
                for sql in statements {
                    execute(conn, sql).await?;
                    issued = issued.saturating_add(1);
                }
            }
            Stage::Discover { query, derive, .. } => {
                let rows = conn.fetch_rows(query).await?;
                tracing::debug!("{}: {} object(s) discovered", stage.name(), rows.len());
                for row in &rows {
                    for sql in derive(row)? {
                        execute(conn, &sql).await?;
                        issued = issued.saturating_add(1);
                    }
                }
            }
        }
    }

    Ok(issued)
}

async fn execute(conn: &mut dyn MaintenanceConnection, sql: &str) -> Result<()> {
    tracing::debug!("Executing: {sql}");
    conn.execute(sql).await
}

/// The cleaning sequence selected for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cleaner {
    /// MySQL: full sequence including index rebuild and replication reset
    MySql(MySqlCleaner),
    /// MariaDB: MySQL sequence without index rebuild or replication reset
    MariaDb(MySqlCleaner),
    /// PostgreSQL reindex, vacuum and log rotation
    PostgreSql(PostgresCleaner),
}

impl Cleaner {
    /// Selects the cleaner named by `config.driver`, compared as
    /// [`DatabaseEngine::from_driver_name`] does.
    ///
    /// # Errors
    /// Returns [`DbCleanerError::UnsupportedDriver`] if the name matches no
    /// engine
    pub fn from_config(config: &ConnectionConfig) -> Result<Self> {
        let engine = DatabaseEngine::from_driver_name(&config.driver)
            .ok_or_else(|| DbCleanerError::unsupported_driver(config.driver.as_str()))?;
        Ok(Self::for_engine(engine, &config.options))
    }

    /// Builds the cleaner for `engine` with the run's options.
    pub fn for_engine(engine: DatabaseEngine, options: &MaintenanceOptions) -> Self {
        let schemas = options.schemas.clone();
        match engine {
            DatabaseEngine::MySql => Self::MySql(MySqlCleaner::mysql(schemas)),
            DatabaseEngine::MariaDb => Self::MariaDb(MySqlCleaner::mariadb(schemas)),
            DatabaseEngine::PostgreSql => Self::PostgreSql(
                PostgresCleaner::new(options.postgres_vacuum, options.postgres_bloat_cleanup)
                    .with_schemas(schemas),
            ),
        }
    }

    /// Engine this cleaner targets.
    pub fn engine(&self) -> DatabaseEngine {
        self.sequence().engine()
    }

    /// Size query for this engine.
    pub fn size_query(&self) -> &'static str {
        self.sequence().size_query()
    }

    /// Stages this cleaner will run, in order.
    pub fn stages(&self) -> Vec<Stage> {
        self.sequence().stages()
    }

    fn sequence(&self) -> &dyn CleaningSequence {
        match self {
            Self::MySql(cleaner) | Self::MariaDb(cleaner) => cleaner,
            Self::PostgreSql(cleaner) => cleaner,
        }
    }

    /// Runs the full sequence: start size query, every stage, end size query.
    ///
    /// The returned report has `dry_run` unset; the caller knows whether the
    /// connection was wrapped.
    ///
    /// # Errors
    /// Returns the first size query, discovery or statement error
    pub async fn clean(&self, conn: &mut dyn MaintenanceConnection) -> Result<CleaningReport> {
        let started = Instant::now();
        let engine = self.engine();
        tracing::info!("Cleaning {engine} instance");

        let start_bytes = conn.fetch_size(self.size_query()).await?;
        tracing::info!("Size at start: {start_bytes} bytes");

        let statements_issued = run_stages(conn, &self.stages()).await?;

        let end_bytes = conn.fetch_size(self.size_query()).await?;
        tracing::info!("Size at end: {end_bytes} bytes");

        Ok(CleaningReport {
            engine,
            sizes: SizeReport::new(start_bytes, end_bytes),
            statements_issued,
            dry_run: false,
            elapsed: started.elapsed(),
            report_log_error: None,
        })
    }
}

/// Quotes a MySQL identifier with backticks, doubling embedded backticks.
///
/// ```rust
/// use dbmscleaner_core::cleaner::quote_mysql_identifier;
///
/// assert_eq!(quote_mysql_identifier("orders"), "`orders`");
/// assert_eq!(quote_mysql_identifier("we`ird"), "`we``ird`");
/// ```
pub fn quote_mysql_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Quotes a PostgreSQL identifier with double quotes, doubling embedded quotes.
///
/// ```rust
/// use dbmscleaner_core::cleaner::quote_pg_identifier;
///
/// assert_eq!(quote_pg_identifier("Orders"), "\"Orders\"");
/// assert_eq!(quote_pg_identifier("a\"b"), "\"a\"\"b\"");
/// ```
pub fn quote_pg_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quotes a MySQL string literal, escaping backslashes and single quotes.
///
/// ```rust
/// use dbmscleaner_core::cleaner::quote_mysql_literal;
///
/// assert_eq!(quote_mysql_literal("shop"), "'shop'");
/// assert_eq!(quote_mysql_literal(r"o'b\x"), r"'o''b\\x'");
/// ```
pub fn quote_mysql_literal(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
}

/// Quotes a PostgreSQL string literal, doubling single quotes.
///
/// Assumes `standard_conforming_strings` is on, the server default.
pub fn quote_pg_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Renders `names` as a parenthesized `IN` list.
pub(crate) fn in_list(names: &[String], quote: fn(&str) -> String) -> String {
    let quoted: Vec<String> = names.iter().map(|name| quote(name.as_str())).collect();
    format!("({})", quoted.join(", "))
}

/// Splits a discovery row into exactly `N` columns.
pub(crate) fn columns<const N: usize>(row: &[String]) -> Result<[&str; N]> {
    let values: Vec<&str> = row.iter().map(String::as_str).collect();
    values.try_into().map_err(|values: Vec<&str>| {
        DbCleanerError::query_failed(
            format!("Discovery row has {} column(s), expected {N}", values.len()),
            std::io::Error::new(std::io::ErrorKind::InvalidData, values.join(", ")),
        )
    })
}
