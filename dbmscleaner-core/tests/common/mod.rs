//! Recording mock connection shared by the integration tests.
//!
//! Discovery queries are answered from a script keyed by a fragment of the
//! query text; every maintenance statement is recorded in issue order.

#![allow(dead_code, clippy::unwrap_used, clippy::arithmetic_side_effects)]

use async_trait::async_trait;
use dbmscleaner_core::{
    ConnectionConfig, Connector, DatabaseEngine, MaintenanceConnection, Result,
    error::DbCleanerError,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Canned answers for one run.
#[derive(Debug, Clone, Default)]
pub struct Script {
    /// `(query fragment, rows)`; the first matching fragment answers
    pub discovery: Vec<(&'static str, Vec<Vec<String>>)>,
    /// Size query answers, consumed in order
    pub sizes: Vec<i64>,
    /// Statement that fails when issued
    pub fail_on: Option<String>,
}

impl Script {
    pub fn with_sizes(mut self, start: i64, end: i64) -> Self {
        self.sizes = vec![start, end];
        self
    }

    pub fn with_rows(mut self, fragment: &'static str, rows: &[&[&str]]) -> Self {
        let rows = rows
            .iter()
            .map(|row| row.iter().map(ToString::to_string).collect())
            .collect();
        self.discovery.push((fragment, rows));
        self
    }

    pub fn failing_on(mut self, statement: &str) -> Self {
        self.fail_on = Some(statement.to_string());
        self
    }
}

/// What reached the mock.
#[derive(Debug, Default)]
pub struct Recorded {
    pub executed: Vec<String>,
    pub queries: Vec<String>,
    pub closed: bool,
}

pub struct MockConnection {
    script: Script,
    sizes: VecDeque<i64>,
    recorded: Arc<Mutex<Recorded>>,
}

impl MockConnection {
    pub fn new(script: Script, recorded: Arc<Mutex<Recorded>>) -> Self {
        let sizes = script.sizes.iter().copied().collect();
        Self {
            script,
            sizes,
            recorded,
        }
    }
}

#[async_trait]
impl MaintenanceConnection for MockConnection {
    async fn ping(&mut self) -> Result<()> {
        Ok(())
    }

    async fn fetch_rows(&mut self, sql: &str) -> Result<Vec<Vec<String>>> {
        self.recorded.lock().unwrap().queries.push(sql.to_string());
        let rows = self
            .script
            .discovery
            .iter()
            .find(|(fragment, _)| sql.contains(fragment))
            .map(|(_, rows)| rows.clone())
            .unwrap_or_default();

        // Apply a schema IN list the way the server would
        Ok(match listed_schemas(sql) {
            Some(schemas) => rows
                .into_iter()
                .filter(|row| row.first().is_some_and(|schema| schemas.contains(schema)))
                .collect(),
            None => rows,
        })
    }

    async fn fetch_size(&mut self, sql: &str) -> Result<i64> {
        self.recorded.lock().unwrap().queries.push(sql.to_string());
        self.sizes.pop_front().ok_or_else(|| {
            DbCleanerError::query_failed(
                "Size query returned no row",
                std::io::Error::other("no scripted size"),
            )
        })
    }

    async fn execute(&mut self, sql: &str) -> Result<()> {
        self.recorded.lock().unwrap().executed.push(sql.to_string());
        if self.script.fail_on.as_deref() == Some(sql) {
            return Err(DbCleanerError::exec_failed(
                sql,
                std::io::Error::other("scripted failure"),
            ));
        }
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.recorded.lock().unwrap().closed = true;
        Ok(())
    }
}

/// Schema names from a `TABLE_SCHEMA IN ('a', 'b')` filter, if present.
pub fn listed_schemas(sql: &str) -> Option<Vec<String>> {
    let lower = sql.to_ascii_lowercase();
    let start = lower.find("table_schema in (")? + "table_schema in (".len();
    let end = start + sql[start..].find(')')?;
    Some(
        sql[start..end]
            .split(", ")
            .map(|name| name.trim_matches('\'').replace("''", "'"))
            .collect(),
    )
}

/// Connector handing out [`MockConnection`]s and counting attempts.
pub struct MockConnector {
    script: Script,
    pub recorded: Arc<Mutex<Recorded>>,
    connects: AtomicUsize,
}

impl MockConnector {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            recorded: Arc::new(Mutex::new(Recorded::default())),
            connects: AtomicUsize::new(0),
        }
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn executed(&self) -> Vec<String> {
        self.recorded.lock().unwrap().executed.clone()
    }

    pub fn queries(&self) -> Vec<String> {
        self.recorded.lock().unwrap().queries.clone()
    }

    pub fn closed(&self) -> bool {
        self.recorded.lock().unwrap().closed
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(
        &self,
        _engine: DatabaseEngine,
        _config: &ConnectionConfig,
    ) -> Result<Box<dyn MaintenanceConnection>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockConnection::new(
            self.script.clone(),
            Arc::clone(&self.recorded),
        )))
    }
}

/// Number of statements issued by the fixed MySQL stages (logging off,
/// clear logs with replication reset, logging on).
pub const MYSQL_FIXED_STATEMENTS: usize = 21;

/// Same for MariaDB, which skips the replication reset.
pub const MARIADB_FIXED_STATEMENTS: usize = 19;

/// Fragments identifying each discovery query.
pub const MYSQL_INNODB: &str = "ENGINE = 'InnoDB'";
pub const MYSQL_REPAIRABLE: &str = "'MyISAM'";
pub const MYSQL_ALL_TABLES: &str = "TABLE_TYPE = 'BASE TABLE'";
pub const PG_DATABASES: &str = "current_database()";
pub const PG_TABLES: &str = "information_schema.tables";
