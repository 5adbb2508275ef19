//! MySQL and MariaDB cleaning sequences.

use super::{
    CleaningSequence, Stage, columns, in_list, quote_mysql_identifier, quote_mysql_literal,
};
use crate::Result;
use crate::config::SchemaScope;
use crate::models::DatabaseEngine;

/// Schemas owned by the server; never touched and excluded from the size.
macro_rules! system_schemas {
    () => {
        "('information_schema', 'mysql', 'performance_schema', 'sys')"
    };
}

const SIZE_QUERY: &str = concat!(
    "SELECT CAST(COALESCE(SUM(data_length + index_length), 0) AS SIGNED) ",
    "FROM information_schema.TABLES WHERE TABLE_SCHEMA NOT IN ",
    system_schemas!()
);

const SYSTEM_SCHEMAS: &str = system_schemas!();

const INNODB_TABLES: &str = "ENGINE = 'InnoDB'";

const REPAIRABLE_TABLES: &str = "ENGINE IN ('MyISAM', 'ARCHIVE', 'CSV')";

// Views cannot be analyzed or optimized.
const ALL_TABLES: &str = "TABLE_TYPE = 'BASE TABLE'";

/// Table discovery matching `condition`, limited to `schemas` and never
/// reaching into a system schema.
fn discovery_query(condition: &str, schemas: &SchemaScope) -> String {
    let mut query = format!(
        "SELECT CAST(TABLE_SCHEMA AS CHAR), CAST(TABLE_NAME AS CHAR) \
         FROM information_schema.TABLES \
         WHERE {condition} AND TABLE_SCHEMA NOT IN {SYSTEM_SCHEMAS}"
    );
    if let SchemaScope::Only(names) = schemas {
        query.push_str(" AND TABLE_SCHEMA IN ");
        query.push_str(&in_list(names, quote_mysql_literal));
    }
    query.push_str(" ORDER BY TABLE_SCHEMA, TABLE_NAME");
    query
}

const LOGGING_OFF: [&str; 6] = [
    "SET GLOBAL general_log = 'OFF'",
    "SET GLOBAL slow_query_log = 'OFF'",
    "SET GLOBAL log_output = 'TABLE'",
    "SET GLOBAL log_queries_not_using_indexes = 'ON'",
    "SET GLOBAL log_slow_admin_statements = 'ON'",
    "SET GLOBAL log_slow_slave_statements = 'ON'",
];

const LOGGING_ON: [&str; 6] = [
    "SET GLOBAL general_log = 'ON'",
    "SET GLOBAL slow_query_log = 'ON'",
    "SET GLOBAL log_output = 'FILE'",
    "SET GLOBAL log_queries_not_using_indexes = 'OFF'",
    "SET GLOBAL log_slow_admin_statements = 'OFF'",
    "SET GLOBAL log_slow_slave_statements = 'OFF'",
];

const CLEAR_LOGS: [&str; 7] = [
    "FLUSH LOGS",
    "PURGE BINARY LOGS BEFORE DATE_SUB(NOW(), INTERVAL 30 DAY)",
    "FLUSH PRIVILEGES",
    "FLUSH TABLES",
    "FLUSH TABLES WITH READ LOCK",
    "UNLOCK TABLES",
    "FLUSH STATUS",
];

const RESET_REPLICATION: [&str; 2] = ["RESET MASTER", "RESET SLAVE"];

/// Sequence for the MySQL protocol family.
///
/// MariaDB runs the same stages minus the InnoDB rebuild and without
/// resetting the replication position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MySqlCleaner {
    engine: DatabaseEngine,
    schemas: SchemaScope,
}

impl MySqlCleaner {
    /// Sequence for a MySQL server, touching tables in `schemas`.
    pub const fn mysql(schemas: SchemaScope) -> Self {
        Self {
            engine: DatabaseEngine::MySql,
            schemas,
        }
    }

    /// Sequence for a MariaDB server, touching tables in `schemas`.
    pub const fn mariadb(schemas: SchemaScope) -> Self {
        Self {
            engine: DatabaseEngine::MariaDb,
            schemas,
        }
    }

    const fn is_mysql(&self) -> bool {
        matches!(self.engine, DatabaseEngine::MySql)
    }

    fn clear_logs(&self) -> Vec<String> {
        let reset: &[&str] = if self.is_mysql() {
            &RESET_REPLICATION
        } else {
            &[]
        };
        CLEAR_LOGS
            .iter()
            .chain(reset)
            .map(ToString::to_string)
            .collect()
    }
}

fn qualified_table(row: &[String]) -> Result<String> {
    let [schema, table] = columns::<2>(row)?;
    Ok(format!(
        "{}.{}",
        quote_mysql_identifier(schema),
        quote_mysql_identifier(table)
    ))
}

fn rebuild_innodb(row: &[String]) -> Result<Vec<String>> {
    Ok(vec![format!("ALTER TABLE {} ENGINE=InnoDB", qualified_table(row)?)])
}

fn repair_extended(row: &[String]) -> Result<Vec<String>> {
    Ok(vec![format!("REPAIR TABLE {} EXTENDED", qualified_table(row)?)])
}

fn analyze_and_optimize(row: &[String]) -> Result<Vec<String>> {
    let table = qualified_table(row)?;
    Ok(vec![
        format!("ANALYZE TABLE {table}"),
        format!("OPTIMIZE TABLE {table}"),
    ])
}

impl CleaningSequence for MySqlCleaner {
    fn engine(&self) -> DatabaseEngine {
        self.engine
    }

    fn size_query(&self) -> &'static str {
        SIZE_QUERY
    }

    fn stages(&self) -> Vec<Stage> {
        let mut stages = vec![Stage::statements(
            "Setting global logging variables OFF",
            &LOGGING_OFF,
        )];

        if self.is_mysql() {
            stages.push(Stage::discover(
                "Rebuilding InnoDB indexes",
                discovery_query(INNODB_TABLES, &self.schemas),
                rebuild_innodb,
            ));
        }

        stages.push(Stage::discover(
            "Repairing tables",
            discovery_query(REPAIRABLE_TABLES, &self.schemas),
            repair_extended,
        ));
        stages.push(Stage::discover(
            "Cleaning all tables",
            discovery_query(ALL_TABLES, &self.schemas),
            analyze_and_optimize,
        ));
        stages.push(Stage::Statements {
            name: "Clearing logs",
            statements: self.clear_logs(),
        });
        stages.push(Stage::statements(
            "Setting global logging variables ON",
            &LOGGING_ON,
        ));

        stages
    }
}
