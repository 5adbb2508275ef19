//! PostgreSQL cleaning sequence.

use super::{
    CleaningSequence, DeriveFn, Stage, columns, in_list, quote_pg_identifier, quote_pg_literal,
};
use crate::Result;
use crate::config::{SchemaScope, VacuumStyle};
use crate::models::DatabaseEngine;

const SIZE_QUERY: &str =
    "SELECT COALESCE(SUM(pg_database_size(datname)), 0)::BIGINT FROM pg_database";

// REINDEX DATABASE only accepts the database the session is connected to.
const REINDEXABLE_DATABASES: &str = "SELECT datname::text FROM pg_database \
     WHERE datname NOT IN ('template0', 'template1') AND datname = current_database()";

const ALL_TABLES: &str = "SELECT table_schema::text, table_name::text \
     FROM information_schema.tables \
     WHERE table_schema NOT IN ('information_schema', 'pg_catalog') \
     AND table_type = 'BASE TABLE'";

fn all_tables_query(schemas: &SchemaScope) -> String {
    let mut query = ALL_TABLES.to_string();
    if let SchemaScope::Only(names) = schemas {
        query.push_str(" AND table_schema IN ");
        query.push_str(&in_list(names, quote_pg_literal));
    }
    query.push_str(" ORDER BY table_schema, table_name");
    query
}

const TEMP_AND_BLOAT: [&str; 2] = ["DROP TABLE IF EXISTS pg_temp CASCADE", "VACUUM FULL"];

const CLEAR_LOGS: [&str; 4] = [
    "CHECKPOINT",
    "SELECT pg_switch_wal()",
    "VACUUM FULL",
    "SELECT pg_rotate_logfile()",
];

/// Reindex, per-table vacuum, optional bloat cleanup and log rotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostgresCleaner {
    vacuum: VacuumStyle,
    bloat_cleanup: bool,
    schemas: SchemaScope,
}

impl Default for PostgresCleaner {
    fn default() -> Self {
        Self::new(VacuumStyle::Full, true)
    }
}

impl PostgresCleaner {
    /// Creates the sequence with the given per-table vacuum syntax, with or
    /// without the temp-table/bloat stage.
    pub const fn new(vacuum: VacuumStyle, bloat_cleanup: bool) -> Self {
        Self {
            vacuum,
            bloat_cleanup,
            schemas: SchemaScope::All,
        }
    }

    /// Limits the per-table stage to `schemas`.
    pub fn with_schemas(mut self, schemas: SchemaScope) -> Self {
        self.schemas = schemas;
        self
    }
}

fn qualified_table(row: &[String]) -> Result<String> {
    let [schema, table] = columns::<2>(row)?;
    Ok(format!(
        "{}.{}",
        quote_pg_identifier(schema),
        quote_pg_identifier(table)
    ))
}

fn reindex_database(row: &[String]) -> Result<Vec<String>> {
    let [name] = columns::<1>(row)?;
    Ok(vec![format!("REINDEX DATABASE {}", quote_pg_identifier(name))])
}

fn vacuum_full_and_analyze(row: &[String]) -> Result<Vec<String>> {
    let table = qualified_table(row)?;
    Ok(vec![
        format!("VACUUM FULL {table}"),
        format!("ANALYZE {table}"),
    ])
}

fn vacuum_and_analyse(row: &[String]) -> Result<Vec<String>> {
    let table = qualified_table(row)?;
    Ok(vec![format!("VACUUM {table}"), format!("ANALYSE {table}")])
}

impl CleaningSequence for PostgresCleaner {
    fn engine(&self) -> DatabaseEngine {
        DatabaseEngine::PostgreSql
    }

    fn size_query(&self) -> &'static str {
        SIZE_QUERY
    }

    fn stages(&self) -> Vec<Stage> {
        let vacuum: DeriveFn = match self.vacuum {
            VacuumStyle::Full => vacuum_full_and_analyze,
            VacuumStyle::Plain => vacuum_and_analyse,
        };

        let mut stages = vec![
            Stage::discover(
                "Reindexing database",
                REINDEXABLE_DATABASES,
                reindex_database,
            ),
            Stage::discover(
                "Cleaning all tables",
                all_tables_query(&self.schemas),
                vacuum,
            ),
        ];

        if self.bloat_cleanup {
            stages.push(Stage::statements(
                "Cleaning up temporary tables and bloat",
                &TEMP_AND_BLOAT,
            ));
        } else {
            tracing::debug!("Temporary table and bloat cleanup disabled");
        }

        stages.push(Stage::statements("Clearing logs", &CLEAR_LOGS));
        stages
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn table_row() -> Vec<String> {
        vec!["public".to_string(), "Orders".to_string()]
    }

    fn derived_for_tables(cleaner: PostgresCleaner) -> Vec<String> {
        match &cleaner.stages()[1] {
            Stage::Discover { derive, .. } => derive(&table_row()).unwrap(),
            Stage::Statements { statements, .. } => statements.clone(),
        }
    }

    #[test]
    fn test_default_stage_order() {
        let names: Vec<_> = PostgresCleaner::default()
            .stages()
            .iter()
            .map(Stage::name)
            .collect();
        assert_eq!(
            names,
            [
                "Reindexing database",
                "Cleaning all tables",
                "Cleaning up temporary tables and bloat",
                "Clearing logs",
            ]
        );
    }

    #[test]
    fn test_full_vacuum_syntax() {
        assert_eq!(
            derived_for_tables(PostgresCleaner::default()),
            ["VACUUM FULL \"public\".\"Orders\"", "ANALYZE \"public\".\"Orders\""]
        );
    }

    #[test]
    fn test_plain_vacuum_syntax() {
        let cleaner = PostgresCleaner::new(VacuumStyle::Plain, true);
        assert_eq!(
            derived_for_tables(cleaner),
            ["VACUUM \"public\".\"Orders\"", "ANALYSE \"public\".\"Orders\""]
        );
    }

    #[test]
    fn test_bloat_cleanup_can_be_disabled() {
        let stages = PostgresCleaner::new(VacuumStyle::Full, false).stages();
        assert_eq!(stages.len(), 3);
        assert!(
            !stages
                .iter()
                .any(|s| s.name() == "Cleaning up temporary tables and bloat")
        );
    }

    #[test]
    fn test_reindex_statement() {
        assert_eq!(
            reindex_database(&["app".to_string()]).unwrap(),
            ["REINDEX DATABASE \"app\""]
        );
        assert!(reindex_database(&table_row()).is_err());
    }

    #[test]
    fn test_discovery_excludes_templates_and_catalogs() {
        assert!(REINDEXABLE_DATABASES.contains("'template0', 'template1'"));
        assert!(ALL_TABLES.contains("'information_schema', 'pg_catalog'"));
        assert!(all_tables_query(&SchemaScope::All).ends_with("ORDER BY table_schema, table_name"));
    }

    #[test]
    fn test_schema_scope_limits_table_discovery() {
        let cleaner = PostgresCleaner::default().with_schemas(SchemaScope::only(["public", "audit"]));
        let query = match &cleaner.stages()[1] {
            Stage::Discover { query, .. } => query.clone(),
            Stage::Statements { .. } => String::new(),
        };
        assert!(query.contains("AND table_schema IN ('public', 'audit')"));
        assert!(query.contains("NOT IN ('information_schema', 'pg_catalog')"));
    }
}
