//! Run options carried in the `options` object of the configuration file.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Vacuum/analyze syntax used by the PostgreSQL table-cleaning stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VacuumStyle {
    /// `VACUUM FULL <table>` followed by `ANALYZE <table>`
    #[default]
    Full,
    /// `VACUUM <table>` followed by `ANALYSE <table>`
    Plain,
}

/// Schemas whose tables the discovery stages may touch.
///
/// Written in the configuration file either as a string (`"*"` or a comma
/// separated list such as `"shop, billing"`) or as an array of names. System
/// schemas stay excluded whatever the scope says.
///
/// ```rust
/// use dbmscleaner_core::SchemaScope;
///
/// let scope: SchemaScope = serde_json::from_str(r#""shop, billing""#).unwrap();
/// assert_eq!(scope.names(), ["shop", "billing"]);
///
/// let scope: SchemaScope = serde_json::from_str(r#""*""#).unwrap();
/// assert!(scope.is_all());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SchemaList", into = "SchemaList")]
pub enum SchemaScope {
    /// Every non-system schema
    #[default]
    All,
    /// Only the named schemas
    Only(Vec<String>),
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum SchemaList {
    Text(String),
    Names(Vec<String>),
}

impl From<SchemaList> for SchemaScope {
    fn from(list: SchemaList) -> Self {
        match list {
            SchemaList::Text(text) => Self::only(text.split(',')),
            SchemaList::Names(names) => Self::only(names),
        }
    }
}

impl From<SchemaScope> for SchemaList {
    fn from(scope: SchemaScope) -> Self {
        match scope {
            SchemaScope::All => Self::Text("*".to_string()),
            SchemaScope::Only(names) => Self::Names(names),
        }
    }
}

impl SchemaScope {
    /// Builds a scope from schema names.
    ///
    /// Names are trimmed and blanks dropped. An empty list or a `*` entry
    /// yields [`SchemaScope::All`].
    pub fn only<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut kept: Vec<String> = Vec::new();
        for name in names {
            let name = name.as_ref().trim();
            if name == "*" {
                return Self::All;
            }
            if !name.is_empty() && !kept.iter().any(|k| k == name) {
                kept.push(name.to_string());
            }
        }

        if kept.is_empty() {
            Self::All
        } else {
            Self::Only(kept)
        }
    }

    /// True when no schema filter applies.
    pub const fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }

    /// Listed schema names; empty for [`SchemaScope::All`].
    pub fn names(&self) -> &[String] {
        match self {
            Self::All => &[],
            Self::Only(names) => names,
        }
    }
}

/// Options that tune a cleaning run without changing its stage order.
///
/// Every field has a default, so `options` may be omitted from the
/// configuration file or given partially.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaintenanceOptions {
    /// Log maintenance statements instead of executing them
    pub dry_run: bool,
    /// Syntax of the PostgreSQL per-table vacuum
    pub postgres_vacuum: VacuumStyle,
    /// Whether the PostgreSQL temp-table/bloat stage runs
    pub postgres_bloat_cleanup: bool,
    /// Seconds to wait for the server while connecting
    pub connect_timeout_secs: u64,
    /// Schemas the table discovery stages are limited to
    pub schemas: SchemaScope,
    /// Ask before running a sequence that changes the server
    pub require_confirmation: bool,
}

impl Default for MaintenanceOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            postgres_vacuum: VacuumStyle::Full,
            postgres_bloat_cleanup: true,
            connect_timeout_secs: 30,
            schemas: SchemaScope::All,
            require_confirmation: true,
        }
    }
}

impl MaintenanceOptions {
    /// Validates option values.
    ///
    /// # Errors
    /// Returns a configuration error if the connect timeout is zero or above
    /// five minutes
    pub fn validate(&self) -> crate::Result<()> {
        if self.connect_timeout_secs == 0 {
            return Err(crate::error::DbCleanerError::configuration(
                "connect_timeout_secs must be greater than 0",
            ));
        }

        if self.connect_timeout_secs > 300 {
            return Err(crate::error::DbCleanerError::configuration(
                "connect_timeout_secs should not exceed 300",
            ));
        }

        Ok(())
    }

    /// Connect timeout as a `Duration`.
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Builder method to toggle dry-run mode.
    pub const fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Builder method to pick the PostgreSQL vacuum syntax.
    pub const fn with_postgres_vacuum(mut self, style: VacuumStyle) -> Self {
        self.postgres_vacuum = style;
        self
    }

    /// Builder method to limit table discovery to some schemas.
    pub fn with_schemas(mut self, schemas: SchemaScope) -> Self {
        self.schemas = schemas;
        self
    }

    /// Builder method to toggle the interactive confirmation.
    pub const fn with_require_confirmation(mut self, required: bool) -> Self {
        self.require_confirmation = required;
        self
    }

    /// Builder method to toggle the PostgreSQL bloat stage.
    pub const fn with_postgres_bloat_cleanup(mut self, enabled: bool) -> Self {
        self.postgres_bloat_cleanup = enabled;
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_options_default() {
        let options = MaintenanceOptions::default();
        assert!(!options.dry_run);
        assert_eq!(options.postgres_vacuum, VacuumStyle::Full);
        assert!(options.postgres_bloat_cleanup);
        assert_eq!(options.connect_timeout(), Duration::from_secs(30));
        assert!(options.schemas.is_all());
        assert!(options.require_confirmation);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_options_partial_json() {
        let options: MaintenanceOptions =
            serde_json::from_str(r#"{"postgres_vacuum": "plain"}"#).unwrap();
        assert_eq!(options.postgres_vacuum, VacuumStyle::Plain);
        assert!(options.postgres_bloat_cleanup);
        assert!(!options.dry_run);
    }

    #[test]
    fn test_options_reject_unknown_vacuum_style() {
        let result = serde_json::from_str::<MaintenanceOptions>(r#"{"postgres_vacuum": "lazy"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_options_validation() {
        let options = MaintenanceOptions {
            connect_timeout_secs: 0,
            ..Default::default()
        };
        assert!(options.validate().is_err());

        let options = MaintenanceOptions {
            connect_timeout_secs: 301,
            ..Default::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_options_builder() {
        let options = MaintenanceOptions::default()
            .with_dry_run(true)
            .with_postgres_vacuum(VacuumStyle::Plain)
            .with_postgres_bloat_cleanup(false);

        assert!(options.dry_run);
        assert_eq!(options.postgres_vacuum, VacuumStyle::Plain);
        assert!(!options.postgres_bloat_cleanup);
    }

    #[test]
    fn test_schema_scope_from_comma_list() {
        let options: MaintenanceOptions =
            serde_json::from_str(r#"{"schemas": "  shop , billing,,shop "}"#).unwrap();
        assert_eq!(
            options.schemas,
            SchemaScope::Only(vec!["shop".to_string(), "billing".to_string()])
        );
    }

    #[test]
    fn test_schema_scope_from_array() {
        let options: MaintenanceOptions =
            serde_json::from_str(r#"{"schemas": ["shop", "audit"]}"#).unwrap();
        assert_eq!(options.schemas.names(), ["shop", "audit"]);
    }

    #[test]
    fn test_schema_scope_wildcard_and_empty_mean_all() {
        for json in [r#""*""#, r#""""#, "[]", r#"["shop", "*"]"#] {
            let scope: SchemaScope = serde_json::from_str(json).unwrap();
            assert!(scope.is_all(), "{json}");
            assert!(scope.names().is_empty());
        }
    }

    #[test]
    fn test_schema_scope_serializes_back() {
        assert_eq!(serde_json::to_string(&SchemaScope::All).unwrap(), r#""*""#);
        assert_eq!(
            serde_json::to_string(&SchemaScope::only(["shop"])).unwrap(),
            r#"["shop"]"#
        );
    }

    #[test]
    fn test_confirmation_can_be_disabled() {
        let options: MaintenanceOptions =
            serde_json::from_str(r#"{"require_confirmation": false}"#).unwrap();
        assert!(!options.require_confirmation);
        assert!(MaintenanceOptions::default()
            .with_require_confirmation(false)
            .validate()
            .is_ok());
    }
}
