//! Connection configuration loaded from the JSON configuration file.
//!
//! The file holds six connection fields plus optional extras:
//!
//! ```json
//! {
//!   "host": "localhost",
//!   "port": "3306",
//!   "user": "root",
//!   "password": "secret",
//!   "database": "shop",
//!   "driver": "mysql",
//!   "password_env": "DBMSCLEANER_PASSWORD",
//!   "options": { "dry_run": false }
//! }
//! ```
//!
//! Only JSON well-formedness is checked. Missing fields load as empty
//! strings and surface later as connection failures.

use super::MaintenanceOptions;
use crate::credentials::Credentials;
use crate::error::DbCleanerError;
use serde::Deserialize;
use std::path::Path;

/// Port given either as a JSON string (`"3306"`) or number (`3306`).
#[derive(Deserialize)]
#[serde(untagged)]
enum PortValue {
    Text(String),
    Number(u64),
}

fn deserialize_port<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match PortValue::deserialize(deserializer)? {
        PortValue::Text(port) => port,
        PortValue::Number(port) => port.to_string(),
    })
}

/// On-disk shape of the configuration file.
#[derive(Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    host: String,
    #[serde(deserialize_with = "deserialize_port")]
    port: String,
    user: String,
    password: String,
    password_env: Option<String>,
    database: String,
    driver: String,
    options: MaintenanceOptions,
}

/// Connection parameters for one cleaning run.
///
/// Immutable once loaded. The password is held in [`Credentials`] and never
/// appears in `Debug` or `Display` output.
///
/// # Example
/// ```rust
/// use dbmscleaner_core::ConnectionConfig;
///
/// let config = ConnectionConfig::new("mysql", "localhost")
///     .with_port("3306")
///     .with_credentials("root", "secret")
///     .with_database("shop");
///
/// assert_eq!(config.to_string(), "mysql ConnectionConfig(localhost:3306/shop)");
/// ```
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Server host name or address
    pub host: String,
    /// Server port, kept as text the way the file carries it
    pub port: String,
    /// Target database (used by PostgreSQL; MySQL connects server-wide)
    pub database: String,
    /// Driver name selecting the cleaning sequence
    pub driver: String,
    /// Username and password
    pub credentials: Credentials,
    /// Run options
    pub options: MaintenanceOptions,
}

impl std::fmt::Display for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ConnectionConfig({}", self.driver, self.host)?;
        if !self.port.is_empty() {
            write!(f, ":{}", self.port)?;
        }
        if !self.database.is_empty() {
            write!(f, "/{}", self.database)?;
        }
        write!(f, ")")
        // Intentionally omit username and never include credentials
    }
}

impl ConnectionConfig {
    /// Creates a configuration with empty credentials and default options.
    pub fn new(driver: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: String::new(),
            database: String::new(),
            driver: driver.into(),
            credentials: Credentials::new(String::new(), String::new()),
            options: MaintenanceOptions::default(),
        }
    }

    /// Loads the configuration file at `path`.
    ///
    /// # Errors
    /// - `ConfigRead` if the file is missing or unreadable
    /// - `ConfigParse` if it is not well-formed JSON of the expected shape
    /// - `Configuration` if `password_env` names an unset variable or an
    ///   option value is out of range
    pub fn from_file(path: impl AsRef<Path>) -> crate::Result<Self> {
        let path = path.as_ref();
        let contents =
            std::fs::read_to_string(path).map_err(|source| DbCleanerError::ConfigRead {
                path: path.to_path_buf(),
                source,
            })?;

        let file: ConfigFile =
            serde_json::from_str(&contents).map_err(|source| DbCleanerError::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?;

        let config = Self::from_config_file(file)?;
        tracing::debug!("Loaded {} from {}", config, path.display());
        Ok(config)
    }

    fn from_config_file(file: ConfigFile) -> crate::Result<Self> {
        file.options.validate()?;

        let password = match (file.password.is_empty(), file.password_env) {
            (true, Some(variable)) => std::env::var(&variable).map_err(|_| {
                DbCleanerError::configuration(format!(
                    "Environment variable {variable} named by password_env is not set"
                ))
            })?,
            (_, _) => file.password,
        };

        Ok(Self {
            host: file.host,
            port: file.port,
            database: file.database,
            driver: file.driver,
            credentials: Credentials::new(file.user, password),
            options: file.options,
        })
    }

    /// Builder method to set port.
    pub fn with_port(mut self, port: impl Into<String>) -> Self {
        self.port = port.into();
        self
    }

    /// Builder method to set database.
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Builder method to set username and password.
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Credentials::new(username.into(), password.into());
        self
    }

    /// Builder method to replace the run options.
    pub fn with_options(mut self, options: MaintenanceOptions) -> Self {
        self.options = options;
        self
    }

    /// Parses the port, falling back to the engine default when empty.
    ///
    /// # Errors
    /// Returns a configuration error if the port is not a number in 1..=65535
    pub fn port_or(&self, default_port: u16) -> crate::Result<u16> {
        if self.port.trim().is_empty() {
            return Ok(default_port);
        }
        match self.port.trim().parse::<u16>() {
            Ok(0) | Err(_) => Err(DbCleanerError::configuration(format!(
                "Invalid port '{}': must be a number between 1 and 65535",
                self.port
            ))),
            Ok(port) => Ok(port),
        }
    }
}
