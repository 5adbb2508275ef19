//! Configuration types for a cleaning run.
//!
//! - `ConnectionConfig`: connection parameters and driver name from the JSON file
//! - `MaintenanceOptions`: optional knobs (dry run, schema scope, PostgreSQL vacuum
//!   syntax, confirmation, timeouts)

mod connection;
mod options;

pub use connection::ConnectionConfig;
pub use options::{MaintenanceOptions, SchemaScope, VacuumStyle};

/// Configuration file read when no path is given on the command line.
pub const DEFAULT_CONFIG_PATH: &str = "config.json";
