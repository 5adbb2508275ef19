//! Core library for DBMS Cleaner.
//!
//! Runs a fixed, per-engine sequence of housekeeping statements (log
//! management, index rebuild, table repair/vacuum/analyze) against MySQL,
//! MariaDB or PostgreSQL and records the size reduction it achieved.
//!
//! # Operational Guarantees
//! - One connection per run; statements are issued strictly one at a time
//! - The first failing statement aborts the run; nothing is rolled back
//! - Passwords never appear in logs, errors or `Debug` output
//! - An unrecognized driver name is rejected before any connection attempt
//!
//! # Architecture
//! - `config`: JSON configuration file and run options
//! - `connection`: connection factory behind the [`connection::MaintenanceConnection`] seam
//! - `cleaner`: the per-engine stage lists
//! - `dispatch`: driver lookup and run orchestration
//! - `report`: append-only size report log

pub mod cleaner;
pub mod config;
pub mod connection;
pub mod credentials;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod models;
pub mod report;

// Re-export commonly used types
pub use cleaner::{Cleaner, CleaningSequence, Stage};
pub use config::{
    ConnectionConfig, DEFAULT_CONFIG_PATH, MaintenanceOptions, SchemaScope, VacuumStyle,
};
pub use connection::{Connector, DriverConnector, MaintenanceConnection};
pub use error::{DbCleanerError, Result};
pub use logging::init_logging;
pub use models::{CleaningReport, DatabaseEngine, SizeReport};
pub use report::{DEFAULT_LOG_PATH, ReportLog};
