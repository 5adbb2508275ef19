//! Database maintenance tool.
//!
//! Reads a JSON configuration file, connects to one MySQL, MariaDB or
//! PostgreSQL server and runs that engine's fixed housekeeping sequence,
//! then reports how many bytes it reclaimed.
//!
//! # Operational Guarantees
//! - One connection, statements issued strictly one after another
//! - The first failing statement aborts the run with a non-zero exit
//! - Passwords never appear in console output or logs

mod console;

use clap::{Args, Parser, Subcommand};
use console::{Style, confirm, paint, paint_bytes};
use dbmscleaner_core::{
    CleaningReport, ConnectionConfig, DEFAULT_CONFIG_PATH, DEFAULT_LOG_PATH, DatabaseEngine,
    DriverConnector, MaintenanceOptions, ReportLog, Result, dispatch, error::DbCleanerError,
    init_logging,
};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "dbmscleaner")]
#[command(about = "Database maintenance tool for MySQL, MariaDB and PostgreSQL")]
#[command(version)]
#[command(long_about = "
DBMS Cleaner - fixed-sequence database housekeeping

Connects to the server described in the configuration file and runs the
maintenance sequence for its engine:

- MySQL:      logging toggles, InnoDB rebuild, repair, analyze/optimize,
              log flush and purge, replication reset
- MariaDB:    as MySQL without the InnoDB rebuild and replication reset
- PostgreSQL: reindex, vacuum/analyze, temp table and bloat cleanup,
              checkpoint and log rotation

Each successful run appends one line to the report log. Unless the
configuration sets \"require_confirmation\": false, a run asks before touching
the server; pass --yes to skip the question.

CONFIGURATION (config.json):
  {\"host\": \"localhost\", \"port\": \"3306\", \"user\": \"root\",
   \"password\": \"secret\", \"database\": \"shop\", \"driver\": \"mysql\",
   \"options\": {\"schemas\": \"shop, billing\"}}

EXAMPLES:
  dbmscleaner
  dbmscleaner --config /etc/dbmscleaner/prod.json --dry-run
  dbmscleaner run --yes
  dbmscleaner check
")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Option<Command>,

    /// Configuration file path
    #[arg(
        short,
        long,
        global = true,
        env = "DBMSCLEANER_CONFIG",
        default_value = DEFAULT_CONFIG_PATH,
        help = "JSON configuration file with connection parameters"
    )]
    pub config: PathBuf,

    /// Report log path
    #[arg(
        long,
        global = true,
        default_value = DEFAULT_LOG_PATH,
        help = "Append-only file receiving one size report line per run"
    )]
    pub log_file: PathBuf,

    /// Dry run
    #[arg(
        long,
        global = true,
        help = "Log maintenance statements instead of executing them (no report line)"
    )]
    pub dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(
        short,
        long,
        global = true,
        help = "Run without asking for confirmation first"
    )]
    pub yes: bool,

    /// Prompt for the password
    #[arg(
        long,
        global = true,
        help = "Prompt for the database password instead of reading it from the configuration"
    )]
    pub ask_password: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the cleaning sequence (default)
    Run,
    /// Test the connection and print the current size
    Check,
    /// List supported drivers
    List,
}

#[derive(Args)]
pub struct GlobalArgs {
    /// Increase verbosity
    #[arg(
        short,
        long,
        global = true,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v shows every statement, -vv traces drivers)"
    )]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true, help = "Suppress all log output except errors")]
    pub quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.global.verbose, cli.global.quiet)?;

    match cli.command {
        Some(Command::List) => {
            list_supported_drivers();
            Ok(())
        }
        Some(Command::Check) => check_connection(&cli).await,
        Some(Command::Run) | None => run_cleaner(&cli).await,
    }
}

/// Loads the configuration and applies command-line overrides.
fn load_config(cli: &Cli) -> Result<ConnectionConfig> {
    let mut config = ConnectionConfig::from_file(&cli.config).map_err(|e| {
        error!("{}", e);
        e
    })?;

    if cli.ask_password {
        let password = rpassword::prompt_password("Database password: ").map_err(|e| {
            DbCleanerError::configuration(format!("Failed to read password: {e}"))
        })?;
        let username = config.credentials.username().to_string();
        config = config.with_credentials(username, password);
    }

    if cli.dry_run {
        config.options = config.options.with_dry_run(true);
    }

    Ok(config)
}

/// True when the run must be confirmed interactively before it starts.
const fn needs_confirmation(cli: &Cli, options: &MaintenanceOptions) -> bool {
    options.require_confirmation && !options.dry_run && !cli.yes
}

/// Runs the cleaning sequence and prints the summary
async fn run_cleaner(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    info!("Loaded {}", config);

    if needs_confirmation(cli, &config.options) {
        let prompt = format!("Run the maintenance sequence against {config}?");
        let confirmed = confirm(&prompt).map_err(|e| {
            DbCleanerError::configuration(format!(
                "Confirmation required but could not be asked ({e}); pass --yes to skip it"
            ))
        })?;
        if !confirmed {
            println!("{}", paint("Cleaning cancelled", Style::Yellow));
            return Ok(());
        }
    }

    let report_log = ReportLog::new(&cli.log_file);
    let report = dispatch::run(&config, &DriverConnector, &report_log)
        .await
        .map_err(|e| {
            error!("Cleaning failed: {}", e);
            e
        })?;

    print_summary(&report, &report_log);
    Ok(())
}

fn print_summary(report: &CleaningReport, report_log: &ReportLog) {
    let sizes = &report.sizes;
    let delta_style = if sizes.delta_bytes() >= 0 {
        Style::Green
    } else {
        Style::Red
    };

    println!("{} cleaning completed", report.engine);
    println!(
        "Size at start:  {} bytes",
        paint_bytes(sizes.start_bytes, Style::Blue)
    );
    println!(
        "Size at end:    {} bytes",
        paint_bytes(sizes.end_bytes, Style::Blue)
    );
    println!(
        "Optimization:   {} bytes",
        paint_bytes(sizes.delta_bytes(), delta_style)
    );
    println!("Statements:     {}", report.statements_issued);
    println!("Elapsed:        {:.2?}", report.elapsed);

    if report.dry_run {
        println!(
            "{}",
            paint("Dry run: no statement was executed and no report line was written", Style::Yellow)
        );
    } else if let Some(failure) = &report.report_log_error {
        println!(
            "Report:         {}",
            paint(&format!("not written ({failure})"), Style::Red)
        );
    } else {
        println!("Report:         {}", report_log.path().display());
    }
}

/// Tests the connection without running any stage
async fn check_connection(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    info!("Testing connection for {}", config);

    let (engine, size) = dispatch::check(&config, &DriverConnector)
        .await
        .map_err(|e| {
            error!("Connection test failed: {}", e);
            e
        })?;

    println!(
        "{} Connection to {} successful",
        paint("✓", Style::Green),
        engine
    );
    println!(
        "Current size:   {} bytes",
        paint_bytes(size, Style::Blue)
    );
    Ok(())
}

/// Lists supported drivers
fn list_supported_drivers() {
    println!("Supported drivers:");
    println!();

    for engine in DatabaseEngine::ALL {
        let compiled = match engine {
            DatabaseEngine::MySql | DatabaseEngine::MariaDb => cfg!(feature = "mysql"),
            DatabaseEngine::PostgreSql => cfg!(feature = "postgresql"),
        };
        let status = if compiled {
            paint("available", Style::Green)
        } else {
            paint("not compiled in", Style::Yellow)
        };
        println!("  {:<12} {:<12} {}", engine.driver_name(), engine.to_string(), status);
    }

    println!();
    println!("\"postgres\" is accepted as an alias of \"postgresql\".");
}
