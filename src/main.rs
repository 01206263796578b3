//! dbbrowse - Runs SQL against a database and prints every result set.

use std::io::Read;
use std::process::ExitCode;
use std::sync::Arc;

use db_browser::cli::{script_statements, Cli};
use db_browser::config::{Config, ConnectionConfig, ConnectionParams};
use db_browser::connection::ConnectionManager;
use db_browser::db::{MockDatabaseClient, ResultTable};
use db_browser::error::{BrowserError, Result};
use db_browser::logging::{init_file_logging, init_stderr_logging};
use db_browser::output::{render, OutputFormat};
use db_browser::status::{LogReporter, StatusReporter};
use tracing::{info, warn};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();
    if cli.log_file {
        init_file_logging();
    } else {
        init_stderr_logging();
    }

    let reporter: Arc<dyn StatusReporter> = Arc::new(LogReporter);
    let mut manager = match open_session(&cli, reporter).await {
        Ok(manager) => manager,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let succeeded = run(&cli, &manager).await;
    manager.close().await;

    if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

async fn open_session(
    cli: &Cli,
    reporter: Arc<dyn StatusReporter>,
) -> Result<ConnectionManager> {
    if cli.mock_db {
        info!("Using mock database");
        let db = MockDatabaseClient::new(reporter.clone());
        return Ok(ConnectionManager::with_session(Box::new(db), "mock", reporter));
    }

    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let config = Config::load_from_file(&config_path)?;

    let params = resolve_connection(cli, &config)?;
    let mut manager = ConnectionManager::new(reporter);
    manager.connect(&params).await?;
    Ok(manager)
}

/// Resolves the final connection parameters from CLI args, config file, and
/// environment.
///
/// Precedence: connection string or individual CLI flags, then the named
/// connection from config (or `default`), then `PG*` environment variables.
fn resolve_connection(cli: &Cli, config: &Config) -> Result<ConnectionParams> {
    let from_config = match cli.connection_name() {
        Some(name) => Some(config.get_connection(Some(name)).cloned().ok_or_else(|| {
            BrowserError::config(format!("Connection '{name}' not found in config"))
        })?),
        None => config.get_connection(None).cloned(),
    };

    let mut connection = match (from_config, cli.to_connection_config()?) {
        (Some(mut base), Some(overrides)) => {
            base.merge(&overrides);
            base
        }
        (Some(base), None) => base,
        (None, Some(from_cli)) => from_cli,
        (None, None) => {
            warn!("No database connection configured");
            ConnectionConfig::default()
        }
    };

    connection.apply_env_defaults();
    connection.to_params()
}

/// Runs the requested statements. Returns false if any of them failed.
async fn run(cli: &Cli, manager: &ConnectionManager) -> bool {
    if cli.tables {
        return match manager.list_tables().await {
            Ok(tables) => print_tables(&tables, cli.format),
            Err(e) => {
                eprintln!("{e}");
                false
            }
        };
    }

    let statements = if cli.reads_stdin() {
        let mut script = String::new();
        if let Err(e) = std::io::stdin().read_to_string(&mut script) {
            eprintln!("Failed to read statements from stdin: {e}");
            return false;
        }
        script_statements(&script)
    } else {
        cli.execute.clone()
    };

    let mut succeeded = true;
    for sql in &statements {
        let printed = match manager.execute(sql).await {
            Ok(table) => print_table(&table, cli.format),
            Err(e) => Err(e),
        };
        if let Err(e) = printed {
            eprintln!("{e}");
            succeeded = false;
        }
    }
    succeeded
}

fn print_table(table: &ResultTable, format: OutputFormat) -> Result<()> {
    println!("{}", render(table, format)?);
    Ok(())
}

fn print_tables(tables: &[String], format: OutputFormat) -> bool {
    match format {
        OutputFormat::Text => {
            for table in tables {
                println!("{table}");
            }
            true
        }
        OutputFormat::Json => match serde_json::to_string(tables) {
            Ok(json) => {
                println!("{json}");
                true
            }
            Err(e) => {
                eprintln!("Failed to serialize table list: {e}");
                false
            }
        },
    }
}
