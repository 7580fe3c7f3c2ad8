//! schema-import CLI - declarative schema import and reconciliation.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use schema_import::{
    Config, Importer, MysqlDriver, PostgresDriver, Result, SchemaExecutor, SchemaIntrospector,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "schema-import")]
#[command(about = "Declarative database schema import and reconciliation")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Override the descriptor directory from the configuration
    #[arg(long)]
    path: Option<PathBuf>,

    /// Abort the whole run on the first failed operation
    #[arg(long)]
    die_on_error: bool,

    /// Append the run log to the configured log file instead of stdout
    #[arg(long)]
    log_to_file: bool,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fresh import: create all declared structures, load seed data, then
    /// apply foreign keys
    Import {
        /// Create structures only, skip seed data
        #[arg(long)]
        skip_data: bool,
    },

    /// Reconcile a live database against the descriptors
    Update,

    /// Test the database connection
    HealthCheck,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.verbosity.clone()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut config = Config::load(&cli.config)?;
    if cli.die_on_error {
        config.importer.die_on_error = true;
    }

    match config.database.r#type.to_lowercase().as_str() {
        "mysql" | "mariadb" => {
            let driver = MysqlDriver::connect(&config.database).await?;
            run_command(driver, config, cli).await
        }
        _ => {
            let driver = PostgresDriver::connect(&config.database).await?;
            run_command(driver, config, cli).await
        }
    }
}

async fn run_command<D>(driver: D, config: Config, cli: Cli) -> Result<()>
where
    D: SchemaIntrospector + SchemaExecutor,
{
    if let Commands::HealthCheck = cli.command {
        // connecting already ran a probe query
        println!("connection ok");
        return Ok(());
    }

    let mut importer = Importer::new(driver, config.importer);
    let loaded = importer.load_descriptors(cli.path.as_deref())?;
    info!(units = loaded, "loaded descriptor units");

    let result = match cli.command {
        Commands::Import { skip_data } => {
            let mut result = importer.import_schema().await;
            if result.is_ok() && !skip_data {
                result = importer.import_data().await;
            }
            if result.is_ok() {
                result = importer.post_import().await;
            }
            result
        }
        Commands::Update => {
            let mut result = importer.update_schema().await;
            if result.is_ok() {
                result = importer.post_update().await;
            }
            result
        }
        Commands::HealthCheck => unreachable!(),
    };

    importer.refresh_schema().await?;
    importer.flush_log_default(!cli.log_to_file)?;
    result
}
