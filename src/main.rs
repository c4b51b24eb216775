use anyhow::Context;
use clap::{Parser, Subcommand};
use configuration::{Config, LoggingSettings};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// The main entry point for the Roster enrollment service.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file, if there is one.
    dotenvy::dotenv().ok();

    // Parse command-line arguments
    let cli = Cli::parse();
    let mut config = configuration::load_config(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;

    // Keep the guard alive so buffered file logs are flushed on exit.
    let _guard = init_tracing(&config.logging)?;
    tracing::info!(config = %cli.config.display(), "Configuration loaded.");

    // Execute the appropriate command
    match cli.command {
        Commands::Serve(args) => {
            if let Some(host) = args.host {
                config.server.host = host;
            }
            if let Some(port) = args.port {
                config.server.port = port;
            }
            web_server::run_server(&config).await
        }
        Commands::Migrate => handle_migrate(&config).await,
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// A CRUD service for courses, people and their enrollments.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API.
    Serve(ServeArgs),
    /// Apply database migrations and exit.
    Migrate,
}

#[derive(Parser)]
struct ServeArgs {
    /// Overrides `server.host` from the configuration.
    #[arg(long)]
    host: Option<String>,

    /// Overrides `server.port` from the configuration.
    #[arg(long)]
    port: Option<u16>,
}

// ==============================================================================
// Command Logic
// ==============================================================================

async fn handle_migrate(config: &Config) -> anyhow::Result<()> {
    let pool = database::connect(&config.database).await?;
    database::run_migrations(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Installs the global subscriber: stdout always, plus a daily rolling file
/// when `logging.directory` is set. `RUST_LOG` overrides `logging.level`.
fn init_tracing(logging: &LoggingSettings) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .context("invalid logging.level")?;

    let (file_layer, guard) = match &logging.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, "roster.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(guard)
}
