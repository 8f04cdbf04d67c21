//! opsdiag CLI
//!
//! Main entry point for the opsdiag command-line tool. Runs the diagnosis
//! HTTP service and the knowledge index maintenance commands.

mod commands;

use clap::{Parser, Subcommand};
use commands::{SearchCommand, ServeCommand, SyncCommand};
use opsdiag_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// opsdiag - retrieval-augmented fault diagnosis service
#[derive(Parser, Debug)]
#[command(name = "opsdiag")]
#[command(about = "Retrieval-augmented fault diagnosis service", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the data directory (SQLite databases and vector index)
    #[arg(short, long, global = true, env = "OPSDIAG_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "OPSDIAG_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Generation engine provider (dashscope, ollama)
    #[arg(short, long, global = true, env = "OPSDIAG_PROVIDER")]
    provider: Option<String>,

    /// Generation model identifier
    #[arg(short, long, global = true, env = "OPSDIAG_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the diagnosis HTTP service
    Serve(ServeCommand),

    /// Rebuild the vector index from the knowledge store
    Sync(SyncCommand),

    /// Search the vector index from the command line
    Search(SearchCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse();

    let config = AppConfig::load()?;
    let config = config.with_overrides(
        cli.data_dir,
        cli.config,
        cli.provider,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::info!("opsdiag starting");
    tracing::debug!("Data dir: {:?}", config.data_dir);
    tracing::debug!("Engine: {}/{}", config.engine.provider, config.engine.model);

    config.ensure_data_dir()?;

    let command_name = match &cli.command {
        Commands::Serve(_) => "serve",
        Commands::Sync(_) => "sync",
        Commands::Search(_) => "search",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Serve(cmd) => cmd.execute(&config).await,
        Commands::Sync(cmd) => cmd.execute(&config).await,
        Commands::Search(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
