//! # Cache Governor
//!
//! Runs the adaptive cache governance loop against the configured backend
//! until interrupted, or validates configuration and exits.

use cache_governor::bootstrap::GovernorSystem;
use cache_governor::config::ConfigManager;
use cache_governor::logging::init_structured_logging;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "cache-governor")]
#[command(about = "Adaptive cache governance loop")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Environment overlay to load (default: CACHE_GOVERNOR_ENV, APP_ENV or development)
    #[arg(short, long)]
    environment: Option<String>,

    /// Configuration directory (default: CACHE_GOVERNOR_CONFIG_DIR or ./config)
    #[arg(short, long)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the control loop until Ctrl-C (default)
    Run,

    /// Load and validate configuration, then print it
    Validate,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_structured_logging();

    if let Err(e) = run(cli).await {
        error!(error = %e, "cache-governor failed");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let environment = cli
        .environment
        .unwrap_or_else(ConfigManager::detect_environment);
    let manager = ConfigManager::load_from_directory_with_env(cli.config_dir, &environment)?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Validate => {
            println!("{}", serde_json::to_string_pretty(&manager.debug_config())?);
            info!(environment = %manager.environment(), "Configuration is valid");
            Ok(())
        }
        Commands::Run => {
            let config = manager.config().clone();
            let backend = GovernorSystem::connect_backend(&config.backend).await?;
            let system = GovernorSystem::bootstrap(config, backend)?;

            let scheduler = system.start();
            info!(environment = %manager.environment(), "Cache governor running, press Ctrl-C to stop");

            tokio::signal::ctrl_c().await?;
            info!("Shutdown signal received");
            scheduler.shutdown().await;

            let status = system.status().await;
            info!(
                active_strategy = ?status.active_strategy,
                breaker = %status.circuit_breaker.format_summary(),
                "Cache governor stopped"
            );
            Ok(())
        }
    }
}
