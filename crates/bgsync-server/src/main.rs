//! bgsync - shared backgammon board server

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use bgsync_runtime::SyncEngine;
use bgsync_server::{cli::Cli, config::AppConfig, transport::WebSocketServer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    if cli.print_config {
        print!("{}", AppConfig::example_config()?);
        return Ok(());
    }

    // Initialize logging
    setup_logging(cli.verbose);

    // Load configuration
    let config = load_configuration(&cli)?;

    let (engine, engine_task) =
        SyncEngine::spawn(config.sync.clone()).context("Failed to start sync engine")?;

    let address = config.listen.address();
    let server = WebSocketServer::bind(&address, engine.clone())
        .await
        .with_context(|| format!("Failed to listen on {address}"))?;
    info!("Listening on ws://{}", server.local_addr()?);

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!("Listener failed: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, shutting down");
        }
    }

    engine.shutdown().await.context("Failed to stop sync engine")?;
    engine_task.await.context("Sync engine task panicked")?;

    info!("bgsync exited successfully");
    Ok(())
}

/// Setup logging based on verbosity level
fn setup_logging(verbose: bool) {
    let log_level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

/// Load configuration from file or use defaults, then apply flag overrides
fn load_configuration(cli: &Cli) -> anyhow::Result<AppConfig> {
    match &cli.config {
        Some(path) => info!("Loading configuration from: {}", path.display()),
        None => info!("Using default configuration"),
    }
    AppConfig::from_cli(cli).context("Invalid configuration")
}
