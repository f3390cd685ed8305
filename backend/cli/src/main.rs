use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use statecast_config::{
    config_file_path, ensure_valid, load_unvalidated, validate, StatecastConfig,
};
use statecast_core::{ActionRegistration, Broker, Dispatcher, Hub};
use statecast_counter::Counter;
use statecast_gateway::{start_server, GatewayState};

#[derive(Parser)]
#[command(name = "statecast")]
#[command(about = "statecast: server-held state pushed to browsers over event streams")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the event stream server
    Serve {
        /// Config file (defaults to $STATECAST_CONFIG, then ./statecast.yaml)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Load and validate a config file, then print the effective config
    CheckConfig {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Query the health endpoint of a running server
    Status {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, port } => {
            let mut config = load_unvalidated(&config_file_path(config.as_deref())).await?;
            if let Some(port) = port {
                config.server.port = port;
            }
            let log_dir = config.logging.dir.as_deref().map(Path::new);
            statecast_logging::init_logger(log_dir, &config.logging.level);
            ensure_valid(&config)?;
            run_server(config).await?;
        }
        Commands::CheckConfig { config } => {
            let path = config_file_path(config.as_deref());
            let config = load_unvalidated(&path).await?;
            let report = validate(&config);
            for warning in &report.warnings {
                println!("warning: {warning}");
            }
            for error in &report.errors {
                println!("error: {error}");
            }
            println!("{}", serde_json::to_string_pretty(&config)?);
            if !report.is_valid() {
                anyhow::bail!("{} has {} errors", path.display(), report.errors.len());
            }
        }
        Commands::Status { config } => {
            let config = load_unvalidated(&config_file_path(config.as_deref())).await?;
            let url = format!("http://localhost:{}/health", config.server.port);
            match reqwest::get(&url).await {
                Ok(resp) => {
                    let body: serde_json::Value = resp.json().await?;
                    println!("{}", serde_json::to_string_pretty(&body)?);
                }
                Err(_) => {
                    println!("statecast is not running on port {}", config.server.port);
                }
            }
        }
    }

    Ok(())
}

async fn run_server(config: StatecastConfig) -> Result<()> {
    info!(
        bind = %config.server.bind_address,
        port = config.server.port,
        "Starting statecast"
    );

    let counter = Arc::new(Counter::new());
    let mut dispatcher = Dispatcher::new();
    dispatcher.register(
        ActionRegistration::new(counter.clone())
            .with_guard(counter.clone())
            .with_teardown(counter),
    )?;
    info!(handlers = dispatcher.len(), "Registered action handlers");

    let hub = Hub::with_broker(
        dispatcher,
        Broker::with_capacity(config.stream.broker_capacity),
    );
    let addr = resolve_addr(&config.server.bind_address, config.server.port).await?;
    let state = GatewayState::new(hub, config);

    start_server(addr, state).await
}

async fn resolve_addr(host: &str, port: u16) -> Result<SocketAddr> {
    tokio::net::lookup_host((host, port))
        .await
        .with_context(|| format!("Failed to resolve {host}:{port}"))?
        .next()
        .with_context(|| format!("No address found for {host}:{port}"))
}
