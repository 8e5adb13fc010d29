//! Battery Telemetry - streaming service binary
//!
//! Accepts battery temperature readings over TCP and pushes the aggregated
//! stream to dashboard subscribers over WebSocket.

use anyhow::Context;
use battery_telemetry::{
    run_service, LogClass, LogSink, ServiceConfig, DEFAULT_INGEST_PORT, DEFAULT_WEB_PORT,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::{filter::LevelFilter, EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "battery_telemetry")]
#[command(about = "Battery temperature telemetry streaming service")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = "Ingests battery temperature readings over TCP, detects unsafe-temperature incidents and streams the aggregated state to WebSocket subscribers")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Bind address for both listeners
    #[arg(long, env = "BIND_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port for inbound telemetry (newline-delimited JSON over TCP)
    #[arg(long, env = "TCP_PORT", default_value_t = DEFAULT_INGEST_PORT)]
    tcp_port: u16,

    /// Port for the WebSocket push endpoint
    #[arg(long, env = "WS_PORT", default_value_t = DEFAULT_WEB_PORT)]
    ws_port: u16,

    /// Directory holding errors.log and incidents.log
    #[arg(long, env = "LOG_DIR", default_value = ".")]
    log_dir: PathBuf,

    /// Maximum WebSocket subscribers
    #[arg(long, default_value_t = 100)]
    max_subscribers: usize,

    /// Disable CORS headers
    #[arg(long)]
    no_cors: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the streaming service (default)
    Serve,

    /// Print the current error and incident logs and exit
    ReplayLogs,
}

impl Cli {
    fn service_config(&self) -> ServiceConfig {
        ServiceConfig::new(&self.host, self.tcp_port, self.ws_port)
            .with_log_dir(&self.log_dir)
            .with_max_subscribers(self.max_subscribers)
            .with_cors(!self.no_cors)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(&cli)?;

    match &cli.command {
        Some(Commands::Serve) | None => serve_command(&cli).await,
        Some(Commands::ReplayLogs) => replay_logs_command(&cli).await,
    }
}

fn log_level(cli: &Cli) -> Level {
    if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else {
        Level::WARN
    }
}

/// Filter at `level`, refined by any `RUST_LOG` style directives.
fn log_filter(level: Level, directives: Option<&str>) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .parse_lossy(directives.unwrap_or_default())
}

fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = log_filter(log_level(cli), directives.as_deref());

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install tracing subscriber")?;

    Ok(())
}

async fn serve_command(cli: &Cli) -> anyhow::Result<()> {
    let config = cli.service_config();

    info!("Starting battery telemetry service...");
    info!("  - Ingest address: {}", config.ingest_address());
    info!("  - Push address: {}", config.web_address());
    info!("  - Log directory: {:?}", config.log_dir);
    info!("  - CORS enabled: {}", config.enable_cors);
    info!("  - Max subscribers: {}", config.max_subscribers);

    run_service(config).await.context("Service stopped")?;
    Ok(())
}

async fn replay_logs_command(cli: &Cli) -> anyhow::Result<()> {
    let sink = LogSink::open(&cli.log_dir)
        .await
        .with_context(|| format!("Failed to open log directory {:?}", cli.log_dir))?;

    for class in LogClass::ALL {
        println!("== {}", class.file_name());
        match sink.read(class).await? {
            Some(content) => print!("{}", content),
            None => println!("(no {} logged)", class),
        }
    }

    Ok(())
}
