//! ecfan Daemon
//!
//! Local REST API server for the mainboard embedded controller: fan modes,
//! levels and temperature curves, plus APU power presets. State is written
//! through to a JSON config file on every change and restored to the EC at
//! startup, so operator intent survives restarts.
//!
//! The EC tolerates one in-flight operation; everything funnels through the
//! serialized bus in `ecfan-hardware`. Run with `--mock` to develop and
//! test against the simulated EC without hardware (or root).

mod api;
mod control;
mod store;

use anyhow::{Context, Result};
use api::AppState;
use clap::Parser;
use control::MonitorLoop;
use ecfan_core::default_config_path;
use ecfan_hardware::{DevPort, EcBus, PortIo, SimulatedEc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use store::ConfigStore;
use tokio::signal;
use tracing::{error, info};

/// ecfan API Server
#[derive(Parser, Debug)]
#[command(name = "ecfand")]
#[command(version, about = "EC fan and power control daemon", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run against a simulated EC (no hardware or root required)
    #[arg(long)]
    mock: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Determine config path: CLI flag > env var > default
    let config_path = args.config.unwrap_or_else(|| {
        std::env::var("ECFAND_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_config_path())
    });

    // The config carries the log path, so it loads before logging starts.
    // Missing file: defaults are materialized and written right here.
    let store = Arc::new(ConfigStore::load(&config_path).await?);
    let config = store.snapshot().await;

    init_tracing(&config.log_path, args.verbose)
        .with_context(|| format!("Failed to open log file {}", config.log_path.display()))?;

    info!("ecfand starting...");
    info!("Configuration file: {}", config_path.display());

    // The EC session. Failure is fatal: partial control of cooling
    // hardware is worse than no daemon.
    let port: Box<dyn PortIo> = if args.mock {
        info!("Mock mode: using simulated EC");
        Box::new(SimulatedEc::new())
    } else {
        match DevPort::open(&config.driver_path) {
            Ok(port) => Box::new(port),
            Err(e) => {
                error!("{}", e);
                std::process::exit(1);
            }
        }
    };
    let bus = Arc::new(EcBus::new(port));

    match bus.firmware_version().await {
        Ok((major, minor)) => info!("EC firmware version {}.{:02}", major, minor),
        Err(e) => {
            error!("EC did not answer the firmware probe: {}", e);
            std::process::exit(1);
        }
    }

    // Push the persisted state back to the hardware
    control::restore_from_config(&bus, &store).await;

    let state = AppState::new(bus.clone(), store.clone());

    // Curve monitoring runs for the life of the process
    MonitorLoop::new(bus, store, state.engine.clone()).spawn();

    let app = api::create_router(state);

    let bind_addr = format!("{}:{}", config.host, config.port);
    info!("Starting server on {}", bind_addr);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;

    info!("ecfand listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully...");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        },
    }
}

/// Initialize tracing: one layer to stdout, one to the log file.
///
/// The log file is truncated at every start; each run's log stands alone.
fn init_tracing(log_path: &Path, verbose: bool) -> std::io::Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    if let Some(parent) = log_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(log_path)?;

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(log_file)),
        )
        .init();

    Ok(())
}
