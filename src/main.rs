//! Panel Sync
//!
//! Keeps the touchscreen, the wireless peer, the operator console and the
//! durable store in agreement about every panel control.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use panel_sync::api::{self, ApiState};
use panel_sync::cli::{self, ConsoleSurface};
use panel_sync::config::AppConfig;
use panel_sync::engine::{EngineHandle, SyncEngine};
use panel_sync::gpio::{GpioBank, LoggingPins};
use panel_sync::paths::AppPaths;
use panel_sync::peer::PeerLinkAdapter;
use panel_sync::state::{self, SledStore};
use panel_sync::touchscreen::{self, ScreenEndpoint};

/// Panel Sync - keep touchscreen, wireless peer and storage in step
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (defaults to the detected data directory)
    #[arg(short, long)]
    config: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Start the interactive console
    #[arg(long)]
    repl: bool,

    /// Do not attach the touchscreen even if configured
    #[arg(long)]
    no_touchscreen: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let mut paths = AppPaths::detect();
    if let Some(config) = &args.config {
        paths = paths.with_config(config);
    }
    paths.ensure_directories()?;

    let _log_guard = init_logging(&args.log_level, &paths.logs_dir)?;

    info!("Starting Panel Sync v{}...", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", paths.config.display());

    let config = if paths.config.exists() {
        AppConfig::load(&paths.config).await?
    } else {
        warn!("No configuration file, using defaults");
        AppConfig::default()
    };

    run_app(&args, &paths, config, shutdown_signal()).await?;

    info!("Panel Sync shutdown complete");
    Ok(())
}

async fn run_app(
    args: &Args,
    paths: &AppPaths,
    config: AppConfig,
    shutdown: impl std::future::Future<Output = ()>,
) -> Result<()> {
    // Durable store first: the engine starts from what it holds
    let db_path = config
        .persistence
        .path
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(|| paths.sled_db_path());
    let store = SledStore::open(&db_path, &config.persistence.namespace)
        .with_context(|| format!("Failed to open control store at {}", db_path.display()))?;

    let initial = state::load_all(&store);
    info!("Restored state: {}", initial.snapshot());

    let engine = SyncEngine::spawn(initial, Box::new(store));

    if args.repl {
        engine.register_surface(Arc::new(ConsoleSurface));
    }

    let peer = config.peer.enabled.then(|| {
        let adapter = Arc::new(PeerLinkAdapter::new(
            engine.clone(),
            config.peer.device_name.clone(),
        ));
        engine.register_surface(adapter.clone());
        info!("Peer link advertising as '{}'", adapter.device_name());
        adapter
    });

    let gpio = config.gpio.enabled.then(|| {
        Arc::new(GpioBank::new(config.gpio.pins.clone(), Box::new(LoggingPins)))
    });

    if config.api.enabled {
        let router = api::build_router(
            Arc::new(ApiState {
                engine: engine.clone(),
                peer,
            }),
            gpio,
        );
        let port = config.api.port;
        tokio::spawn(async move {
            if let Err(e) = api::start_server(router, port).await {
                error!("HTTP server stopped: {:#}", e);
            }
        });
    }

    if config.touchscreen.enabled && !args.no_touchscreen {
        let endpoint = ScreenEndpoint::parse(&config.touchscreen.port);
        match touchscreen::start(&endpoint, engine.clone()).await {
            Ok(_) => info!("Touchscreen running on {}", endpoint),
            Err(e) => warn!("Touchscreen unavailable: {:#}", e),
        }
    }

    let console = args.repl.then(|| tokio::spawn(cli::run_repl(engine.clone())));

    info!("Panel Sync running");
    tokio::select! {
        _ = shutdown => {}
        _ = wait_console(console) => info!("Console closed, shutting down"),
    }

    stop_engine(&engine).await;
    Ok(())
}

async fn wait_console(console: Option<JoinHandle<Result<()>>>) {
    match console {
        Some(handle) => match handle.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("Console failed: {:#}", e),
            Err(e) => error!("Console task panicked: {}", e),
        },
        None => std::future::pending().await,
    }
}

async fn stop_engine(engine: &EngineHandle) {
    info!("Flushing control state...");
    engine.shutdown().await;
}

fn init_logging(level: &str, logs_dir: &Path) -> Result<WorkerGuard> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let file_appender = tracing_appender::rolling::daily(logs_dir, "panel-sync.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(file_writer),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(guard)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to install CTRL+C signal handler: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
