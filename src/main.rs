//! beltwatch - predictive maintenance simulator
//!
//! Simulates a bucket elevator and a conveyor belt, scores their health,
//! raises alarms and maintenance recommendations, serves everything over
//! HTTP and optionally pushes it to a remote collector.
//!
//! # Usage
//!
//! ```bash
//! # Defaults: both machines, 1 s ticks, API on 0.0.0.0:8080
//! cargo run --release
//!
//! # Explicit config, reproducible noise, no upload
//! ./beltwatch --config plant.toml --seed 42 --no-transmit
//! ```
//!
//! # Environment Variables
//!
//! - `BELTWATCH_CONFIG`: Path to the plant TOML file
//! - `BELTWATCH_SERVER_ADDR`: Override the HTTP bind address
//! - `BELTWATCH_CORS_ORIGINS`: Comma-separated cross-origin allow list
//! - `BELTWATCH_LOG_JSON`: Emit JSON log lines
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use axum::Router;
use beltwatch::api::{create_app, ApiState};
use beltwatch::config::PlantConfig;
use beltwatch::pipeline::{Plant, Scheduler};
use beltwatch::transmit::{run_uploader, HttpTransmitter, Outbox, SharedStats, UploadSettings};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "beltwatch")]
#[command(about = "Bucket elevator and conveyor belt maintenance simulator")]
#[command(version)]
struct CliArgs {
    /// Plant configuration file (otherwise $BELTWATCH_CONFIG, then ./beltwatch.toml)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Override the server address (default: "0.0.0.0:8080")
    #[arg(short, long)]
    addr: Option<String>,

    /// Seed the sensor noise generators for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Override the tick interval in milliseconds
    #[arg(long, value_name = "MS")]
    tick_ms: Option<u64>,

    /// Disable the remote transmitter even if the config enables it
    #[arg(long)]
    no_transmit: bool,

    /// Emit logs as JSON lines
    #[arg(long, env = "BELTWATCH_LOG_JSON")]
    log_json: bool,
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(args: &CliArgs) -> Result<PlantConfig> {
    let mut config = match &args.config {
        Some(path) => PlantConfig::load_from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => PlantConfig::load(),
    };
    config.apply_env_overrides();

    if let Some(addr) = &args.addr {
        config.server.addr.clone_from(addr);
    }
    if let Some(seed) = args.seed {
        config.simulation.seed = Some(seed);
    }
    if let Some(tick_ms) = args.tick_ms {
        config.simulation.tick_interval_ms = tick_ms;
    }
    if args.no_transmit {
        config.transmitter.enabled = false;
    }

    // CLI overrides can break invariants the file satisfied
    config.validate()?;
    Ok(config)
}

// ============================================================================
// Task Names for Supervisor Logging
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum TaskName {
    HttpServer,
    Scheduler,
    Uploader,
}

impl std::fmt::Display for TaskName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskName::HttpServer => write!(f, "HttpServer"),
            TaskName::Scheduler => write!(f, "Scheduler"),
            TaskName::Uploader => write!(f, "Uploader"),
        }
    }
}

// ============================================================================
// Task spawning
// ============================================================================

/// Spawn the HTTP server task into the JoinSet.
fn spawn_http_server(
    task_set: &mut JoinSet<Result<TaskName>>,
    listener: tokio::net::TcpListener,
    app: Router,
    cancel_token: CancellationToken,
) {
    task_set.spawn(async move {
        info!("[HttpServer] Task starting");

        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                cancel_token.cancelled().await;
                info!("[HttpServer] Received shutdown signal");
            })
            .await;

        match result {
            Ok(()) => {
                info!("[HttpServer] Graceful shutdown complete");
                Ok(TaskName::HttpServer)
            }
            Err(e) => {
                error!("[HttpServer] Server error: {}", e);
                Err(anyhow::anyhow!("HTTP server error: {}", e))
            }
        }
    });
}

/// Spawn the upload task and return the outbox the scheduler feeds.
fn spawn_uploader(
    task_set: &mut JoinSet<Result<TaskName>>,
    config: &PlantConfig,
    stats: &SharedStats,
    cancel_token: CancellationToken,
) -> Result<Outbox> {
    let cfg = &config.transmitter;
    let transmitter = HttpTransmitter::new(&cfg.base_url, Duration::from_secs(cfg.timeout_secs))
        .context("building HTTP transmitter")?;
    let (outbox, rx) = Outbox::channel(cfg.outbox_capacity, stats.clone());
    let settings = UploadSettings::from(cfg);
    let stats = stats.clone();

    info!(base_url = %cfg.base_url, "[Uploader] Transmitting to remote collector");
    task_set.spawn(async move {
        run_uploader(rx, Arc::new(transmitter), settings, stats, cancel_token).await;
        Ok(TaskName::Uploader)
    });
    Ok(outbox)
}

/// Spawn the tick loop. A numeric anomaly ends it with an error, which
/// the supervisor turns into a full shutdown.
fn spawn_scheduler(
    task_set: &mut JoinSet<Result<TaskName>>,
    scheduler: Scheduler,
    cancel_token: CancellationToken,
) {
    task_set.spawn(async move {
        let ticks = scheduler
            .run(cancel_token)
            .await
            .context("simulation aborted")?;
        info!(ticks, "[Scheduler] Finished");
        Ok(TaskName::Scheduler)
    });
}

/// Run the supervisor loop: monitor tasks, cancel on failure.
async fn run_supervisor(
    task_set: &mut JoinSet<Result<TaskName>>,
    cancel_token: CancellationToken,
) -> Result<()> {
    info!("Supervisor: all tasks spawned, monitoring");

    loop {
        tokio::select! {
            () = cancel_token.cancelled() => {
                info!("Supervisor: shutdown signal received");
                break;
            }
            result = task_set.join_next() => {
                match result {
                    Some(Ok(Ok(task_name))) => {
                        info!("Supervisor: task {} completed normally", task_name);
                    }
                    Some(Ok(Err(e))) => {
                        error!("Supervisor: task failed with error: {:#}", e);
                        cancel_token.cancel();
                        return Err(e);
                    }
                    Some(Err(e)) => {
                        error!("Supervisor: task panicked: {}", e);
                        cancel_token.cancel();
                        return Err(anyhow::anyhow!("Task panicked: {}", e));
                    }
                    None => {
                        info!("Supervisor: all tasks completed");
                        break;
                    }
                }
            }
        }
    }

    // Let the remaining tasks observe the cancellation and wind down
    while let Some(result) = task_set.join_next().await {
        if let Ok(Err(e)) = result {
            error!("Supervisor: task failed during shutdown: {:#}", e);
        }
    }
    Ok(())
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(args.log_json);
    let config = load_config(&args)?;

    info!(
        plant = %config.plant.name,
        machines = config.enabled_machines().count(),
        tick_ms = config.simulation.tick_interval_ms,
        transmit = config.transmitter.enabled,
        "beltwatch starting"
    );

    let plant = Arc::new(Plant::from_config(&config).context("building machines")?);

    // Graceful shutdown via Ctrl+C
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received Ctrl+C, initiating shutdown");
        shutdown_token.cancel();
    });

    let mut task_set: JoinSet<Result<TaskName>> = JoinSet::new();
    let stats = SharedStats::new(config.transmitter.enabled);

    let outbox = if config.transmitter.enabled {
        Some(spawn_uploader(&mut task_set, &config, &stats, cancel_token.clone())?)
    } else {
        info!("Transmitter disabled, running offline");
        None
    };

    let scheduler = Scheduler::new(Arc::clone(&plant), &config, outbox);
    spawn_scheduler(&mut task_set, scheduler, cancel_token.clone());

    let listener = tokio::net::TcpListener::bind(&config.server.addr)
        .await
        .with_context(|| format!("binding {}", config.server.addr))?;
    info!(addr = %config.server.addr, "HTTP API listening");
    let app = create_app(ApiState::new(plant, stats));
    spawn_http_server(&mut task_set, listener, app, cancel_token.clone());

    run_supervisor(&mut task_set, cancel_token).await
}
