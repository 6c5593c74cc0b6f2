//! Headless machine simulation
//!
//! Runs one machine as fast as possible on synthetic time and prints one
//! line per tick (readings plus health) to stdout. A run summary with the
//! final recommendations and alarm counts goes to stderr.
//!
//! # Usage
//! ```bash
//! ./beltwatch-sim --machine conveyor_belt --ticks 3600 --seed 7 --format csv \
//!     --fault belt_slip --fault-at 1200 > run.csv
//! ```

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Duration, Utc};
use clap::{Parser, ValueEnum};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Instant;

use beltwatch::config::PlantConfig;
use beltwatch::pipeline::{DriveProfile, Machine, TickReport};
use beltwatch::types::{Fault, Severity};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Csv,
}

#[derive(Parser, Debug)]
#[command(name = "beltwatch-sim")]
#[command(about = "Run one simulated machine on synthetic time")]
#[command(version)]
struct Args {
    /// Machine id from the plant config
    #[arg(short, long, default_value = "conveyor_belt")]
    machine: String,

    /// Number of ticks to simulate
    #[arg(short, long, default_value = "3600")]
    ticks: u64,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Fault to inject, e.g. bearing_failure
    #[arg(long)]
    fault: Option<String>,

    /// Tick at which the fault becomes active
    #[arg(long, default_value = "0", requires = "fault")]
    fault_at: u64,

    /// Plant configuration file (otherwise the standard search order)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Suppress the stderr summary
    #[arg(short, long)]
    quiet: bool,
}

// ============================================================================
// Output
// ============================================================================

fn write_csv_header(out: &mut impl Write, channels: &[String]) -> io::Result<()> {
    writeln!(
        out,
        "tick,timestamp,{},health_score,remaining_useful_life,severity,status",
        channels.join(",")
    )
}

fn write_csv_row(out: &mut impl Write, machine: &Machine, report: &TickReport) -> io::Result<()> {
    let values: Vec<String> = report
        .snapshot
        .channels
        .values()
        .map(|r| format!("{:.3}", r.value))
        .collect();
    writeln!(
        out,
        "{},{},{},{:.2},{:.2},{:?},{:?}",
        report.tick,
        report.snapshot.timestamp.to_rfc3339(),
        values.join(","),
        report.health.health_score,
        report.health.remaining_useful_life,
        report.health.severity,
        machine.status(),
    )
}

fn write_json_row(out: &mut impl Write, machine: &Machine, report: &TickReport) -> Result<()> {
    let line = serde_json::json!({
        "tick": report.tick,
        "timestamp": report.snapshot.timestamp,
        "readings": report.snapshot.channels,
        "health": report.health,
        "status": machine.status(),
        "new_alarms": report.new_alarms.len(),
    });
    writeln!(out, "{}", serde_json::to_string(&line)?)?;
    Ok(())
}

fn print_summary(machine: &Machine, elapsed: std::time::Duration) {
    let alarms = machine.alarm_log();
    let count = |s: Severity| alarms.iter().filter(|a| a.severity == s).count();
    let health = machine.health();

    eprintln!("{}", "=".repeat(60));
    eprintln!("SIMULATION COMPLETE: {} ({})", machine.id(), machine.kind());
    eprintln!("{}", "=".repeat(60));
    eprintln!("Ticks:            {}", machine.tick_count());
    eprintln!("Operating hours:  {:.3}", machine.operating_hours());
    eprintln!("Status:           {:?}", machine.status());
    eprintln!(
        "Health:           {:.1} ({:?}), RUL {:.1}",
        health.health_score, health.severity, health.remaining_useful_life
    );
    eprintln!(
        "Alarms logged:    {} medium, {} high, {} critical",
        count(Severity::Medium),
        count(Severity::High),
        count(Severity::Critical)
    );
    for (name, risk) in &health.failure_indicators {
        eprintln!("  {name:<22} {risk:.2}");
    }
    if machine.recommendations().is_empty() {
        eprintln!("Recommendations:  none");
    } else {
        eprintln!("Recommendations:");
        for rec in machine.recommendations() {
            eprintln!(
                "  [{:?}] {} within {} days: {}",
                rec.priority, rec.kind, rec.estimated_days, rec.description
            );
        }
    }
    eprintln!("Real time:        {:.2}s", elapsed.as_secs_f64());
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => PlantConfig::load_from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => PlantConfig::load(),
    };
    let machine_cfg = config.machines.get(&args.machine).ok_or_else(|| {
        let known: Vec<&str> = config.machines.keys().map(String::as_str).collect();
        anyhow!("unknown machine '{}' (configured: {})", args.machine, known.join(", "))
    })?;
    let fault: Option<Fault> = args
        .fault
        .as_deref()
        .map(str::parse)
        .transpose()
        .map_err(|e: String| anyhow!(e))?;

    let seed = args.seed.or(config.simulation.seed);
    let mut machine = Machine::from_config(&args.machine, machine_cfg, &config, seed)?;
    let drive = DriveProfile::new(machine_cfg.drive());

    let sim = &config.simulation;
    #[allow(clippy::cast_precision_loss)]
    let tick_secs = sim.tick_interval_ms as f64 / 1000.0 * sim.time_scale;
    let hours_per_tick = tick_secs / 3600.0;
    #[allow(clippy::cast_possible_truncation)]
    let step = Duration::milliseconds((tick_secs * 1000.0).round() as i64);
    let start: DateTime<Utc> = Utc::now();

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if matches!(args.format, OutputFormat::Csv) {
        let channels: Vec<String> = machine.get_snapshot().channels.into_keys().collect();
        write_csv_header(&mut out, &channels)?;
    }

    let started = Instant::now();
    let mut now = start;
    for tick in 0..args.ticks {
        if tick == args.fault_at {
            if let Some(f) = fault {
                machine.set_fault(Some(f));
            }
        }
        now += step;
        let params = drive.params_at(machine.operating_hours() + hours_per_tick);
        let report = machine
            .tick(&params, now)
            .with_context(|| format!("tick {} aborted", tick + 1))?;

        match args.format {
            OutputFormat::Json => write_json_row(&mut out, &machine, &report)?,
            OutputFormat::Csv => write_csv_row(&mut out, &machine, &report)?,
        }
    }
    out.flush()?;
    drop(out);

    if !args.quiet {
        print_summary(&machine, started.elapsed());
    }
    Ok(())
}
