//! renderwatch - run a render command and watch its lifecycle.
//!
//! Spawns the given command with piped stdout/stderr, feeds both streams
//! into a monitor, prints the transcript live, and exits 0 when the job
//! completes with an artifact or 1 when it fails.

use anyhow::{bail, Context, Result};
use clap::Parser;
use renderwatch_cli::config::Config;
use renderwatch_cli::logging::{self, LogConfig, LogFormat};
use renderwatch_cli::process::RenderProcess;
use renderwatch_core::{ingest_channel, MonitorController, MonitorOptions};
use renderwatch_types::{Classification, JobOutcome, MonitorEvent};
use std::path::PathBuf;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Watch a render process and report its lifecycle.
#[derive(Parser, Debug)]
#[command(name = "renderwatch")]
#[command(about = "Run a render command and derive its outcome from the log stream")]
#[command(version)]
struct Cli {
    /// Path to config file (TOML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Artifact path the render is expected to produce. Required for
    /// backends that only announce completion in free text.
    #[arg(short, long, value_name = "PATH")]
    artifact: Option<PathBuf>,

    /// Enable verbose logging (INFO for all targets)
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Enable trace logging
    #[arg(long)]
    trace: bool,

    /// Quiet mode (WARN and ERROR only)
    #[arg(short, long)]
    quiet: bool,

    /// Set log level for specific targets (e.g., "monitor=debug").
    /// Can be specified multiple times; targets are prefixed with
    /// "renderwatch::" automatically.
    #[arg(long = "log", value_name = "TARGET=LEVEL")]
    log_overrides: Vec<String>,

    /// Log output format
    #[arg(long = "log-format", value_name = "FORMAT", default_value = "text")]
    log_format: LogFormat,

    /// Render command to run, after `--`
    #[arg(last = true, required = true)]
    command: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(&LogConfig::from_cli(
        cli.verbose,
        cli.debug,
        cli.trace,
        cli.quiet,
        cli.log_overrides.clone(),
        cli.log_format,
    ));

    let config = match &cli.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => Config::load()?,
    };

    let (program, args) = cli
        .command
        .split_first()
        .context("empty render command")?;

    let job_id = Uuid::new_v4();
    let (tx, rx) = ingest_channel(256);
    let mut handle = MonitorController::spawn(
        MonitorOptions {
            job_id,
            expected_artifact: cli.artifact.clone(),
            config: config.monitor_config(),
        },
        rx,
    );

    let _ = tx.opened().await;
    info!(target: "renderwatch::cli", "Spawning render command: {}", program);
    let process = RenderProcess::spawn(program, args, tx)?;

    let mut exit_code = None;
    while let Some(event) = handle.recv().await {
        match event {
            MonitorEvent::LineAppended { line, .. } => {
                println!("[{}] {}", class_tag(line.classification), line.text);
            }
            MonitorEvent::StatusChanged { status, .. } => {
                info!(target: "renderwatch::cli", "Job {} is {}", job_id, status);
            }
            MonitorEvent::Elapsed { seconds, .. } => {
                debug!(target: "renderwatch::cli", "Processing for {}", format_elapsed(seconds));
            }
            MonitorEvent::Finished { outcome, .. } => {
                let elapsed = format_elapsed(handle.elapsed().await.as_secs());
                match outcome {
                    JobOutcome::Completed { artifact } => {
                        info!(target: "renderwatch::cli", "Job {} completed in {}", job_id, elapsed);
                        println!("render completed in {} -> {}", elapsed, artifact.display());
                        exit_code = Some(0);
                    }
                    JobOutcome::Failed { message } => {
                        warn!(target: "renderwatch::cli", "Job {} failed after {}", job_id, elapsed);
                        eprintln!("render failed: {}", message);
                        exit_code = Some(1);
                    }
                }
                break;
            }
        }
    }

    // An erroring log line latches the job while the render process is
    // usually still running; stop and reap it before touching the exit
    // status, which bypasses destructors.
    process.shutdown().await;

    match exit_code {
        Some(0) => Ok(()),
        Some(code) => std::process::exit(code),
        None => bail!("monitor ended without a terminal event"),
    }
}

/// Short transcript prefix per classification, the CLI stand-in for the
/// color coding a graphical view would apply.
fn class_tag(classification: Classification) -> &'static str {
    match classification {
        Classification::Progress => "progress",
        Classification::Completion => "complete",
        Classification::Error => "error",
        Classification::Neutral => "log",
    }
}

/// Format seconds as m:ss.
fn format_elapsed(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
