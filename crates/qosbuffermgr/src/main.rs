//! qosbuffermgr entry point.
//!
//! Plans a QoS buffer reconciliation offline: reads a task file and the
//! device's current buffer document, then prints the change records and
//! REST requests as JSON on stdout.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use sonic_qosbuffermgr::{
    parse_buffer_config, Batching, BufferTask, Mode, QosBufferConfig, QosBufferMgr,
};

/// SONiC QoS buffer pool and profile reconciler
#[derive(Parser, Debug)]
#[command(name = "qosbuffermgr")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Task file (YAML) with `state` and `config`
    #[arg(short = 't', long)]
    task: PathBuf,

    /// Current device buffer document (JSON); absent means empty device
    #[arg(short = 'e', long)]
    existing: Option<PathBuf>,

    /// Manager configuration file (YAML)
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Override the task's state
    #[arg(short = 's', long, value_enum)]
    state: Option<Mode>,

    /// Override upsert batching
    #[arg(short = 'b', long, value_enum)]
    batching: Option<Batching>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, default_value = "info")]
    log_level: String,
}

/// Initialize tracing/logging. Logs go to stderr so stdout stays JSON.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn read_existing(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid JSON in {}", path.display()))
}

fn run(args: &Args) -> Result<()> {
    let task = BufferTask::from_yaml_file(&args.task)
        .with_context(|| format!("Failed to load task {}", args.task.display()))?;

    let mut config = match &args.config {
        Some(path) => QosBufferConfig::from_yaml_file(path)?,
        None => QosBufferConfig::default(),
    };
    if let Some(batching) = args.batching {
        config = config.with_batching(batching);
    }

    let document = args.existing.as_deref().map(read_existing).transpose()?;
    let existing = parse_buffer_config(document.as_ref())?;
    let mode = args.state.unwrap_or(task.state);

    info!(
        "Existing device state: {} pools, {} profiles",
        existing.buffer_pools.len(),
        existing.buffer_profiles.len()
    );

    let mgr = QosBufferMgr::new(config);
    let plan = mgr.plan(&task.config, &existing, mode)?;

    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args.log_level);

    info!("Starting qosbuffermgr");

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("qosbuffermgr failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
