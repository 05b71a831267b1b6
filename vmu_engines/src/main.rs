//! # VMU Engine Simulator Binary
//!
//! ```bash
//! vmu_engine --engine electric --config config/vmu.toml
//! vmu_engine --engine combustion -v --json
//! ```
//!
//! The supervisor must already be running: the state region, its semaphore
//! and the engine's queues are opened, never created, here.

use clap::Parser;
use std::path::PathBuf;
use std::process;
use tracing::{error, info};
use vmu_common::command::EngineKind;
use vmu_common::config::{ConfigLoader, VmuConfig};
use vmu_common::lifecycle::RunFlags;
use vmu_common::logging::init_tracing;
use vmu_engines::{EngineRunner, ModelLimits, ModelRegistry};
use vmu_shared_memory::{EngineLink, SharedState};

/// VMU engine simulator
#[derive(Parser, Debug)]
#[command(name = "vmu_engine")]
#[command(version)]
#[command(about = "Electric / combustion engine simulator for the vehicle management unit")]
struct Args {
    /// Engine to simulate (electric or combustion).
    #[arg(short, long)]
    engine: EngineKind,

    /// Path to the VMU configuration file.
    #[arg(short, long, default_value = "config/vmu.toml")]
    config: PathBuf,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();
    let config = VmuConfig::load(&args.config);
    let level = config
        .as_ref()
        .map(|c| c.shared.log_level)
        .unwrap_or_default();
    init_tracing(level, args.verbose, args.json);

    info!(
        "VMU {} engine v{} starting...",
        args.engine,
        env!("CARGO_PKG_VERSION")
    );

    let result = config
        .map_err(|e| Box::new(e) as Box<dyn std::error::Error>)
        .and_then(|config| run(&args, &config));
    if let Err(e) = result {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("VMU {} engine shutdown complete", args.engine);
}

fn run(args: &Args, config: &VmuConfig) -> Result<(), Box<dyn std::error::Error>> {
    config.validate()?;

    let flags = RunFlags::install()?;
    let store = SharedState::open(&config.ipc)?;
    let link = EngineLink::open(args.engine, &config.ipc)?;
    let model = ModelRegistry::with_builtin()
        .with_limits(ModelLimits::from(&config.controller))
        .create(args.engine.as_str())?;
    info!("Attached to {} ({})", config.ipc.state_region, config.shared.service_name);

    let mut runner = EngineRunner::new(store, link, model)?;
    runner.run(
        &flags,
        config.engine.poll_timeout(),
        config.engine.pause_nap(),
    )?;
    Ok(())
}
