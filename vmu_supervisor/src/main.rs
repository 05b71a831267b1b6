//! # VMU Supervisor Binary
//!
//! ```bash
//! vmu_supervisor --config config/vmu.toml
//! vmu_supervisor -v --json --no-pedal
//! ```
//!
//! Start this first: it creates the state region, its semaphore and the
//! engine queues, and removes them again on exit. Then start one
//! `vmu_engine` per engine.

use clap::Parser;
use std::path::PathBuf;
use std::process;
use tracing::{error, info};
use vmu_common::command::EngineKind;
use vmu_common::config::{ConfigLoader, VmuConfig};
use vmu_common::lifecycle::RunFlags;
use vmu_common::logging::init_tracing;
use vmu_common::state::SystemState;
use vmu_shared_memory::{EngineLink, SharedState};
use vmu_supervisor::Supervisor;
use vmu_supervisor::pedal::spawn_stdin_reader;

/// VMU supervisor
#[derive(Parser, Debug)]
#[command(name = "vmu_supervisor")]
#[command(version)]
#[command(about = "Power-mode supervisor for the hybrid powertrain simulation")]
struct Args {
    /// Path to the VMU configuration file.
    #[arg(short, long, default_value = "config/vmu.toml")]
    config: PathBuf,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,

    /// Do not read pedal input from stdin.
    #[arg(long)]
    no_pedal: bool,
}

fn main() {
    let args = Args::parse();
    let config = VmuConfig::load(&args.config);
    let level = config
        .as_ref()
        .map(|c| c.shared.log_level)
        .unwrap_or_default();
    init_tracing(level, args.verbose, args.json);

    info!("VMU supervisor v{} starting...", env!("CARGO_PKG_VERSION"));

    let result = config
        .map_err(|e| Box::new(e) as Box<dyn std::error::Error>)
        .and_then(|config| run(&args, &config));
    if let Err(e) = result {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("VMU supervisor shutdown complete");
}

fn run(args: &Args, config: &VmuConfig) -> Result<(), Box<dyn std::error::Error>> {
    config.validate()?;
    info!(
        "Config OK: service={} cycle={}ms split={} km/h",
        config.shared.service_name,
        config.supervisor.cycle_time_ms,
        config.controller.split_speed
    );

    let flags = RunFlags::install()?;

    let initial = SystemState::initial(&config.vehicle);
    let store = SharedState::create(&config.ipc, initial)?;
    let electric = EngineLink::create(EngineKind::Electric, &config.ipc)?;
    let combustion = EngineLink::create(EngineKind::Combustion, &config.ipc)?;
    info!(
        "Created {} ({}), queues {} / {}",
        config.ipc.state_region,
        config.ipc.state_lock,
        config.ipc.ev_requests,
        config.ipc.iec_requests
    );

    if args.no_pedal {
        info!("Pedal input disabled");
    } else {
        let pedal_store = SharedState::open(&config.ipc)?;
        spawn_stdin_reader(pedal_store, flags.clone())?;
    }

    let mut supervisor = Supervisor::new(store, electric, combustion, config)?;
    supervisor.run(&flags)?;
    Ok(())
}
