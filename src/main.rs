//! Global Watch - headless runner
//!
//! Runs the simulation for a fixed number of ticks and prints a summary
//! followed by the chronicle of what happened. With `--worker` the same run
//! goes through the simulation thread and a presentation mirror.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use global_watch::core::config::SimulationConfig;
use global_watch::core::error::{Result, SimError};
use global_watch::data;
use global_watch::faction::FactionManager;
use global_watch::narrative::ChronicleEngine;
use global_watch::sync::{PresentationMirror, SimulationWorker, WorkerCommand};
use global_watch::world::World;

#[derive(Parser, Debug)]
#[command(name = "global-watch", about = "Run the Global Watch simulation headless")]
struct Args {
    /// Number of fixed steps to run
    #[arg(long, default_value_t = 600)]
    ticks: u32,

    /// World seed (overrides the config file)
    #[arg(long)]
    seed: Option<u64>,

    /// Simulation config (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Region definitions (JSON) replacing the bundled map
    #[arg(long)]
    regions: Option<PathBuf>,

    /// Drive the run through the simulation thread
    #[arg(long)]
    worker: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("global_watch=info")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => SimulationConfig::load(path)?,
        None => SimulationConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }

    if args.worker {
        return run_worker(config, args.ticks);
    }

    let mut world = match &args.regions {
        Some(path) => {
            config.validate().map_err(SimError::Config)?;
            let regions = data::load_regions(path, config.planet_radius)?;
            World::from_parts(
                config,
                regions,
                FactionManager::new(data::default_factions()),
                data::default_actions()?,
                data::default_abilities()?,
            )
        }
        None => World::new(config)?,
    };

    tracing::info!("Running {} ticks", args.ticks);
    let dt = world.config.fixed_dt;
    for _ in 0..args.ticks {
        world.tick(dt);
    }

    print_summary(&world);

    let mut chronicles = ChronicleEngine::default();
    chronicles.process(&world.log);
    println!();
    println!("=== Chronicle ===");
    for chronicle in chronicles.chronicles() {
        println!("[{:>8.1}s] {}", chronicle.timestamp, chronicle.title);
    }
    Ok(())
}

fn print_summary(world: &World) {
    println!();
    println!(
        "=== Tick {} | t = {:.1}s | alert {} ===",
        world.tick_count(),
        world.time(),
        world.ai.alert_level()
    );
    for faction in world.factions.iter() {
        let r = faction.resources();
        let owned = world.regions.iter().filter(|g| g.is_owned_by(faction.id)).count();
        println!(
            "  {:<26} funds {:>8.1}  intel {:>6.1}  tech {:>6.1}  regions {:>2}  research {:>3.0}%",
            faction.name,
            r.funds,
            r.intel,
            r.tech,
            owned,
            faction.research.progress() * 100.0
        );
    }
    println!(
        "  threats live {}  mitigated {} ({} by player)",
        world.threats.iter().filter(|t| !t.is_mitigated()).count(),
        world.threats.mitigated_total(),
        world.threats.mitigated_by_player()
    );
    println!(
        "  agents {}  units {}  satellites {}  events {}",
        world.agents.len(),
        world.units.units().len(),
        world.units.satellites().len(),
        world.log.len()
    );
}

fn run_worker(config: SimulationConfig, ticks: u32) -> Result<()> {
    let mut worker = SimulationWorker::spawn(&config)?;
    let mut mirror = PresentationMirror::new();

    worker.send(WorkerCommand::Init(Box::new(config)));
    if let Some(update) = worker.recv_blocking() {
        mirror.apply(update);
    }

    let mut remaining = ticks;
    while remaining > 0 {
        let batch = remaining.min(32);
        if !worker.send(WorkerCommand::Step(batch)) {
            std::thread::yield_now();
            continue;
        }
        remaining -= batch;
        match worker.recv_blocking() {
            Some(update) => mirror.apply(update),
            None => break,
        }
    }
    while let Some(update) = worker.try_recv() {
        mirror.apply(update);
    }

    println!();
    println!(
        "=== Mirror at tick {} | t = {:.1}s | alert {} ===",
        mirror.header.tick, mirror.header.time, mirror.header.alert_level
    );
    println!(
        "  entities {}  events seen {}  updates applied {}",
        mirror.len(),
        mirror.events().len(),
        mirror.updates_applied()
    );
    worker.shutdown();
    Ok(())
}
