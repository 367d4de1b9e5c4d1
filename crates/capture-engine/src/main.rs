//! # Capture Sim
//!
//! Headless driver for one authority of a capture room.
//!
//! Loads a room configuration, seeds the room with the authority, its bots
//! and idle NPC groups, then runs fixed-timestep ticks and logs every event
//! as the packet a transport would broadcast.
//!
//! Usage: `capture-sim [config.toml]`

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod config;
mod script;
mod timing;

use std::path::Path;

use anyhow::Result;
use capture_common::{GroupId, Position, UserId};
use capture_gameplay::{spawn_position, Simulation, UserInfo};
use capture_kernel::AnimalKind;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::SimConfig;
use crate::script::Script;
use crate::timing::FixedTimestep;

/// Main entry point.
fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("capture=info".parse()?))
        .init();

    info!("Capture sim starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = match std::env::args().nth(1) {
        Some(path) => load_or_init(Path::new(&path)),
        None => SimConfig::load(),
    };

    let mut sim = build_room(&config);
    run(&mut sim, &config)?;

    info!(
        "Finished at tick {}: {} groups, {} captors, {} paths in flight",
        sim.tick(),
        sim.registry().len(),
        sim.registry().captor_count(),
        sim.paths().len()
    );
    println!("{}", sim.registry().to_json()?);
    Ok(())
}

/// Loads `path`, writing the defaults there first if it does not exist.
fn load_or_init(path: &Path) -> SimConfig {
    if path.exists() {
        return SimConfig::load_from(path);
    }
    let config = SimConfig::default();
    if let Err(e) = config.save_to(path) {
        warn!("Could not write default config to {}: {e}", path.display());
    }
    config
}

/// Creates the room: the authority, its bots and the initial idle groups.
fn build_room(config: &SimConfig) -> Simulation {
    let bounds = config.bounds();
    info!(
        "Room {}: x {}..{}, y {}..{}, grid {}",
        config.room_id, bounds.min_x, bounds.max_x, bounds.min_y, bounds.max_y, bounds.grid_size
    );

    let mut sim =
        Simulation::new(config.settings(), bounds).with_footprints(config.footprint_table());
    let authority = UserId::new(config.authority_id.as_str());
    sim.upsert_user(UserInfo::player(authority.clone(), AnimalKind::Fox.key(), Position::ORIGIN));

    for n in 0..config.bot_count {
        let id = UserId::new(format!("bot-{n}"));
        let animal = AnimalKind::ALL[n as usize % AnimalKind::ALL.len()];
        let at = spawn_position(&bounds, &GroupId::new(id.as_str()), 0);
        sim.upsert_user(UserInfo::bot(id, animal.key(), at, Some(authority.clone())));
    }

    for n in 0..config.initial_npc_groups {
        sim.spawn_group(format!("npc-{n}"));
    }
    sim
}

/// Runs ticks until `max_ticks` (forever when zero).
fn run(sim: &mut Simulation, config: &SimConfig) -> Result<()> {
    let mut timestep = FixedTimestep::new(config.tick_rate);
    let script = Script::new(config.throw_interval, config.tick_dt());

    timestep.reset();
    while !finished(sim, config.max_ticks) {
        let dt = timestep.frame_delta();
        let ticks = timestep.accumulate(dt);
        for _ in 0..ticks {
            script.drive(sim);
            let report = sim.step(timestep.fixed_dt());
            for transfer in &report.transfers {
                info!(
                    "Tick {}: {} stole {} from {:?}",
                    report.tick, transfer.to, transfer.group_id, transfer.from
                );
            }
            for event in sim.events().drain() {
                debug!("{}", event.to_packet()?.encode()?);
            }
            if finished(sim, config.max_ticks) {
                break;
            }
        }
        timestep.sleep_remainder();
    }
    Ok(())
}

fn finished(sim: &Simulation, max_ticks: u64) -> bool {
    max_ticks > 0 && sim.tick() >= max_ticks
}
