//! Scripted behaviour for the users this process simulates.
//!
//! Stands in for player input in the headless driver: walk toward the
//! nearest idle group, and every so often throw whatever is held at the
//! nearest other user.

use capture_common::{Direction, Position, UserId};
use capture_gameplay::{simulated_users, GroupPhase, Simulation};
use capture_kernel::{deterministic_value, RngInputs};
use tracing::{debug, trace};

/// Walking speed of scripted users, units/s.
const WALK_SPEED: f32 = 6.0;

/// Ticks between wander heading changes.
const WANDER_PERIOD: u64 = 60;

/// Decides and applies one tick of input for the authority and its bots.
#[derive(Debug, Clone)]
pub struct Script {
    throw_interval: u64,
    dt: f32,
}

impl Script {
    /// Creates a script throwing every `throw_interval` ticks.
    #[must_use]
    pub fn new(throw_interval: u64, dt: f32) -> Self {
        Self {
            throw_interval: throw_interval.max(1),
            dt,
        }
    }

    /// Applies input for everyone `sim`'s authority simulates.
    pub fn drive(&self, sim: &mut Simulation) {
        let tick = sim.tick();
        let authority = &sim.settings().authority;
        let actors: Vec<(UserId, Position)> = simulated_users(authority, sim.users())
            .into_iter()
            .map(|u| (u.id.clone(), u.position))
            .collect();

        for (slot, (user_id, position)) in actors.into_iter().enumerate() {
            let holding = sim.registry().get_by_user(&user_id).is_some();
            if holding && (tick + slot as u64) % self.throw_interval == 0 {
                if let Some(target) = nearest_other_user(sim, &user_id, position) {
                    match sim.throw(&user_id, target) {
                        Ok(path_id) => debug!("{user_id} threw {path_id}"),
                        Err(e) => trace!("{user_id} could not throw: {e}"),
                    }
                    continue;
                }
            }

            let heading = nearest_idle_group(sim, position).map_or_else(
                || wander_heading(&user_id, tick),
                |g| Direction::towards(position, g),
            );
            let step = heading.to_vec2() * WALK_SPEED * self.dt;
            let next = Position::new(position.x + step.x, position.y + step.y);
            sim.move_user(&user_id, next, heading);
        }
    }
}

fn nearest_other_user(sim: &Simulation, user_id: &UserId, from: Position) -> Option<Position> {
    sim.users()
        .values()
        .filter(|u| &u.id != user_id)
        .map(|u| u.position)
        .min_by(|a, b| from.distance(*a).total_cmp(&from.distance(*b)))
}

fn nearest_idle_group(sim: &Simulation, from: Position) -> Option<Position> {
    sim.registry()
        .values()
        .filter(|g| g.phase == GroupPhase::Idle)
        .map(|g| g.position)
        .min_by(|a, b| from.distance(*a).total_cmp(&from.distance(*b)))
}

fn wander_heading(user_id: &UserId, tick: u64) -> Direction {
    let inputs = RngInputs::new()
        .with("userId", user_id)
        .with("epoch", tick / WANDER_PERIOD);
    let angle = deterministic_value(&inputs) * std::f32::consts::TAU;
    Direction::new(angle.cos(), angle.sin())
}

#[cfg(test)]
mod tests {
    use super::*;
    use capture_gameplay::{SimulationSettings, UserInfo};
    use capture_kernel::TerrainBounds;

    fn sim() -> Simulation {
        let mut sim = Simulation::new(
            SimulationSettings::new("host"),
            TerrainBounds::new(-20.0, 20.0, -20.0, 20.0, 1.0),
        );
        sim.upsert_user(UserInfo::player("host", "fox", Position::ORIGIN));
        sim.upsert_user(UserInfo::player("guest", "cat", Position::new(10.0, 0.0)));
        sim
    }

    #[test]
    fn test_walks_toward_idle_group() {
        let mut sim = sim();
        let id = sim.spawn_group("npc-1");
        let target = sim.registry().get_by_group_id(&id).expect("spawned").position;
        let before = Position::ORIGIN.distance(target);

        Script::new(90, 1.0 / 60.0).drive(&mut sim);

        let host = &sim.users()[&UserId::new("host")];
        assert!(host.position.distance(target) < before);
    }

    #[test]
    fn test_only_simulated_users_move() {
        let mut sim = sim();
        Script::new(90, 1.0 / 60.0).drive(&mut sim);
        assert_eq!(sim.users()[&UserId::new("guest")].position, Position::new(10.0, 0.0));
    }

    #[test]
    fn test_wander_is_deterministic() {
        let user = UserId::new("bot-1");
        assert_eq!(wander_heading(&user, 10), wander_heading(&user, 59));
        assert!(!wander_heading(&user, 10).is_idle());
    }
}
