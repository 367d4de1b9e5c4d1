//! One authority's view of a room.
//!
//! `Simulation` owns the shared mutable state of a room (the registry and
//! the active-paths table) plus read snapshots of users and terrain, and
//! advances them one tick at a time. It has no clock of its own: the host
//! decides when to call [`Simulation::step`] and with which `dt`.

use capture_common::{
    CaptureResult, Direction, GroupId, PathError, PathId, Position, ThrowError, UserId,
};
use capture_kernel::{FootprintTable, TerrainBounds, COLLISION_THRESHOLD};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::bots::reassign_orphans;
use crate::events::{EventBus, SimEvent};
use crate::group::GroupPhase;
use crate::packet::Packet;
use crate::path::{ActivePaths, PathData, PathPhase, PathStep, PathTuning};
use crate::registry::{NpcGroupsBiMap, RegistryMutation};
use crate::resolution::{resolve_tick, Capture, TickInput, Transfer};
use crate::spawn;
use crate::user::{UserInfo, UserTable};

/// Static settings of a simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationSettings {
    /// User on whose behalf collisions are resolved
    pub authority: UserId,
    /// Fraction of the width trimmed from each collision box
    pub collision_threshold: f32,
    /// Path speeds and durations
    pub path_tuning: PathTuning,
    /// Capacity of the event bus
    pub event_capacity: usize,
}

impl SimulationSettings {
    /// Default settings for `authority`.
    #[must_use]
    pub fn new(authority: impl Into<UserId>) -> Self {
        Self {
            authority: authority.into(),
            collision_threshold: COLLISION_THRESHOLD,
            path_tuning: PathTuning::default(),
            event_capacity: 1024,
        }
    }
}

/// What one call to [`Simulation::step`] did.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickReport {
    /// Tick number after the step
    pub tick: u64,
    /// Paths that changed phase while moving
    pub phase_changes: Vec<(PathId, PathPhase)>,
    /// Groups that landed back with their owner (or on the terrain)
    pub landed: Vec<GroupId>,
    /// Idle groups picked up
    pub captures: Vec<Capture>,
    /// Paths intercepted
    pub transfers: Vec<Transfer>,
    /// Paths removed from the active table
    pub removed_paths: Vec<PathId>,
    /// Every registry mutation applied this tick, in order
    pub mutations: Vec<RegistryMutation>,
}

/// Simulation state of one room for one authority.
#[derive(Debug)]
pub struct Simulation {
    settings: SimulationSettings,
    tick: u64,
    registry: NpcGroupsBiMap,
    paths: ActivePaths,
    users: UserTable,
    footprints: FootprintTable,
    bounds: TerrainBounds,
    events: EventBus,
}

impl Simulation {
    /// Creates an empty simulation.
    #[must_use]
    pub fn new(settings: SimulationSettings, bounds: TerrainBounds) -> Self {
        let events = EventBus::new(settings.event_capacity);
        Self {
            settings,
            tick: 0,
            registry: NpcGroupsBiMap::new(),
            paths: ActivePaths::new(),
            users: UserTable::new(),
            footprints: FootprintTable::new(),
            bounds,
            events,
        }
    }

    /// Replaces the footprint table.
    #[must_use]
    pub fn with_footprints(mut self, footprints: FootprintTable) -> Self {
        self.footprints = footprints;
        self
    }

    /// Starts from an existing registry.
    #[must_use]
    pub fn with_registry(mut self, registry: NpcGroupsBiMap) -> Self {
        self.registry = registry;
        self
    }

    /// Current tick.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Settings.
    #[must_use]
    pub const fn settings(&self) -> &SimulationSettings {
        &self.settings
    }

    /// Ownership registry.
    #[must_use]
    pub const fn registry(&self) -> &NpcGroupsBiMap {
        &self.registry
    }

    /// In-flight paths.
    #[must_use]
    pub const fn paths(&self) -> &ActivePaths {
        &self.paths
    }

    /// Users in the room.
    #[must_use]
    pub const fn users(&self) -> &UserTable {
        &self.users
    }

    /// Terrain bounds.
    #[must_use]
    pub const fn bounds(&self) -> &TerrainBounds {
        &self.bounds
    }

    /// Event bus the simulation publishes to.
    #[must_use]
    pub const fn events(&self) -> &EventBus {
        &self.events
    }

    /// Adds or replaces a user. Bots without a live controller are handed
    /// to a human.
    pub fn upsert_user(&mut self, user: UserInfo) {
        let is_bot = user.is_bot;
        self.users.insert(user.id.clone(), user);
        if is_bot {
            reassign_orphans(&mut self.users);
        }
    }

    /// Moves a user. Returns `false` for unknown users.
    pub fn move_user(
        &mut self,
        user_id: &UserId,
        position: Position,
        direction: Direction,
    ) -> bool {
        match self.users.get_mut(user_id) {
            Some(user) => {
                user.position = self.bounds.clamp(position);
                user.direction = direction;
                true
            },
            None => false,
        }
    }

    /// Removes a user.
    ///
    /// Their captured group and every group they had in flight drop to the
    /// terrain as IDLE, their paths are invalidated, and their bots are
    /// handed to the remaining humans.
    pub fn remove_user(&mut self, user_id: &UserId) -> Option<UserInfo> {
        let user = self.users.remove(user_id)?;
        let mut mutations = Vec::new();

        if let Some(held) = self.registry.get_by_user(user_id) {
            let mut dropped = held.clone();
            dropped.release();
            dropped.position = user.position;
            mutations.push(RegistryMutation::SetByGroupId {
                group_id: dropped.id.clone(),
                group: dropped,
            });
        }

        let invalidated = self.paths.invalidate_owner(user_id);
        for path in &invalidated {
            if let Some(group) = self.registry.get_by_group_id(&path.npc_group_id) {
                let mut dropped = group.clone();
                dropped.release();
                dropped.position = path.position;
                mutations.push(RegistryMutation::SetByGroupId {
                    group_id: dropped.id.clone(),
                    group: dropped,
                });
            }
        }

        self.commit(mutations);
        if !invalidated.is_empty() {
            self.events.publish(SimEvent::PathsRemoved {
                tick: self.tick,
                path_ids: invalidated.into_iter().map(|p| p.id).collect(),
            });
        }
        reassign_orphans(&mut self.users);
        info!("User {user_id} left");
        Some(user)
    }

    /// Spawns an idle group at its deterministic position for this tick.
    pub fn spawn_group(&mut self, group_id: impl Into<GroupId>) -> GroupId {
        let group = spawn::spawn_group(&self.bounds, group_id.into(), self.tick);
        let group_id = group.id.clone();
        debug!("Spawned {group_id} at ({:.2}, {:.2})", group.position.x, group.position.y);
        self.commit(vec![RegistryMutation::SetByGroupId {
            group_id: group_id.clone(),
            group,
        }]);
        group_id
    }

    /// Throws the user's captured group toward `target`.
    pub fn throw(&mut self, user_id: &UserId, target: Position) -> Result<PathId, ThrowError> {
        let user = self
            .users
            .get(user_id)
            .ok_or_else(|| ThrowError::UnknownUser(user_id.clone()))?;
        let mut group = self
            .registry
            .get_by_user(user_id)
            .cloned()
            .ok_or_else(|| ThrowError::NothingCaptured(user_id.clone()))?;

        let origin = user.position;
        let path = PathData::thrown(
            PathId::for_throw(&group.id, self.tick),
            group.id.clone(),
            Some(user_id.clone()),
            origin,
            self.bounds.clamp(target),
        );
        group.launch();
        group.position = origin;
        group.direction = path.direction;

        let path_id = path.id.clone();
        info!("{user_id} threw {} toward ({:.2}, {:.2})", group.id, path.target.x, path.target.y);
        self.commit(vec![RegistryMutation::SetByGroupId {
            group_id: group.id.clone(),
            group,
        }]);
        self.events.publish(SimEvent::Thrown {
            tick: self.tick,
            path: path.clone(),
        });
        self.paths.insert(path);
        Ok(path_id)
    }

    /// Calls a path back to its owner. Returns `Ok(false)` for unknown paths.
    pub fn recall(&mut self, path_id: &PathId) -> Result<bool, PathError> {
        let Some(path) = self.paths.get_mut(path_id) else {
            return Ok(false);
        };
        path.recall()?;
        self.events.publish(SimEvent::PathPhaseChanged {
            tick: self.tick,
            path_id: path_id.clone(),
            phase: PathPhase::Returning,
        });
        Ok(true)
    }

    /// Advances the room by `dt` seconds.
    ///
    /// Order: move paths (landing arrivals), pick up idle groups, resolve
    /// path interceptions, apply the result, publish the deltas.
    pub fn step(&mut self, dt: f32) -> TickReport {
        self.tick += 1;
        let mut report = TickReport {
            tick: self.tick,
            ..TickReport::default()
        };

        let mut mutations = self.advance_paths(dt, &mut report);
        // Landings must be visible to the sweep.
        self.registry.apply(&mutations);

        let outcome = {
            let input = TickInput {
                users: &self.users,
                registry: &self.registry,
                active_paths: &self.paths,
                footprints: &self.footprints,
                collision_threshold: self.settings.collision_threshold,
            };
            resolve_tick(&input, &self.settings.authority)
        };
        self.registry.apply(&outcome.registry_mutations);
        for path_id in &outcome.path_removals {
            self.paths.remove(path_id);
        }

        mutations.extend(outcome.registry_mutations);
        report.removed_paths.extend(outcome.path_removals);
        report.captures = outcome.captures;
        report.transfers = outcome.transfers;
        report.mutations = mutations;

        self.publish_report(&report);
        report
    }

    /// Applies an authoritative mutation batch received from elsewhere.
    ///
    /// Paths whose group is no longer in flight were resolved by the
    /// sender and are dropped. Returns their ids.
    pub fn apply_remote(&mut self, mutations: &[RegistryMutation]) -> Vec<PathId> {
        self.registry.apply(mutations);
        let stale: Vec<PathId> = self
            .paths
            .iter()
            .filter(|p| {
                self.registry
                    .get_by_group_id(&p.npc_group_id)
                    .map_or(true, |g| g.phase != GroupPhase::Path)
            })
            .map(|p| p.id.clone())
            .collect();
        for path_id in &stale {
            self.paths.remove(path_id);
        }
        if !stale.is_empty() {
            debug!("Dropped {} paths resolved remotely", stale.len());
        }
        stale
    }

    /// Applies an event packet broadcast by another authority.
    ///
    /// Only registry deltas change local state; other events are
    /// informational. Returns the ids of paths dropped as resolved.
    pub fn receive(&mut self, packet: &Packet) -> CaptureResult<Vec<PathId>> {
        match SimEvent::from_packet(packet)? {
            SimEvent::RegistryDelta { tick, mutations } => {
                trace!("Applying remote delta from tick {tick}");
                Ok(self.apply_remote(&mutations))
            },
            other => {
                trace!("Ignoring remote {} event", other.name());
                Ok(Vec::new())
            },
        }
    }

    fn advance_paths(&mut self, dt: f32, report: &mut TickReport) -> Vec<RegistryMutation> {
        let mut mutations = Vec::new();
        let tuning = self.settings.path_tuning;

        for path_id in self.paths.ids() {
            let Some(path) = self.paths.get_mut(&path_id) else {
                continue;
            };
            let home = path
                .owner
                .as_ref()
                .and_then(|owner| self.users.get(owner))
                .map(|owner| owner.position);

            match path.advance(dt, &tuning, &self.bounds, home) {
                PathStep::Moving => {},
                PathStep::Entered(phase) => {
                    trace!("Path {path_id} entered {phase}");
                    report.phase_changes.push((path_id, phase));
                },
                PathStep::Arrived => {
                    if let Some(path) = self.paths.remove(&path_id) {
                        if let Some(group_id) = self.land(&path, &mut mutations) {
                            report.landed.push(group_id);
                        }
                        report.removed_paths.push(path_id);
                    }
                },
            }
        }
        mutations
    }

    /// Brings a returned group home: merged into the owner's captured group
    /// if they hold one, captured again if not, dropped IDLE if the owner
    /// is gone.
    fn land(&self, path: &PathData, mutations: &mut Vec<RegistryMutation>) -> Option<GroupId> {
        let Some(group) = self.registry.get_by_group_id(&path.npc_group_id) else {
            trace!("Path {} landed without a group, skipping", path.id);
            return None;
        };
        let mut landed = group.clone();
        let owner = path
            .owner
            .as_ref()
            .filter(|owner| self.users.contains_key(*owner));

        let Some(owner) = owner else {
            landed.release();
            landed.position = path.position;
            mutations.push(RegistryMutation::SetByGroupId {
                group_id: landed.id.clone(),
                group: landed,
            });
            return Some(path.npc_group_id.clone());
        };

        let held = mutations
            .iter()
            .rev()
            .find_map(|m| match m {
                RegistryMutation::SetByUser { user_id, group } if user_id == owner => {
                    Some(group.clone())
                },
                _ => None,
            })
            .or_else(|| self.registry.get_by_user(owner).cloned());

        match held {
            Some(mut held) => {
                held.absorb(&landed);
                mutations.push(RegistryMutation::DeleteByGroupId {
                    group_id: landed.id.clone(),
                });
                mutations.push(RegistryMutation::SetByUser {
                    user_id: owner.clone(),
                    group: held,
                });
            },
            None => {
                landed.capture(owner.clone());
                landed.position = path.position;
                landed.direction = Direction::IDLE;
                mutations.push(RegistryMutation::SetByUser {
                    user_id: owner.clone(),
                    group: landed,
                });
            },
        }
        debug!("Group {} landed with {owner}", path.npc_group_id);
        Some(path.npc_group_id.clone())
    }

    fn commit(&mut self, mutations: Vec<RegistryMutation>) {
        if mutations.is_empty() {
            return;
        }
        self.registry.apply(&mutations);
        self.events.publish(SimEvent::RegistryDelta {
            tick: self.tick,
            mutations,
        });
    }

    fn publish_report(&self, report: &TickReport) {
        for (path_id, phase) in &report.phase_changes {
            self.events.publish(SimEvent::PathPhaseChanged {
                tick: report.tick,
                path_id: path_id.clone(),
                phase: *phase,
            });
        }
        for group_id in &report.landed {
            self.events.publish(SimEvent::Landed {
                tick: report.tick,
                group_id: group_id.clone(),
                captor_id: self
                    .registry
                    .get_by_group_id(group_id)
                    .and_then(|g| g.captor_id.clone()),
            });
        }
        if !report.mutations.is_empty() {
            self.events.publish(SimEvent::RegistryDelta {
                tick: report.tick,
                mutations: report.mutations.clone(),
            });
        }
        if !report.removed_paths.is_empty() {
            self.events.publish(SimEvent::PathsRemoved {
                tick: report.tick,
                path_ids: report.removed_paths.clone(),
            });
        }
    }
}
