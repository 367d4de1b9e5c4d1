//! In-flight NPC groups.
//!
//! A thrown group is tracked by a path record until it is absorbed by an
//! interceptor or lands back with its owner:
//!
//! ```text
//! THROWN --reached target--> FLEEING --timeout--> RETURNING --arrival--> (removed)
//!    |  \--hit terrain edge--> BOUNCING --timeout--^
//!    \--------------recall-------------------------^
//! ```
//!
//! Only THROWN and RETURNING paths can be intercepted.

use std::collections::BTreeMap;
use std::f32::consts::TAU;
use std::fmt;

use capture_common::{Direction, GroupId, PathError, PathId, Position, UserId};
use capture_kernel::{deterministic_value, RngInputs, TerrainBounds};
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Motion phase of a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PathPhase {
    /// Flying toward the throw target
    Thrown,
    /// Scattering after reaching the target
    Fleeing,
    /// Rebounding after hitting the terrain edge
    Bouncing,
    /// Heading back to the owner
    Returning,
}

impl PathPhase {
    /// Whether a path in this phase can be intercepted by another user.
    #[must_use]
    pub const fn is_interceptable(self) -> bool {
        matches!(self, Self::Thrown | Self::Returning)
    }

    /// Whether `next` is a legal successor of this phase.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Thrown, Self::Fleeing | Self::Bouncing | Self::Returning)
                | (Self::Fleeing, Self::Bouncing | Self::Returning)
                | (Self::Bouncing, Self::Returning)
        )
    }
}

impl fmt::Display for PathPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Thrown => "THROWN",
            Self::Fleeing => "FLEEING",
            Self::Bouncing => "BOUNCING",
            Self::Returning => "RETURNING",
        };
        f.write_str(name)
    }
}

/// What a thrown group ran into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImpactKind {
    /// Reached the throw target
    ReachedTarget,
    /// Hit the terrain edge or another obstacle
    Obstacle,
}

/// Speeds and durations for path motion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathTuning {
    /// Speed while THROWN, units/s
    pub throw_speed: f32,
    /// Speed while RETURNING, units/s
    pub return_speed: f32,
    /// Drift speed while FLEEING or BOUNCING, units/s
    pub drift_speed: f32,
    /// Seconds spent FLEEING before returning
    pub flee_duration: f32,
    /// Seconds spent BOUNCING before returning
    pub bounce_duration: f32,
    /// Distance from the owner at which a returning path lands
    pub arrival_radius: f32,
}

impl Default for PathTuning {
    fn default() -> Self {
        Self {
            throw_speed: 24.0,
            return_speed: 16.0,
            drift_speed: 4.0,
            flee_duration: 2.0,
            bounce_duration: 0.75,
            arrival_radius: 1.0,
        }
    }
}

/// Result of advancing a path by one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStep {
    /// Still moving in the same phase
    Moving,
    /// Entered a new phase this tick
    Entered(PathPhase),
    /// Reached its owner; the record should be removed
    Arrived,
}

/// Trajectory record of one thrown group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathData {
    /// Path id
    pub id: PathId,
    /// Group in flight
    pub npc_group_id: GroupId,
    /// User who threw the group
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<UserId>,
    /// Current phase
    pub path_phase: PathPhase,
    /// Where the throw started
    pub origin: Position,
    /// Where the throw is aimed
    pub target: Position,
    /// Current position
    pub position: Position,
    /// Current heading
    pub direction: Direction,
    /// Seconds spent in the current phase
    #[serde(default)]
    pub phase_elapsed: f32,
}

impl PathData {
    /// Creates a THROWN path from `origin` toward `target`.
    #[must_use]
    pub fn thrown(
        id: PathId,
        npc_group_id: GroupId,
        owner: Option<UserId>,
        origin: Position,
        target: Position,
    ) -> Self {
        Self {
            id,
            npc_group_id,
            owner,
            path_phase: PathPhase::Thrown,
            origin,
            target,
            position: origin,
            direction: Direction::towards(origin, target),
            phase_elapsed: 0.0,
        }
    }

    /// Whether the path can be intercepted right now.
    #[must_use]
    pub const fn is_interceptable(&self) -> bool {
        self.path_phase.is_interceptable()
    }

    /// Moves to `next`, rejecting illegal edges.
    pub fn transition(&mut self, next: PathPhase) -> Result<(), PathError> {
        if !self.path_phase.can_transition_to(next) {
            return Err(PathError::InvalidTransition {
                from: self.path_phase.to_string(),
                to: next.to_string(),
            });
        }
        self.path_phase = next;
        self.phase_elapsed = 0.0;
        if next == PathPhase::Fleeing {
            self.direction = self.flee_heading();
        }
        Ok(())
    }

    /// Applies an impact to a THROWN path.
    pub fn impact(&mut self, kind: ImpactKind) -> Result<PathPhase, PathError> {
        let next = match kind {
            ImpactKind::ReachedTarget => PathPhase::Fleeing,
            ImpactKind::Obstacle => PathPhase::Bouncing,
        };
        self.transition(next)?;
        Ok(next)
    }

    /// Calls the group back to its owner.
    pub fn recall(&mut self) -> Result<(), PathError> {
        self.transition(PathPhase::Returning)
    }

    /// Advances the path by `dt` seconds.
    ///
    /// `home` is the owner's current position; when absent the path heads
    /// back to its origin.
    pub fn advance(
        &mut self,
        dt: f32,
        tuning: &PathTuning,
        bounds: &TerrainBounds,
        home: Option<Position>,
    ) -> PathStep {
        self.phase_elapsed += dt;
        match self.path_phase {
            PathPhase::Thrown => self.advance_thrown(dt, tuning, bounds),
            PathPhase::Fleeing => self.advance_drift(dt, tuning, bounds, tuning.flee_duration),
            PathPhase::Bouncing => self.advance_drift(dt, tuning, bounds, tuning.bounce_duration),
            PathPhase::Returning => self.advance_returning(dt, tuning, home.unwrap_or(self.origin)),
        }
    }

    fn advance_thrown(&mut self, dt: f32, tuning: &PathTuning, bounds: &TerrainBounds) -> PathStep {
        let step = tuning.throw_speed * dt;
        if self.position.distance(self.target) <= step {
            self.position = bounds.clamp(self.target);
            return self.enter(ImpactKind::ReachedTarget);
        }

        self.position = (self.position.to_vec2() + self.direction.to_vec2() * step).into();
        if self.reflect_off(bounds) {
            return self.enter(ImpactKind::Obstacle);
        }
        PathStep::Moving
    }

    fn advance_drift(
        &mut self,
        dt: f32,
        tuning: &PathTuning,
        bounds: &TerrainBounds,
        duration: f32,
    ) -> PathStep {
        if self.phase_elapsed >= duration {
            return match self.transition(PathPhase::Returning) {
                Ok(()) => PathStep::Entered(PathPhase::Returning),
                Err(_) => PathStep::Moving,
            };
        }
        let drift = self.direction.to_vec2() * tuning.drift_speed * dt;
        self.position = (self.position.to_vec2() + drift).into();
        self.reflect_off(bounds);
        PathStep::Moving
    }

    fn advance_returning(&mut self, dt: f32, tuning: &PathTuning, home: Position) -> PathStep {
        let step = tuning.return_speed * dt;
        if self.position.distance(home) <= step.max(tuning.arrival_radius) {
            self.position = home;
            self.direction = Direction::IDLE;
            return PathStep::Arrived;
        }
        self.direction = Direction::towards(self.position, home);
        self.position = (self.position.to_vec2() + self.direction.to_vec2() * step).into();
        PathStep::Moving
    }

    fn enter(&mut self, kind: ImpactKind) -> PathStep {
        match self.impact(kind) {
            Ok(phase) => PathStep::Entered(phase),
            Err(_) => PathStep::Moving,
        }
    }

    /// Clamps into `bounds`, mirroring the heading on every crossed axis.
    /// Returns whether an edge was hit.
    fn reflect_off(&mut self, bounds: &TerrainBounds) -> bool {
        let p = self.position;
        let mut d = self.direction.to_vec2();
        let hit_x = p.x < bounds.min_x || p.x > bounds.max_x;
        let hit_y = p.y < bounds.min_y || p.y > bounds.max_y;
        if hit_x {
            d.x = -d.x;
        }
        if hit_y {
            d.y = -d.y;
        }
        if hit_x || hit_y {
            self.position = bounds.clamp(p);
            self.direction = d.into();
        }
        hit_x || hit_y
    }

    /// Scatter heading after reaching the target. Derived from the path id,
    /// so every participant agrees on it.
    fn flee_heading(&self) -> Direction {
        let inputs = RngInputs::new()
            .with("pathId", &self.id)
            .with("phase", PathPhase::Fleeing);
        Vec2::from_angle(deterministic_value(&inputs) * TAU).into()
    }
}

/// Ordered table of every in-flight path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivePaths {
    paths: BTreeMap<PathId, PathData>,
}

impl ActivePaths {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a path, returning any record it replaced.
    pub fn insert(&mut self, path: PathData) -> Option<PathData> {
        self.paths.insert(path.id.clone(), path)
    }

    /// Removes a path.
    pub fn remove(&mut self, id: &PathId) -> Option<PathData> {
        self.paths.remove(id)
    }

    /// Looks up a path.
    #[must_use]
    pub fn get(&self, id: &PathId) -> Option<&PathData> {
        self.paths.get(id)
    }

    /// Looks up a path for mutation.
    pub fn get_mut(&mut self, id: &PathId) -> Option<&mut PathData> {
        self.paths.get_mut(id)
    }

    /// Whether the path exists.
    #[must_use]
    pub fn contains(&self, id: &PathId) -> bool {
        self.paths.contains_key(id)
    }

    /// All paths, ordered by id.
    pub fn iter(&self) -> impl Iterator<Item = &PathData> {
        self.paths.values()
    }

    /// Ids of all paths, ordered.
    #[must_use]
    pub fn ids(&self) -> Vec<PathId> {
        self.paths.keys().cloned().collect()
    }

    /// Paths that can currently be intercepted.
    pub fn interceptable(&self) -> impl Iterator<Item = &PathData> {
        self.paths.values().filter(|p| p.is_interceptable())
    }

    /// Removes and returns every path thrown by `owner`.
    pub fn invalidate_owner(&mut self, owner: &UserId) -> Vec<PathData> {
        let ids: Vec<PathId> = self
            .paths
            .values()
            .filter(|p| p.owner.as_ref() == Some(owner))
            .map(|p| p.id.clone())
            .collect();
        ids.iter().filter_map(|id| self.paths.remove(id)).collect()
    }

    /// Number of paths.
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Whether there are no paths.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}
