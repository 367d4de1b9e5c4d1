//! Per-tick collision resolution.
//!
//! One authority resolves collisions for itself and the bots it controls.
//! The sweep reads a snapshot of the room and produces the registry
//! mutations and path removals that result from it; it never touches the
//! live registry. Each transfer is applied to a private working copy
//! before the next pair is examined, so later pairs observe earlier
//! transfers of the same tick.

use std::collections::BTreeSet;

use capture_common::{Direction, GroupId, PathId, Position, UserId};
use capture_kernel::{intersects, Footprint, FootprintTable, OrientedRect};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::bots::simulated_users;
use crate::group::{GroupPhase, NpcGroup};
use crate::path::{ActivePaths, PathData};
use crate::registry::{NpcGroupsBiMap, RegistryMutation};
use crate::user::{UserInfo, UserTable};

/// Read-only view of the room for one tick.
#[derive(Debug, Clone, Copy)]
pub struct TickInput<'a> {
    /// Every user in the room
    pub users: &'a UserTable,
    /// Ownership registry at the start of the sweep
    pub registry: &'a NpcGroupsBiMap,
    /// In-flight paths at the start of the sweep
    pub active_paths: &'a ActivePaths,
    /// Species dimensions
    pub footprints: &'a FootprintTable,
    /// Fraction of the width trimmed from each box before testing
    pub collision_threshold: f32,
}

/// A path intercepted by another user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transfer {
    /// Path that was consumed
    pub path_id: PathId,
    /// Group that was in flight
    pub group_id: GroupId,
    /// User who threw it
    pub from: Option<UserId>,
    /// User who intercepted it
    pub to: UserId,
    /// Group it was merged into
    pub into_group: GroupId,
}

/// An idle group picked up by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capture {
    /// Group that was idle
    pub group_id: GroupId,
    /// User who picked it up
    pub user_id: UserId,
    /// Group the user now holds
    pub into_group: GroupId,
}

/// Everything one sweep decided.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickOutcome {
    /// Mutations to apply to the registry, in order
    pub registry_mutations: Vec<RegistryMutation>,
    /// Paths consumed by a transfer
    pub path_removals: Vec<PathId>,
    /// Interceptions, in resolution order
    pub transfers: Vec<Transfer>,
    /// Idle pickups, in resolution order
    pub captures: Vec<Capture>,
}

impl TickOutcome {
    /// Whether the sweep changed nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registry_mutations.is_empty() && self.path_removals.is_empty()
    }
}

/// Collision box of a body at `position`, rotated to its heading.
#[must_use]
pub fn collision_box(
    position: Position,
    direction: Direction,
    footprint: Footprint,
    threshold: f32,
) -> OrientedRect {
    let effective = footprint.shrunk(threshold);
    OrientedRect::new(position, effective.width, effective.height, direction.heading())
}

/// Runs one sweep for `authority` and the bots it controls.
///
/// Users are processed authority first, then bots in id order. Every user
/// first picks up overlapping idle groups, then paths are tested against
/// every user's captured group.
#[must_use]
pub fn resolve_tick(input: &TickInput<'_>, authority: &UserId) -> TickOutcome {
    let users = simulated_users(authority, input.users);
    let mut resolver = Resolver::new(input);

    for user in &users {
        resolver.capture_idle(user);
    }
    for user in &users {
        resolver.intercept_paths(user);
    }

    let outcome = resolver.finish();
    if !outcome.is_empty() {
        debug!(
            "Tick resolved for {authority}: {} captures, {} transfers, {} mutations",
            outcome.captures.len(),
            outcome.transfers.len(),
            outcome.registry_mutations.len()
        );
    }
    outcome
}

struct Resolver<'a> {
    paths: &'a ActivePaths,
    footprints: &'a FootprintTable,
    threshold: f32,
    working: NpcGroupsBiMap,
    removed: BTreeSet<PathId>,
    outcome: TickOutcome,
}

impl<'a> Resolver<'a> {
    fn new(input: &TickInput<'a>) -> Self {
        Self {
            paths: input.active_paths,
            footprints: input.footprints,
            threshold: input.collision_threshold,
            working: input.registry.clone(),
            removed: BTreeSet::new(),
            outcome: TickOutcome::default(),
        }
    }

    fn finish(self) -> TickOutcome {
        self.outcome
    }

    fn commit(&mut self, mutation: RegistryMutation) {
        self.working.apply_mutation(&mutation);
        self.outcome.registry_mutations.push(mutation);
    }

    fn user_box(&self, user: &UserInfo) -> OrientedRect {
        collision_box(
            user.position,
            user.direction,
            user.footprint(self.footprints),
            self.threshold,
        )
    }

    fn group_box(
        &self,
        position: Position,
        direction: Direction,
        group: &NpcGroup,
    ) -> OrientedRect {
        collision_box(
            position,
            direction,
            self.footprints.for_face(group.face_file_name()),
            self.threshold,
        )
    }

    fn capture_idle(&mut self, user: &UserInfo) {
        let body = self.user_box(user);
        let touched: Vec<GroupId> = self
            .working
            .values()
            .filter(|g| g.phase == GroupPhase::Idle)
            .filter(|g| intersects(&body, &self.group_box(g.position, g.direction, g)))
            .map(|g| g.id.clone())
            .collect();

        for group_id in touched {
            let Some(idle) = self.working.get_by_group_id(&group_id).cloned() else {
                continue;
            };
            let into_group = match self.working.get_by_user(&user.id).cloned() {
                Some(mut held) => {
                    held.absorb(&idle);
                    let into = held.id.clone();
                    self.commit(RegistryMutation::DeleteByGroupId {
                        group_id: group_id.clone(),
                    });
                    self.commit(RegistryMutation::SetByUser {
                        user_id: user.id.clone(),
                        group: held,
                    });
                    into
                },
                None => {
                    let mut captured = idle;
                    captured.capture(user.id.clone());
                    self.commit(RegistryMutation::SetByUser {
                        user_id: user.id.clone(),
                        group: captured,
                    });
                    group_id.clone()
                },
            };
            debug!("{} captured idle group {group_id} into {into_group}", user.id);
            self.outcome.captures.push(Capture {
                group_id,
                user_id: user.id.clone(),
                into_group,
            });
        }
    }

    fn intercept_paths(&mut self, user: &UserInfo) {
        let body = self.user_box(user);
        let paths = self.paths;

        for path in paths.interceptable() {
            if self.removed.contains(&path.id) {
                continue;
            }
            // A user holding nothing has no group to absorb into.
            let Some(held) = self.working.get_by_user(&user.id) else {
                return;
            };
            let Some(flying) = self.working.get_by_group_id(&path.npc_group_id) else {
                trace!("Path {} references missing group {}, skipping", path.id, path.npc_group_id);
                continue;
            };
            if flying.phase != GroupPhase::Path || flying.id == held.id {
                trace!("Path {} references group {} not in flight, skipping", path.id, flying.id);
                continue;
            }
            let thrower = path.owner.as_ref().or(flying.captor_id.as_ref());
            if thrower == Some(&user.id) || flying.captor_id == held.captor_id {
                continue;
            }
            if !intersects(&body, &self.group_box(path.position, path.direction, flying)) {
                continue;
            }

            let held = held.clone();
            let flying = flying.clone();
            self.transfer(user, held, flying, path);
        }
    }

    fn transfer(&mut self, user: &UserInfo, mut held: NpcGroup, flying: NpcGroup, path: &PathData) {
        held.absorb(&flying);
        let into_group = held.id.clone();
        let from = path.owner.clone().or_else(|| flying.captor_id.clone());

        self.commit(RegistryMutation::DeleteByGroupId {
            group_id: flying.id.clone(),
        });
        self.commit(RegistryMutation::SetByUser {
            user_id: user.id.clone(),
            group: held,
        });
        self.removed.insert(path.id.clone());
        self.outcome.path_removals.push(path.id.clone());

        debug!(
            "{} intercepted path {} ({} from {:?}) into {into_group}",
            user.id, path.id, flying.id, from
        );
        self.outcome.transfers.push(Transfer {
            path_id: path.id.clone(),
            group_id: flying.id,
            from,
            to: user.id.clone(),
            into_group,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::PathPhase;

    const U1: &str = "u1";
    const U2: &str = "u2";

    struct Room {
        users: UserTable,
        registry: NpcGroupsBiMap,
        paths: ActivePaths,
        footprints: FootprintTable,
    }

    impl Room {
        fn new() -> Self {
            let mut users = UserTable::new();
            for (id, x) in [(U1, -10.0), (U2, 0.0)] {
                users.insert(
                    UserId::new(id),
                    UserInfo::player(id, "fox", Position::new(x, 0.0)),
                );
            }
            Self {
                users,
                registry: NpcGroupsBiMap::new(),
                paths: ActivePaths::new(),
                footprints: FootprintTable::new(),
            }
        }

        /// `g1` thrown by u1 and currently at `at`; `g2` held by u2.
        fn with_throw(mut self, at: Position, phase: PathPhase) -> Self {
            let mut g1 = NpcGroup::new("g1", ["fox.png"]).captured_by(U1);
            g1.launch();
            self.registry.set_by_group_id(&GroupId::new("g1"), g1);
            self.registry.set_by_group_id(
                &GroupId::new("g2"),
                NpcGroup::new("g2", ["cat.png"]).captured_by(U2),
            );

            let mut path = PathData::thrown(
                PathId::new("p1"),
                GroupId::new("g1"),
                Some(UserId::new(U1)),
                Position::new(-10.0, 0.0),
                Position::new(10.0, 0.0),
            );
            path.position = at;
            path.path_phase = phase;
            self.paths.insert(path);
            self
        }

        fn resolve(&self, authority: &str) -> TickOutcome {
            let input = TickInput {
                users: &self.users,
                registry: &self.registry,
                active_paths: &self.paths,
                footprints: &self.footprints,
                collision_threshold: capture_kernel::COLLISION_THRESHOLD,
            };
            resolve_tick(&input, &UserId::new(authority))
        }
    }

    #[test]
    fn test_thrown_path_is_intercepted_once() {
        let room = Room::new().with_throw(Position::new(0.2, 0.0), PathPhase::Thrown);
        let outcome = room.resolve(U2);

        assert_eq!(outcome.transfers.len(), 1);
        assert_eq!(outcome.path_removals, vec![PathId::new("p1")]);

        let after = room.registry.applied(&outcome.registry_mutations);
        let held = after.get_by_user(&UserId::new(U2)).expect("u2 holds a group");
        assert_eq!(held.id, GroupId::new("g2"));
        assert_eq!(held.file_names, vec!["cat.png", "fox.png"]);
        assert!(after.get_by_group_id(&GroupId::new("g1")).is_none());
        assert!(after.get_by_user(&UserId::new(U1)).is_none());
        assert!(after.invariants_hold());
    }

    #[test]
    fn test_only_interceptable_phases_collide() {
        for phase in [PathPhase::Fleeing, PathPhase::Bouncing] {
            let room = Room::new().with_throw(Position::new(0.0, 0.0), phase);
            assert!(room.resolve(U2).is_empty(), "{phase} must not be intercepted");
        }
        let room = Room::new().with_throw(Position::new(0.0, 0.0), PathPhase::Returning);
        assert_eq!(room.resolve(U2).transfers.len(), 1);
    }

    #[test]
    fn test_thrower_does_not_intercept_own_path() {
        let mut room = Room::new().with_throw(Position::new(-10.0, 0.0), PathPhase::Thrown);
        // u1 picks up another group and stands on top of its own throw.
        room.registry.set_by_group_id(
            &GroupId::new("g3"),
            NpcGroup::new("g3", ["dog.png"]).captured_by(U1),
        );
        let outcome = room.resolve(U1);
        assert!(outcome.transfers.is_empty());
        assert!(outcome.path_removals.is_empty());
    }

    #[test]
    fn test_distant_path_is_untouched() {
        let room = Room::new().with_throw(Position::new(5.0, 5.0), PathPhase::Thrown);
        assert!(room.resolve(U2).is_empty());
    }

    #[test]
    fn test_path_to_deleted_group_is_skipped() {
        let mut room = Room::new().with_throw(Position::new(0.0, 0.0), PathPhase::Thrown);
        room.registry.delete_by_group_id(&GroupId::new("g1"));
        assert!(room.resolve(U2).is_empty());
    }

    #[test]
    fn test_user_holding_nothing_does_not_intercept() {
        let mut room = Room::new().with_throw(Position::new(0.0, 0.0), PathPhase::Thrown);
        room.registry.delete_by_user(&UserId::new(U2));
        assert!(room.resolve(U2).is_empty());
    }

    #[test]
    fn test_other_authority_does_not_resolve_for_u2() {
        let room = Room::new().with_throw(Position::new(0.0, 0.0), PathPhase::Thrown);
        let outcome = room.resolve(U1);
        assert!(outcome.transfers.is_empty());
    }

    #[test]
    fn test_idle_group_becomes_captured() {
        let mut room = Room::new();
        room.registry.set_by_group_id(
            &GroupId::new("idle"),
            NpcGroup::new("idle", ["bunny.png"]).at(Position::new(0.3, 0.0)),
        );
        let outcome = room.resolve(U2);
        assert_eq!(outcome.captures.len(), 1);

        let after = room.registry.applied(&outcome.registry_mutations);
        let held = after.get_by_user(&UserId::new(U2)).expect("captured");
        assert_eq!(held.id, GroupId::new("idle"));
        assert_eq!(held.phase, GroupPhase::Captured);
        assert!(after.invariants_hold());
    }

    #[test]
    fn test_idle_group_merges_into_held_group() {
        let mut room = Room::new();
        room.registry.set_by_group_id(
            &GroupId::new("g2"),
            NpcGroup::new("g2", ["cat.png"]).captured_by(U2),
        );
        room.registry.set_by_group_id(
            &GroupId::new("idle"),
            NpcGroup::new("idle", ["bunny.png"]).at(Position::new(0.0, 0.3)),
        );
        let outcome = room.resolve(U2);
        let after = room.registry.applied(&outcome.registry_mutations);

        assert_eq!(after.len(), 1);
        let held = after.get_by_user(&UserId::new(U2)).expect("captured");
        assert_eq!(held.file_names, vec!["cat.png", "bunny.png"]);
        assert_eq!(outcome.captures[0].into_group, GroupId::new("g2"));
    }

    #[test]
    fn test_bots_are_resolved_by_their_controller() {
        let mut room = Room::new();
        room.users.insert(
            UserId::new("bot-1"),
            UserInfo::bot("bot-1", "pig", Position::new(20.0, 0.0), Some(UserId::new(U1))),
        );
        room.registry.set_by_group_id(
            &GroupId::new("idle"),
            NpcGroup::new("idle", ["cow.png"]).at(Position::new(20.0, 0.0)),
        );

        assert!(room.resolve(U2).captures.is_empty());
        let outcome = room.resolve(U1);
        assert_eq!(outcome.captures.len(), 1);
        assert_eq!(outcome.captures[0].user_id, UserId::new("bot-1"));
    }
}
