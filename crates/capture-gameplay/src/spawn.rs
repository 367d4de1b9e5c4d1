//! Deterministic NPC spawning.
//!
//! Spawn choices are derived from values every participant already agrees
//! on (group id and tick), so a spawn can be announced by id alone.

use capture_common::{GroupId, Position};
use capture_kernel::{deterministic_range, AnimalKind, RngInputs, TerrainBounds};

use crate::group::NpcGroup;

fn spawn_inputs(group_id: &GroupId, tick: u64) -> RngInputs {
    RngInputs::new().with("groupId", group_id).with("tick", tick)
}

/// Where a group spawned at `tick` appears. Always inside `bounds`.
#[must_use]
pub fn spawn_position(bounds: &TerrainBounds, group_id: &GroupId, tick: u64) -> Position {
    let inputs = spawn_inputs(group_id, tick);
    let x = deterministic_range(&inputs.clone().with("axis", "x"), bounds.min_x, bounds.max_x);
    let y = deterministic_range(&inputs.with("axis", "y"), bounds.min_y, bounds.max_y);
    bounds.clamp(Position::new(x, y))
}

/// Species of a group spawned at `tick`.
#[must_use]
pub fn spawn_animal(group_id: &GroupId, tick: u64) -> AnimalKind {
    let count = AnimalKind::ALL.len();
    let inputs = spawn_inputs(group_id, tick).with("field", "animal");
    let pick = deterministic_range(&inputs, 0.0, count as f32);
    AnimalKind::ALL[(pick as usize).min(count - 1)]
}

/// Creates an idle single-member group at its spawn position.
#[must_use]
pub fn spawn_group(bounds: &TerrainBounds, group_id: GroupId, tick: u64) -> NpcGroup {
    let face = format!("{}.png", spawn_animal(&group_id, tick).key());
    let position = spawn_position(bounds, &group_id, tick);
    NpcGroup::new(group_id, [face]).at(position)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::GroupPhase;

    #[test]
    fn test_spawn_is_reproducible() {
        let bounds = TerrainBounds::from_room_id("room-7");
        let id = GroupId::new("npc-3");
        assert_eq!(spawn_position(&bounds, &id, 12), spawn_position(&bounds, &id, 12));
        assert_eq!(spawn_group(&bounds, id.clone(), 12), spawn_group(&bounds, id, 12));
    }

    #[test]
    fn test_spawn_stays_inside_bounds() {
        let bounds = TerrainBounds::new(-5.0, 5.0, -2.0, 2.0, 1.0);
        for n in 0..50 {
            let id = GroupId::new(format!("npc-{n}"));
            assert!(bounds.contains(spawn_position(&bounds, &id, n)));
        }
    }

    #[test]
    fn test_spawned_group_is_idle_with_known_face() {
        let group = spawn_group(&TerrainBounds::default(), GroupId::new("npc-1"), 0);
        assert_eq!(group.phase, GroupPhase::Idle);
        assert_eq!(group.captor_id, None);
        let face = group.face_file_name().expect("one member");
        assert!(AnimalKind::from_file_name(face).is_some());
    }
}
