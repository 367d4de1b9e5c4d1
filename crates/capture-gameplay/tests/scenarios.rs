//! End-to-end ownership scenarios.

use capture_common::{GroupId, PathId, Position, UserId};
use capture_gameplay::prelude::*;
use capture_kernel::TerrainBounds;

fn user(id: &str) -> UserId {
    UserId::new(id)
}

fn group(id: &str) -> GroupId {
    GroupId::new(id)
}

#[test]
fn registry_capture_then_drain() {
    let mut registry = NpcGroupsBiMap::new();
    let g1 = NpcGroup::new("g1", ["fox.png"]).captured_by("u1");

    registry.set_by_group_id(&group("g1"), g1.clone());
    assert_eq!(registry.get_by_user(&user("u1")).map(|g| g.id.clone()), Some(group("g1")));

    registry.set_by_group_id(
        &group("g1"),
        NpcGroup {
            file_names: vec![],
            ..g1
        },
    );
    assert!(registry.get_by_user(&user("u1")).is_none());
    assert!(registry.get_by_group_id(&group("g1")).is_none());
    assert!(registry.invariants_hold());
}

/// u1 throws g1 straight at u2, who holds g2.
fn interception_room() -> Simulation {
    let mut sim = Simulation::new(
        SimulationSettings::new("u2"),
        TerrainBounds::new(-30.0, 30.0, -30.0, 30.0, 1.0),
    );
    sim.upsert_user(UserInfo::player("u1", "fox", Position::new(-6.0, 0.0)));
    sim.upsert_user(UserInfo::player("u2", "cat", Position::new(0.0, 0.0)));

    let registry = NpcGroupsBiMap::from_entries([
        (group("g1"), NpcGroup::new("g1", ["fox.png"]).captured_by("u1")),
        (group("g2"), NpcGroup::new("g2", ["dog.png"]).captured_by("u2")),
    ]);
    sim.with_registry(registry)
}

#[test]
fn thrown_group_is_stolen_by_overlapping_captor() {
    let mut sim = interception_room();
    let path_id = sim.throw(&user("u1"), Position::new(6.0, 0.0)).expect("u1 holds g1");

    let mut transfers = Vec::new();
    let mut removed = Vec::new();
    for _ in 0..60 {
        let report = sim.step(1.0 / 60.0);
        transfers.extend(report.transfers);
        removed.extend(report.removed_paths);
        if !transfers.is_empty() {
            break;
        }
    }

    assert_eq!(transfers.len(), 1, "exactly one ownership transfer");
    assert_eq!(removed, vec![path_id.clone()], "exactly one path removed");
    assert_eq!(transfers[0].from, Some(user("u1")));
    assert_eq!(transfers[0].to, user("u2"));

    let registry = sim.registry();
    let held = registry.get_by_user(&user("u2")).expect("u2 still holds a group");
    assert_eq!(held.id, group("g2"));
    assert_eq!(held.file_names, vec!["dog.png", "fox.png"]);
    assert!(registry.get_by_group_id(&group("g1")).is_none());
    assert!(registry.get_by_user(&user("u1")).is_none());
    assert!(!sim.paths().contains(&path_id));
    assert!(registry.invariants_hold());
}

#[test]
fn stolen_group_is_not_stolen_again() {
    let mut sim = interception_room();
    sim.throw(&user("u1"), Position::new(6.0, 0.0)).expect("u1 holds g1");

    let total: usize = (0..240).map(|_| sim.step(1.0 / 60.0).transfers.len()).sum();
    assert_eq!(total, 1);
    assert!(sim.paths().is_empty());
}

#[test]
fn own_path_never_collides_with_own_capture() {
    let mut sim = Simulation::new(
        SimulationSettings::new("u1"),
        TerrainBounds::new(-30.0, 30.0, -30.0, 30.0, 1.0),
    );
    sim.upsert_user(UserInfo::player("u1", "fox", Position::new(0.0, 0.0)));
    let mut sim = sim.with_registry(NpcGroupsBiMap::from_entries([(
        group("g1"),
        NpcGroup::new("g1", ["fox.png"]).captured_by("u1"),
    )]));

    let path_id = sim.throw(&user("u1"), Position::new(3.0, 0.0)).expect("throw");
    // A second group is picked up right where the throw starts.
    let mut extra = NpcGroup::new("g3", ["cat.png"]).captured_by("u1");
    extra.position = Position::ORIGIN;
    sim.apply_remote(&[RegistryMutation::SetByGroupId {
        group_id: group("g3"),
        group: extra,
    }]);

    let report = sim.step(1.0 / 60.0);
    assert!(report.transfers.is_empty());
    assert!(sim.paths().contains(&path_id));
}

#[test]
fn fleeing_path_cannot_be_intercepted() {
    let mut sim = interception_room();
    // Aim short so the group reaches its target and flees before u2.
    let path_id = sim.throw(&user("u1"), Position::new(-4.0, 0.0)).expect("throw");

    let mut saw_fleeing = false;
    for _ in 0..30 {
        let report = sim.step(1.0 / 60.0);
        assert!(report.transfers.is_empty());
        if sim.paths().get(&path_id).map(|p| p.path_phase) == Some(PathPhase::Fleeing) {
            saw_fleeing = true;
            break;
        }
    }
    assert!(saw_fleeing);
}

#[test]
fn deltas_replay_to_the_same_registry() {
    let mut sim = interception_room();
    let start = sim.registry().clone();
    sim.events().drain();
    sim.throw(&user("u1"), Position::new(6.0, 0.0)).expect("throw");
    for _ in 0..60 {
        sim.step(1.0 / 60.0);
    }

    let mut replica = start;
    for event in sim.events().drain() {
        if let SimEvent::RegistryDelta { mutations, .. } = event {
            replica.apply(&mutations);
        }
    }
    assert_eq!(&replica, sim.registry());
}

#[test]
fn registry_delta_survives_the_wire() {
    let mut sim = interception_room();
    sim.events().drain();
    sim.throw(&user("u1"), Position::new(6.0, 0.0)).expect("throw");

    let delta = sim
        .events()
        .drain()
        .into_iter()
        .find(|e| matches!(e, SimEvent::RegistryDelta { .. }))
        .expect("throw publishes a delta");
    let text = delta.to_packet().expect("packet").encode().expect("encode");

    let packet = Packet::decode(&text).expect("decode");
    assert_eq!(packet.event_name(), Some("registryDelta"));
    let back: SimEvent =
        serde_json::from_value(packet.event_payload().cloned().expect("payload")).expect("event");
    assert_eq!(back, delta);
}

#[test]
fn path_ids_are_stable_per_tick() {
    let mut sim = interception_room();
    let path_id = sim.throw(&user("u1"), Position::new(6.0, 0.0)).expect("throw");
    assert_eq!(path_id, PathId::for_throw(&group("g1"), 0));
}
