//! Registry invariants under arbitrary mutation sequences.

use capture_common::{GroupId, UserId};
use capture_gameplay::{GroupPhase, NpcGroup, NpcGroupsBiMap, RegistryMutation};
use proptest::prelude::*;

fn arb_phase() -> impl Strategy<Value = GroupPhase> {
    prop_oneof![
        Just(GroupPhase::Idle),
        Just(GroupPhase::Captured),
        Just(GroupPhase::Path),
    ]
}

fn arb_group() -> impl Strategy<Value = NpcGroup> {
    (
        0..6u8,
        prop::collection::vec("(fox|cat|dog|pig)\\.png", 0..3),
        prop::option::of(0..4u8),
        arb_phase(),
    )
        .prop_map(|(id, file_names, captor, phase)| {
            let mut group = NpcGroup::new(format!("g{id}"), file_names).with_phase(phase);
            group.captor_id = captor.map(|c| UserId::new(format!("u{c}")));
            group
        })
}

fn arb_mutation() -> impl Strategy<Value = RegistryMutation> {
    prop_oneof![
        (0..4u8, arb_group()).prop_map(|(u, group)| RegistryMutation::SetByUser {
            user_id: UserId::new(format!("u{u}")),
            group,
        }),
        (0..6u8, arb_group()).prop_map(|(g, group)| RegistryMutation::SetByGroupId {
            group_id: GroupId::new(format!("g{g}")),
            group,
        }),
        (0..4u8).prop_map(|u| RegistryMutation::DeleteByUser {
            user_id: UserId::new(format!("u{u}")),
        }),
        (0..6u8).prop_map(|g| RegistryMutation::DeleteByGroupId {
            group_id: GroupId::new(format!("g{g}")),
        }),
    ]
}

proptest! {
    #[test]
    fn invariants_hold_after_every_mutation(
        batch in prop::collection::vec(arb_mutation(), 0..40)
    ) {
        let mut registry = NpcGroupsBiMap::new();
        for mutation in &batch {
            registry.apply_mutation(mutation);
            prop_assert!(registry.invariants_hold(), "broken after {:?}", mutation);
            for group in registry.values().filter(|g| g.phase == GroupPhase::Captured) {
                let captor = group.captor_id.as_ref();
                prop_assert!(captor.is_some(), "{} captured by nobody", group.id);
                let held = captor.and_then(|c| registry.get_by_user(c)).map(|g| &g.id);
                prop_assert_eq!(held, Some(&group.id));
            }
        }
    }

    #[test]
    fn every_indexed_user_is_a_captor(
        batch in prop::collection::vec(arb_mutation(), 0..40)
    ) {
        let registry = NpcGroupsBiMap::new().applied(&batch);
        for (user, group) in registry.captured() {
            prop_assert_eq!(group.phase, GroupPhase::Captured);
            prop_assert_eq!(group.captor_id.as_ref(), Some(user));
        }
        prop_assert!(registry.values().all(|g| !g.is_empty()));
    }

    #[test]
    fn applied_leaves_the_source_untouched(
        first in prop::collection::vec(arb_mutation(), 0..20),
        second in prop::collection::vec(arb_mutation(), 0..20),
    ) {
        let base = NpcGroupsBiMap::new().applied(&first);
        let before = base.clone();
        let _next = base.applied(&second);
        prop_assert_eq!(base, before);
    }

    #[test]
    fn snapshot_round_trip_preserves_registry(
        batch in prop::collection::vec(arb_mutation(), 0..30)
    ) {
        let registry = NpcGroupsBiMap::new().applied(&batch);
        let text = registry.to_json().expect("encode");
        let back = NpcGroupsBiMap::from_json(&text).expect("decode");
        prop_assert_eq!(back, registry);
    }
}
