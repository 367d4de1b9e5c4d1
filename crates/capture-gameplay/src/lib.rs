//! # Capture Gameplay
//!
//! Authoritative simulation core of a capture room.
//!
//! This crate provides:
//! - NPC groups and the dual-indexed ownership registry
//! - The path state machine for thrown groups
//! - Bot assignment between authorities
//! - The per-tick collision and ownership-transfer sweep
//! - Deterministic NPC spawning
//! - Packet envelope codec and simulation events
//! - `Simulation`, which runs one authority's ticks

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod bots;
pub mod events;
pub mod group;
pub mod packet;
pub mod path;
pub mod registry;
pub mod resolution;
pub mod simulation;
pub mod spawn;
pub mod user;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::bots::*;
    pub use crate::events::*;
    pub use crate::group::*;
    pub use crate::packet::*;
    pub use crate::path::*;
    pub use crate::registry::*;
    pub use crate::resolution::*;
    pub use crate::simulation::*;
    pub use crate::spawn::*;
    pub use crate::user::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;
    use capture_common::{GroupId, UserId};

    #[test]
    fn test_registry_set_and_delete_by_group_id() {
        let mut registry = NpcGroupsBiMap::new();
        let group = NpcGroup::new("g1", ["fox.png"]).captured_by("u1");
        registry.set_by_group_id(&GroupId::new("g1"), group.clone());
        assert_eq!(
            registry.get_by_user(&UserId::new("u1")).map(|g| &g.id),
            Some(&GroupId::new("g1"))
        );

        let drained = NpcGroup {
            file_names: Vec::new(),
            ..group
        };
        registry.set_by_group_id(&GroupId::new("g1"), drained);
        assert!(registry.get_by_user(&UserId::new("u1")).is_none());
        assert!(registry.get_by_group_id(&GroupId::new("g1")).is_none());
    }
}
