//! # Capture Common
//!
//! Common types, utilities, and shared abstractions for the capture
//! simulation core.
//!
//! This crate provides foundational types used across all capture crates:
//! - Planar coordinate types (position, direction)
//! - ID types (UserId, GroupId, PathId)
//! - Version information for snapshot schemas
//! - Common error types
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod coords;
pub mod error;
pub mod ids;
pub mod version;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::coords::*;
    pub use crate::error::*;
    pub use crate::ids::*;
    pub use crate::version::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_order_lexicographically() {
        let a = GroupId::new("g1");
        let b = GroupId::new("g2");
        assert!(a < b);
        assert_eq!(a.as_str(), "g1");
    }

    #[test]
    fn test_idle_direction_has_zero_heading() {
        assert_eq!(Direction::IDLE.heading(), 0.0);
        assert!(Direction::IDLE.is_idle());
    }

    #[test]
    fn test_version_compatibility() {
        let v1 = SchemaVersion::new(1, 0, 0);
        let v2 = SchemaVersion::new(1, 1, 0);
        let v3 = SchemaVersion::new(2, 0, 0);

        assert!(v2.is_compatible_with(&v1));
        assert!(!v1.is_compatible_with(&v3));
    }
}
