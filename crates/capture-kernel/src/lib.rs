//! # Capture Kernel
//!
//! Stateless math shared by every participant of a room:
//! - Rotated rectangle overlap via the Separating Axis Theorem
//! - Per-animal collision footprints
//! - Hash-based deterministic random values
//! - Terrain bounds derived from a room id

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod footprint;
pub mod random;
pub mod spatial;
pub mod terrain;

pub use footprint::{AnimalKind, Footprint, FootprintTable, COLLISION_THRESHOLD};
pub use random::{deterministic_range, deterministic_value, RngInputs};
pub use spatial::{intersects, OrientedRect};
pub use terrain::TerrainBounds;
