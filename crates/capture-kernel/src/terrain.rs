//! Terrain boundary data.
//!
//! Terrain generation lives outside the simulation core. The core only
//! consumes the playable rectangle, which must be identical for every
//! participant, so it is derived from the room id alone.

use capture_common::Position;
use serde::{Deserialize, Serialize};

use crate::random::{deterministic_range, RngInputs};

/// Smallest half extent a room can have, in world units.
const MIN_HALF_EXTENT: f32 = 40.0;

/// Largest half extent a room can have, in world units.
const MAX_HALF_EXTENT: f32 = 80.0;

/// Grid sizes a room can be laid out on.
const GRID_SIZES: [f32; 3] = [1.0, 2.0, 4.0];

/// Playable rectangle of a room.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerrainBounds {
    /// Left edge
    pub min_x: f32,
    /// Right edge
    pub max_x: f32,
    /// Bottom edge
    pub min_y: f32,
    /// Top edge
    pub max_y: f32,
    /// Terrain grid cell size
    pub grid_size: f32,
}

impl TerrainBounds {
    /// Creates bounds from explicit edges.
    #[must_use]
    pub const fn new(min_x: f32, max_x: f32, min_y: f32, max_y: f32, grid_size: f32) -> Self {
        Self {
            min_x,
            max_x,
            min_y,
            max_y,
            grid_size,
        }
    }

    /// Derives the bounds for a room. The same id always yields the same
    /// bounds.
    #[must_use]
    pub fn from_room_id(room_id: &str) -> Self {
        let half_x = deterministic_range(
            &RngInputs::new().with("roomId", room_id).with("axis", "x"),
            MIN_HALF_EXTENT,
            MAX_HALF_EXTENT,
        );
        let half_y = deterministic_range(
            &RngInputs::new().with("roomId", room_id).with("axis", "y"),
            MIN_HALF_EXTENT,
            MAX_HALF_EXTENT,
        );
        let grid_pick = deterministic_range(
            &RngInputs::new().with("roomId", room_id).with("field", "grid"),
            0.0,
            GRID_SIZES.len() as f32,
        );
        let grid_size = GRID_SIZES[(grid_pick as usize).min(GRID_SIZES.len() - 1)];

        // Snap extents to whole grid cells.
        let half_x = (half_x / grid_size).floor() * grid_size;
        let half_y = (half_y / grid_size).floor() * grid_size;

        Self::new(-half_x, half_x, -half_y, half_y, grid_size)
    }

    /// Whether a position lies inside the bounds (edges included).
    #[must_use]
    pub fn contains(&self, p: Position) -> bool {
        (self.min_x..=self.max_x).contains(&p.x) && (self.min_y..=self.max_y).contains(&p.y)
    }

    /// Clamps a position into the bounds.
    #[must_use]
    pub fn clamp(&self, p: Position) -> Position {
        Position::new(
            p.x.clamp(self.min_x, self.max_x),
            p.y.clamp(self.min_y, self.max_y),
        )
    }
}

impl Default for TerrainBounds {
    fn default() -> Self {
        Self::new(-MIN_HALF_EXTENT, MIN_HALF_EXTENT, -MIN_HALF_EXTENT, MIN_HALF_EXTENT, 1.0)
    }
}
