//! Planar coordinate types.
//!
//! The render layer keeps a fixed z lane per layer, so collision and
//! ownership only ever deal with `{x, y}`.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// World position in planar coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    /// X coordinate in world space
    pub x: f32,
    /// Y coordinate in world space
    pub y: f32,
}

impl Position {
    /// The world origin.
    pub const ORIGIN: Self = Self::new(0.0, 0.0);

    /// Creates a new position.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Returns the distance to another position.
    #[must_use]
    pub fn distance(self, other: Self) -> f32 {
        self.to_vec2().distance(other.to_vec2())
    }

    /// Converts to a glam vector for math.
    #[must_use]
    pub const fn to_vec2(self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

impl From<Vec2> for Position {
    fn from(v: Vec2) -> Self {
        Self::new(v.x, v.y)
    }
}

/// Heading vector. Not required to be normalized; `{0, 0}` means idle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Direction {
    /// X component
    pub x: f32,
    /// Y component
    pub y: f32,
}

impl Direction {
    /// No heading.
    pub const IDLE: Self = Self::new(0.0, 0.0);

    /// Creates a new direction.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Unit direction pointing from `from` to `to`, or idle if they coincide.
    #[must_use]
    pub fn towards(from: Position, to: Position) -> Self {
        (to.to_vec2() - from.to_vec2()).normalize_or_zero().into()
    }

    /// Whether this direction carries no heading.
    #[must_use]
    pub fn is_idle(self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }

    /// Rotation in radians for this heading. Idle maps to zero.
    #[must_use]
    pub fn heading(self) -> f32 {
        if self.is_idle() {
            0.0
        } else {
            self.y.atan2(self.x)
        }
    }

    /// Converts to a glam vector for math.
    #[must_use]
    pub const fn to_vec2(self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

impl From<Vec2> for Direction {
    fn from(v: Vec2) -> Self {
        Self::new(v.x, v.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_towards_is_unit_length() {
        let d = Direction::towards(Position::new(0.0, 0.0), Position::new(3.0, 4.0));
        assert!((d.to_vec2().length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_towards_same_point_is_idle() {
        let p = Position::new(5.0, 5.0);
        assert!(Direction::towards(p, p).is_idle());
    }

    #[test]
    fn test_heading_quarter_turn() {
        let d = Direction::new(0.0, 1.0);
        assert!((d.heading() - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
    }

    #[test]
    fn test_position_wire_shape() {
        let json = serde_json::to_string(&Position::new(1.5, -2.0)).expect("serialize");
        assert_eq!(json, r#"{"x":1.5,"y":-2.0}"#);
    }
}
