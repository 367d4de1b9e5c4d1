//! Rotated rectangle collision.
//!
//! Collision between avatars and NPC groups uses oriented bounding boxes
//! tested with the Separating Axis Theorem. Two convex shapes are disjoint
//! exactly when some edge normal of either shape separates their
//! projections, so for rectangles four axes suffice.

use capture_common::Position;
use glam::Vec2;

/// Edges shorter than this are degenerate and contribute no axis.
const AXIS_EPSILON: f32 = 1e-6;

/// Overlap along an axis at or below this depth counts as touching.
const TOUCH_EPSILON: f32 = 1e-4;

/// A rectangle rotated about its center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientedRect {
    /// Center in world space
    pub center: Vec2,
    /// Extent along the local x axis
    pub width: f32,
    /// Extent along the local y axis
    pub height: f32,
    /// Rotation in radians, counter-clockwise
    pub rotation: f32,
}

impl OrientedRect {
    /// Creates a new oriented rectangle.
    #[must_use]
    pub fn new(center: Position, width: f32, height: f32, rotation: f32) -> Self {
        Self {
            center: center.to_vec2(),
            width,
            height,
            rotation,
        }
    }

    /// Creates an axis-aligned rectangle.
    #[must_use]
    pub fn axis_aligned(center: Position, width: f32, height: f32) -> Self {
        Self::new(center, width, height, 0.0)
    }

    /// Returns the corners in winding order.
    #[must_use]
    pub fn corners(&self) -> [Vec2; 4] {
        let rot = Vec2::from_angle(self.rotation);
        let hw = self.width * 0.5;
        let hh = self.height * 0.5;
        [
            Vec2::new(-hw, -hh),
            Vec2::new(hw, -hh),
            Vec2::new(hw, hh),
            Vec2::new(-hw, hh),
        ]
        .map(|offset| self.center + rot.rotate(offset))
    }
}

/// Projects corners onto an axis and returns `(min, max)`.
fn project(corners: &[Vec2; 4], axis: Vec2) -> (f32, f32) {
    corners.iter().fold((f32::INFINITY, f32::NEG_INFINITY), |(min, max), c| {
        let p = c.dot(axis);
        (min.min(p), max.max(p))
    })
}

/// The two distinct edge normals of a rectangle given its corners.
fn edge_normals(corners: &[Vec2; 4]) -> impl Iterator<Item = Vec2> + '_ {
    (0..2).filter_map(move |i| {
        let edge = corners[i + 1] - corners[i];
        if edge.length() < AXIS_EPSILON {
            None
        } else {
            Some(edge.perp().normalize())
        }
    })
}

/// Separating Axis Theorem test for two oriented rectangles.
///
/// Returns `false` as soon as any axis shows a gap. Shapes that only touch
/// along an edge or at a corner are reported as separated.
#[must_use]
pub fn intersects(a: &OrientedRect, b: &OrientedRect) -> bool {
    let corners_a = a.corners();
    let corners_b = b.corners();

    let axes: Vec<Vec2> = edge_normals(&corners_a)
        .chain(edge_normals(&corners_b))
        .collect();

    for axis in axes {
        let (min_a, max_a) = project(&corners_a, axis);
        let (min_b, max_b) = project(&corners_b, axis);

        if max_a - min_b <= TOUCH_EPSILON || max_b - min_a <= TOUCH_EPSILON {
            return false;
        }
    }

    true
}
