//! Collision detection subsystem

pub mod broad_phase;
pub mod gjk;
pub mod narrow_phase;
pub mod shapes;

use glam::Vec3;
use serde::{Deserialize, Serialize};

pub use broad_phase::{BroadPhase, PairEvent, ProxyId, ProxyOwner, SweepAndPruneBroadPhase};
pub use shapes::{Ray, RaycastHit, Shape};

/// Most points kept in one contact manifold
pub const MAX_MANIFOLD_POINTS: usize = 4;

/// One contact between shape A and shape B
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ContactPoint {
    /// Point on the surface of A (margin included)
    pub point_a: Vec3,
    /// Point on the surface of B (margin included)
    pub point_b: Vec3,
    /// Contact normal pointing from A to B
    pub normal: Vec3,
    /// Penetration depth along the normal (negative for separation)
    pub depth: f32,
}

impl ContactPoint {
    /// Create a contact from its two surface points; depth is derived from them
    pub fn new(point_a: Vec3, point_b: Vec3, normal: Vec3) -> Self {
        Self {
            point_a,
            point_b,
            normal,
            depth: normal.dot(point_a - point_b),
        }
    }

    /// Swap A and B
    pub fn flipped(self) -> Self {
        Self {
            point_a: self.point_b,
            point_b: self.point_a,
            normal: -self.normal,
            depth: self.depth,
        }
    }

    /// Midpoint of the two surface points
    pub fn midpoint(&self) -> Vec3 {
        (self.point_a + self.point_b) * 0.5
    }
}

/// Fixed-capacity set of contact points between two shapes.
///
/// When full, a new point only replaces the shallowest stored point.
#[derive(Debug, Clone, Default)]
pub struct ContactManifold {
    points: [ContactPoint; MAX_MANIFOLD_POINTS],
    len: usize,
}

impl ContactManifold {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    pub fn push(&mut self, contact: ContactPoint) {
        if self.len < MAX_MANIFOLD_POINTS {
            self.points[self.len] = contact;
            self.len += 1;
            return;
        }

        let shallowest = self
            .points
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.depth.total_cmp(&b.1.depth))
            .map(|(i, _)| i);
        if let Some(i) = shallowest {
            if self.points[i].depth < contact.depth {
                self.points[i] = contact;
            }
        }
    }

    pub fn as_slice(&self) -> &[ContactPoint] {
        &self.points[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Deepest contact, if any
    pub fn deepest(&self) -> Option<&ContactPoint> {
        self.as_slice()
            .iter()
            .max_by(|a, b| a.depth.total_cmp(&b.depth))
    }

    /// Swap A and B on every point
    pub fn flip(&mut self) {
        for point in &mut self.points[..self.len] {
            *point = point.flipped();
        }
    }
}

/// Create an orthonormal basis given a normal vector
pub(crate) fn create_tangent_basis(normal: Vec3) -> (Vec3, Vec3) {
    // Choose a vector that's not parallel to the normal
    let up = if normal.y.abs() < 0.9 { Vec3::Y } else { Vec3::X };

    let tangent = up.cross(normal).normalize();
    let bitangent = normal.cross(tangent);

    (tangent, bitangent)
}

/// Axis-aligned bounding box for broad phase
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AABB {
    pub min: Vec3,
    pub max: Vec3,
}

impl AABB {
    /// AABB that contains nothing; expanding it by a point yields that point
    pub const EMPTY: AABB = AABB {
        min: Vec3::splat(f32::MAX),
        max: Vec3::splat(f32::MIN),
    };

    /// Create a new AABB from min and max points
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create an AABB from a center point and half-extents
    pub fn from_center_half_extents(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Smallest AABB containing both segment endpoints
    pub fn from_segment(from: Vec3, to: Vec3) -> Self {
        Self {
            min: from.min(to),
            max: from.max(to),
        }
    }

    /// Check if this AABB overlaps with another
    pub fn overlaps(&self, other: &AABB) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Slab test of the segment `from..to` against this box
    pub fn intersects_segment(&self, from: Vec3, to: Vec3) -> bool {
        let dir = to - from;
        let mut t_enter = 0.0f32;
        let mut t_exit = 1.0f32;

        for axis in 0..3 {
            let origin = from[axis];
            let delta = dir[axis];
            if delta.abs() < f32::EPSILON {
                if origin < self.min[axis] || origin > self.max[axis] {
                    return false;
                }
                continue;
            }
            let inv = 1.0 / delta;
            let mut t0 = (self.min[axis] - origin) * inv;
            let mut t1 = (self.max[axis] - origin) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_enter = t_enter.max(t0);
            t_exit = t_exit.min(t1);
            if t_enter > t_exit {
                return false;
            }
        }
        true
    }

    /// Expand this AABB to include a point
    pub fn expand_to_include(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Grow every face outward by `amount`
    pub fn grown(&self, amount: f32) -> AABB {
        AABB {
            min: self.min - Vec3::splat(amount),
            max: self.max + Vec3::splat(amount),
        }
    }

    /// This box swept along `motion`
    pub fn swept(&self, motion: Vec3) -> AABB {
        self.merge(&AABB {
            min: self.min + motion,
            max: self.max + motion,
        })
    }

    /// Get the center of the AABB
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the half-extents of the AABB
    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Merge two AABBs
    pub fn merge(&self, other: &AABB) -> AABB {
        AABB {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }
}
