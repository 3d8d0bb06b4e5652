//! Direct spatial queries against a space
//!
//! A [`DirectSpaceState`] borrows a space and its objects read-only and
//! answers point, ray and shape queries from the broad phase plus exact
//! narrow phase tests. It can only be obtained while the space is unlocked.

mod direct;
mod motion;

use crate::collision::{ProxyOwner, AABB};
use crate::error::SpaceError;
use crate::object::{CollisionObject, ObjectArena, ObjectId};
use crate::space::Space;
use glam::Vec3;
use std::collections::BTreeSet;
use tracing::error;

pub use motion::{MotionCollision, MotionResult, CAST_MOTION_EPSILON, CAST_MOTION_MAX_ITERATIONS};

/// Upper bound on broad phase candidates and results of a single query
pub const INTERSECTION_QUERY_MAX: usize = 2048;

/// Which objects a query may report
#[derive(Debug, Clone, PartialEq)]
pub struct QueryFilter {
    pub exclude: BTreeSet<ObjectId>,
    /// Objects whose layer shares no bit with this mask are skipped
    pub collision_mask: u32,
    pub collide_with_bodies: bool,
    pub collide_with_areas: bool,
}

impl Default for QueryFilter {
    fn default() -> Self {
        Self {
            exclude: BTreeSet::new(),
            collision_mask: u32::MAX,
            collide_with_bodies: true,
            collide_with_areas: false,
        }
    }
}

impl QueryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mask(mut self, mask: u32) -> Self {
        self.collision_mask = mask;
        self
    }

    pub fn excluding(mut self, id: ObjectId) -> Self {
        self.exclude.insert(id);
        self
    }

    pub fn with_bodies(mut self, enabled: bool) -> Self {
        self.collide_with_bodies = enabled;
        self
    }

    pub fn with_areas(mut self, enabled: bool) -> Self {
        self.collide_with_areas = enabled;
        self
    }

    pub fn accepts(&self, id: ObjectId, object: &CollisionObject) -> bool {
        if self.exclude.contains(&id) || object.collision_layer & self.collision_mask == 0 {
            return false;
        }
        if object.is_area() {
            self.collide_with_areas
        } else {
            self.collide_with_bodies
        }
    }
}

/// An object shape found by a point or shape query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapeResult {
    pub collider: ObjectId,
    pub collider_instance_id: u64,
    pub shape: usize,
}

/// Closest hit of a ray query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayResult {
    pub position: Vec3,
    pub normal: Vec3,
    pub collider: ObjectId,
    pub collider_instance_id: u64,
    pub shape: usize,
}

/// Fractions of a motion that are free and that first touch something
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionCast {
    pub closest_safe: f32,
    pub closest_unsafe: f32,
}

/// Deepest contact of a resting shape
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeRestInfo {
    /// Contact point on the collider's surface
    pub point: Vec3,
    /// Points out of the collider
    pub normal: Vec3,
    pub depth: f32,
    pub collider: ObjectId,
    pub collider_instance_id: u64,
    pub shape: usize,
    /// Velocity of the collider at `point`
    pub linear_velocity: Vec3,
}

/// Read-only query view of a space
pub struct DirectSpaceState<'a> {
    space: &'a Space,
    objects: &'a ObjectArena,
}

impl<'a> DirectSpaceState<'a> {
    pub(crate) fn new(space: &'a Space, objects: &'a ObjectArena) -> Self {
        Self { space, objects }
    }

    pub fn space(&self) -> &'a Space {
        self.space
    }

    /// A registered object of this space
    fn object(&self, id: ObjectId) -> Option<&'a CollisionObject> {
        self.objects
            .get(id)
            .filter(|object| object.space() == Some(self.space.id()))
    }

    /// A candidate proxy that passes `filter`
    fn accepted(&self, owner: &ProxyOwner, filter: &QueryFilter) -> Option<&'a CollisionObject> {
        self.object(owner.object)
            .filter(|object| filter.accepts(owner.object, object))
    }

    fn cull_aabb(&self, aabb: &AABB) -> Vec<ProxyOwner> {
        let mut candidates = Vec::new();
        self.space
            .broad_phase
            .cull_aabb(aabb, &mut candidates, INTERSECTION_QUERY_MAX);
        candidates
    }
}

impl Space {
    /// Query view of this space; fails while a step is running
    pub fn direct_state<'a>(&'a self, objects: &'a ObjectArena) -> Result<DirectSpaceState<'a>, SpaceError> {
        if self.is_locked() {
            error!(space = ?self.id(), "Direct queries are not allowed while the space is locked");
            return Err(SpaceError::Locked);
        }
        Ok(DirectSpaceState::new(self, objects))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{Area, RigidBody};

    #[test]
    fn test_filter_defaults_to_bodies_only() {
        let filter = QueryFilter::default();
        let body = CollisionObject::rigid_body(RigidBody::default());
        let area = CollisionObject::area(Area::default());
        let id = ObjectId::from_raw_parts(0, 0);

        assert!(filter.accepts(id, &body));
        assert!(!filter.accepts(id, &area));
        assert!(filter.clone().with_areas(true).accepts(id, &area));
        assert!(!filter.clone().excluding(id).accepts(id, &body));
        assert!(!filter.with_mask(0b10).accepts(id, &body));
    }

    #[test]
    fn test_direct_state_unavailable_while_locked() {
        let objects = ObjectArena::new();
        let mut space = Space::new();
        space.lock().unwrap();
        assert!(matches!(space.direct_state(&objects), Err(SpaceError::Locked)));
        space.unlock().unwrap();
        assert!(space.direct_state(&objects).is_ok());
    }
}
