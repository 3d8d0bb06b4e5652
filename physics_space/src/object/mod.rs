//! Collision objects: rigid bodies, areas and soft bodies
//!
//! Objects are owned by an [`ObjectArena`] and referenced by [`ObjectId`].
//! A space only records which ids are registered with it; the engine layer
//! that creates objects keeps ownership.

pub mod arena;
pub mod area;
pub mod body;
pub mod soft_body;

use crate::collision::narrow_phase::PlacedShape;
use crate::collision::{ProxyId, Shape, AABB};
use crate::math::Transform;
use crate::space::activity::ListMembership;
use crate::space::pairs::PairKey;
use crate::space::SpaceId;
use glam::Vec3;
use serde::{Deserialize, Serialize};

pub use arena::ObjectArena;
pub use area::{Area, AreaSpaceOverride, MonitorKey};
pub use body::{BodyMode, Medium, RigidBody};
pub use soft_body::{SoftBody, SoftLink, SoftNode};

/// Generational handle of an object in an [`ObjectArena`]
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ObjectId {
    index: u32,
    generation: u32,
}

impl ObjectId {
    pub fn from_raw_parts(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(self) -> u32 {
        self.index
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

/// Capabilities the space needs from every kind of object
pub trait SpaceObject {
    /// Static objects never pair with other static objects in the broad phase
    fn is_static(&self) -> bool;

    /// Whether the object is currently simulated (not sleeping)
    fn is_active(&self) -> bool;

    /// Velocity of the material point at `point`, given the object's origin
    fn velocity_at(&self, point: Vec3, origin: Vec3) -> Vec3;
}

/// Kind-specific state of a collision object
#[derive(Debug, Clone)]
pub enum ObjectKind {
    RigidBody(RigidBody),
    Area(Area),
    SoftBody(SoftBody),
}

impl ObjectKind {
    pub fn name(&self) -> &'static str {
        match self {
            ObjectKind::RigidBody(_) => "rigid body",
            ObjectKind::Area(_) => "area",
            ObjectKind::SoftBody(_) => "soft body",
        }
    }

    /// Pairing order: areas first, then bodies, then soft bodies
    pub(crate) fn pair_order(&self) -> u8 {
        match self {
            ObjectKind::Area(_) => 0,
            ObjectKind::RigidBody(_) => 1,
            ObjectKind::SoftBody(_) => 2,
        }
    }
}

/// One shape attached to an object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShapeInstance {
    pub shape: Shape,
    /// Placement relative to the owning object
    pub local_transform: Transform,
    /// Disabled shapes have no broad phase proxy and are ignored by queries
    pub disabled: bool,
    /// One-way shapes are skipped by regular ray queries but not by pick rays
    pub one_way: bool,
}

impl ShapeInstance {
    pub fn new(shape: Shape, local_transform: Transform) -> Self {
        Self {
            shape,
            local_transform,
            disabled: false,
            one_way: false,
        }
    }
}

/// A collision object: shapes, placement and layer filtering around an [`ObjectKind`]
#[derive(Debug, Clone)]
pub struct CollisionObject {
    kind: ObjectKind,
    transform: Transform,
    shapes: Vec<ShapeInstance>,
    pub collision_layer: u32,
    pub collision_mask: u32,
    /// Whether pick rays may hit this object
    pub ray_pickable: bool,
    /// Opaque user handle reported back in query results
    pub instance_id: u64,
    pub(crate) space: Option<SpaceId>,
    pub(crate) proxies: Vec<(usize, ProxyId)>,
    pub(crate) lists: ListMembership,
    pub(crate) constraints: Vec<PairKey>,
}

impl CollisionObject {
    fn new(kind: ObjectKind) -> Self {
        Self {
            kind,
            transform: Transform::IDENTITY,
            shapes: Vec::new(),
            collision_layer: 1,
            collision_mask: 1,
            ray_pickable: true,
            instance_id: 0,
            space: None,
            proxies: Vec::new(),
            lists: ListMembership::default(),
            constraints: Vec::new(),
        }
    }

    pub fn rigid_body(body: RigidBody) -> Self {
        Self::new(ObjectKind::RigidBody(body))
    }

    pub fn area(area: Area) -> Self {
        Self::new(ObjectKind::Area(area))
    }

    pub fn soft_body(soft_body: SoftBody) -> Self {
        Self::new(ObjectKind::SoftBody(soft_body))
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self.kind_transform_changed();
        self
    }

    pub fn with_shape(mut self, shape: Shape, local_transform: Transform) -> Self {
        self.shapes.push(ShapeInstance::new(shape, local_transform));
        self
    }

    pub fn with_layers(mut self, layer: u32, mask: u32) -> Self {
        self.collision_layer = layer;
        self.collision_mask = mask;
        self
    }

    pub fn with_instance_id(mut self, instance_id: u64) -> Self {
        self.instance_id = instance_id;
        self
    }

    pub fn kind(&self) -> &ObjectKind {
        &self.kind
    }

    pub fn body(&self) -> Option<&RigidBody> {
        match &self.kind {
            ObjectKind::RigidBody(body) => Some(body),
            _ => None,
        }
    }

    /// Mode and sleep state of a registered body only change through `Space`
    pub fn body_mut(&mut self) -> Option<&mut RigidBody> {
        match &mut self.kind {
            ObjectKind::RigidBody(body) => Some(body),
            _ => None,
        }
    }

    pub fn as_area(&self) -> Option<&Area> {
        match &self.kind {
            ObjectKind::Area(area) => Some(area),
            _ => None,
        }
    }

    pub fn as_area_mut(&mut self) -> Option<&mut Area> {
        match &mut self.kind {
            ObjectKind::Area(area) => Some(area),
            _ => None,
        }
    }

    pub fn as_soft_body(&self) -> Option<&SoftBody> {
        match &self.kind {
            ObjectKind::SoftBody(soft_body) => Some(soft_body),
            _ => None,
        }
    }

    pub fn as_soft_body_mut(&mut self) -> Option<&mut SoftBody> {
        match &mut self.kind {
            ObjectKind::SoftBody(soft_body) => Some(soft_body),
            _ => None,
        }
    }

    pub fn is_area(&self) -> bool {
        matches!(self.kind, ObjectKind::Area(_))
    }

    pub fn is_soft_body(&self) -> bool {
        matches!(self.kind, ObjectKind::SoftBody(_))
    }

    /// Rigid body in [`BodyMode::Rigid`]
    pub fn is_dynamic_body(&self) -> bool {
        self.body().is_some_and(|body| body.mode() == BodyMode::Rigid)
    }

    /// The space this object is registered with, if any
    pub fn space(&self) -> Option<SpaceId> {
        self.space
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Move the object. Registered objects must be moved through
    /// `Space::set_object_transform` so the broad phase follows.
    pub(crate) fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
        self.kind_transform_changed();
    }

    fn kind_transform_changed(&mut self) {
        if let ObjectKind::RigidBody(body) = &mut self.kind {
            body.update_world_inertia(&self.transform);
        }
    }

    pub fn shapes(&self) -> &[ShapeInstance] {
        &self.shapes
    }

    /// Edit the shape list. Registered objects must call
    /// `Space::update_object_shapes` afterwards.
    pub fn shapes_mut(&mut self) -> &mut Vec<ShapeInstance> {
        &mut self.shapes
    }

    pub fn shape(&self, index: usize) -> Option<&ShapeInstance> {
        self.shapes.get(index)
    }

    pub fn shape_world_transform(&self, index: usize) -> Option<Transform> {
        self.shapes
            .get(index)
            .map(|instance| self.transform.mul_transform(&instance.local_transform))
    }

    /// An enabled shape placed in the world, ready for narrow phase tests
    pub fn placed_shape(&self, index: usize) -> Option<PlacedShape<'_>> {
        let instance = self.shapes.get(index).filter(|instance| !instance.disabled)?;
        Some(PlacedShape::new(
            &instance.shape,
            self.transform.mul_transform(&instance.local_transform),
        ))
    }

    /// Indices of enabled shapes
    pub fn enabled_shapes(&self) -> impl Iterator<Item = usize> + '_ {
        self.shapes
            .iter()
            .enumerate()
            .filter(|(_, instance)| !instance.disabled)
            .map(|(i, _)| i)
    }

    /// Broad phase subindices this object needs proxies for
    pub(crate) fn proxy_subindices(&self) -> Vec<usize> {
        match &self.kind {
            ObjectKind::SoftBody(_) => vec![0],
            _ => self.enabled_shapes().collect(),
        }
    }

    /// World bounds of the proxy with the given subindex
    pub(crate) fn proxy_aabb(&self, subindex: usize) -> AABB {
        match &self.kind {
            ObjectKind::SoftBody(soft_body) => soft_body.aabb(),
            _ => self
                .shapes
                .get(subindex)
                .map(|instance| {
                    instance
                        .shape
                        .world_aabb(&self.transform.mul_transform(&instance.local_transform))
                })
                .unwrap_or(AABB::from_center_half_extents(self.transform.position, Vec3::ZERO)),
        }
    }

    /// True if `other`'s layer is in this object's mask
    pub fn collides_with(&self, other: &CollisionObject) -> bool {
        other.collision_layer & self.collision_mask != 0
    }

    /// True if either object's mask contains the other's layer
    pub fn interacts_with(&self, other: &CollisionObject) -> bool {
        self.collides_with(other) || other.collides_with(self)
    }

    /// Recompute mass and inertia of a rigid body from its shapes
    pub(crate) fn update_mass_properties(&mut self) {
        if let ObjectKind::RigidBody(body) = &mut self.kind {
            body.update_mass_properties(&self.shapes, &self.transform);
        }
    }

    /// Advance a rigid body's transform by its velocities. Returns true if it moved.
    pub(crate) fn integrate_body_velocities(&mut self, dt: f32) -> bool {
        let ObjectKind::RigidBody(body) = &mut self.kind else {
            return false;
        };
        match body.integrate_velocities(&self.transform, dt) {
            Some(transform) => {
                self.transform = transform;
                body.update_world_inertia(&self.transform);
                true
            }
            None => false,
        }
    }
}

impl SpaceObject for CollisionObject {
    fn is_static(&self) -> bool {
        match &self.kind {
            ObjectKind::RigidBody(body) => body.is_static(),
            ObjectKind::Area(area) => area.is_static(),
            ObjectKind::SoftBody(soft_body) => soft_body.is_static(),
        }
    }

    fn is_active(&self) -> bool {
        match &self.kind {
            ObjectKind::RigidBody(body) => body.is_active(),
            ObjectKind::Area(area) => area.is_active(),
            ObjectKind::SoftBody(soft_body) => soft_body.is_active(),
        }
    }

    fn velocity_at(&self, point: Vec3, origin: Vec3) -> Vec3 {
        match &self.kind {
            ObjectKind::RigidBody(body) => body.velocity_at(point, origin),
            ObjectKind::Area(area) => area.velocity_at(point, origin),
            ObjectKind::SoftBody(soft_body) => soft_body.velocity_at(point, origin),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_mask_filtering() {
        let a = CollisionObject::rigid_body(RigidBody::default()).with_layers(0b01, 0b10);
        let b = CollisionObject::rigid_body(RigidBody::default()).with_layers(0b10, 0b00);
        let c = CollisionObject::rigid_body(RigidBody::default()).with_layers(0b100, 0b100);

        assert!(a.collides_with(&b));
        assert!(!b.collides_with(&a));
        assert!(a.interacts_with(&b) && b.interacts_with(&a));
        assert!(!a.interacts_with(&c));
    }

    #[test]
    fn test_disabled_shapes_have_no_proxy() {
        let mut object = CollisionObject::rigid_body(RigidBody::default())
            .with_shape(Shape::Sphere { radius: 1.0 }, Transform::IDENTITY)
            .with_shape(Shape::Sphere { radius: 1.0 }, Transform::from_position(Vec3::X));
        object.shapes_mut()[0].disabled = true;

        assert_eq!(object.proxy_subindices(), vec![1]);
        assert!(object.placed_shape(0).is_none());
        let placed = object.placed_shape(1).expect("enabled shape");
        assert_eq!(placed.transform.position, Vec3::X);
    }
}
