//! Point, ray and shape queries

use super::motion::bisect_motion;
use super::{
    DirectSpaceState, MotionCast, QueryFilter, RayResult, ShapeRestInfo, ShapeResult,
    INTERSECTION_QUERY_MAX,
};
use crate::collision::narrow_phase::{self, PlacedShape};
use crate::collision::{ContactManifold, Ray, Shape, AABB};
use crate::math::Transform;
use crate::object::{ObjectId, SpaceObject};
use glam::Vec3;
use tracing::trace;

impl<'a> DirectSpaceState<'a> {
    /// Collect up to `max_results` shapes containing `point`. Returns the count.
    pub fn intersect_point(
        &self,
        point: Vec3,
        results: &mut Vec<ShapeResult>,
        max_results: usize,
        filter: &QueryFilter,
    ) -> usize {
        results.clear();
        let max_results = max_results.min(INTERSECTION_QUERY_MAX);
        if max_results == 0 {
            return 0;
        }

        let mut candidates = Vec::new();
        self.space
            .broad_phase
            .cull_point(point, &mut candidates, INTERSECTION_QUERY_MAX);

        for owner in &candidates {
            let Some(object) = self.accepted(owner, filter) else {
                continue;
            };
            let Some(placed) = object.placed_shape(owner.subindex) else {
                continue;
            };
            let local = placed.transform.inverse_transform_point(point);
            if !placed.shape.contains_point(local) {
                continue;
            }
            results.push(ShapeResult {
                collider: owner.object,
                collider_instance_id: object.instance_id,
                shape: owner.subindex,
            });
            if results.len() >= max_results {
                break;
            }
        }
        results.len()
    }

    /// Closest hit along the segment `from..to`.
    ///
    /// Rays starting inside a shape do not hit it. A pick ray only hits
    /// ray-pickable objects but does hit one-way shapes.
    pub fn intersect_ray(
        &self,
        from: Vec3,
        to: Vec3,
        filter: &QueryFilter,
        pick_ray: bool,
    ) -> Option<RayResult> {
        let delta = to - from;
        let length = delta.length();
        if length <= f32::EPSILON {
            return None;
        }
        let direction = delta / length;

        let mut candidates = Vec::new();
        self.space
            .broad_phase
            .cull_segment(from, to, &mut candidates, INTERSECTION_QUERY_MAX);

        let mut best: Option<(f32, RayResult)> = None;
        for owner in &candidates {
            let Some(object) = self.accepted(owner, filter) else {
                continue;
            };
            if pick_ray && !object.ray_pickable {
                continue;
            }
            let Some(instance) = object.shape(owner.subindex).filter(|instance| !instance.disabled)
            else {
                continue;
            };
            if instance.one_way && !pick_ray {
                continue;
            }
            let Some(transform) = object.shape_world_transform(owner.subindex) else {
                continue;
            };

            let local_ray = Ray::new(
                transform.inverse_transform_point(from),
                transform.inverse_transform_vector(direction),
            );
            let Some(hit) = instance.shape.raycast(&local_ray, length) else {
                continue;
            };
            if best.as_ref().is_some_and(|(distance, _)| hit.distance >= *distance) {
                continue;
            }
            best = Some((
                hit.distance,
                RayResult {
                    position: transform.transform_point(hit.position),
                    normal: transform.transform_vector(hit.normal),
                    collider: owner.object,
                    collider_instance_id: object.instance_id,
                    shape: owner.subindex,
                },
            ));
        }
        best.map(|(_, result)| result)
    }

    /// Collect up to `max_results` shapes overlapping `shape` placed at `transform`
    pub fn intersect_shape(
        &self,
        shape: &Shape,
        transform: &Transform,
        margin: f32,
        results: &mut Vec<ShapeResult>,
        max_results: usize,
        filter: &QueryFilter,
    ) -> usize {
        results.clear();
        let max_results = max_results.min(INTERSECTION_QUERY_MAX);
        if max_results == 0 {
            return 0;
        }

        let query = PlacedShape::new(shape, *transform).with_margin(margin);
        let aabb = shape.world_aabb(transform).grown(margin);
        for owner in &self.cull_aabb(&aabb) {
            let Some(object) = self.accepted(owner, filter) else {
                continue;
            };
            let Some(other) = object.placed_shape(owner.subindex) else {
                continue;
            };
            if !narrow_phase::intersects(&query, &other) {
                continue;
            }
            results.push(ShapeResult {
                collider: owner.object,
                collider_instance_id: object.instance_id,
                shape: owner.subindex,
            });
            if results.len() >= max_results {
                break;
            }
        }
        results.len()
    }

    /// How far `shape` can travel along `motion` before touching anything.
    ///
    /// Returns `None` when nothing blocks the whole motion. A shape that
    /// already overlaps something at the start is stuck: both fractions are 0.
    pub fn cast_motion(
        &self,
        shape: &Shape,
        transform: &Transform,
        motion: Vec3,
        margin: f32,
        filter: &QueryFilter,
    ) -> Option<MotionCast> {
        let start_aabb = shape.world_aabb(transform);
        let aabb = start_aabb.swept(motion).grown(margin);
        let query = PlacedShape::new(shape, *transform).with_margin(margin);
        let motion_length = motion.length();

        let mut best: Option<MotionCast> = None;
        for owner in &self.cull_aabb(&aabb) {
            let Some(object) = self.accepted(owner, filter) else {
                continue;
            };
            let Some(other) = object.placed_shape(owner.subindex) else {
                continue;
            };
            if !narrow_phase::intersects_swept(&query, motion, &other) {
                continue;
            }
            if narrow_phase::intersects(&query, &other) {
                trace!(collider = ?owner.object, "Motion cast stuck at start");
                return Some(MotionCast {
                    closest_safe: 0.0,
                    closest_unsafe: 0.0,
                });
            }

            let (safe, unsafe_fraction) = bisect_motion(motion_length, |fraction| {
                narrow_phase::intersects_swept(&query, motion * fraction, &other)
            });
            if best.map_or(true, |best| safe < best.closest_safe) {
                best = Some(MotionCast {
                    closest_safe: safe,
                    closest_unsafe: unsafe_fraction,
                });
            }
        }
        trace!(motion = ?motion, result = ?best, "Motion cast");
        best
    }

    /// Contact point pairs between `shape` and everything it overlaps.
    ///
    /// Each pair is pushed as `(point on shape, point on collider)`; at most
    /// `max_pairs` pairs are collected. Returns the number of pairs.
    pub fn collide_shape(
        &self,
        shape: &Shape,
        transform: &Transform,
        margin: f32,
        results: &mut Vec<(Vec3, Vec3)>,
        max_pairs: usize,
        filter: &QueryFilter,
    ) -> usize {
        results.clear();
        let max_pairs = max_pairs.min(INTERSECTION_QUERY_MAX);
        if max_pairs == 0 {
            return 0;
        }

        let query = PlacedShape::new(shape, *transform).with_margin(margin);
        let aabb = shape.world_aabb(transform).grown(margin);
        let mut manifold = ContactManifold::new();
        'candidates: for owner in &self.cull_aabb(&aabb) {
            let Some(object) = self.accepted(owner, filter) else {
                continue;
            };
            let Some(other) = object.placed_shape(owner.subindex) else {
                continue;
            };
            if !narrow_phase::collide(&query, &other, 0.0, &mut manifold) {
                continue;
            }
            for contact in manifold.as_slice() {
                results.push((contact.point_a, contact.point_b));
                if results.len() >= max_pairs {
                    break 'candidates;
                }
            }
        }
        results.len()
    }

    /// The deepest contact of `shape` resting at `transform`, if it touches anything
    pub fn rest_info(
        &self,
        shape: &Shape,
        transform: &Transform,
        margin: f32,
        filter: &QueryFilter,
    ) -> Option<ShapeRestInfo> {
        let query = PlacedShape::new(shape, *transform).with_margin(margin);
        let aabb = shape.world_aabb(transform).grown(margin);
        let min_depth = self.space.params().test_motion_min_contact_depth;
        self.deepest_contact(&query, &aabb, min_depth, filter)
    }

    /// Deepest contact at least `min_depth` deep of `query` against the accepted candidates in `aabb`
    pub(crate) fn deepest_contact(
        &self,
        query: &PlacedShape,
        aabb: &AABB,
        min_depth: f32,
        filter: &QueryFilter,
    ) -> Option<ShapeRestInfo> {
        let mut manifold = ContactManifold::new();
        let mut best: Option<ShapeRestInfo> = None;

        for owner in &self.cull_aabb(aabb) {
            let Some(object) = self.accepted(owner, filter) else {
                continue;
            };
            let Some(other) = object.placed_shape(owner.subindex) else {
                continue;
            };
            if !narrow_phase::collide(query, &other, 0.0, &mut manifold) {
                continue;
            }
            for contact in manifold.as_slice() {
                if contact.depth < min_depth {
                    continue;
                }
                if best.is_some_and(|best| contact.depth <= best.depth) {
                    continue;
                }
                let point = contact.point_b;
                best = Some(ShapeRestInfo {
                    point,
                    normal: -contact.normal,
                    depth: contact.depth,
                    collider: owner.object,
                    collider_instance_id: object.instance_id,
                    shape: owner.subindex,
                    linear_velocity: object.velocity_at(point, object.transform().position),
                });
            }
        }
        best
    }

    /// Closest point to `point` on or inside the enabled shapes of `object`.
    ///
    /// An object without enabled shapes answers with its origin. Returns
    /// `None` if the object is not registered with this space.
    pub fn closest_point_to_object_volume(&self, object: ObjectId, point: Vec3) -> Option<Vec3> {
        let object = self.object(object)?;

        let mut closest: Option<(f32, Vec3)> = None;
        for index in object.enabled_shapes() {
            let (Some(instance), Some(transform)) =
                (object.shape(index), object.shape_world_transform(index))
            else {
                continue;
            };
            let local = instance
                .shape
                .closest_point(transform.inverse_transform_point(point));
            let candidate = transform.transform_point(local);
            let distance = candidate.distance_squared(point);
            if closest.map_or(true, |(best, _)| distance < best) {
                closest = Some((distance, candidate));
            }
        }

        Some(closest.map_or(object.transform().position, |(_, candidate)| candidate))
    }
}
