//! Swept body motion: depenetration, casting and rest contact

use super::{DirectSpaceState, QueryFilter, ShapeRestInfo};
use crate::collision::narrow_phase::{self, PlacedShape};
use crate::collision::ContactManifold;
use crate::error::SpaceError;
use crate::math::Transform;
use crate::object::{CollisionObject, ObjectId};
use glam::Vec3;
use std::collections::BTreeSet;
use tracing::{debug, error, trace};

/// Most bisection steps of a single motion cast
pub const CAST_MOTION_MAX_ITERATIONS: usize = 24;

/// Bisection stops once the bracket is this short along the motion
pub const CAST_MOTION_EPSILON: f32 = 1.0e-4;

const RECOVER_MAX_ITERATIONS: usize = 4;
const RECOVER_RATIO: f32 = 0.4;
const RECOVER_FINAL_ITERATIONS: usize = 4;

/// Bracket the first touching fraction of a motion.
///
/// `hits(fraction)` must be false at 0 and true at 1. Returns the
/// `(safe, unsafe)` fractions around the first contact. Repeated hits with
/// nothing free found yet converge faster toward the start, repeated misses
/// toward the end; once both sides are known it is a plain bisection.
pub(crate) fn bisect_motion(motion_length: f32, mut hits: impl FnMut(f32) -> bool) -> (f32, f32) {
    let mut low = 0.0f32;
    let mut high = 1.0f32;
    let mut coefficient = 0.5f32;

    for iteration in 0..CAST_MOTION_MAX_ITERATIONS {
        if (high - low) * motion_length <= CAST_MOTION_EPSILON {
            break;
        }
        let fraction = low + (high - low) * coefficient;
        if hits(fraction) {
            high = fraction;
            coefficient = if iteration == 0 || low > 0.0 { 0.5 } else { 0.25 };
        } else {
            low = fraction;
            coefficient = if iteration == 0 || high < 1.0 { 0.5 } else { 0.75 };
        }
    }
    (low, high)
}

/// Contact reported at the end of a blocked body motion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionCollision {
    /// Point on the collider
    pub point: Vec3,
    /// Points from the collider toward the moving body
    pub normal: Vec3,
    pub depth: f32,
    pub collider_velocity: Vec3,
    pub collider: ObjectId,
    pub collider_instance_id: u64,
    pub collider_shape: usize,
    /// Shape of the moving body that made contact
    pub local_shape: usize,
}

/// Outcome of [`DirectSpaceState::test_body_motion`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionResult {
    /// Displacement actually applied, depenetration included
    pub travel: Vec3,
    /// Part of the requested motion that was not travelled
    pub remainder: Vec3,
    pub body_transform: Transform,
    pub safe_fraction: f32,
    pub unsafe_fraction: f32,
    pub collision: Option<MotionCollision>,
}

impl MotionResult {
    pub fn is_blocked(&self) -> bool {
        self.safe_fraction < 1.0
    }
}

impl<'a> DirectSpaceState<'a> {
    /// Move `body`'s shapes from `from` along `motion` and report where they stop.
    ///
    /// The body is first pushed out of anything it overlaps, then each
    /// enabled shape is cast along the motion. Separation ray shapes only take
    /// part when `collide_separation_ray` is set. A body stuck at the start
    /// travels nothing and keeps the (depenetrated) starting transform.
    pub fn test_body_motion(
        &self,
        body: ObjectId,
        from: &Transform,
        motion: Vec3,
        margin: f32,
        exclude: &BTreeSet<ObjectId>,
        collide_separation_ray: bool,
    ) -> Result<MotionResult, SpaceError> {
        let Some(object) = self.object(body) else {
            error!(body = ?body, "test_body_motion on an object outside this space");
            return Err(SpaceError::UnknownObject(body));
        };
        let Some(rigid) = object.body() else {
            error!(body = ?body, kind = object.kind().name(), "test_body_motion needs a rigid body");
            return Err(SpaceError::WrongObjectKind {
                id: body,
                expected: "rigid body",
            });
        };

        let mut filter = QueryFilter::new().with_mask(object.collision_mask);
        filter.exclude.extend(exclude.iter().copied());
        filter.exclude.insert(body);
        filter.exclude.extend(rigid.exceptions.iter().copied());

        let shapes: Vec<usize> = object
            .enabled_shapes()
            .filter(|&index| {
                collide_separation_ray
                    || object
                        .shape(index)
                        .is_some_and(|instance| !instance.shape.is_separation_ray())
            })
            .collect();

        let min_contact_depth = self
            .space
            .params()
            .test_motion_min_contact_depth
            .max(margin * 0.05);

        let recovery =
            self.recover_from_penetration(object, &shapes, from, margin, min_contact_depth, &filter);
        let start = from.translated(recovery);

        let motion_length = motion.length();
        let (safe, unsafe_fraction, best_shape) = if motion_length > f32::EPSILON {
            self.cast_body_shapes(object, &shapes, &start, motion, &filter)
        } else {
            (1.0, 1.0, None)
        };

        let mut collision = None;
        if recovery != Vec3::ZERO || safe < 1.0 {
            let contact_transform = start.translated(motion * unsafe_fraction);
            let min_allowed_depth = motion_length.min(min_contact_depth);
            let candidates: Vec<usize> = match best_shape {
                Some(index) => vec![index],
                None => shapes.clone(),
            };
            collision = self.body_rest_contact(
                object,
                &candidates,
                &contact_transform,
                margin,
                min_allowed_depth,
                &filter,
            );
        }

        let travel = motion * safe + recovery;
        let result = MotionResult {
            travel,
            remainder: motion * (1.0 - safe),
            body_transform: from.translated(travel),
            safe_fraction: safe,
            unsafe_fraction,
            collision,
        };
        trace!(
            body = ?body,
            safe,
            unsafe_fraction,
            colliding = result.collision.is_some(),
            "Body motion tested"
        );
        Ok(result)
    }

    /// Total offset that pushes `object`'s shapes at `from` out of their overlaps.
    ///
    /// Soft passes move a fraction of the way out. If the body is still deeper
    /// than the allowed penetration afterwards, full passes finish the job.
    fn recover_from_penetration(
        &self,
        object: &CollisionObject,
        shapes: &[usize],
        from: &Transform,
        margin: f32,
        min_contact_depth: f32,
        filter: &QueryFilter,
    ) -> Vec3 {
        let max_allowed = self.space.params().contact_max_allowed_penetration;
        let mut manifold = ContactManifold::new();
        let mut total = Vec3::ZERO;

        for iteration in 0..RECOVER_MAX_ITERATIONS {
            let transform = from.translated(total);
            let (recover, _) = self.recovery_pass(
                object,
                shapes,
                &transform,
                margin,
                min_contact_depth,
                RECOVER_RATIO,
                filter,
                &mut manifold,
            );
            if recover == Vec3::ZERO {
                return total;
            }
            total += recover;
            debug!(iteration, recover = ?recover, "Recovering from penetration");
        }

        let target = min_contact_depth.min(max_allowed);
        for iteration in 0..RECOVER_FINAL_ITERATIONS {
            let transform = from.translated(total);
            let (recover, deepest) = self.recovery_pass(
                object,
                shapes,
                &transform,
                margin,
                target,
                1.0,
                filter,
                &mut manifold,
            );
            if deepest <= max_allowed || recover == Vec3::ZERO {
                break;
            }
            total += recover;
            debug!(iteration, deepest, recover = ?recover, "Forcing body out of deep penetration");
        }
        total
    }

    /// One depenetration pass at `transform`. Returns the offset and the
    /// deepest contact found before correcting it.
    #[allow(clippy::too_many_arguments)]
    fn recovery_pass(
        &self,
        object: &CollisionObject,
        shapes: &[usize],
        transform: &Transform,
        margin: f32,
        target_depth: f32,
        ratio: f32,
        filter: &QueryFilter,
        manifold: &mut ContactManifold,
    ) -> (Vec3, f32) {
        let mut recover = Vec3::ZERO;
        let mut deepest = 0.0f32;

        for &index in shapes {
            let Some(instance) = object.shape(index) else {
                continue;
            };
            let shape_transform = transform.mul_transform(&instance.local_transform);
            let query = PlacedShape::new(&instance.shape, shape_transform).with_margin(margin);
            let aabb = instance.shape.world_aabb(&shape_transform).grown(margin);

            for owner in &self.cull_aabb(&aabb) {
                let Some(other) = self
                    .accepted(owner, filter)
                    .and_then(|other| other.placed_shape(owner.subindex))
                else {
                    continue;
                };
                if !narrow_phase::collide(&query, &other, 0.0, manifold) {
                    continue;
                }
                for contact in manifold.as_slice() {
                    let normal = (contact.point_a - contact.point_b).normalize_or_zero();
                    if normal == Vec3::ZERO {
                        continue;
                    }
                    deepest = deepest.max(contact.depth);
                    let depth = normal.dot(contact.point_a + recover) - normal.dot(contact.point_b);
                    if depth > target_depth {
                        recover -= normal * (depth - target_depth) * ratio;
                    }
                }
            }
        }
        (recover, deepest)
    }

    /// Cast every shape along `motion`; returns the tightest fractions and the shape that produced them
    fn cast_body_shapes(
        &self,
        object: &CollisionObject,
        shapes: &[usize],
        start: &Transform,
        motion: Vec3,
        filter: &QueryFilter,
    ) -> (f32, f32, Option<usize>) {
        let motion_length = motion.length();
        let mut safe = 1.0f32;
        let mut unsafe_fraction = 1.0f32;
        let mut best_shape = None;

        for &index in shapes {
            let Some(instance) = object.shape(index) else {
                continue;
            };
            let shape_transform = start.mul_transform(&instance.local_transform);
            let query = PlacedShape::new(&instance.shape, shape_transform);
            let aabb = instance.shape.world_aabb(&shape_transform).swept(motion);

            let mut shape_safe = 1.0f32;
            let mut shape_unsafe = 1.0f32;
            for owner in &self.cull_aabb(&aabb) {
                let Some(other) = self
                    .accepted(owner, filter)
                    .and_then(|other| other.placed_shape(owner.subindex))
                else {
                    continue;
                };
                if !narrow_phase::intersects_swept(&query, motion, &other) {
                    continue;
                }
                if narrow_phase::intersects(&query, &other) {
                    shape_safe = 0.0;
                    shape_unsafe = 0.0;
                    break;
                }
                let (low, high) = bisect_motion(motion_length, |fraction| {
                    narrow_phase::intersects_swept(&query, motion * fraction, &other)
                });
                if low < shape_safe {
                    shape_safe = low;
                    shape_unsafe = high;
                }
            }

            if shape_safe < safe {
                safe = shape_safe;
                unsafe_fraction = shape_unsafe;
                best_shape = Some(index);
            }
            if safe == 0.0 {
                break;
            }
        }
        (safe, unsafe_fraction, best_shape)
    }

    /// Deepest contact of the given body shapes placed at `transform`
    fn body_rest_contact(
        &self,
        object: &CollisionObject,
        shapes: &[usize],
        transform: &Transform,
        margin: f32,
        min_depth: f32,
        filter: &QueryFilter,
    ) -> Option<MotionCollision> {
        let mut best: Option<(ShapeRestInfo, usize)> = None;
        for &index in shapes {
            let Some(instance) = object.shape(index) else {
                continue;
            };
            let shape_transform = transform.mul_transform(&instance.local_transform);
            let query = PlacedShape::new(&instance.shape, shape_transform).with_margin(margin);
            let aabb = instance.shape.world_aabb(&shape_transform).grown(margin);
            let Some(info) = self.deepest_contact(&query, &aabb, min_depth, filter) else {
                continue;
            };
            if best.map_or(true, |(current, _)| info.depth > current.depth) {
                best = Some((info, index));
            }
        }

        best.map(|(info, local_shape)| MotionCollision {
            point: info.point,
            normal: info.normal,
            depth: info.depth,
            collider_velocity: info.linear_velocity,
            collider: info.collider,
            collider_instance_id: info.collider_instance_id,
            collider_shape: info.shape,
            local_shape,
        })
    }
}
