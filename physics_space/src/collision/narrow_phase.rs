//! Narrow phase collision detection for generating contact points

use super::gjk::{self, ConvexProxy};
use super::shapes::{Ray, Shape};
use super::{ContactManifold, ContactPoint};
use crate::math::Transform;
use glam::Vec3;

/// A shape placed in the world with a collision margin
#[derive(Debug, Clone, Copy)]
pub struct PlacedShape<'a> {
    pub shape: &'a Shape,
    pub transform: Transform,
    pub margin: f32,
}

impl<'a> PlacedShape<'a> {
    pub fn new(shape: &'a Shape, transform: Transform) -> Self {
        Self {
            shape,
            transform,
            margin: 0.0,
        }
    }

    pub fn with_margin(mut self, margin: f32) -> Self {
        self.margin = margin;
        self
    }
}

/// Generate contacts between two placed shapes.
///
/// Points are reported on the margin-inflated surfaces with the normal
/// pointing from A to B. Pairs separated by up to `max_separation` still
/// produce (negative depth) contacts. Returns true if any contact was kept.
pub fn collide(
    a: &PlacedShape,
    b: &PlacedShape,
    max_separation: f32,
    manifold: &mut ContactManifold,
) -> bool {
    manifold.clear();

    let mut raw = ContactManifold::new();
    let slack = a.margin + b.margin + max_separation;
    generate(a, b, slack, &mut raw);

    for contact in raw.as_slice() {
        let inflated = ContactPoint::new(
            contact.point_a + contact.normal * a.margin,
            contact.point_b - contact.normal * b.margin,
            contact.normal,
        );
        if inflated.depth >= -max_separation {
            manifold.push(inflated);
        }
    }

    !manifold.is_empty()
}

/// True if the two placed shapes touch or overlap (margins included)
pub fn intersects(a: &PlacedShape, b: &PlacedShape) -> bool {
    let mut manifold = ContactManifold::new();
    collide(a, b, 0.0, &mut manifold)
}

/// True if `a`, swept along `motion`, touches `b` anywhere along the way
pub fn intersects_swept(a: &PlacedShape, motion: Vec3, b: &PlacedShape) -> bool {
    match (a.shape, b.shape) {
        (Shape::WorldBoundary { .. }, Shape::WorldBoundary { .. }) => false,
        (_, Shape::WorldBoundary { normal, distance }) => {
            let (plane_normal, plane_distance) = world_plane(*normal, *distance, &b.transform);
            let lowest = a.shape.world_support(-plane_normal, &a.transform) - plane_normal * a.margin;
            let start = plane_normal.dot(lowest);
            let end = plane_normal.dot(lowest + motion);
            start.min(end) - plane_distance - b.margin <= 0.0
        }
        (Shape::WorldBoundary { .. }, _) => intersects_swept(b, -motion, a),
        _ => {
            let moving = ConvexProxy::new(a.shape, a.transform, a.margin).swept(motion);
            let fixed = ConvexProxy::new(b.shape, b.transform, b.margin);
            gjk::intersects(&moving, &fixed)
        }
    }
}

/// Dispatch to the pair routine; contacts are raw (no margins applied)
fn generate(a: &PlacedShape, b: &PlacedShape, slack: f32, out: &mut ContactManifold) {
    match (a.shape, b.shape) {
        (Shape::SeparationRay { .. }, Shape::SeparationRay { .. }) => {}
        (Shape::SeparationRay { length }, _) => {
            separation_ray_collision(&a.transform, *length, b, slack, out)
        }
        (_, Shape::SeparationRay { .. }) => generate_flipped(a, b, slack, out),
        (Shape::WorldBoundary { .. }, Shape::WorldBoundary { .. }) => {}
        (_, Shape::WorldBoundary { normal, distance }) => {
            convex_plane_collision(a, *normal, *distance, &b.transform, slack, out)
        }
        (Shape::WorldBoundary { .. }, _) => generate_flipped(a, b, slack, out),
        (Shape::Sphere { radius: radius_a }, Shape::Sphere { radius: radius_b }) => {
            if let Some(contact) = sphere_sphere_collision(
                a.transform.position,
                *radius_a,
                b.transform.position,
                *radius_b,
                slack,
            ) {
                out.push(contact);
            }
        }
        (Shape::Sphere { radius }, Shape::Box { half_extents }) => {
            if let Some(contact) = sphere_box_collision(
                a.transform.position,
                *radius,
                &b.transform,
                *half_extents,
                slack,
            ) {
                out.push(contact);
            }
        }
        (Shape::Box { .. }, Shape::Sphere { .. }) => generate_flipped(a, b, slack, out),
        (
            Shape::Sphere { radius },
            Shape::Capsule {
                radius: capsule_radius,
                half_height,
            },
        ) => {
            let (top, bottom) = capsule_segment(&b.transform, *half_height);
            let center = a.transform.position;
            let core = closest_on_segment(top, bottom, center);
            if let Some(contact) =
                sphere_sphere_collision(center, *radius, core, *capsule_radius, slack)
            {
                out.push(contact);
            }
        }
        (Shape::Capsule { .. }, Shape::Sphere { .. }) => generate_flipped(a, b, slack, out),
        (
            Shape::Capsule {
                radius: radius_a,
                half_height: half_height_a,
            },
            Shape::Capsule {
                radius: radius_b,
                half_height: half_height_b,
            },
        ) => {
            let (top_a, bottom_a) = capsule_segment(&a.transform, *half_height_a);
            let (top_b, bottom_b) = capsule_segment(&b.transform, *half_height_b);
            let (core_a, core_b) = closest_points_segments(top_a, bottom_a, top_b, bottom_b);
            if let Some(contact) = sphere_sphere_collision(core_a, *radius_a, core_b, *radius_b, slack)
            {
                out.push(contact);
            }
        }
        (
            Shape::Capsule {
                radius,
                half_height,
            },
            Shape::Box { half_extents },
        ) => capsule_box_collision(
            &a.transform,
            *radius,
            *half_height,
            &b.transform,
            *half_extents,
            slack,
            out,
        ),
        (Shape::Box { .. }, Shape::Capsule { .. }) => generate_flipped(a, b, slack, out),
        (
            Shape::Box {
                half_extents: extents_a,
            },
            Shape::Box {
                half_extents: extents_b,
            },
        ) => box_box_collision(&a.transform, *extents_a, &b.transform, *extents_b, slack, out),
    }
}

fn generate_flipped(a: &PlacedShape, b: &PlacedShape, slack: f32, out: &mut ContactManifold) {
    let mut swapped = ContactManifold::new();
    generate(b, a, slack, &mut swapped);
    swapped.flip();
    for contact in swapped.as_slice() {
        out.push(*contact);
    }
}

/// Test for contact between two spheres
fn sphere_sphere_collision(
    pos_a: Vec3,
    radius_a: f32,
    pos_b: Vec3,
    radius_b: f32,
    slack: f32,
) -> Option<ContactPoint> {
    let delta = pos_b - pos_a;
    let distance_sq = delta.length_squared();
    let reach = radius_a + radius_b + slack;

    if distance_sq > reach * reach {
        return None;
    }

    let distance = distance_sq.sqrt();
    let normal = if distance > 0.0 {
        delta / distance
    } else {
        // Spheres are at the same position, use arbitrary normal
        Vec3::Y
    };

    Some(ContactPoint::new(
        pos_a + normal * radius_a,
        pos_b - normal * radius_b,
        normal,
    ))
}

/// Test for contact between a sphere (A) and a box (B)
fn sphere_box_collision(
    sphere_pos: Vec3,
    sphere_radius: f32,
    box_transform: &Transform,
    box_half_extents: Vec3,
    slack: f32,
) -> Option<ContactPoint> {
    // Transform sphere to box's local space
    let local_sphere_pos = box_transform.inverse_transform_point(sphere_pos);
    let closest = local_sphere_pos.clamp(-box_half_extents, box_half_extents);

    let delta = local_sphere_pos - closest;
    let distance_sq = delta.length_squared();
    let reach = sphere_radius + slack;

    if distance_sq > reach * reach {
        return None;
    }

    let distance = distance_sq.sqrt();
    let (outward, surface) = if distance > 0.0 {
        (delta / distance, closest)
    } else {
        // Sphere center is inside box, push out through the closest face
        let face_distances = [
            box_half_extents.x - local_sphere_pos.x.abs(),
            box_half_extents.y - local_sphere_pos.y.abs(),
            box_half_extents.z - local_sphere_pos.z.abs(),
        ];
        let mut axis = 0;
        for i in 1..3 {
            if face_distances[i] < face_distances[axis] {
                axis = i;
            }
        }
        let sign = if local_sphere_pos[axis] < 0.0 { -1.0 } else { 1.0 };
        let mut outward = Vec3::ZERO;
        outward[axis] = sign;
        let mut surface = local_sphere_pos;
        surface[axis] = box_half_extents[axis] * sign;
        (outward, surface)
    };

    // Normal points from the sphere into the box
    let normal = -box_transform.transform_vector(outward);
    Some(ContactPoint::new(
        sphere_pos + normal * sphere_radius,
        box_transform.transform_point(surface),
        normal,
    ))
}

fn capsule_box_collision(
    capsule_transform: &Transform,
    radius: f32,
    half_height: f32,
    box_transform: &Transform,
    half_extents: Vec3,
    slack: f32,
    out: &mut ContactManifold,
) {
    let (top, bottom) = capsule_segment(capsule_transform, half_height);

    for end in [top, bottom] {
        if let Some(contact) = sphere_box_collision(end, radius, box_transform, half_extents, slack)
        {
            out.push(contact);
        }
    }
    if !out.is_empty() {
        return;
    }

    // The segment may cross the box between its ends: alternate projections
    let mut core = closest_on_segment(top, bottom, box_transform.position);
    for _ in 0..4 {
        let local = box_transform.inverse_transform_point(core);
        let on_box = box_transform.transform_point(local.clamp(-half_extents, half_extents));
        core = closest_on_segment(top, bottom, on_box);
    }
    if let Some(contact) = sphere_box_collision(core, radius, box_transform, half_extents, slack) {
        out.push(contact);
    }
}

/// Test for contact between two boxes using SAT (Separating Axis Theorem)
fn box_box_collision(
    transform_a: &Transform,
    extents_a: Vec3,
    transform_b: &Transform,
    extents_b: Vec3,
    slack: f32,
    out: &mut ContactManifold,
) {
    let rot_a = transform_a.rotation;
    let rot_b = transform_b.rotation;
    let axes_a = [rot_a * Vec3::X, rot_a * Vec3::Y, rot_a * Vec3::Z];
    let axes_b = [rot_b * Vec3::X, rot_b * Vec3::Y, rot_b * Vec3::Z];

    let center_delta = transform_b.position - transform_a.position;

    let mut min_penetration = f32::MAX;
    let mut best_axis = Vec3::ZERO;

    let mut candidates: Vec<Vec3> = Vec::with_capacity(15);
    candidates.extend_from_slice(&axes_a);
    candidates.extend_from_slice(&axes_b);
    for axis_a in &axes_a {
        for axis_b in &axes_b {
            let axis = axis_a.cross(*axis_b);
            if axis.length_squared() < 1e-6 {
                continue; // Parallel edges
            }
            candidates.push(axis.normalize());
        }
    }

    for axis in candidates {
        let Some((penetration, flip)) = test_separation_axis(
            &axis,
            center_delta,
            extents_a,
            extents_b,
            &axes_a,
            &axes_b,
            slack,
        ) else {
            return;
        };

        if penetration < min_penetration {
            min_penetration = penetration;
            best_axis = if flip { -axis } else { axis };
        }
    }

    let normal = best_axis;
    let top_a = normal.dot(transform_a.position) + project_radius(&normal, extents_a, &axes_a);
    let bottom_b = normal.dot(transform_b.position) - project_radius(&normal, extents_b, &axes_b);
    let tolerance = slack + 1e-4;

    // Corners of B below A's supporting plane and inside A
    for corner in box_corners(transform_b, extents_b) {
        let depth = top_a - normal.dot(corner);
        if depth >= -slack && box_contains(transform_a, extents_a, corner, tolerance) {
            out.push(ContactPoint {
                point_a: corner + normal * depth,
                point_b: corner,
                normal,
                depth,
            });
        }
    }

    // Corners of A above B's supporting plane and inside B
    for corner in box_corners(transform_a, extents_a) {
        let depth = normal.dot(corner) - bottom_b;
        if depth >= -slack && box_contains(transform_b, extents_b, corner, tolerance) {
            out.push(ContactPoint {
                point_a: corner,
                point_b: corner - normal * depth,
                normal,
                depth,
            });
        }
    }

    if out.is_empty() {
        // Edge-edge: use the deepest support points of each box
        let support_a = get_box_support_point(transform_a.position, &axes_a, extents_a, normal);
        let support_b = get_box_support_point(transform_b.position, &axes_b, extents_b, -normal);
        out.push(ContactPoint::new(support_a, support_b, normal));
    }
}

/// Test a separation axis for the SAT algorithm
fn test_separation_axis(
    axis: &Vec3,
    center_delta: Vec3,
    extents_a: Vec3,
    extents_b: Vec3,
    axes_a: &[Vec3; 3],
    axes_b: &[Vec3; 3],
    slack: f32,
) -> Option<(f32, bool)> {
    let separation = center_delta.dot(*axis);

    let radius_a = project_radius(axis, extents_a, axes_a);
    let radius_b = project_radius(axis, extents_b, axes_b);

    let penetration = radius_a + radius_b - separation.abs();

    if penetration < -slack {
        None // Separated along this axis
    } else {
        Some((penetration, separation < 0.0))
    }
}

/// Half length of a box's projection onto `axis`
fn project_radius(axis: &Vec3, extents: Vec3, axes: &[Vec3; 3]) -> f32 {
    extents.x * axes[0].dot(*axis).abs()
        + extents.y * axes[1].dot(*axis).abs()
        + extents.z * axes[2].dot(*axis).abs()
}

/// Get the support point of a box in a given direction
fn get_box_support_point(center: Vec3, axes: &[Vec3; 3], extents: Vec3, direction: Vec3) -> Vec3 {
    let mut support = center;

    for (i, &axis) in axes.iter().enumerate() {
        if axis.dot(direction) > 0.0 {
            support += axis * extents[i];
        } else {
            support -= axis * extents[i];
        }
    }

    support
}

fn box_corners(transform: &Transform, extents: Vec3) -> [Vec3; 8] {
    let mut corners = [Vec3::ZERO; 8];
    for (i, corner) in corners.iter_mut().enumerate() {
        let local = Vec3::new(
            if i & 1 == 0 { -extents.x } else { extents.x },
            if i & 2 == 0 { -extents.y } else { extents.y },
            if i & 4 == 0 { -extents.z } else { extents.z },
        );
        *corner = transform.transform_point(local);
    }
    corners
}

fn box_contains(transform: &Transform, extents: Vec3, point: Vec3, tolerance: f32) -> bool {
    let local = transform.inverse_transform_point(point);
    local.abs().cmple(extents + Vec3::splat(tolerance)).all()
}

/// Convex shape (A) against an infinite plane (B)
fn convex_plane_collision(
    a: &PlacedShape,
    normal: Vec3,
    distance: f32,
    plane_transform: &Transform,
    slack: f32,
    out: &mut ContactManifold,
) {
    let (plane_normal, plane_distance) = world_plane(normal, distance, plane_transform);

    let mut test_feature = |center: Vec3, radius: f32| {
        let surface = center - plane_normal * radius;
        let height = plane_normal.dot(surface) - plane_distance;
        if -height >= -slack {
            out.push(ContactPoint::new(
                surface,
                surface - plane_normal * height,
                -plane_normal,
            ));
        }
    };

    match a.shape {
        Shape::Sphere { radius } => test_feature(a.transform.position, *radius),
        Shape::Capsule {
            radius,
            half_height,
        } => {
            let (top, bottom) = capsule_segment(&a.transform, *half_height);
            test_feature(top, *radius);
            test_feature(bottom, *radius);
        }
        Shape::Box { half_extents } => {
            for corner in box_corners(&a.transform, *half_extents) {
                test_feature(corner, 0.0);
            }
        }
        Shape::WorldBoundary { .. } | Shape::SeparationRay { .. } => {}
    }
}

/// Separation ray (A) cast into shape B; depth is how far the ray end lies past the hit
fn separation_ray_collision(
    ray_transform: &Transform,
    length: f32,
    b: &PlacedShape,
    slack: f32,
    out: &mut ContactManifold,
) {
    let origin = ray_transform.position;
    let direction = ray_transform.transform_vector(Vec3::Z).normalize_or_zero();
    if direction == Vec3::ZERO {
        return;
    }

    let local_ray = Ray {
        origin: b.transform.inverse_transform_point(origin),
        direction: b.transform.inverse_transform_vector(direction),
    };
    if let Some(hit) = b.shape.raycast(&local_ray, length + slack) {
        let end = origin + direction * length;
        out.push(ContactPoint::new(
            end,
            b.transform.transform_point(hit.position),
            direction,
        ));
    }
}

/// Plane normal and offset in world space
pub(crate) fn world_plane(normal: Vec3, distance: f32, transform: &Transform) -> (Vec3, f32) {
    let world_normal = transform.transform_vector(normal).normalize_or_zero();
    (world_normal, distance + world_normal.dot(transform.position))
}

fn capsule_segment(transform: &Transform, half_height: f32) -> (Vec3, Vec3) {
    (
        transform.transform_point(Vec3::new(0.0, half_height, 0.0)),
        transform.transform_point(Vec3::new(0.0, -half_height, 0.0)),
    )
}

/// Closest point on segment `a..b` to `point`
fn closest_on_segment(a: Vec3, b: Vec3, point: Vec3) -> Vec3 {
    let ab = b - a;
    let length_sq = ab.length_squared();
    if length_sq <= f32::EPSILON {
        return a;
    }
    let t = ((point - a).dot(ab) / length_sq).clamp(0.0, 1.0);
    a + ab * t
}

/// Closest points between segments `p1..q1` and `p2..q2`
fn closest_points_segments(p1: Vec3, q1: Vec3, p2: Vec3, q2: Vec3) -> (Vec3, Vec3) {
    let d1 = q1 - p1;
    let d2 = q2 - p2;
    let r = p1 - p2;
    let a = d1.length_squared();
    let e = d2.length_squared();
    let f = d2.dot(r);

    if a <= f32::EPSILON && e <= f32::EPSILON {
        return (p1, p2);
    }

    let (s, t) = if a <= f32::EPSILON {
        (0.0, (f / e).clamp(0.0, 1.0))
    } else {
        let c = d1.dot(r);
        if e <= f32::EPSILON {
            ((-c / a).clamp(0.0, 1.0), 0.0)
        } else {
            let b = d1.dot(d2);
            let denom = a * e - b * b;
            let mut s = if denom > f32::EPSILON {
                ((b * f - c * e) / denom).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let mut t = (b * s + f) / e;
            if t < 0.0 {
                t = 0.0;
                s = (-c / a).clamp(0.0, 1.0);
            } else if t > 1.0 {
                t = 1.0;
                s = ((b - c) / a).clamp(0.0, 1.0);
            }
            (s, t)
        }
    };

    (p1 + d1 * s, p2 + d2 * t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    fn placed(shape: &Shape, position: Vec3) -> PlacedShape<'_> {
        PlacedShape::new(shape, Transform::from_position(position))
    }

    #[test]
    fn test_sphere_sphere_normal_points_from_a_to_b() {
        let sphere = Shape::Sphere { radius: 1.0 };
        let mut manifold = ContactManifold::new();
        assert!(collide(
            &placed(&sphere, Vec3::ZERO),
            &placed(&sphere, Vec3::new(1.5, 0.0, 0.0)),
            0.0,
            &mut manifold
        ));
        let contact = manifold.as_slice()[0];
        assert!((contact.normal - Vec3::X).length() < 1e-6);
        assert!((contact.depth - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_sphere_box_flipped_keeps_orientation() {
        let sphere = Shape::Sphere { radius: 0.5 };
        let cube = Shape::Box {
            half_extents: Vec3::ONE,
        };
        let mut manifold = ContactManifold::new();
        assert!(collide(
            &placed(&cube, Vec3::ZERO),
            &placed(&sphere, Vec3::new(0.0, 1.25, 0.0)),
            0.0,
            &mut manifold
        ));
        let contact = manifold.as_slice()[0];
        assert!((contact.normal - Vec3::Y).length() < 1e-5);
        assert!((contact.depth - 0.25).abs() < 1e-5);
    }

    #[test]
    fn test_box_resting_on_plane_yields_four_points() {
        let cube = Shape::Box {
            half_extents: Vec3::splat(0.5),
        };
        let plane = Shape::WorldBoundary {
            normal: Vec3::Y,
            distance: 0.0,
        };
        let mut manifold = ContactManifold::new();
        assert!(collide(
            &placed(&cube, Vec3::new(0.0, 0.49, 0.0)),
            &placed(&plane, Vec3::ZERO),
            0.0,
            &mut manifold
        ));
        assert_eq!(manifold.len(), 4);
        for contact in manifold.as_slice() {
            assert!((contact.depth - 0.01).abs() < 1e-5);
            assert!((contact.normal + Vec3::Y).length() < 1e-6);
        }
    }

    #[test]
    fn test_stacked_boxes_face_contact() {
        let cube = Shape::Box {
            half_extents: Vec3::splat(0.5),
        };
        let mut manifold = ContactManifold::new();
        assert!(collide(
            &placed(&cube, Vec3::ZERO),
            &placed(&cube, Vec3::new(0.1, 0.95, 0.0)),
            0.0,
            &mut manifold
        ));
        assert_eq!(manifold.len(), 4);
        for contact in manifold.as_slice() {
            assert!((contact.normal - Vec3::Y).length() < 1e-5);
            assert!((contact.depth - 0.05).abs() < 1e-4);
        }
    }

    #[test]
    fn test_separated_boxes_within_max_separation() {
        let cube = Shape::Box {
            half_extents: Vec3::splat(0.5),
        };
        let a = placed(&cube, Vec3::ZERO);
        let b = placed(&cube, Vec3::new(0.0, 1.02, 0.0));
        let mut manifold = ContactManifold::new();
        assert!(!collide(&a, &b, 0.0, &mut manifold));
        assert!(collide(&a, &b, 0.05, &mut manifold));
        assert!(manifold.as_slice().iter().all(|c| c.depth < 0.0));
    }

    #[test]
    fn test_capsule_lying_on_box() {
        let capsule = Shape::Capsule {
            radius: 0.25,
            half_height: 0.5,
        };
        let cube = Shape::Box {
            half_extents: Vec3::ONE,
        };
        let lying = Transform::from_position_rotation(
            Vec3::new(0.0, 1.2, 0.0),
            Quat::from_rotation_z(std::f32::consts::FRAC_PI_2),
        );
        let mut manifold = ContactManifold::new();
        assert!(collide(
            &PlacedShape::new(&capsule, lying),
            &placed(&cube, Vec3::ZERO),
            0.0,
            &mut manifold
        ));
        assert_eq!(manifold.len(), 2);
        for contact in manifold.as_slice() {
            assert!((contact.depth - 0.05).abs() < 1e-4);
        }
    }

    #[test]
    fn test_separation_ray_against_plane() {
        let ray = Shape::SeparationRay { length: 1.0 };
        let plane = Shape::WorldBoundary {
            normal: Vec3::Y,
            distance: 0.0,
        };
        // Ray pointing down from y = 0.8
        let down = Transform::from_position_rotation(
            Vec3::new(0.0, 0.8, 0.0),
            Quat::from_rotation_x(std::f32::consts::FRAC_PI_2),
        );
        let mut manifold = ContactManifold::new();
        assert!(collide(
            &PlacedShape::new(&ray, down),
            &placed(&plane, Vec3::ZERO),
            0.0,
            &mut manifold
        ));
        let contact = manifold.as_slice()[0];
        assert!((contact.depth - 0.2).abs() < 1e-5);
        assert!((contact.normal + Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn test_swept_point_against_plane() {
        let point = Shape::Sphere { radius: 0.0 };
        let plane = Shape::WorldBoundary {
            normal: Vec3::Y,
            distance: 0.0,
        };
        let a = placed(&point, Vec3::new(0.0, 4.0, 0.0));
        let b = placed(&plane, Vec3::ZERO);
        assert!(intersects_swept(&a, Vec3::new(0.0, -5.0, 0.0), &b));
        assert!(!intersects_swept(&a, Vec3::new(0.0, -3.0, 0.0), &b));
        assert!(!intersects_swept(&a, Vec3::new(0.0, 3.0, 0.0), &b));
    }

    #[test]
    fn test_closest_points_on_crossing_segments() {
        let (a, b) = closest_points_segments(
            Vec3::new(-1.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, -1.0),
            Vec3::new(0.0, 1.0, 1.0),
        );
        assert!(a.length() < 1e-6);
        assert!((b - Vec3::Y).length() < 1e-6);
    }
}
