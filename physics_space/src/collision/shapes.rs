//! Collision shapes and their local-space geometry queries

use crate::math::Transform;
use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::AABB;

/// Half size of the bounds reported for infinite shapes
const BOUNDARY_EXTENT: f32 = 1.0e12;

/// Geometry of one shape attached to a collision object.
///
/// Capsules are aligned with local Y. Separation rays point along local +Z.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Shape {
    Sphere {
        radius: f32,
    },
    Box {
        half_extents: Vec3,
    },
    Capsule {
        radius: f32,
        half_height: f32,
    },
    /// Infinite half-space: points with `normal.dot(p) <= distance` are inside
    WorldBoundary {
        normal: Vec3,
        distance: f32,
    },
    /// Segment from the origin to `(0, 0, length)` that pushes bodies out
    /// along its own direction instead of the contact normal
    SeparationRay {
        length: f32,
    },
}

impl Shape {
    /// Get the AABB for this shape in local space
    pub fn local_aabb(&self) -> AABB {
        match self {
            Shape::Sphere { radius } => {
                AABB::from_center_half_extents(Vec3::ZERO, Vec3::splat(*radius))
            }
            Shape::Box { half_extents } => AABB::from_center_half_extents(Vec3::ZERO, *half_extents),
            Shape::Capsule {
                radius,
                half_height,
            } => AABB::from_center_half_extents(
                Vec3::ZERO,
                Vec3::new(*radius, half_height + radius, *radius),
            ),
            Shape::WorldBoundary { .. } => {
                AABB::from_center_half_extents(Vec3::ZERO, Vec3::splat(BOUNDARY_EXTENT))
            }
            Shape::SeparationRay { length } => {
                AABB::from_segment(Vec3::ZERO, Vec3::new(0.0, 0.0, *length))
            }
        }
    }

    /// Get the AABB for this shape placed at `transform`
    pub fn world_aabb(&self, transform: &Transform) -> AABB {
        let position = transform.position;
        let rotation = transform.rotation;
        match self {
            Shape::Sphere { radius } => {
                // Spheres are rotation-invariant
                AABB::from_center_half_extents(position, Vec3::splat(*radius))
            }
            Shape::Box { half_extents } => {
                // Project the rotated extents onto each world axis
                let basis = transform.basis();
                let extent = basis.x_axis.abs() * half_extents.x
                    + basis.y_axis.abs() * half_extents.y
                    + basis.z_axis.abs() * half_extents.z;
                AABB::from_center_half_extents(position, extent)
            }
            Shape::Capsule {
                radius,
                half_height,
            } => {
                let top = position + rotation * Vec3::new(0.0, *half_height, 0.0);
                let bottom = position + rotation * Vec3::new(0.0, -*half_height, 0.0);

                let top_aabb = AABB::from_center_half_extents(top, Vec3::splat(*radius));
                let bottom_aabb = AABB::from_center_half_extents(bottom, Vec3::splat(*radius));

                top_aabb.merge(&bottom_aabb)
            }
            Shape::WorldBoundary { .. } => self.local_aabb(),
            Shape::SeparationRay { length } => AABB::from_segment(
                position,
                position + rotation * Vec3::new(0.0, 0.0, *length),
            ),
        }
    }

    /// Get support point in given direction (local space).
    ///
    /// World boundaries have no finite support; callers test them analytically.
    pub fn support(&self, direction: Vec3) -> Vec3 {
        match self {
            Shape::Sphere { radius } => direction.normalize_or_zero() * *radius,
            Shape::Box { half_extents } => Vec3::new(
                if direction.x > 0.0 {
                    half_extents.x
                } else {
                    -half_extents.x
                },
                if direction.y > 0.0 {
                    half_extents.y
                } else {
                    -half_extents.y
                },
                if direction.z > 0.0 {
                    half_extents.z
                } else {
                    -half_extents.z
                },
            ),
            Shape::Capsule {
                radius,
                half_height,
            } => {
                let hemisphere_center = if direction.y > 0.0 {
                    Vec3::new(0.0, *half_height, 0.0)
                } else {
                    Vec3::new(0.0, -*half_height, 0.0)
                };
                hemisphere_center + direction.normalize_or_zero() * *radius
            }
            Shape::WorldBoundary { normal, distance } => *normal * *distance,
            Shape::SeparationRay { length } => {
                if direction.z > 0.0 {
                    Vec3::new(0.0, 0.0, *length)
                } else {
                    Vec3::ZERO
                }
            }
        }
    }

    /// Support point of this shape placed at `transform`
    pub fn world_support(&self, direction: Vec3, transform: &Transform) -> Vec3 {
        let local_direction = transform.inverse_transform_vector(direction);
        transform.transform_point(self.support(local_direction))
    }

    /// Get the volume of the shape
    pub fn volume(&self) -> f32 {
        match self {
            Shape::Sphere { radius } => (4.0 / 3.0) * std::f32::consts::PI * radius.powi(3),
            Shape::Box { half_extents } => 8.0 * half_extents.x * half_extents.y * half_extents.z,
            Shape::Capsule {
                radius,
                half_height,
            } => {
                let cylinder_volume = std::f32::consts::PI * radius.powi(2) * (2.0 * half_height);
                let sphere_volume = (4.0 / 3.0) * std::f32::consts::PI * radius.powi(3);
                cylinder_volume + sphere_volume
            }
            Shape::WorldBoundary { .. } | Shape::SeparationRay { .. } => 0.0,
        }
    }

    /// Principal moments of inertia for the given mass about the shape origin
    pub fn principal_inertia(&self, mass: f32) -> Vec3 {
        let box_inertia = |e: Vec3| {
            Vec3::new(
                e.y * e.y + e.z * e.z,
                e.x * e.x + e.z * e.z,
                e.x * e.x + e.y * e.y,
            ) * (mass / 3.0)
        };
        match self {
            Shape::Sphere { radius } => Vec3::splat(0.4 * mass * radius * radius),
            Shape::Box { half_extents } => box_inertia(*half_extents),
            Shape::Capsule {
                radius,
                half_height,
            } => box_inertia(Vec3::new(*radius, half_height + radius, *radius)),
            Shape::WorldBoundary { .. } | Shape::SeparationRay { .. } => Vec3::ZERO,
        }
    }

    /// True for shapes that enclose a finite volume and have a support mapping
    pub fn is_convex_solid(&self) -> bool {
        !matches!(self, Shape::WorldBoundary { .. } | Shape::SeparationRay { .. })
    }

    pub fn is_separation_ray(&self) -> bool {
        matches!(self, Shape::SeparationRay { .. })
    }

    /// Check if a point is inside the shape (in local space)
    pub fn contains_point(&self, point: Vec3) -> bool {
        match self {
            Shape::Sphere { radius } => point.length_squared() <= radius * radius,
            Shape::Box { half_extents } => {
                point.x.abs() <= half_extents.x
                    && point.y.abs() <= half_extents.y
                    && point.z.abs() <= half_extents.z
            }
            Shape::Capsule {
                radius,
                half_height,
            } => {
                let clamped_y = point.y.clamp(-*half_height, *half_height);
                let closest_point = Vec3::new(0.0, clamped_y, 0.0);
                (point - closest_point).length_squared() <= radius * radius
            }
            Shape::WorldBoundary { normal, distance } => normal.dot(point) <= *distance,
            Shape::SeparationRay { .. } => false,
        }
    }

    /// Closest point of the solid to `point` (local space); the point itself when inside
    pub fn closest_point(&self, point: Vec3) -> Vec3 {
        match self {
            Shape::Sphere { radius } => {
                if point.length_squared() <= radius * radius {
                    point
                } else {
                    point.normalize() * *radius
                }
            }
            Shape::Box { half_extents } => point.clamp(-*half_extents, *half_extents),
            Shape::Capsule {
                radius,
                half_height,
            } => {
                let clamped_y = point.y.clamp(-*half_height, *half_height);
                let closest_on_line = Vec3::new(0.0, clamped_y, 0.0);
                let to_point = point - closest_on_line;
                if to_point.length_squared() <= radius * radius {
                    point
                } else {
                    closest_on_line + to_point.normalize() * *radius
                }
            }
            Shape::WorldBoundary { normal, distance } => {
                let height = normal.dot(point) - distance;
                if height <= 0.0 {
                    point
                } else {
                    point - *normal * height
                }
            }
            Shape::SeparationRay { length } => Vec3::new(0.0, 0.0, point.z.clamp(0.0, *length)),
        }
    }
}

/// Ray for raycasting
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// Create a new ray
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    /// Get a point along the ray at distance t
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Raycast result
#[derive(Debug, Clone, Copy)]
pub struct RaycastHit {
    /// Distance along the ray to the hit point
    pub distance: f32,
    /// Hit point, in the same space as the ray
    pub position: Vec3,
    /// Surface normal at the hit point
    pub normal: Vec3,
}

impl Shape {
    /// Perform a raycast against this shape (in local space).
    ///
    /// Rays that start inside the solid report no hit.
    pub fn raycast(&self, ray: &Ray, max_distance: f32) -> Option<RaycastHit> {
        match self {
            Shape::Sphere { radius } => ray_sphere(ray, Vec3::ZERO, *radius, max_distance),
            Shape::Box { half_extents } => {
                if self.contains_point(ray.origin) {
                    return None;
                }

                // Ray-box intersection using slab method
                let inv_dir = ray.direction.recip();
                let t1 = (-*half_extents - ray.origin) * inv_dir;
                let t2 = (*half_extents - ray.origin) * inv_dir;

                let t_min = t1.min(t2);
                let t_max = t1.max(t2);

                let t_enter = t_min.max_element();
                let t_exit = t_max.min_element();

                if t_enter > t_exit || t_enter < 0.0 || t_enter > max_distance {
                    return None;
                }

                // The face hit is the one on the axis that entered last
                let axis = if t_min.x >= t_min.y && t_min.x >= t_min.z {
                    0
                } else if t_min.y >= t_min.z {
                    1
                } else {
                    2
                };
                let mut normal = Vec3::ZERO;
                normal[axis] = -ray.direction[axis].signum();

                Some(RaycastHit {
                    distance: t_enter,
                    position: ray.at(t_enter),
                    normal,
                })
            }
            Shape::Capsule {
                radius,
                half_height,
            } => {
                if self.contains_point(ray.origin) {
                    return None;
                }

                let mut best: Option<RaycastHit> = None;
                let mut consider = |hit: Option<RaycastHit>| {
                    if let Some(hit) = hit {
                        if best.map_or(true, |b| hit.distance < b.distance) {
                            best = Some(hit);
                        }
                    }
                };

                // Cylinder body around Y
                let o = ray.origin;
                let d = ray.direction;
                let a = d.x * d.x + d.z * d.z;
                if a > f32::EPSILON {
                    let b = 2.0 * (o.x * d.x + o.z * d.z);
                    let c = o.x * o.x + o.z * o.z - radius * radius;
                    let discriminant = b * b - 4.0 * a * c;
                    if discriminant >= 0.0 {
                        let t = (-b - discriminant.sqrt()) / (2.0 * a);
                        let position = ray.at(t);
                        if t >= 0.0 && t <= max_distance && position.y.abs() <= *half_height {
                            consider(Some(RaycastHit {
                                distance: t,
                                position,
                                normal: Vec3::new(position.x, 0.0, position.z).normalize_or_zero(),
                            }));
                        }
                    }
                }

                for cap in [*half_height, -*half_height] {
                    consider(ray_sphere(ray, Vec3::new(0.0, cap, 0.0), *radius, max_distance));
                }

                best
            }
            Shape::WorldBoundary { normal, distance } => {
                let height = normal.dot(ray.origin) - distance;
                let approach = normal.dot(ray.direction);
                if height <= 0.0 || approach >= 0.0 {
                    return None;
                }
                let t = height / -approach;
                if t > max_distance {
                    return None;
                }
                Some(RaycastHit {
                    distance: t,
                    position: ray.at(t),
                    normal: *normal,
                })
            }
            Shape::SeparationRay { .. } => None,
        }
    }
}

/// Entry hit of a ray against a sphere centered at `center`
fn ray_sphere(ray: &Ray, center: Vec3, radius: f32, max_distance: f32) -> Option<RaycastHit> {
    let oc = ray.origin - center;
    let b = oc.dot(ray.direction);
    let c = oc.dot(oc) - radius * radius;
    if c <= 0.0 {
        return None;
    }

    let discriminant = b * b - c;
    if discriminant < 0.0 {
        return None;
    }

    let t = -b - discriminant.sqrt();
    if t < 0.0 || t > max_distance {
        return None;
    }

    let position = ray.at(t);
    Some(RaycastHit {
        distance: t,
        position,
        normal: (position - center).normalize_or_zero(),
    })
}
