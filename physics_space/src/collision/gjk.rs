//! Boolean GJK overlap test over support mappings
//!
//! Used for swept-shape tests where no closed-form pair routine exists: a
//! shape swept along a motion vector is still convex, and its support point
//! is the shape's support plus the motion when the motion points along the
//! query direction.

use super::shapes::Shape;
use crate::math::Transform;
use glam::Vec3;

const MAX_ITERATIONS: usize = 64;

/// Support mapping of a convex set in world space
pub trait SupportMap {
    fn support(&self, direction: Vec3) -> Vec3;
}

/// A convex shape placed in the world, inflated by `margin` and swept along `motion`
#[derive(Debug, Clone, Copy)]
pub struct ConvexProxy<'a> {
    pub shape: &'a Shape,
    pub transform: Transform,
    pub margin: f32,
    pub motion: Vec3,
}

impl<'a> ConvexProxy<'a> {
    pub fn new(shape: &'a Shape, transform: Transform, margin: f32) -> Self {
        Self {
            shape,
            transform,
            margin,
            motion: Vec3::ZERO,
        }
    }

    pub fn swept(mut self, motion: Vec3) -> Self {
        self.motion = motion;
        self
    }
}

impl SupportMap for ConvexProxy<'_> {
    fn support(&self, direction: Vec3) -> Vec3 {
        let mut point = self.shape.world_support(direction, &self.transform);
        if self.margin > 0.0 {
            point += direction.normalize_or_zero() * self.margin;
        }
        if self.motion.dot(direction) > 0.0 {
            point += self.motion;
        }
        point
    }
}

/// Minkowski difference support function
#[inline(always)]
fn minkowski_support<A: SupportMap, B: SupportMap>(a: &A, b: &B, direction: Vec3) -> Vec3 {
    a.support(direction) - b.support(-direction)
}

/// Simplex for GJK (up to 4 points in 3D)
#[derive(Clone, Debug)]
struct Simplex {
    points: [Vec3; 4],
    size: usize,
}

impl Simplex {
    fn new() -> Self {
        Self {
            points: [Vec3::ZERO; 4],
            size: 0,
        }
    }

    fn push(&mut self, point: Vec3) {
        for i in (1..4).rev() {
            self.points[i] = self.points[i - 1];
        }
        self.points[0] = point;
        self.size = (self.size + 1).min(4);
    }

    fn set(&mut self, points: &[Vec3]) {
        for (i, &p) in points.iter().enumerate().take(4) {
            self.points[i] = p;
        }
        self.size = points.len().min(4);
    }
}

/// True if the two convex sets overlap (touching counts as overlap).
pub fn intersects<A: SupportMap, B: SupportMap>(a: &A, b: &B) -> bool {
    let mut direction = Vec3::X;

    let mut simplex = Simplex::new();
    simplex.push(minkowski_support(a, b, direction));
    direction = -simplex.points[0];

    for _ in 0..MAX_ITERATIONS {
        if direction.length_squared() <= f32::EPSILON * f32::EPSILON {
            // Origin lies on the simplex
            return true;
        }

        let new_point = minkowski_support(a, b, direction);
        if new_point.dot(direction) < 0.0 {
            return false;
        }

        simplex.push(new_point);
        if do_simplex(&mut simplex, &mut direction) {
            return true;
        }
    }

    false
}

fn do_simplex(simplex: &mut Simplex, direction: &mut Vec3) -> bool {
    match simplex.size {
        2 => do_simplex_line(simplex, direction),
        3 => do_simplex_triangle(simplex, direction),
        4 => do_simplex_tetrahedron(simplex, direction),
        _ => false,
    }
}

fn do_simplex_line(simplex: &mut Simplex, direction: &mut Vec3) -> bool {
    let a = simplex.points[0];
    let b = simplex.points[1];
    let ab = b - a;
    let ao = -a;

    if ab.dot(ao) > 0.0 {
        *direction = ab.cross(ao).cross(ab);
    } else {
        simplex.set(&[a]);
        *direction = ao;
    }

    false
}

fn do_simplex_triangle(simplex: &mut Simplex, direction: &mut Vec3) -> bool {
    let a = simplex.points[0];
    let b = simplex.points[1];
    let c = simplex.points[2];

    let ab = b - a;
    let ac = c - a;
    let ao = -a;

    let abc = ab.cross(ac);

    if abc.cross(ac).dot(ao) > 0.0 {
        if ac.dot(ao) > 0.0 {
            simplex.set(&[a, c]);
            *direction = ac.cross(ao).cross(ac);
        } else {
            simplex.set(&[a, b]);
            return do_simplex_line(simplex, direction);
        }
    } else if ab.cross(abc).dot(ao) > 0.0 {
        simplex.set(&[a, b]);
        return do_simplex_line(simplex, direction);
    } else if abc.dot(ao) > 0.0 {
        *direction = abc;
    } else {
        simplex.set(&[a, c, b]);
        *direction = -abc;
    }

    false
}

fn do_simplex_tetrahedron(simplex: &mut Simplex, direction: &mut Vec3) -> bool {
    let a = simplex.points[0];
    let b = simplex.points[1];
    let c = simplex.points[2];
    let d = simplex.points[3];

    let ab = b - a;
    let ac = c - a;
    let ad = d - a;
    let ao = -a;

    let abc = ab.cross(ac);
    let acd = ac.cross(ad);
    let adb = ad.cross(ab);

    if abc.dot(ao) > 0.0 {
        simplex.set(&[a, b, c]);
        return do_simplex_triangle(simplex, direction);
    }

    if acd.dot(ao) > 0.0 {
        simplex.set(&[a, c, d]);
        return do_simplex_triangle(simplex, direction);
    }

    if adb.dot(ao) > 0.0 {
        simplex.set(&[a, d, b]);
        return do_simplex_triangle(simplex, direction);
    }

    // Origin is inside the tetrahedron
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sphere_at(shape: &Shape, x: f32) -> ConvexProxy<'_> {
        ConvexProxy::new(shape, Transform::from_position(Vec3::new(x, 0.0, 0.0)), 0.0)
    }

    #[test]
    fn test_overlapping_spheres() {
        let sphere = Shape::Sphere { radius: 1.0 };
        assert!(intersects(&sphere_at(&sphere, 0.0), &sphere_at(&sphere, 1.5)));
        assert!(!intersects(&sphere_at(&sphere, 0.0), &sphere_at(&sphere, 2.5)));
    }

    #[test]
    fn test_box_and_capsule() {
        let cube = Shape::Box {
            half_extents: Vec3::ONE,
        };
        let capsule = Shape::Capsule {
            radius: 0.5,
            half_height: 1.0,
        };
        let at = |y: f32| ConvexProxy::new(&capsule, Transform::from_position(Vec3::new(0.0, y, 0.0)), 0.0);
        let cube_proxy = ConvexProxy::new(&cube, Transform::IDENTITY, 0.0);
        assert!(intersects(&at(2.2), &cube_proxy));
        assert!(!intersects(&at(2.7), &cube_proxy));
    }

    #[test]
    fn test_swept_sphere_hits_obstacle_in_path() {
        let sphere = Shape::Sphere { radius: 0.5 };
        let moving = sphere_at(&sphere, -5.0).swept(Vec3::new(10.0, 0.0, 0.0));
        let obstacle = sphere_at(&sphere, 0.0);
        assert!(intersects(&moving, &obstacle));

        let short = sphere_at(&sphere, -5.0).swept(Vec3::new(2.0, 0.0, 0.0));
        assert!(!intersects(&short, &obstacle));
    }

    #[test]
    fn test_margin_closes_gap() {
        let sphere = Shape::Sphere { radius: 1.0 };
        let a = sphere_at(&sphere, 0.0);
        let mut b = sphere_at(&sphere, 2.1);
        assert!(!intersects(&a, &b));
        b.margin = 0.2;
        assert!(intersects(&a, &b));
    }
}
