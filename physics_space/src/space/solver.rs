//! Sequential impulse contact solver
//!
//! Bodies taking part in an island are copied into [`SolverBody`] snapshots,
//! contacts become [`ContactConstraint`]s, and every island is solved
//! independently so islands can run in parallel.

use super::pairs::{CachedContact, PairKey};
use crate::collision::{create_tangent_basis, MAX_MANIFOLD_POINTS};
use crate::object::{BodyMode, CollisionObject, ObjectId};
use crate::params::SpaceParams;
use glam::{Mat3, Vec3};
use std::collections::HashMap;

/// Relative velocities below this are treated as zero
const MIN_VELOCITY: f32 = 0.0001;

/// Solver-side copy of a rigid body
#[derive(Debug, Clone, Copy)]
pub(crate) struct SolverBody {
    pub id: ObjectId,
    /// World position of the body origin
    pub origin: Vec3,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
    /// Position correction velocities, discarded after the step
    pub biased_linear_velocity: Vec3,
    pub biased_angular_velocity: Vec3,
    /// Zero for static and kinematic bodies
    pub inv_mass: f32,
    pub inv_inertia_world: Mat3,
    pub dynamic: bool,
}

impl SolverBody {
    pub fn from_object(id: ObjectId, object: &CollisionObject) -> Option<Self> {
        let body = object.body()?;
        let dynamic = body.mode() == BodyMode::Rigid;
        Some(Self {
            id,
            origin: object.transform().position,
            linear_velocity: body.linear_velocity,
            angular_velocity: body.angular_velocity,
            biased_linear_velocity: Vec3::ZERO,
            biased_angular_velocity: Vec3::ZERO,
            inv_mass: if dynamic { body.inv_mass() } else { 0.0 },
            inv_inertia_world: if dynamic {
                body.inv_inertia_world()
            } else {
                Mat3::ZERO
            },
            dynamic,
        })
    }

    fn velocity_at(&self, r: Vec3) -> Vec3 {
        self.linear_velocity + self.angular_velocity.cross(r)
    }

    fn biased_velocity_at(&self, r: Vec3) -> Vec3 {
        self.biased_linear_velocity + self.biased_angular_velocity.cross(r)
    }

    fn apply_impulse(&mut self, impulse: Vec3, r: Vec3) {
        if !self.dynamic {
            return;
        }
        self.linear_velocity += impulse * self.inv_mass;
        self.angular_velocity += self.inv_inertia_world * r.cross(impulse);
    }

    fn apply_bias_impulse(&mut self, impulse: Vec3, r: Vec3) {
        if !self.dynamic {
            return;
        }
        self.biased_linear_velocity += impulse * self.inv_mass;
        self.biased_angular_velocity += self.inv_inertia_world * r.cross(impulse);
    }
}

/// Inverse of the effective mass of two bodies along `direction`
fn effective_mass(a: &SolverBody, b: &SolverBody, r_a: Vec3, r_b: Vec3, direction: Vec3) -> f32 {
    let k = a.inv_mass
        + b.inv_mass
        + direction.dot((a.inv_inertia_world * r_a.cross(direction)).cross(r_a))
        + direction.dot((b.inv_inertia_world * r_b.cross(direction)).cross(r_b));
    if k > f32::EPSILON {
        1.0 / k
    } else {
        0.0
    }
}

/// One penetrating contact point
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct SolverContact {
    /// Contact offsets from the body origins
    pub r_a: Vec3,
    pub r_b: Vec3,
    /// Points from A towards B
    pub normal: Vec3,
    pub tangent: Vec3,
    pub bitangent: Vec3,
    pub depth: f32,
    normal_mass: f32,
    tangent_mass: f32,
    bitangent_mass: f32,
    bias: f32,
    bounce_velocity: f32,
    pub normal_impulse: f32,
    pub tangent_impulse: f32,
    pub bitangent_impulse: f32,
    bias_impulse: f32,
    /// Index of the matching entry in the pair's contact cache
    pub cache_index: usize,
}

impl SolverContact {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        point_a: Vec3,
        point_b: Vec3,
        a: &SolverBody,
        b: &SolverBody,
        normal: Vec3,
        depth: f32,
        cached: &CachedContact,
        cache_index: usize,
    ) -> Self {
        let (tangent, bitangent) = create_tangent_basis(normal);
        Self {
            r_a: point_a - a.origin,
            r_b: point_b - b.origin,
            normal,
            tangent,
            bitangent,
            depth,
            normal_impulse: cached.normal_impulse,
            tangent_impulse: cached.tangent_impulse.dot(tangent),
            bitangent_impulse: cached.tangent_impulse.dot(bitangent),
            cache_index,
            ..Default::default()
        }
    }

    /// Friction impulse as a world vector, for caching
    pub fn friction_impulse(&self) -> Vec3 {
        self.tangent * self.tangent_impulse + self.bitangent * self.bitangent_impulse
    }
}

/// Contacts between two bodies of an island
#[derive(Debug, Clone)]
pub(crate) struct ContactConstraint {
    pub key: PairKey,
    pub body_a: usize,
    pub body_b: usize,
    pub friction: f32,
    pub bounce: f32,
    contacts: [SolverContact; MAX_MANIFOLD_POINTS],
    len: usize,
}

impl ContactConstraint {
    pub fn new(key: PairKey, body_a: usize, body_b: usize, friction: f32, bounce: f32) -> Self {
        Self {
            key,
            body_a,
            body_b,
            friction,
            bounce,
            contacts: [SolverContact::default(); MAX_MANIFOLD_POINTS],
            len: 0,
        }
    }

    pub fn push(&mut self, contact: SolverContact) {
        if self.len < MAX_MANIFOLD_POINTS {
            self.contacts[self.len] = contact;
            self.len += 1;
        }
    }

    pub fn contacts(&self) -> &[SolverContact] {
        &self.contacts[..self.len]
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

fn apply_pair_impulse(
    bodies: &mut [SolverBody],
    a: usize,
    b: usize,
    impulse: Vec3,
    r_a: Vec3,
    r_b: Vec3,
) {
    bodies[a].apply_impulse(-impulse, r_a);
    bodies[b].apply_impulse(impulse, r_b);
}

fn apply_pair_bias_impulse(
    bodies: &mut [SolverBody],
    a: usize,
    b: usize,
    impulse: Vec3,
    r_a: Vec3,
    r_b: Vec3,
) {
    bodies[a].apply_bias_impulse(-impulse, r_a);
    bodies[b].apply_bias_impulse(impulse, r_b);
}

/// Bodies and constraints of one island
#[derive(Debug, Default)]
pub(crate) struct IslandSolver {
    pub bodies: Vec<SolverBody>,
    pub constraints: Vec<ContactConstraint>,
    index: HashMap<ObjectId, usize>,
}

impl IslandSolver {
    pub fn clear(&mut self) {
        self.bodies.clear();
        self.constraints.clear();
        self.index.clear();
    }

    /// Solver slot of `id`, gathering the body on first use
    pub fn body_index(&mut self, id: ObjectId, object: &CollisionObject) -> Option<usize> {
        if let Some(&index) = self.index.get(&id) {
            return Some(index);
        }
        let body = SolverBody::from_object(id, object)?;
        let index = self.bodies.len();
        self.bodies.push(body);
        self.index.insert(id, index);
        Some(index)
    }

    /// Compute effective masses and biases, then warm start from cached impulses
    pub fn prepare(&mut self, inv_dt: f32, params: &SpaceParams) {
        let Self {
            bodies,
            constraints,
            ..
        } = self;

        for constraint in constraints.iter_mut() {
            let (ia, ib) = (constraint.body_a, constraint.body_b);
            let a = bodies[ia];
            let b = bodies[ib];

            for contact in &mut constraint.contacts[..constraint.len] {
                contact.normal_mass = effective_mass(&a, &b, contact.r_a, contact.r_b, contact.normal);
                contact.tangent_mass =
                    effective_mass(&a, &b, contact.r_a, contact.r_b, contact.tangent);
                contact.bitangent_mass =
                    effective_mass(&a, &b, contact.r_a, contact.r_b, contact.bitangent);
                contact.bias = params.constraint_default_bias
                    * inv_dt
                    * (contact.depth - params.contact_max_allowed_penetration).max(0.0);
                contact.bias_impulse = 0.0;

                let relative = b.velocity_at(contact.r_b) - a.velocity_at(contact.r_a);
                contact.bounce_velocity = constraint.bounce * relative.dot(contact.normal).min(0.0);

                let impulse = contact.normal * contact.normal_impulse + contact.friction_impulse();
                apply_pair_impulse(bodies, ia, ib, impulse, contact.r_a, contact.r_b);
            }
        }
    }

    pub fn solve(&mut self, iterations: u32) {
        let Self {
            bodies,
            constraints,
            ..
        } = self;

        for _ in 0..iterations {
            for constraint in constraints.iter_mut() {
                let (ia, ib) = (constraint.body_a, constraint.body_b);
                let friction = constraint.friction;

                for contact in &mut constraint.contacts[..constraint.len] {
                    let (r_a, r_b, normal) = (contact.r_a, contact.r_b, contact.normal);

                    // Position correction through biased velocities
                    let biased = bodies[ib].biased_velocity_at(r_b) - bodies[ia].biased_velocity_at(r_a);
                    let vbn = biased.dot(normal);
                    if (contact.bias - vbn).abs() > MIN_VELOCITY {
                        let jbn = (contact.bias - vbn) * contact.normal_mass;
                        let old = contact.bias_impulse;
                        contact.bias_impulse = (old + jbn).max(0.0);
                        let impulse = normal * (contact.bias_impulse - old);
                        apply_pair_bias_impulse(bodies, ia, ib, impulse, r_a, r_b);
                    }

                    let relative = bodies[ib].velocity_at(r_b) - bodies[ia].velocity_at(r_a);
                    let vn = relative.dot(normal);
                    if vn.abs() > MIN_VELOCITY || contact.bounce_velocity != 0.0 {
                        let jn = -(contact.bounce_velocity + vn) * contact.normal_mass;
                        let old = contact.normal_impulse;
                        contact.normal_impulse = (old + jn).max(0.0);
                        let impulse = normal * (contact.normal_impulse - old);
                        apply_pair_impulse(bodies, ia, ib, impulse, r_a, r_b);
                    }

                    // Friction, clamped to the friction cone of the accumulated normal impulse
                    let max_friction = friction * contact.normal_impulse;
                    let relative = bodies[ib].velocity_at(r_b) - bodies[ia].velocity_at(r_a);
                    let old_tangent = contact.tangent_impulse;
                    let old_bitangent = contact.bitangent_impulse;
                    let mut tangent = old_tangent - relative.dot(contact.tangent) * contact.tangent_mass;
                    let mut bitangent =
                        old_bitangent - relative.dot(contact.bitangent) * contact.bitangent_mass;
                    let length = (tangent * tangent + bitangent * bitangent).sqrt();
                    if length > max_friction && length > 0.0 {
                        let scale = max_friction / length;
                        tangent *= scale;
                        bitangent *= scale;
                    }
                    contact.tangent_impulse = tangent;
                    contact.bitangent_impulse = bitangent;
                    let impulse = contact.tangent * (tangent - old_tangent)
                        + contact.bitangent * (bitangent - old_bitangent);
                    apply_pair_impulse(bodies, ia, ib, impulse, r_a, r_b);
                }
            }
        }
    }
}
