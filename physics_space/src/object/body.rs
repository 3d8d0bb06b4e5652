//! Rigid body state and integration

use super::{ObjectId, ShapeInstance, SpaceObject};
use crate::math::Transform;
use crate::params::SpaceParams;
use glam::{Mat3, Quat, Vec3};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// How a rigid body takes part in the simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BodyMode {
    /// Never moves
    Static,
    /// Moves by its velocities but is not affected by forces or contacts
    Kinematic,
    /// Fully simulated
    #[default]
    Rigid,
}

/// Gravity and damping acting on a body, resolved from the areas it is in
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Medium {
    pub gravity: Vec3,
    pub linear_damp: f32,
    pub angular_damp: f32,
}

/// An area whose medium applies to a body
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct AreaLink {
    pub area: ObjectId,
    pub priority: i32,
    /// Number of overlapping shape pairs
    pub refcount: u32,
}

#[derive(Debug, Clone)]
pub struct RigidBody {
    mode: BodyMode,
    mass: f32,
    inv_mass: f32,
    inv_inertia: Vec3,
    inv_inertia_world: Mat3,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
    pub gravity_scale: f32,
    /// Replaces the linear damping of the medium when set
    pub linear_damp_override: Option<f32>,
    /// Replaces the angular damping of the medium when set
    pub angular_damp_override: Option<f32>,
    pub friction: f32,
    pub bounce: f32,
    pub can_sleep: bool,
    /// Queue a state notification whenever the body moves or changes sleep state
    pub report_state: bool,
    /// Bodies this one never collides with
    pub exceptions: Vec<ObjectId>,
    pub constant_force: Vec3,
    pub constant_torque: Vec3,
    applied_force: Vec3,
    applied_torque: Vec3,
    sleeping: bool,
    still_time: f32,
    pub(crate) areas: Vec<AreaLink>,
    pub(crate) biased_linear_velocity: Vec3,
    pub(crate) biased_angular_velocity: Vec3,
    pub(crate) island_stamp: u64,
}

impl Default for RigidBody {
    fn default() -> Self {
        Self {
            mode: BodyMode::Rigid,
            mass: 1.0,
            inv_mass: 1.0,
            inv_inertia: Vec3::ONE,
            inv_inertia_world: Mat3::IDENTITY,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            gravity_scale: 1.0,
            linear_damp_override: None,
            angular_damp_override: None,
            friction: 1.0,
            bounce: 0.0,
            can_sleep: true,
            report_state: false,
            exceptions: Vec::new(),
            constant_force: Vec3::ZERO,
            constant_torque: Vec3::ZERO,
            applied_force: Vec3::ZERO,
            applied_torque: Vec3::ZERO,
            sleeping: false,
            still_time: 0.0,
            areas: Vec::new(),
            biased_linear_velocity: Vec3::ZERO,
            biased_angular_velocity: Vec3::ZERO,
            island_stamp: 0,
        }
    }
}

impl RigidBody {
    /// Dynamic body with the given mass
    pub fn new(mass: f32) -> Self {
        let mut body = Self::default();
        body.mass = mass.max(f32::EPSILON);
        body.inv_mass = 1.0 / body.mass;
        body
    }

    pub fn new_static() -> Self {
        Self::default().with_mode(BodyMode::Static)
    }

    pub fn new_kinematic() -> Self {
        Self::default().with_mode(BodyMode::Kinematic)
    }

    pub fn with_mode(mut self, mode: BodyMode) -> Self {
        self.mode = mode;
        self.inv_mass = if mode == BodyMode::Rigid {
            1.0 / self.mass
        } else {
            0.0
        };
        self
    }

    pub fn with_velocity(mut self, linear: Vec3, angular: Vec3) -> Self {
        self.linear_velocity = linear;
        self.angular_velocity = angular;
        self
    }

    pub fn mode(&self) -> BodyMode {
        self.mode
    }

    /// Changes take effect on registered bodies through `Space::body_set_mode`
    pub(crate) fn set_mode(&mut self, mode: BodyMode) {
        *self = std::mem::take(self).with_mode(mode);
        if mode != BodyMode::Rigid {
            self.inv_inertia = Vec3::ZERO;
            self.inv_inertia_world = Mat3::ZERO;
        }
    }

    pub fn mass(&self) -> f32 {
        self.mass
    }

    pub fn inv_mass(&self) -> f32 {
        self.inv_mass
    }

    pub fn inv_inertia_world(&self) -> Mat3 {
        self.inv_inertia_world
    }

    pub fn is_sleeping(&self) -> bool {
        self.sleeping
    }

    pub(crate) fn set_sleeping(&mut self, sleeping: bool) {
        self.sleeping = sleeping;
        if sleeping {
            self.linear_velocity = Vec3::ZERO;
            self.angular_velocity = Vec3::ZERO;
        } else {
            self.still_time = 0.0;
        }
    }

    /// Seconds the body has spent below both sleep thresholds
    pub fn still_time(&self) -> f32 {
        self.still_time
    }

    pub fn apply_force(&mut self, force: Vec3) {
        self.applied_force += force;
    }

    pub fn apply_torque(&mut self, torque: Vec3) {
        self.applied_torque += torque;
    }

    pub fn apply_central_impulse(&mut self, impulse: Vec3) {
        self.linear_velocity += impulse * self.inv_mass;
    }

    /// Impulse applied at `offset` from the body origin
    pub fn apply_impulse(&mut self, impulse: Vec3, offset: Vec3) {
        self.linear_velocity += impulse * self.inv_mass;
        self.angular_velocity += self.inv_inertia_world * offset.cross(impulse);
    }

    pub fn has_exception(&self, other: ObjectId) -> bool {
        self.exceptions.contains(&other)
    }

    /// Recompute mass distribution from shape volumes
    pub(crate) fn update_mass_properties(&mut self, shapes: &[ShapeInstance], transform: &Transform) {
        if self.mode != BodyMode::Rigid {
            self.inv_mass = 0.0;
            self.inv_inertia = Vec3::ZERO;
            self.inv_inertia_world = Mat3::ZERO;
            return;
        }

        self.inv_mass = 1.0 / self.mass;

        let total_volume: f32 = shapes
            .iter()
            .filter(|instance| !instance.disabled)
            .map(|instance| instance.shape.volume())
            .sum();

        let inertia = if total_volume > f32::EPSILON {
            let mut inertia = Vec3::ZERO;
            for instance in shapes.iter().filter(|instance| !instance.disabled) {
                let share = self.mass * instance.shape.volume() / total_volume;
                if share <= 0.0 {
                    continue;
                }
                // Parallel axis term along the principal axes
                let r = instance.local_transform.position;
                let offset = Vec3::new(r.y * r.y + r.z * r.z, r.x * r.x + r.z * r.z, r.x * r.x + r.y * r.y);
                inertia += instance.shape.principal_inertia(share) + offset * share;
            }
            inertia
        } else {
            Vec3::splat(self.mass)
        };

        self.inv_inertia = Vec3::new(
            if inertia.x > 0.0 { 1.0 / inertia.x } else { 0.0 },
            if inertia.y > 0.0 { 1.0 / inertia.y } else { 0.0 },
            if inertia.z > 0.0 { 1.0 / inertia.z } else { 0.0 },
        );
        self.update_world_inertia(transform);
    }

    pub(crate) fn update_world_inertia(&mut self, transform: &Transform) {
        let rotation = transform.basis();
        self.inv_inertia_world =
            rotation * Mat3::from_diagonal(self.inv_inertia) * rotation.transpose();
    }

    /// Apply gravity, accumulated forces and damping to the velocities
    pub(crate) fn integrate_forces(&mut self, dt: f32, medium: &Medium) {
        if self.mode == BodyMode::Rigid {
            let gravity = medium.gravity * self.gravity_scale;
            let force = self.applied_force + self.constant_force;
            let torque = self.applied_torque + self.constant_torque;

            self.linear_velocity += (gravity + force * self.inv_mass) * dt;
            self.angular_velocity += self.inv_inertia_world * torque * dt;

            let linear_damp = self.linear_damp_override.unwrap_or(medium.linear_damp);
            let angular_damp = self.angular_damp_override.unwrap_or(medium.angular_damp);
            self.linear_velocity *= (1.0 - dt * linear_damp).max(0.0);
            self.angular_velocity *= (1.0 - dt * angular_damp).max(0.0);
        }

        self.applied_force = Vec3::ZERO;
        self.applied_torque = Vec3::ZERO;
        self.biased_linear_velocity = Vec3::ZERO;
        self.biased_angular_velocity = Vec3::ZERO;
    }

    /// Transform after advancing by the current velocities, or `None` if the body does not move.
    ///
    /// Non-finite velocities are reset to zero and a non-finite result keeps
    /// the previous transform.
    pub(crate) fn integrate_velocities(&mut self, transform: &Transform, dt: f32) -> Option<Transform> {
        if self.mode == BodyMode::Static {
            return None;
        }

        if !self.linear_velocity.is_finite() || !self.angular_velocity.is_finite() {
            warn!(
                linear = ?self.linear_velocity,
                angular = ?self.angular_velocity,
                "Non-finite body velocity reset to zero"
            );
            self.linear_velocity = Vec3::ZERO;
            self.angular_velocity = Vec3::ZERO;
        }
        if !self.biased_linear_velocity.is_finite() || !self.biased_angular_velocity.is_finite() {
            self.biased_linear_velocity = Vec3::ZERO;
            self.biased_angular_velocity = Vec3::ZERO;
        }

        let total_angular = self.angular_velocity + self.biased_angular_velocity;
        let total_linear = self.linear_velocity + self.biased_linear_velocity;
        if total_angular == Vec3::ZERO && total_linear == Vec3::ZERO {
            return None;
        }

        let mut next = *transform;
        let angle = total_angular.length();
        if angle > f32::EPSILON {
            let rotation = Quat::from_axis_angle(total_angular / angle, angle * dt);
            next.rotation = (rotation * next.rotation).normalize();
        }
        next.position += total_linear * dt;

        if !next.is_finite() {
            warn!(transform = ?next, "Non-finite body transform discarded");
            self.linear_velocity = Vec3::ZERO;
            self.angular_velocity = Vec3::ZERO;
            return None;
        }
        Some(next)
    }

    /// Accumulate still time; true once the body may sleep
    pub(crate) fn sleep_test(&mut self, dt: f32, params: &SpaceParams) -> bool {
        match self.mode {
            BodyMode::Static | BodyMode::Kinematic => return true,
            BodyMode::Rigid if !self.can_sleep => return false,
            BodyMode::Rigid => {}
        }

        let linear_threshold = params.body_linear_velocity_sleep_threshold;
        if self.angular_velocity.length() < params.body_angular_velocity_sleep_threshold
            && self.linear_velocity.length_squared() < linear_threshold * linear_threshold
        {
            self.still_time += dt;
            self.still_time >= params.body_time_to_sleep
        } else {
            self.still_time = 0.0;
            false
        }
    }

    /// Register an overlapping area shape pair
    pub(crate) fn add_area(&mut self, area: ObjectId, priority: i32) {
        if let Some(link) = self.areas.iter_mut().find(|link| link.area == area) {
            link.refcount += 1;
            return;
        }
        let at = self
            .areas
            .iter()
            .position(|link| link.priority > priority)
            .unwrap_or(self.areas.len());
        self.areas.insert(
            at,
            AreaLink {
                area,
                priority,
                refcount: 1,
            },
        );
    }

    pub(crate) fn remove_area(&mut self, area: ObjectId) {
        if let Some(i) = self.areas.iter().position(|link| link.area == area) {
            self.areas[i].refcount -= 1;
            if self.areas[i].refcount == 0 {
                self.areas.remove(i);
            }
        }
    }
}

impl SpaceObject for RigidBody {
    fn is_static(&self) -> bool {
        self.mode != BodyMode::Rigid
    }

    fn is_active(&self) -> bool {
        self.mode != BodyMode::Static && !self.sleeping
    }

    fn velocity_at(&self, point: Vec3, origin: Vec3) -> Vec3 {
        self.linear_velocity + self.angular_velocity.cross(point - origin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::Shape;

    #[test]
    fn test_integrate_forces_applies_gravity_and_clears_forces() {
        let mut body = RigidBody::new(2.0);
        body.apply_force(Vec3::new(4.0, 0.0, 0.0));
        let medium = Medium {
            gravity: Vec3::new(0.0, -10.0, 0.0),
            ..Default::default()
        };
        body.integrate_forces(0.5, &medium);
        assert!((body.linear_velocity - Vec3::new(1.0, -5.0, 0.0)).length() < 1e-6);

        body.integrate_forces(0.5, &Medium::default());
        assert!((body.linear_velocity - Vec3::new(1.0, -5.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_static_body_ignores_forces() {
        let mut body = RigidBody::new_static();
        body.integrate_forces(
            1.0,
            &Medium {
                gravity: Vec3::NEG_Y,
                ..Default::default()
            },
        );
        assert_eq!(body.linear_velocity, Vec3::ZERO);
        assert!(body
            .integrate_velocities(&Transform::IDENTITY, 1.0)
            .is_none());
    }

    #[test]
    fn test_nan_velocity_is_sanitized() {
        let mut body = RigidBody::new(1.0);
        body.linear_velocity = Vec3::new(f32::NAN, 0.0, 0.0);
        let next = body.integrate_velocities(&Transform::IDENTITY, 0.1);
        assert!(next.is_none());
        assert_eq!(body.linear_velocity, Vec3::ZERO);
    }

    #[test]
    fn test_sleep_test_accumulates_still_time() {
        let params = SpaceParams::default();
        let mut body = RigidBody::new(1.0);
        let mut asleep = false;
        for _ in 0..60 {
            asleep = body.sleep_test(0.1, &params);
            if asleep {
                break;
            }
        }
        assert!(asleep);
        assert!(body.still_time() >= params.body_time_to_sleep);

        body.linear_velocity = Vec3::X;
        assert!(!body.sleep_test(0.1, &params));
        assert_eq!(body.still_time(), 0.0);
    }

    #[test]
    fn test_mass_properties_from_shapes() {
        let mut body = RigidBody::new(3.0);
        let shapes = vec![ShapeInstance::new(
            Shape::Sphere { radius: 1.0 },
            Transform::IDENTITY,
        )];
        body.update_mass_properties(&shapes, &Transform::IDENTITY);
        let expected = 1.0 / (0.4 * 3.0);
        assert!((body.inv_inertia_world().x_axis.x - expected).abs() < 1e-5);
    }

    #[test]
    fn test_areas_sorted_by_priority_and_refcounted() {
        let mut body = RigidBody::default();
        let low = ObjectId::from_raw_parts(1, 0);
        let high = ObjectId::from_raw_parts(2, 0);
        body.add_area(high, 5);
        body.add_area(low, 1);
        body.add_area(high, 5);
        assert_eq!(body.areas.iter().map(|l| l.area).collect::<Vec<_>>(), vec![low, high]);

        body.remove_area(high);
        assert_eq!(body.areas.len(), 2);
        body.remove_area(high);
        assert_eq!(body.areas.len(), 1);
    }
}
