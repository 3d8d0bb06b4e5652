//! Rigid transforms used for objects, shapes and queries

use glam::{Mat3, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Rigid transform (rotation followed by translation). Physics shapes are never scaled.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Transform {
    /// World position of the origin
    pub position: Vec3,
    /// Orientation as a unit quaternion
    pub rotation: Quat,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    /// Create a new transform with the given position
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }

    /// Create a new transform with the given position and rotation
    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    /// Apply `self` after `local`: the world transform of a child placed at `local`.
    pub fn mul_transform(&self, local: &Transform) -> Transform {
        Transform {
            position: self.position + self.rotation * local.position,
            rotation: (self.rotation * local.rotation).normalize(),
        }
    }

    pub fn inverse(&self) -> Transform {
        let rotation = self.rotation.conjugate();
        Transform {
            position: rotation * -self.position,
            rotation,
        }
    }

    /// Transform a point from local to world space
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.position + self.rotation * point
    }

    /// Rotate a direction from local to world space
    pub fn transform_vector(&self, vector: Vec3) -> Vec3 {
        self.rotation * vector
    }

    /// Transform a world point into local space
    pub fn inverse_transform_point(&self, point: Vec3) -> Vec3 {
        self.rotation.conjugate() * (point - self.position)
    }

    pub fn inverse_transform_vector(&self, vector: Vec3) -> Vec3 {
        self.rotation.conjugate() * vector
    }

    /// Same transform moved by `offset`
    pub fn translated(&self, offset: Vec3) -> Transform {
        Transform {
            position: self.position + offset,
            rotation: self.rotation,
        }
    }

    pub fn basis(&self) -> Mat3 {
        Mat3::from_quat(self.rotation)
    }

    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.rotation.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inverse_round_trips_points() {
        let transform = Transform::from_position_rotation(
            Vec3::new(1.0, 2.0, 3.0),
            Quat::from_rotation_y(0.7),
        );
        let point = Vec3::new(-4.0, 0.5, 2.0);
        let back = transform
            .inverse()
            .transform_point(transform.transform_point(point));
        assert!((back - point).length() < 1e-5);
    }

    #[test]
    fn test_mul_transform_composes_translation() {
        let parent = Transform::from_position_rotation(Vec3::X, Quat::from_rotation_z(std::f32::consts::FRAC_PI_2));
        let child = Transform::from_position(Vec3::X);
        let world = parent.mul_transform(&child);
        assert!((world.position - Vec3::new(1.0, 1.0, 0.0)).length() < 1e-5);
    }
}
