//! Areas: regions that override gravity and damping and report overlaps

use super::body::Medium;
use super::{ObjectId, SpaceObject};
use crate::math::Transform;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How an area's medium combines with lower-priority areas and the default area
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AreaSpaceOverride {
    /// The area does not affect bodies
    #[default]
    Disabled,
    /// Add to the media processed so far and continue
    Combine,
    /// Add to the media processed so far and stop
    CombineReplace,
    /// Discard the media processed so far and stop
    Replace,
    /// Discard the media processed so far and continue
    ReplaceCombine,
}

/// One monitored shape pair: `other`'s shape `other_shape` overlapping the area's `area_shape`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MonitorKey {
    pub other: ObjectId,
    pub other_shape: usize,
    pub area_shape: usize,
}

#[derive(Debug, Clone)]
pub struct Area {
    /// Gravity direction, or the local-space attraction point for point gravity
    pub gravity_direction: Vec3,
    pub gravity_magnitude: f32,
    pub gravity_is_point: bool,
    /// Distance at which point gravity equals `gravity_magnitude`; 0 disables falloff
    pub gravity_point_unit_distance: f32,
    pub linear_damp: f32,
    pub angular_damp: f32,
    /// Higher priority areas are processed first
    pub priority: i32,
    pub space_override: AreaSpaceOverride,
    /// Report bodies entering and leaving
    pub monitoring: bool,
    /// Report monitorable areas entering and leaving
    pub monitoring_areas: bool,
    /// Whether other areas can detect this one
    pub monitorable: bool,
    pub(crate) pending_bodies: BTreeMap<MonitorKey, i32>,
    pub(crate) pending_areas: BTreeMap<MonitorKey, i32>,
}

impl Default for Area {
    fn default() -> Self {
        Self {
            gravity_direction: Vec3::NEG_Y,
            gravity_magnitude: 9.8,
            gravity_is_point: false,
            gravity_point_unit_distance: 0.0,
            linear_damp: 0.1,
            angular_damp: 0.1,
            priority: 0,
            space_override: AreaSpaceOverride::Disabled,
            monitoring: false,
            monitoring_areas: false,
            monitorable: true,
            pending_bodies: BTreeMap::new(),
            pending_areas: BTreeMap::new(),
        }
    }
}

impl Area {
    /// Area whose medium replaces everything below it
    pub fn with_medium(gravity: Vec3, linear_damp: f32, angular_damp: f32) -> Self {
        Self {
            gravity_direction: gravity.normalize_or_zero(),
            gravity_magnitude: gravity.length(),
            linear_damp,
            angular_damp,
            space_override: AreaSpaceOverride::Replace,
            ..Default::default()
        }
    }

    /// Report bodies and, when `areas` is set, monitorable areas entering and leaving
    pub fn with_monitoring(mut self, areas: bool) -> Self {
        self.monitoring = true;
        self.monitoring_areas = areas;
        self
    }

    /// Gravity this area applies at `point`
    pub fn gravity_at(&self, area_transform: &Transform, point: Vec3) -> Vec3 {
        if !self.gravity_is_point {
            return area_transform.transform_vector(self.gravity_direction) * self.gravity_magnitude;
        }

        let center = area_transform.transform_point(self.gravity_direction);
        let offset = center - point;
        let distance_sq = offset.length_squared();
        if distance_sq <= f32::EPSILON {
            return Vec3::ZERO;
        }

        let direction = offset / distance_sq.sqrt();
        if self.gravity_point_unit_distance > 0.0 {
            let unit = self.gravity_point_unit_distance;
            direction * self.gravity_magnitude * (unit * unit / distance_sq)
        } else {
            direction * self.gravity_magnitude
        }
    }

    /// Add this area's medium at `point` into `medium`
    pub(crate) fn accumulate_medium(&self, area_transform: &Transform, point: Vec3, medium: &mut Medium) {
        medium.gravity += self.gravity_at(area_transform, point);
        medium.linear_damp += self.linear_damp;
        medium.angular_damp += self.angular_damp;
    }

    /// Record an overlap change; entries that cancel out are dropped
    pub(crate) fn add_monitor_delta(&mut self, key: MonitorKey, other_is_area: bool, delta: i32) {
        let pending = if other_is_area {
            &mut self.pending_areas
        } else {
            &mut self.pending_bodies
        };
        let entry = pending.entry(key).or_insert(0);
        *entry += delta;
        if *entry == 0 {
            pending.remove(&key);
        }
    }

    pub fn has_pending_events(&self) -> bool {
        !self.pending_bodies.is_empty() || !self.pending_areas.is_empty()
    }
}

impl SpaceObject for Area {
    fn is_static(&self) -> bool {
        false
    }

    fn is_active(&self) -> bool {
        true
    }

    fn velocity_at(&self, _point: Vec3, _origin: Vec3) -> Vec3 {
        Vec3::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_gravity_falloff() {
        let area = Area {
            gravity_direction: Vec3::ZERO,
            gravity_magnitude: 4.0,
            gravity_is_point: true,
            gravity_point_unit_distance: 1.0,
            ..Default::default()
        };
        let at_two = area.gravity_at(&Transform::IDENTITY, Vec3::new(2.0, 0.0, 0.0));
        assert!((at_two - Vec3::new(-1.0, 0.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_monitor_deltas_cancel() {
        let mut area = Area::default();
        let key = MonitorKey {
            other: ObjectId::from_raw_parts(3, 0),
            other_shape: 0,
            area_shape: 0,
        };
        area.add_monitor_delta(key, false, 1);
        assert!(area.has_pending_events());
        area.add_monitor_delta(key, false, -1);
        assert!(!area.has_pending_events());
    }
}
