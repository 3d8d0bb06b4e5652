//! Tunable space parameters and JSON-backed configuration

use crate::error::SpaceError;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, error, info};

/// Scalar parameters that tune contact handling and sleeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpaceParameter {
    ContactRecycleRadius,
    ContactMaxSeparation,
    ContactMaxAllowedPenetration,
    BodyLinearVelocitySleepThreshold,
    BodyAngularVelocitySleepThreshold,
    BodyTimeToSleep,
    BodyAngularVelocityDampRatio,
    ConstraintDefaultBias,
    TestMotionMinContactDepth,
}

impl SpaceParameter {
    pub const ALL: [SpaceParameter; 9] = [
        SpaceParameter::ContactRecycleRadius,
        SpaceParameter::ContactMaxSeparation,
        SpaceParameter::ContactMaxAllowedPenetration,
        SpaceParameter::BodyLinearVelocitySleepThreshold,
        SpaceParameter::BodyAngularVelocitySleepThreshold,
        SpaceParameter::BodyTimeToSleep,
        SpaceParameter::BodyAngularVelocityDampRatio,
        SpaceParameter::ConstraintDefaultBias,
        SpaceParameter::TestMotionMinContactDepth,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SpaceParameter::ContactRecycleRadius => "contact_recycle_radius",
            SpaceParameter::ContactMaxSeparation => "contact_max_separation",
            SpaceParameter::ContactMaxAllowedPenetration => "contact_max_allowed_penetration",
            SpaceParameter::BodyLinearVelocitySleepThreshold => {
                "body_linear_velocity_sleep_threshold"
            }
            SpaceParameter::BodyAngularVelocitySleepThreshold => {
                "body_angular_velocity_sleep_threshold"
            }
            SpaceParameter::BodyTimeToSleep => "body_time_to_sleep",
            SpaceParameter::BodyAngularVelocityDampRatio => "body_angular_velocity_damp_ratio",
            SpaceParameter::ConstraintDefaultBias => "constraint_default_bias",
            SpaceParameter::TestMotionMinContactDepth => "test_motion_min_contact_depth",
        }
    }
}

impl fmt::Display for SpaceParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u32> for SpaceParameter {
    type Error = SpaceError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        SpaceParameter::ALL
            .get(value as usize)
            .copied()
            .ok_or_else(|| SpaceError::UnknownParameter(value.to_string()))
    }
}

impl FromStr for SpaceParameter {
    type Err = SpaceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SpaceParameter::ALL
            .iter()
            .copied()
            .find(|param| param.name() == s)
            .ok_or_else(|| SpaceError::UnknownParameter(s.to_string()))
    }
}

/// Current values of every [`SpaceParameter`]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SpaceParams {
    pub contact_recycle_radius: f32,
    pub contact_max_separation: f32,
    pub contact_max_allowed_penetration: f32,
    pub body_linear_velocity_sleep_threshold: f32,
    /// Radians per second
    pub body_angular_velocity_sleep_threshold: f32,
    /// Seconds of sub-threshold motion before a body may sleep
    pub body_time_to_sleep: f32,
    pub body_angular_velocity_damp_ratio: f32,
    pub constraint_default_bias: f32,
    pub test_motion_min_contact_depth: f32,
}

impl Default for SpaceParams {
    fn default() -> Self {
        Self {
            contact_recycle_radius: 0.01,
            contact_max_separation: 0.05,
            contact_max_allowed_penetration: 0.01,
            body_linear_velocity_sleep_threshold: 0.1,
            body_angular_velocity_sleep_threshold: (8.0f32).to_radians(),
            body_time_to_sleep: 0.5,
            body_angular_velocity_damp_ratio: 10.0,
            constraint_default_bias: 0.01,
            test_motion_min_contact_depth: 0.00001,
        }
    }
}

impl SpaceParams {
    pub fn get(&self, param: SpaceParameter) -> f32 {
        match param {
            SpaceParameter::ContactRecycleRadius => self.contact_recycle_radius,
            SpaceParameter::ContactMaxSeparation => self.contact_max_separation,
            SpaceParameter::ContactMaxAllowedPenetration => self.contact_max_allowed_penetration,
            SpaceParameter::BodyLinearVelocitySleepThreshold => {
                self.body_linear_velocity_sleep_threshold
            }
            SpaceParameter::BodyAngularVelocitySleepThreshold => {
                self.body_angular_velocity_sleep_threshold
            }
            SpaceParameter::BodyTimeToSleep => self.body_time_to_sleep,
            SpaceParameter::BodyAngularVelocityDampRatio => self.body_angular_velocity_damp_ratio,
            SpaceParameter::ConstraintDefaultBias => self.constraint_default_bias,
            SpaceParameter::TestMotionMinContactDepth => self.test_motion_min_contact_depth,
        }
    }

    /// Set a parameter. Non-finite or negative values are rejected.
    pub fn set(&mut self, param: SpaceParameter, value: f32) -> Result<(), SpaceError> {
        if !value.is_finite() || value < 0.0 {
            error!(param = %param, value, "Rejected space parameter value");
            return Err(SpaceError::InvalidParameterValue {
                name: param.name(),
                value,
            });
        }

        let slot = match param {
            SpaceParameter::ContactRecycleRadius => &mut self.contact_recycle_radius,
            SpaceParameter::ContactMaxSeparation => &mut self.contact_max_separation,
            SpaceParameter::ContactMaxAllowedPenetration => {
                &mut self.contact_max_allowed_penetration
            }
            SpaceParameter::BodyLinearVelocitySleepThreshold => {
                &mut self.body_linear_velocity_sleep_threshold
            }
            SpaceParameter::BodyAngularVelocitySleepThreshold => {
                &mut self.body_angular_velocity_sleep_threshold
            }
            SpaceParameter::BodyTimeToSleep => &mut self.body_time_to_sleep,
            SpaceParameter::BodyAngularVelocityDampRatio => {
                &mut self.body_angular_velocity_damp_ratio
            }
            SpaceParameter::ConstraintDefaultBias => &mut self.constraint_default_bias,
            SpaceParameter::TestMotionMinContactDepth => &mut self.test_motion_min_contact_depth,
        };
        *slot = value;
        debug!(param = %param, value, "Space parameter set");
        Ok(())
    }
}

/// Full configuration of a space: parameters, solver settings and the
/// medium of the default area.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SpaceConfig {
    pub params: SpaceParams,
    /// Sequential impulse iterations per island
    pub solver_iterations: u32,
    /// Gravity of the default area
    pub gravity: Vec3,
    /// Linear damping of the default area
    pub linear_damp: f32,
    /// Angular damping of the default area
    pub angular_damp: f32,
}

impl Default for SpaceConfig {
    fn default() -> Self {
        Self {
            params: SpaceParams::default(),
            solver_iterations: 8,
            gravity: Vec3::new(0.0, -9.8, 0.0),
            linear_damp: 0.1,
            angular_damp: 0.1,
        }
    }
}

impl SpaceConfig {
    /// Parse a configuration from JSON; missing fields fall back to defaults
    pub fn from_json_str(json: &str) -> Result<Self, SpaceError> {
        let config = serde_json::from_str(json)?;
        Ok(config)
    }

    /// Load a configuration from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SpaceError> {
        let path = path.as_ref();
        info!(path = ?path, "Loading space config");

        let json = fs::read_to_string(path)?;
        let config = Self::from_json_str(&json)?;

        info!(path = ?path, "Space config loaded");
        Ok(config)
    }

    /// Save this configuration as pretty-printed JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), SpaceError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        info!(path = ?path, "Space config saved");
        Ok(())
    }
}
