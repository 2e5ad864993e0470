//! Swerve module identifiers and states

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector2;
use serde::Serialize;
use std::convert::TryFrom;
use std::f64::consts::{FRAC_PI_2, PI};

// Internal
use super::{DriveCtrlError, NUM_MODULES};
use util::maths::{get_ang_dist_pi, wrap_pi};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Identifies one of the four swerve modules, in the fixed index order used by every array of
/// per-module data.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum ModuleId {
    LeftFront,
    LeftBack,
    RightFront,
    RightBack,
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Target or measured state of a single module.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize)]
pub struct ModuleState {
    /// Signed wheel ground speed.
    ///
    /// Units: meters/second
    pub speed_ms: f64,

    /// Wheel angle from the robot X axis, in `[-pi, pi)`.
    ///
    /// Units: radians
    pub angle_rad: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ModuleId {
    pub const ALL: [ModuleId; NUM_MODULES] = [
        ModuleId::LeftFront,
        ModuleId::LeftBack,
        ModuleId::RightFront,
        ModuleId::RightBack,
    ];

    pub fn index(self) -> usize {
        match self {
            ModuleId::LeftFront => 0,
            ModuleId::LeftBack => 1,
            ModuleId::RightFront => 2,
            ModuleId::RightBack => 3,
        }
    }
}

impl TryFrom<usize> for ModuleId {
    type Error = DriveCtrlError;

    fn try_from(index: usize) -> Result<Self, Self::Error> {
        ModuleId::ALL
            .get(index)
            .copied()
            .ok_or(DriveCtrlError::InvalidModuleIndex(index))
    }
}

impl ModuleState {
    pub fn new(speed_ms: f64, angle_rad: f64) -> Self {
        Self {
            speed_ms,
            angle_rad: wrap_pi(angle_rad),
        }
    }

    /// State whose wheel moves along `vel_ms`. A zero vector keeps the `fallback_angle_rad`.
    pub fn from_vector(vel_ms: &Vector2<f64>, fallback_angle_rad: f64) -> Self {
        let speed = vel_ms.norm();

        if speed > 0.0 {
            Self::new(speed, vel_ms[1].atan2(vel_ms[0]))
        } else {
            Self::new(0.0, fallback_angle_rad)
        }
    }

    /// Choose between this state and its flipped equivalent (angle + pi, speed negated) so the
    /// module turns by at most 90 degrees from `current_angle_rad`.
    pub fn optimize(&self, current_angle_rad: f64) -> Self {
        let delta = get_ang_dist_pi(self.angle_rad, current_angle_rad);

        if delta.abs() > FRAC_PI_2 {
            Self::new(-self.speed_ms, self.angle_rad + PI)
        } else {
            *self
        }
    }
}
