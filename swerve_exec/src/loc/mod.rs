//! # Localisation module
//!
//! Pose estimation (odometry and vision fusion) is performed outside of the drive core. This
//! module defines the pose snapshot the estimator provides once per control cycle.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{Rotation2, Vector2};
use serde::{Deserialize, Serialize};
use util::maths::wrap_pi;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The pose (position and heading in the field frame) of the robot.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// The position in the field frame.
    ///
    /// Units: meters
    pub position_m: Vector2<f64>,

    /// Heading of the robot, angle from the field X axis following the right hand rule about Z+.
    ///
    /// Units: radians
    pub heading_rad: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Pose {
    fn default() -> Self {
        Self {
            position_m: Vector2::zeros(),
            heading_rad: 0.0,
        }
    }
}

impl Pose {
    /// Create a new pose, wrapping the heading into `[-pi, pi)`.
    pub fn new(x_m: f64, y_m: f64, heading_rad: f64) -> Self {
        Self {
            position_m: Vector2::new(x_m, y_m),
            heading_rad: wrap_pi(heading_rad),
        }
    }

    /// Unit vector pointing in the direction of the heading.
    pub fn forward2(&self) -> Vector2<f64> {
        Vector2::new(self.heading_rad.cos(), self.heading_rad.sin())
    }

    /// Express a field frame vector in the robot frame of this pose.
    pub fn to_robot_frame(&self, vec_field: &Vector2<f64>) -> Vector2<f64> {
        Rotation2::new(-self.heading_rad) * vec_field
    }

    /// True if all components are finite.
    pub fn is_finite(&self) -> bool {
        self.position_m.iter().all(|v| v.is_finite()) && self.heading_rad.is_finite()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_robot_frame() {
        let pose = Pose::new(1.0, 1.0, std::f64::consts::FRAC_PI_2);

        // A vector pointing along field Y is straight ahead for a robot facing Y
        let v = pose.to_robot_frame(&Vector2::new(0.0, 2.0));
        assert!((v[0] - 2.0).abs() < 1e-12);
        assert!(v[1].abs() < 1e-12);
        assert!((pose.forward2()[1] - 1.0).abs() < 1e-12);
    }
}
