//! Chassis velocity commands passed into DriveCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::{Rotation2, Vector2};
use serde::{Deserialize, Serialize};

// Internal
pub use comms_if::tc::drive::Frame;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The linear and angular velocity of the robot, tagged with the frame the linear part is
/// expressed in.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChassisVelocity {
    pub frame: Frame,

    /// Units: meters/second
    pub vx_ms: f64,

    /// Units: meters/second
    pub vy_ms: f64,

    /// Rotation rate about Z+, identical in both frames.
    ///
    /// Units: radians/second
    pub omega_rads: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for ChassisVelocity {
    fn default() -> Self {
        Self::zero(Frame::Robot)
    }
}

impl ChassisVelocity {
    pub fn new(frame: Frame, vx_ms: f64, vy_ms: f64, omega_rads: f64) -> Self {
        Self {
            frame,
            vx_ms,
            vy_ms,
            omega_rads,
        }
    }

    pub fn robot(vx_ms: f64, vy_ms: f64, omega_rads: f64) -> Self {
        Self::new(Frame::Robot, vx_ms, vy_ms, omega_rads)
    }

    pub fn field(vx_ms: f64, vy_ms: f64, omega_rads: f64) -> Self {
        Self::new(Frame::Field, vx_ms, vy_ms, omega_rads)
    }

    pub fn zero(frame: Frame) -> Self {
        Self::new(frame, 0.0, 0.0, 0.0)
    }

    /// Build a velocity from a linear vector and a rate.
    pub fn from_linear(frame: Frame, linear_ms: Vector2<f64>, omega_rads: f64) -> Self {
        Self::new(frame, linear_ms[0], linear_ms[1], omega_rads)
    }

    /// The linear part as a vector.
    pub fn linear(&self) -> Vector2<f64> {
        Vector2::new(self.vx_ms, self.vy_ms)
    }

    pub fn is_finite(&self) -> bool {
        self.vx_ms.is_finite() && self.vy_ms.is_finite() && self.omega_rads.is_finite()
    }

    pub fn is_zero(&self) -> bool {
        self.vx_ms == 0.0 && self.vy_ms == 0.0 && self.omega_rads == 0.0
    }

    /// True if the linear part is zero.
    pub fn is_stationary(&self) -> bool {
        self.vx_ms == 0.0 && self.vy_ms == 0.0
    }

    /// Express this velocity in the field frame, with the robot at `heading_rad`.
    pub fn to_field(&self, heading_rad: f64) -> Self {
        match self.frame {
            Frame::Field => *self,
            Frame::Robot => Self::from_linear(
                Frame::Field,
                Rotation2::new(heading_rad) * self.linear(),
                self.omega_rads,
            ),
        }
    }

    /// Express this velocity in the robot frame, with the robot at `heading_rad`.
    pub fn to_robot(&self, heading_rad: f64) -> Self {
        match self.frame {
            Frame::Robot => *self,
            Frame::Field => Self::from_linear(
                Frame::Robot,
                Rotation2::new(-heading_rad) * self.linear(),
                self.omega_rads,
            ),
        }
    }

    /// Express this velocity in `frame`.
    pub fn in_frame(&self, frame: Frame, heading_rad: f64) -> Self {
        match frame {
            Frame::Robot => self.to_robot(heading_rad),
            Frame::Field => self.to_field(heading_rad),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_frames() {
        // Robot facing field +Y driving forwards moves along field +Y
        let v = ChassisVelocity::robot(1.0, 0.0, 0.5).to_field(FRAC_PI_2);
        assert_eq!(v.frame, Frame::Field);
        assert!(v.vx_ms.abs() < 1e-12);
        assert!((v.vy_ms - 1.0).abs() < 1e-12);
        assert_eq!(v.omega_rads, 0.5);

        let back = v.to_robot(FRAC_PI_2);
        assert!((back.vx_ms - 1.0).abs() < 1e-12);
        assert!(back.vy_ms.abs() < 1e-12);

        // Converting into the same frame is a no-op
        assert_eq!(v.in_frame(Frame::Field, 1.0), v);
    }

    #[test]
    fn test_finite() {
        assert!(ChassisVelocity::field(1.0, 2.0, 3.0).is_finite());
        assert!(!ChassisVelocity::field(f64::NAN, 2.0, 3.0).is_finite());
        assert!(!ChassisVelocity::robot(0.0, f64::INFINITY, 0.0).is_finite());
        assert!(ChassisVelocity::default().is_zero());
        assert!(ChassisVelocity::robot(0.0, 0.0, 1.0).is_stationary());
    }
}
