//! # Trajectory controllers module
//!
//! This module provides the holonomic controller used by TrajCtrl. X and Y position errors are
//! corrected by independent PID controllers on top of the trajectory's velocity feedforward,
//! while heading is driven by a profiled PID controller so that large heading changes are spread
//! out over the path.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::debug;
use nalgebra::Vector2;
use serde::Serialize;
use std::f64::consts::PI;

// Internal
use super::{TrajCtrlError, TrajCtrlParams, TrajectorySample};
use crate::ctrl::{PidController, ProfileConstraints, ProfiledPidController};
use crate::drive_ctrl::ChassisVelocity;
use crate::loc::Pose;
use util::maths::get_ang_dist_pi;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Controller for a platform able to translate independently of its heading.
#[derive(Debug, Clone)]
pub struct HolonomicController {
    x_ctrl: PidController,
    y_ctrl: PidController,
    theta_ctrl: ProfiledPidController,

    /// Units: meters
    pos_tolerance_m: Vector2<f64>,

    /// Units: radians
    head_tolerance_rad: f64,

    /// Errors from the last call to `calculate`
    errors: ControllerErrors,

    /// If true the heading controller is reset on the next calculation
    first_run: bool,
}

/// Errors between the robot and the reference.
#[derive(Debug, Copy, Clone, Default, Serialize)]
pub struct ControllerErrors {
    /// Position error (reference minus current) in the robot frame.
    ///
    /// Units: meters
    pub pos_error_m: Vector2<f64>,

    /// Heading error (target minus current).
    ///
    /// Units: radians
    pub head_error_rad: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl HolonomicController {
    /// Build the controller from the parameters, checking they describe a usable controller.
    pub fn new(params: &TrajCtrlParams) -> Result<Self, TrajCtrlError> {
        let constraints =
            ProfileConstraints::new(params.theta_max_rate_rads, params.theta_max_accel_rads2);

        if !constraints.is_valid() {
            return Err(TrajCtrlError::InvalidControllerParams(format!(
                "heading profile constraints {:?}",
                constraints
            )));
        }

        let gains_ok = params
            .x_gains
            .iter()
            .chain(params.y_gains.iter())
            .chain(params.theta_gains.iter())
            .all(|g| g.is_finite());
        if !gains_ok {
            return Err(TrajCtrlError::InvalidControllerParams(
                "non-finite gains".into(),
            ));
        }

        let [xp, xi, xd] = params.x_gains;
        let [yp, yi, yd] = params.y_gains;
        let [tp, ti, td] = params.theta_gains;

        Ok(Self {
            x_ctrl: PidController::new(xp, xi, xd),
            y_ctrl: PidController::new(yp, yi, yd),
            theta_ctrl: ProfiledPidController::new(tp, ti, td, constraints)
                .with_continuous_input(-PI, PI),
            pos_tolerance_m: Vector2::new(params.pos_tolerance_m[0], params.pos_tolerance_m[1]),
            head_tolerance_rad: params.head_tolerance_rad,
            errors: ControllerErrors::default(),
            first_run: true,
        })
    }

    /// Reset the controllers, the heading profile restarts from the robot heading on the next
    /// calculation.
    pub fn reset(&mut self) {
        self.x_ctrl.reset();
        self.y_ctrl.reset();
        self.first_run = true;
    }

    /// Calculate the field frame chassis velocity to track `reference`.
    ///
    /// # Inputs
    /// - `pose`: current pose of the robot
    /// - `reference`: the trajectory sample to track
    /// - `target_heading_rad`: heading the robot should face, independent of the direction of
    ///   travel
    /// - `dt`: time since the last calculation
    pub fn calculate(
        &mut self,
        pose: &Pose,
        reference: &TrajectorySample,
        target_heading_rad: f64,
        dt: f64,
    ) -> ChassisVelocity {
        if self.first_run {
            self.theta_ctrl.reset(pose.heading_rad);
            self.first_run = false;
        }

        // Feedforward from the trajectory, along the direction of travel
        let ff = reference.pose.forward2() * reference.velocity_ms;

        let omega = self
            .theta_ctrl
            .calculate(pose.heading_rad, target_heading_rad, dt);

        let vx = ff[0]
            + self
                .x_ctrl
                .calculate(pose.position_m[0], reference.pose.position_m[0], Some(dt));
        let vy = ff[1]
            + self
                .y_ctrl
                .calculate(pose.position_m[1], reference.pose.position_m[1], Some(dt));

        self.errors = ControllerErrors {
            pos_error_m: pose.to_robot_frame(&(reference.pose.position_m - pose.position_m)),
            head_error_rad: get_ang_dist_pi(target_heading_rad, pose.heading_rad),
        };

        debug!(
            "Holonomic errors: pos ({:.3}, {:.3}) m, head {:.3} rad",
            self.errors.pos_error_m[0], self.errors.pos_error_m[1], self.errors.head_error_rad
        );

        ChassisVelocity::field(vx, vy, omega)
    }

    /// True if the errors of the last calculation are all within tolerance.
    pub fn at_reference(&self) -> bool {
        self.errors.pos_error_m[0].abs() < self.pos_tolerance_m[0]
            && self.errors.pos_error_m[1].abs() < self.pos_tolerance_m[1]
            && self.errors.head_error_rad.abs() < self.head_tolerance_rad
    }

    pub fn errors(&self) -> ControllerErrors {
        self.errors
    }
}
