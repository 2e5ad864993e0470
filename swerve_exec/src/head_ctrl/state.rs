//! Implementation of the heading controller

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

// Internal
use super::HeadCtrlParams;
use crate::ctrl::PidController;
use util::maths::{get_ang_dist_pi, limit_magnitude, wrap_pi};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A heading to reach, with the rate the heading is expected to be changing at when reached.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeadingGoal {
    /// Units: radians
    pub heading_rad: f64,

    /// Feed-forward rate added to the controller output.
    ///
    /// Units: radians/second
    pub rate_rads: f64,
}

/// Heading controller state
#[derive(Debug, Clone)]
pub struct HeadCtrl {
    params: HeadCtrlParams,

    pid: PidController,

    /// Time of the last call to `turn_to`, used to detect stale controller state.
    last_update_s: Option<f64>,

    /// Error on the last call to `turn_to`.
    last_error_rad: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl HeadingGoal {
    /// A goal of holding `heading_rad` still.
    pub fn fixed(heading_rad: f64) -> Self {
        Self {
            heading_rad: wrap_pi(heading_rad),
            rate_rads: 0.0,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.heading_rad.is_finite() && self.rate_rads.is_finite()
    }
}

impl HeadCtrl {
    pub fn new(params: &HeadCtrlParams) -> Self {
        let pid = PidController::new(params.k_p, params.k_i, params.k_d)
            .with_continuous_input(-PI, PI)
            .with_integrator_range(-params.integrator_limit_rads, params.integrator_limit_rads);

        Self {
            params: params.clone(),
            pid,
            last_update_s: None,
            last_error_rad: 0.0,
        }
    }

    /// Compute the rotation rate that turns the robot from `heading_rad` towards `goal`.
    ///
    /// If `limit_output_speed` is set the output magnitude is capped at the aiming rate while
    /// keeping its sign.
    ///
    /// Units: radians/second
    pub fn turn_to(
        &mut self,
        now_s: f64,
        goal: &HeadingGoal,
        heading_rad: f64,
        limit_output_speed: bool,
    ) -> f64 {
        self.pid.set_setpoint(goal.heading_rad);
        let error = self.pid.error_to(heading_rad);

        let stale = match self.last_update_s {
            Some(t) => now_s - t > self.params.stale_reset_s,
            None => true,
        };

        if stale {
            self.pid.reset();
        } else if error.abs() > self.params.i_zone_rad {
            self.pid.reset_integral();
        }

        self.last_update_s = Some(now_s);
        self.last_error_rad = error;

        let mut out = self.pid.get(error, now_s) + goal.rate_rads;

        if limit_output_speed {
            out = limit_magnitude(out, self.params.aiming_max_rate_rads);
        }

        trace!(
            "HeadCtrl: error {:.4} rad, output {:.4} rad/s",
            error,
            out
        );

        out
    }

    /// True if the robot at `heading_rad`, rotating at `rate_rads`, has reached the goal
    /// heading.
    pub fn is_done(&self, goal_heading_rad: f64, heading_rad: f64, rate_rads: f64) -> bool {
        self.is_done_within(
            goal_heading_rad,
            heading_rad,
            rate_rads,
            self.params.tolerance_rad,
        )
    }

    /// As `is_done` but with a specific heading tolerance.
    pub fn is_done_within(
        &self,
        goal_heading_rad: f64,
        heading_rad: f64,
        rate_rads: f64,
        tolerance_rad: f64,
    ) -> bool {
        let in_tol = get_ang_dist_pi(goal_heading_rad, heading_rad).abs() < tolerance_rad;

        if self.params.require_stopped {
            in_tol && rate_rads.abs() < self.params.stop_rate_rads
        } else {
            in_tol
        }
    }

    /// Error on the last update.
    ///
    /// Units: radians
    pub fn last_error_rad(&self) -> f64 {
        self.last_error_rad
    }

    pub fn params(&self) -> &HeadCtrlParams {
        &self.params
    }

    /// Clear the controller history.
    pub fn reset(&mut self) {
        self.pid.reset();
        self.last_update_s = None;
    }
}
