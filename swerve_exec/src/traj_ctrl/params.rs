//! Parameters structure for TrajCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for trajectory control.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrajCtrlParams {

    // ---- GAINS ----

    /// Proportional, integral and derivative gains of the field X position controller.
    pub x_gains: [f64; 3],

    /// Proportional, integral and derivative gains of the field Y position controller.
    pub y_gains: [f64; 3],

    /// Proportional, integral and derivative gains of the profiled heading controller.
    pub theta_gains: [f64; 3],

    /// Maximum rotation rate of the heading profile.
    ///
    /// Units: radians/second
    pub theta_max_rate_rads: f64,

    /// Maximum rotation acceleration of the heading profile.
    ///
    /// Units: radians/second^2
    pub theta_max_accel_rads2: f64,

    // ---- TOLERANCES ----

    /// Maximum X and Y position error, in the robot frame, to be at the reference.
    ///
    /// Units: meters
    pub pos_tolerance_m: [f64; 2],

    /// Maximum heading error to be at the reference.
    ///
    /// Units: radians
    pub head_tolerance_rad: f64,

    // ---- FAULTS ----

    /// Minimum time between two reports of a follower fault.
    ///
    /// Units: seconds
    pub fault_report_interval_s: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for TrajCtrlParams {
    fn default() -> Self {
        Self {
            x_gains: [3.0, 0.0, 0.0],
            y_gains: [3.0, 0.0, 0.0],
            theta_gains: [8.0, 0.0, 0.01],
            theta_max_rate_rads: 4.0,
            theta_max_accel_rads2: 4.0,
            pos_tolerance_m: [0.5, 0.5],
            head_tolerance_rad: 10f64.to_radians(),
            fault_report_interval_s: 2.0,
        }
    }
}
