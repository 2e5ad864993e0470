//! Parameters structure for HeadCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for heading control.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HeadCtrlParams {

    // ---- GAINS ----

    pub k_p: f64,
    pub k_i: f64,
    pub k_d: f64,

    /// Limit of the integral term's contribution to the output, applied symmetrically.
    ///
    /// Units: radians/second
    pub integrator_limit_rads: f64,

    /// If the heading error is larger than this the integral is cleared.
    ///
    /// Units: radians
    pub i_zone_rad: f64,

    /// If the controller has not been run for longer than this it is reset before use.
    ///
    /// Units: seconds
    pub stale_reset_s: f64,

    // ---- COMPLETION ----

    /// Heading error under which a turn is considered done.
    ///
    /// Units: radians
    pub tolerance_rad: f64,

    /// Angular rate under which the robot is considered stopped.
    ///
    /// Units: radians/second
    pub stop_rate_rads: f64,

    /// If true a turn is only done once the robot has also stopped rotating.
    pub require_stopped: bool,

    // ---- LIMITS ----

    /// Maximum rotation rate commanded while aiming and translating at the same time.
    ///
    /// Units: radians/second
    pub aiming_max_rate_rads: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for HeadCtrlParams {
    fn default() -> Self {
        Self {
            k_p: 8.0,
            k_i: 0.5,
            k_d: 0.0,
            integrator_limit_rads: 8.0 * std::f64::consts::PI,
            i_zone_rad: 7f64.to_radians(),
            stale_reset_s: 0.2,
            tolerance_rad: 0.85f64.to_radians(),
            stop_rate_rads: 5.2f64.to_radians(),
            require_stopped: false,
            aiming_max_rate_rads: 4.0,
        }
    }
}
