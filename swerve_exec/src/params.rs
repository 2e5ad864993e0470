//! # Swerve Executable Parameters
//!
//! This module provides parameters for the swerve executable.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

use crate::{auto::AutoParams, sim::SimParams};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SwerveExecParams {
    /// Target period of one cycle.
    ///
    /// Units: seconds
    pub cycle_period_s: f64,

    /// Number of consecutive cycle overruns after which the drive is made safe.
    pub max_consec_cycle_overruns: u64,

    /// Pose of the simulated robot at start up, `[x_m, y_m, heading_rad]`.
    pub sim_start_pose: [f64; 3],

    /// Simulated module dynamics
    pub sim: SimParams,

    /// Autonomy parameters
    pub auto: AutoParams,
}

impl Default for SwerveExecParams {
    fn default() -> Self {
        Self {
            cycle_period_s: 0.02,
            max_consec_cycle_overruns: 50,
            sim_start_pose: [0.0; 3],
            sim: SimParams::default(),
            auto: AutoParams::default(),
        }
    }
}
