//! Parameters structure for lead prediction

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for lead prediction.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LeadPredParams {
    /// Position of the target in the field frame.
    ///
    /// Units: meters
    pub target_pos_m: [f64; 2],

    /// Number of fixed point iterations used to solve for the aim point.
    pub num_iterations: usize,

    /// Lookahead applied when no shot has been fired recently.
    ///
    /// Units: seconds
    pub base_lookahead_s: f64,

    /// Delay between commanding a turn and the robot responding, added to the lookahead.
    ///
    /// Units: seconds
    pub turn_delay_s: f64,

    /// Time step between the two predictions used to estimate the aim heading rate.
    ///
    /// Units: seconds
    pub heading_rate_step_s: f64,

    /// The time of flight model.
    pub tof: TofParams,
}

/// Piecewise linear time of flight model, continuous at the breakpoint.
#[derive(Debug, Copy, Clone, Deserialize)]
#[serde(default)]
pub struct TofParams {
    /// Units: meters
    pub breakpoint_m: f64,

    /// Time of flight at the breakpoint distance.
    ///
    /// Units: seconds
    pub tof_at_breakpoint_s: f64,

    /// Slope below the breakpoint.
    ///
    /// Units: seconds/meter
    pub near_slope_spm: f64,

    /// Slope above the breakpoint.
    ///
    /// Units: seconds/meter
    pub far_slope_spm: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for LeadPredParams {
    fn default() -> Self {
        Self {
            target_pos_m: [8.25, 0.0],
            num_iterations: 40,
            base_lookahead_s: 0.15,
            turn_delay_s: 0.0,
            heading_rate_step_s: 0.1,
            tof: TofParams::default(),
        }
    }
}

impl Default for TofParams {
    fn default() -> Self {
        // Measured at 30 frames per second against distance in inches: 22 frames at 113 inches,
        // 0.02 frames per inch below 120 inches and 0.071 frames per inch above.
        const IN_TO_M: f64 = 0.0254;
        let near = 0.02 / 30.0 / IN_TO_M;

        Self {
            breakpoint_m: 120.0 * IN_TO_M,
            tof_at_breakpoint_s: 22.0 / 30.0 + near * 7.0 * IN_TO_M,
            near_slope_spm: near,
            far_slope_spm: 0.071 / 30.0 / IN_TO_M,
        }
    }
}
