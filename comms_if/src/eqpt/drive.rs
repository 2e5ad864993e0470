//! # Swerve Drive Equipment Demands and Sensor Data

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Number of swerve modules on the drivetrain.
///
/// Modules are always indexed in the order left-front, left-back, right-front, right-back.
pub const NUM_MODULES: usize = 4;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Demands sent to the swerve modules each cycle.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, Default, PartialEq)]
pub struct DriveDems {
    /// The demanded steer axis absolute position.
    ///
    /// `None` means the module shall keep its current steer setpoint.
    ///
    /// Units: radians
    pub str_abs_pos_rad: [Option<f64>; NUM_MODULES],

    /// The demanded wheel ground speed.
    ///
    /// Units: meters/second
    pub drv_speed_ms: [f64; NUM_MODULES],
}

/// Sensor data returned by the swerve modules.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, Default, PartialEq)]
pub struct DriveSensData {
    /// Measured steer axis absolute position.
    ///
    /// Units: radians
    pub str_abs_pos_rad: [f64; NUM_MODULES],

    /// Measured wheel ground speed.
    ///
    /// Units: meters/second
    pub drv_speed_ms: [f64; NUM_MODULES],
}
