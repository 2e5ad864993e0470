//! # Drive control telecommands

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Serialize, Deserialize};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// The frame a velocity is expressed in.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frame {
    /// Fixed to the robot chassis, X forwards and Y to the left.
    Robot,

    /// Fixed to the playing field.
    Field,
}

/// A command to the drive control module.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum DriveCmd {
    /// Drive at the given chassis velocity.
    Velocity {
        /// Frame the velocity is given in.
        frame: Frame,

        /// Units: meters/second
        vx_ms: f64,

        /// Units: meters/second
        vy_ms: f64,

        /// Follows the right hand rule about the robot's Z+ (upwards) axis.
        ///
        /// Units: radians/second
        omega_rads: f64
    },

    /// Turn to face the given field heading, keeping any translation command.
    TurnTo {
        /// Units: radians
        heading_rad: f64,

        /// Feed-forward angular rate at the goal.
        ///
        /// Units: radians/second
        #[serde(default)]
        rate_rads: f64
    },

    /// Hold position with the wheels locked in an X pattern.
    Hold,

    /// Return to operator control with a zero velocity command.
    Teleop,

    /// Decelerate to a stop.
    Stop,

    /// Change the maximum linear acceleration of the drive.
    SetAccelLimit {
        /// Units: meters/second^2
        accel_ms2: f64
    },
}
