//! # Autonomous Script Definitions
//!
//! An autonomous script is a list of steps. Trajectory steps drive a pre-computed path while
//! applying a heading schedule and firing scripted actions; script steps run their actions
//! immediately, in order.
//!
//! Actions form a closed set. Anything not listed in [`AutoAction`] is rejected when the script
//! is parsed, before any step runs.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A complete autonomous script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoScript {
    pub steps: Vec<AutoStepSpec>,
}

/// Definition of one trajectory step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryStepSpec {
    /// Time-stamped trajectory states, in increasing time order.
    pub states: Vec<TrajectoryState>,

    /// Heading schedule. The first entry gives the heading at the start of the path.
    pub rotations: Vec<TimedRotation>,

    /// Actions triggered by elapsed time, `trigger` in seconds.
    #[serde(default)]
    pub time_actions: Vec<TimedAction>,

    /// Actions triggered by path completion fraction, `trigger` in `[0, 1]`.
    #[serde(default)]
    pub fraction_actions: Vec<TimedAction>,
}

/// A single state of a pre-computed trajectory.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryState {
    pub time_s: f64,
    pub x_m: f64,
    pub y_m: f64,

    /// Direction of travel along the path (not the robot heading).
    pub heading_deg: f64,

    pub velocity_ms: f64,

    #[serde(default)]
    pub accel_ms2: f64,

    #[serde(default)]
    pub curvature_radpm: f64,
}

/// A heading the robot should face from `time_s` onwards.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedRotation {
    pub time_s: f64,
    pub heading_deg: f64,
}

/// An action and the key that triggers it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedAction {
    pub trigger: f64,

    #[serde(rename = "do")]
    pub action: AutoAction,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// One step of an autonomous script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum AutoStepSpec {
    Trajectory(TrajectoryStepSpec),
    Script { actions: Vec<AutoAction> },
}

/// The closed set of actions an autonomous script can perform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AutoAction {
    /// Write a message to the log.
    Print { message: String },

    /// Block the autonomous task for the given time.
    Sleep { duration_s: f64 },

    /// Enable or disable aiming at the target while driving.
    SetAutoAiming { enabled: bool },

    /// Change the maximum linear acceleration of the drive.
    SetAccelLimit { accel_ms2: f64 },

    /// Turn in place to the given heading and wait for the turn to finish.
    ///
    /// Only valid in script steps.
    TurnTo { heading_deg: f64 },

    /// Fire the given number of game pieces.
    ShootBalls { count: u32 },

    /// Deploy or retract the intake.
    SetIntake { deployed: bool },

    /// Spin the shooter flywheel up to the given speed.
    SetShooterSpeed { rpm: f64 },

    /// Move the shooter hood to the given angle.
    SetHoodAngle { angle_deg: f64 },
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl AutoScript {
    /// Parse a script from JSON.
    pub fn from_json(json_str: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json_str)
    }
}

impl AutoAction {
    /// Returns true if the action is carried out by a subsystem outside the drive.
    pub fn is_subsystem_call(&self) -> bool {
        matches!(
            self,
            AutoAction::ShootBalls { .. }
                | AutoAction::SetIntake { .. }
                | AutoAction::SetShooterSpeed { .. }
                | AutoAction::SetHoodAngle { .. }
        )
    }

    /// Short name of the action, as written in scripts.
    pub fn name(&self) -> &'static str {
        match self {
            AutoAction::Print { .. } => "print",
            AutoAction::Sleep { .. } => "sleep",
            AutoAction::SetAutoAiming { .. } => "set_auto_aiming",
            AutoAction::SetAccelLimit { .. } => "set_accel_limit",
            AutoAction::TurnTo { .. } => "turn_to",
            AutoAction::ShootBalls { .. } => "shoot_balls",
            AutoAction::SetIntake { .. } => "set_intake",
            AutoAction::SetShooterSpeed { .. } => "set_shooter_speed",
            AutoAction::SetHoodAngle { .. } => "set_hood_angle",
        }
    }
}
