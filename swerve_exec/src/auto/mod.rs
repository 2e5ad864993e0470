//! # Autonomy Module
//!
//! Runs autonomous scripts. A script is loaded and validated in full before it starts, then
//! executed step by step on its own thread by the [`AutoMgr`]. Trajectory steps hand the path to
//! drive control and, while it is being followed, apply the heading schedule and fire the
//! scripted actions when their trigger comes up.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Autonomy manager - runs scripts on a background thread
pub mod auto_mgr;

/// Executes loaded steps against the drive
pub mod executor;

/// Parameters of the autonomy module
pub mod params;

/// Heading schedule and action queues
pub mod schedule;

/// Subsystems outside the drive which carry out scripted actions
pub mod sink;

/// Loaded and validated script steps
pub mod step;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use auto_mgr::AutoMgr;
pub use executor::{StepExecutor, StepOutcome};
pub use params::AutoParams;
pub use schedule::{ActionQueue, RotationSchedule, ScheduledAction};
pub use sink::{ActionError, ActionSink, LoggingSink};
pub use step::{load_script, AutoStep, TrajectoryStep};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Longest wait a script action or autonomy parameter can ask for.
///
/// Units: seconds
pub const MAX_WAIT_S: f64 = 3600.0;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Possible errors that can occur in the autonomy system.
#[derive(Debug, thiserror::Error)]
pub enum AutoError {
    #[error("Could not read the autonomous script: {0}")]
    ScriptReadError(std::io::Error),

    #[error("Could not parse the autonomous script: {0}")]
    ScriptParseError(serde_json::Error),

    #[error("Action {0} is not allowed in a trajectory step")]
    ActionNotAllowed(&'static str),

    #[error("Action {name} is invalid: {reason}")]
    InvalidAction { name: &'static str, reason: String },

    #[error("A trajectory step needs at least one scheduled rotation")]
    NoRotations,

    #[error("Trigger values must be finite, got {0}")]
    NonFiniteTrigger(f64),

    #[error("Invalid trajectory: {0}")]
    TrajError(#[from] crate::traj_ctrl::TrajError),

    #[error("Drive control error: {0}")]
    DriveCtrlError(#[from] crate::drive_ctrl::DriveCtrlError),

    #[error("An autonomous script is already running")]
    AlreadyRunning,

    #[error("Could not spawn the autonomy thread: {0}")]
    ThreadSpawnError(std::io::Error),

    #[error("The autonomy thread panicked")]
    ThreadPanicked,
}
