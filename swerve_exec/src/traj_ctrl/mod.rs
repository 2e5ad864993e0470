//! # Trajectory control module
//!
//! Trajectory control keeps the robot on a pre-computed, time parameterised trajectory. Each
//! cycle the trajectory is sampled at the time elapsed since the start of the path, and a
//! holonomic controller corrects the position error in X and Y independently while a profiled
//! loop drives the heading towards the currently scheduled target heading.
//!
//! The path is finished once its duration has elapsed, whether or not the controller reports
//! that the robot is at the reference. This guarantees that a path always terminates.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod controllers;
pub mod params;
pub mod state;
pub mod trajectory;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use controllers::*;
pub use params::TrajCtrlParams;
pub use state::*;
pub use trajectory::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Potential errors that can occur during processing of the module.
#[derive(Debug, thiserror::Error)]
pub enum TrajCtrlError {
    /// The controller could not be built from the parameters.
    #[error("Invalid holonomic controller parameters: {0}")]
    InvalidControllerParams(String),

    /// Attempted to follow a trajectory when none is loaded.
    #[error("No trajectory has been loaded")]
    NoTrajectory,

    /// The pose provided to the controller is not finite.
    #[error("The pose contains non-finite values")]
    NonFinitePose,
}

/// Errors found while validating a trajectory.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TrajError {
    #[error("A trajectory must contain at least one sample")]
    Empty,

    #[error("Sample {0} does not come strictly after the previous sample")]
    NonMonotonicTime(usize),

    #[error("Sample {0} contains non-finite values")]
    NonFinite(usize),

    #[error("Cannot generate a trajectory: {0}")]
    GenerationError(String),
}
