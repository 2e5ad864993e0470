//! # Drive control module
//!
//! Drive control owns the drivetrain. Once per control cycle it selects what the robot should be
//! doing from the current `DriveMode`, bounds the resulting chassis velocity with the
//! acceleration limiter and converts it into demands for the four swerve modules.
//!
//! Other tasks (telecommand processing, the autonomous manager) interact with it through a
//! cloneable `DriveHandle`.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod accel_limit;
mod calc_hold;
mod calc_swerve;
mod cmd;
mod handle;
mod module;
mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use accel_limit::*;
pub use calc_swerve::*;
pub use cmd::*;
pub use handle::*;
pub use module::*;
pub use params::*;
pub use state::*;

pub use comms_if::eqpt::drive::NUM_MODULES;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during DriveCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum DriveCtrlError {
    #[error("Module index {0} is out of range, there are only {} modules", NUM_MODULES)]
    InvalidModuleIndex(usize),

    #[error("Received a non-finite velocity command: {0:?}")]
    NonFiniteVelocity(ChassisVelocity),

    #[error("Received a non-finite heading goal: {0}")]
    NonFiniteHeading(f64),

    #[error("Input data contains non-finite values")]
    NonFiniteInput,

    #[error("Acceleration limit must be finite and positive, got {0}")]
    InvalidAccelLimit(f64),

    #[error("Could not load the drive parameters: {0}")]
    ParamLoadError(#[from] util::params::LoadError),

    #[error("Could not initialise the drive archives: {0}")]
    ArchiveError(#[from] util::archive::ArchiveError),

    #[error("Trajectory control error: {0}")]
    TrajCtrlError(#[from] crate::traj_ctrl::TrajCtrlError),

    #[error("Lead prediction error: {0}")]
    LeadPredError(#[from] crate::lead_pred::LeadPredError),
}
