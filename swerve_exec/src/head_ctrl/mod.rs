//! # Heading control module
//!
//! Drives the robot to face a target heading using a continuous-input PID loop. Used on its own
//! for turn-to-angle, and as the rotation source whenever the robot aims at a target.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use params::*;
pub use state::*;
