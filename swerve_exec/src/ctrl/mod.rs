//! # Control primitives
//!
//! Feedback controllers and motion profiles shared by the heading controller and the trajectory
//! follower.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod pid;
mod profile;

// ---------------------------------------------------------------------------
// EXPORTS
// ---------------------------------------------------------------------------

pub use pid::*;
pub use profile::*;
