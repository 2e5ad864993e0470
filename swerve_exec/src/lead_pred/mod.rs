//! # Lead prediction module
//!
//! Computes where to aim a launcher while the robot is moving. A ball leaves the robot carrying
//! the robot's velocity, so aiming straight at the target misses. Instead the predictor finds a
//! virtual target, offset by the distance the robot's motion carries the ball during its flight.
//!
//! Because the time of flight depends on the distance to the virtual target, which in turn
//! depends on the time of flight, the aim point is found by fixed point iteration.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod predictor;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use params::*;
pub use predictor::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum LeadPredError {
    #[error("Non-finite {0} passed to the lead predictor")]
    NonFiniteInput(&'static str),

    #[error("Lookahead time must not be negative, got {0} s")]
    NegativeLookahead(f64),
}
