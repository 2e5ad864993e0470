//! Autonomy parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters of the autonomy system.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct AutoParams {
    /// Longest time the executor waits for a drive update before checking for cancellation.
    ///
    /// Units: seconds
    pub poll_period_s: f64,

    /// Time after which a scripted turn is abandoned.
    ///
    /// Units: seconds
    pub turn_timeout_s: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for AutoParams {
    fn default() -> Self {
        Self {
            poll_period_s: 0.005,
            turn_timeout_s: 3.0,
        }
    }
}
