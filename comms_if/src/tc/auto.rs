//! # Autonomy Telecommands

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A command that can be performed by the Autonomy system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum AutoCmd {
    /// Load and run the autonomous script at the given system path.
    Run {
        script_path: PathBuf
    },

    /// Cancel the running autonomous script immediately, stopping the drive.
    Kill,
}
