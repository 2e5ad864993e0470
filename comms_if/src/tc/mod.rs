//! # Telecommand module
//!
//! This module provides telecommand functionality to the communications 
//! interface.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod auto;
pub mod drive;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Serialize, Deserialize};
use thiserror::Error;

// Internal
use self::{auto::AutoCmd, drive::DriveCmd};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A telecommand, i.e. an instruction sent to the robot by an operator or a
/// script.
///
/// In JSON a TC is given by its `type` and an optional `payload`:
///
/// ```json
/// {"type": "drive", "payload": {"cmd": "hold"}}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Tc {
    /// Put the drive into safe mode, stopping all motion.
    MakeSafe,

    /// Attempt to remove safe mode.
    MakeUnsafe,

    /// A drive control command.
    Drive(DriveCmd),

    /// An autonomy command.
    Auto(AutoCmd),
}

/// Possible parsing errors.
#[derive(Debug, Error)]
pub enum TcParseError {
    #[error("TC contains invalid JSON or an unknown TC: {0}")]
    InvalidJson(serde_json::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Tc {
    /// Parse a new TC from a JSON packet
    pub fn from_json(json_str: &str) -> Result<Self, TcParseError> {
        serde_json::from_str(json_str).map_err(TcParseError::InvalidJson)
    }

    /// Serialise the TC into a JSON packet
    pub fn to_json(&self) -> Result<String, TcParseError> {
        serde_json::to_string(self).map_err(TcParseError::InvalidJson)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use drive::Frame;

    #[test]
    fn test_parse_tcs() {
        assert_eq!(Tc::from_json("{\"type\": \"make_safe\"}").unwrap(), Tc::MakeSafe);

        let tc = Tc::from_json(
            "{\"type\": \"drive\", \"payload\": {\
                \"cmd\": \"velocity\", \"frame\": \"field\", \
                \"vx_ms\": 1.5, \"vy_ms\": 0.0, \"omega_rads\": 0.25}}"
        ).unwrap();
        assert_eq!(tc, Tc::Drive(DriveCmd::Velocity {
            frame: Frame::Field,
            vx_ms: 1.5,
            vy_ms: 0.0,
            omega_rads: 0.25
        }));

        let tc = Tc::from_json("{\"type\": \"auto\", \"payload\": {\"cmd\": \"kill\"}}").unwrap();
        assert_eq!(tc, Tc::Auto(AutoCmd::Kill));
    }

    #[test]
    fn test_reject_unknown() {
        assert!(Tc::from_json("{\"type\": \"self_destruct\"}").is_err());
        assert!(Tc::from_json("{\"type\": \"drive\", \"payload\": {\"cmd\": \"fly\"}}").is_err());
    }
}
