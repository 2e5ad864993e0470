//! Parameters structure for DriveCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

use super::NUM_MODULES;
use crate::{head_ctrl::HeadCtrlParams, lead_pred::LeadPredParams, traj_ctrl::TrajCtrlParams};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Offset of each module's centre from the robot centre on the reference robot, 12.125 inches.
///
/// Units: meters
const MODULE_OFFSET_M: f64 = 0.307975;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for drive control, one section per controller.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Params {
    pub accel: AccelParams,
    pub swerve: SwerveParams,
    pub heading: HeadCtrlParams,
    pub traj: TrajCtrlParams,
    pub lead_pred: LeadPredParams,
    pub drive: DriveParams,
}

/// Parameters of the acceleration limiter.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AccelParams {
    /// Maximum linear acceleration used during normal driving.
    ///
    /// Units: meters/second^2
    pub max_accel_ms2: f64,

    /// Maximum angular acceleration.
    ///
    /// Units: radians/second^2
    pub max_ang_accel_rads2: f64,

    /// If the limiter has not been called for longer than this its state is reseeded from the
    /// measured velocity.
    ///
    /// Units: seconds
    pub stale_period_s: f64,
}

/// Parameters of the swerve command synthesizer.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SwerveParams {
    /// Position of each module relative to the robot centre, ordered LF, LB, RF, RB.
    ///
    /// Units: meters,
    /// Frame: Robot body
    pub module_pos_m: [[f64; 2]; NUM_MODULES],

    /// Maximum wheel ground speed.
    ///
    /// Units: meters/second
    pub max_speed_ms: f64,

    /// Steer changes smaller than this are not commanded.
    ///
    /// Units: radians
    pub steer_deadband_rad: f64,
}

/// General drive control parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DriveParams {
    /// Nominal control period.
    ///
    /// Units: seconds
    pub period_s: f64,

    /// If true field relative commands are honoured while the gyro is connected.
    pub field_relative: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for AccelParams {
    fn default() -> Self {
        Self {
            max_accel_ms2: 20.0,
            max_ang_accel_rads2: (360.0f64 * 9.0).to_radians(),
            stale_period_s: 0.4,
        }
    }
}

impl Default for SwerveParams {
    fn default() -> Self {
        Self {
            module_pos_m: [
                [MODULE_OFFSET_M, MODULE_OFFSET_M],
                [-MODULE_OFFSET_M, MODULE_OFFSET_M],
                [MODULE_OFFSET_M, -MODULE_OFFSET_M],
                [-MODULE_OFFSET_M, -MODULE_OFFSET_M],
            ],
            max_speed_ms: 7.26,
            steer_deadband_rad: 0.1f64.to_radians(),
        }
    }
}

impl Default for DriveParams {
    fn default() -> Self {
        Self {
            period_s: 0.02,
            field_relative: true,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_partial_params() {
        let p: Params = util::params::from_str(
            "[accel]\nmax_accel_ms2 = 5.0\n\n[swerve]\nmax_speed_ms = 4.0\n",
        )
        .unwrap();

        assert_eq!(p.accel.max_accel_ms2, 5.0);
        assert_eq!(p.accel.stale_period_s, 0.4);
        assert_eq!(p.swerve.max_speed_ms, 4.0);
        assert_eq!(p.swerve.module_pos_m[1], [-MODULE_OFFSET_M, MODULE_OFFSET_M]);
        assert!(p.drive.field_relative);
    }

    #[test]
    fn test_param_file_matches_defaults() {
        let p: Params =
            util::params::from_str(include_str!("../../../params/drive_ctrl.toml")).unwrap();
        let d = Params::default();

        let close = |a: f64, b: f64| (a - b).abs() < 1e-5;

        assert!(close(p.accel.max_ang_accel_rads2, d.accel.max_ang_accel_rads2));
        assert!(close(p.swerve.steer_deadband_rad, d.swerve.steer_deadband_rad));
        assert_eq!(p.swerve.module_pos_m, d.swerve.module_pos_m);
        assert!(close(p.heading.tolerance_rad, d.heading.tolerance_rad));
        assert!(close(p.heading.i_zone_rad, d.heading.i_zone_rad));
        assert!(close(p.traj.head_tolerance_rad, d.traj.head_tolerance_rad));
        assert!(close(p.lead_pred.tof.near_slope_spm, d.lead_pred.tof.near_slope_spm));
        assert!(close(p.lead_pred.tof.tof_at_breakpoint_s, d.lead_pred.tof.tof_at_breakpoint_s));
    }
}
