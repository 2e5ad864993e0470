//! # Telecommand processor module
//!
//! The telecommand processor handles various TCs coming from any source.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, warn};

// Internal
use comms_if::tc::{drive::DriveCmd, Tc};
use swerve_lib::{
    data_store::{DataStore, SafeModeCause},
    drive_ctrl::{ChassisVelocity, DriveCtrlError, DriveMode, Frame},
    head_ctrl::HeadingGoal,
};

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Execute a telecommand.
///
/// Drive commands go straight to drive control through its handle, autonomy commands are left in
/// the datastore for the main loop.
pub(crate) fn exec(ds: &mut DataStore, tc: &Tc) {
    match tc {
        Tc::MakeSafe => {
            debug!("Received MakeSafe command");
            ds.make_safe(SafeModeCause::MakeSafeTc);
        }
        Tc::MakeUnsafe => {
            debug!("Received MakeUnsafe command");
            ds.make_unsafe(SafeModeCause::MakeSafeTc).ok();
        }
        Tc::Drive(cmd) => {
            if let Err(e) = exec_drive(ds, cmd) {
                warn!("Could not execute drive command {:?}: {}", cmd, e);
            }
        }
        Tc::Auto(a) => {
            ds.auto_cmd = Some(a.clone());
        }
    }
}

fn exec_drive(ds: &mut DataStore, cmd: &DriveCmd) -> Result<(), DriveCtrlError> {
    let h = ds.drive_ctrl.handle();

    match *cmd {
        DriveCmd::Velocity {
            frame,
            vx_ms,
            vy_ms,
            omega_rads,
        } => h.command_velocity(ChassisVelocity::new(frame, vx_ms, vy_ms, omega_rads))?,
        DriveCmd::TurnTo {
            heading_rad,
            rate_rads,
        } => h.turn_to_heading(
            HeadingGoal {
                heading_rad,
                rate_rads,
            },
            None,
        )?,
        DriveCmd::Hold => h.hold(),
        DriveCmd::Teleop => {
            h.set_drive_mode(DriveMode::Teleop);
            h.command_velocity(ChassisVelocity::zero(Frame::Robot))?;
        }
        DriveCmd::Stop => h.stop(),
        DriveCmd::SetAccelLimit { accel_ms2 } => h.set_accel_limit(accel_ms2)?,
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_drive_tcs() {
        let mut ds = DataStore::default();
        let h = ds.drive_ctrl.handle();

        exec(&mut ds, &Tc::Drive(DriveCmd::Hold));
        assert_eq!(h.mode(), DriveMode::Hold);

        exec(
            &mut ds,
            &Tc::Drive(DriveCmd::TurnTo {
                heading_rad: 1.0,
                rate_rads: 0.0,
            }),
        );
        assert_eq!(h.mode(), DriveMode::TurnToHeading);

        exec(&mut ds, &Tc::Drive(DriveCmd::Teleop));
        assert_eq!(h.mode(), DriveMode::Teleop);

        exec(&mut ds, &Tc::MakeSafe);
        assert!(ds.safe);
    }
}
