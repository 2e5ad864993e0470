//! # Drive handle
//!
//! State shared between the fixed period control loop and the other tasks which command the
//! drive. Everything lives behind a single mutex, held only while reading or updating, never
//! during the control calculations. The control loop notifies the condition variable every cycle
//! so waiting tasks wake up as soon as the drive state changes.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info};
use serde::Serialize;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Condvar, Mutex, MutexGuard,
};
use std::time::Duration;

// Internal
use super::{ChassisVelocity, DriveCtrlError};
use crate::head_ctrl::HeadingGoal;
use crate::traj_ctrl::Trajectory;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Handle used to command drive control from other tasks.
///
/// Cloning the handle is cheap, all clones refer to the same drive.
#[derive(Clone, Default)]
pub struct DriveHandle {
    shared: Arc<(Mutex<Shared>, Condvar)>,

    /// Kill flag, kept outside the lock so it can be polled without contention.
    kill: Arc<AtomicBool>,
}

/// Progress along the current path.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize)]
pub struct PathProgress {
    /// Units: seconds
    pub elapsed_s: f64,

    /// Units: seconds
    pub duration_s: f64,

    /// True once the path is no longer being followed.
    pub finished: bool,
}

/// A request to start a new path, picked up by the next control cycle.
#[derive(Clone)]
pub(crate) struct PathRequest {
    pub trajectory: Arc<Trajectory>,
}

/// The state shared between the control loop and other tasks.
pub(crate) struct Shared {
    pub mode: DriveMode,

    /// Incremented whenever the mode is set by a caller, so the control loop doesn't overwrite a
    /// mode set while it was computing.
    pub mode_seq: u64,

    /// Latest operator velocity command.
    pub teleop_cmd: ChassisVelocity,

    /// Goal of the current turn.
    pub turn_goal: HeadingGoal,

    /// Tolerance of the current turn, `None` for the default.
    pub turn_tolerance_rad: Option<f64>,

    /// The current turn was triggered by an autonomous script.
    pub turn_from_auto: bool,

    pub turn_done: bool,
    pub aiming: bool,
    pub auto_aiming: bool,

    /// Currently scheduled heading while following a path.
    pub target_heading_rad: f64,

    pub path_request: Option<PathRequest>,
    pub progress: PathProgress,

    pub accel_limit_request: Option<f64>,
    pub shot_fired: bool,

    pub cancelled: bool,
}

/// Snapshot of the shared state taken at the start of each control cycle.
pub(crate) struct Snapshot {
    pub mode: DriveMode,
    pub mode_seq: u64,
    pub teleop_cmd: ChassisVelocity,
    pub turn_goal: HeadingGoal,
    pub turn_tolerance_rad: Option<f64>,
    pub turn_from_auto: bool,
    pub auto_aiming: bool,
    pub target_heading_rad: f64,
    pub path_request: Option<PathRequest>,
    pub accel_limit_request: Option<f64>,
    pub shot_fired: bool,
    pub killed: bool,
}

/// Results of a control cycle published back to the shared state.
pub(crate) struct Publish {
    /// Mode to switch to, only applied if no caller has set the mode since the snapshot.
    pub mode: Option<DriveMode>,
    pub mode_seq: u64,
    pub aiming: bool,
    pub turn_done: bool,
    pub progress: Option<PathProgress>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// What the drive is currently doing.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum DriveMode {
    /// Following the operator's velocity commands.
    Teleop,

    /// Turning to a heading, optionally while translating.
    TurnToHeading,

    /// Wheels locked in an X pattern.
    Hold,

    /// Following a trajectory.
    FollowingPath,

    /// A path or autonomous turn has finished.
    PathDone,

    /// Brought to a stop.
    Stopped,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for DriveMode {
    fn default() -> Self {
        DriveMode::Stopped
    }
}

impl Default for Shared {
    fn default() -> Self {
        Self {
            mode: DriveMode::default(),
            mode_seq: 0,
            teleop_cmd: ChassisVelocity::default(),
            turn_goal: HeadingGoal::default(),
            turn_tolerance_rad: None,
            turn_from_auto: false,
            turn_done: true,
            aiming: false,
            auto_aiming: false,
            target_heading_rad: 0.0,
            path_request: None,
            progress: PathProgress {
                finished: true,
                ..Default::default()
            },
            accel_limit_request: None,
            shot_fired: false,
            cancelled: false,
        }
    }
}

impl Shared {
    fn set_mode(&mut self, mode: DriveMode) {
        if self.mode != mode {
            debug!("Drive mode {:?} -> {:?}", self.mode, mode);
        }
        self.mode = mode;
        self.mode_seq = self.mode_seq.wrapping_add(1);

        if mode != DriveMode::FollowingPath {
            self.progress.finished = true;
        }
    }
}

impl DriveHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the shared state. A poisoned lock is recovered, the state is plain data and is
    /// always left consistent.
    fn lock(&self) -> MutexGuard<Shared> {
        self.shared.0.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Apply `f` to the shared state and wake any waiting tasks.
    fn update<T, F: FnOnce(&mut Shared) -> T>(&self, f: F) -> T {
        let ret = f(&mut self.lock());
        self.shared.1.notify_all();
        ret
    }

    /// Set the drive mode.
    pub fn set_drive_mode(&self, mode: DriveMode) {
        self.update(|s| s.set_mode(mode));
    }

    /// The current drive mode.
    pub fn mode(&self) -> DriveMode {
        self.lock().mode
    }

    /// Command a chassis velocity.
    ///
    /// Outside of path following and turning this puts the drive into `Teleop`. While turning
    /// the translation part is kept and the rotation comes from the heading controller. While
    /// following a path the command is stored but not used.
    pub fn command_velocity(&self, cmd: ChassisVelocity) -> Result<(), DriveCtrlError> {
        if !cmd.is_finite() {
            return Err(DriveCtrlError::NonFiniteVelocity(cmd));
        }

        self.update(|s| {
            s.teleop_cmd = cmd;
            match s.mode {
                DriveMode::Teleop | DriveMode::TurnToHeading | DriveMode::FollowingPath => (),
                _ => s.set_mode(DriveMode::Teleop),
            }
        });

        Ok(())
    }

    /// Start following `trajectory`, facing `initial_heading_rad` until the heading schedule
    /// says otherwise.
    pub fn start_path(&self, trajectory: Arc<Trajectory>, initial_heading_rad: f64) {
        info!(
            "Path requested, duration {:.2} s, initial heading {:.3} rad",
            trajectory.duration_s(),
            initial_heading_rad
        );

        self.update(|s| {
            s.progress = PathProgress {
                elapsed_s: 0.0,
                duration_s: trajectory.duration_s(),
                finished: false,
            };
            s.target_heading_rad = initial_heading_rad;
            s.path_request = Some(PathRequest { trajectory });
            s.set_mode(DriveMode::FollowingPath);
        });
    }

    /// Set the heading to face while following a path.
    pub fn set_auto_rotation(&self, heading_rad: f64) {
        debug!("Auto rotation set to {:.3} rad", heading_rad);
        self.update(|s| s.target_heading_rad = heading_rad);
    }

    /// Heading currently scheduled for path following.
    pub fn target_heading(&self) -> f64 {
        self.lock().target_heading_rad
    }

    /// True if no path is being followed.
    pub fn is_path_finished(&self) -> bool {
        let s = self.lock();
        s.progress.finished || s.mode != DriveMode::FollowingPath
    }

    /// Progress along the current path.
    pub fn path_progress(&self) -> PathProgress {
        self.lock().progress
    }

    /// Wait for the control loop to update the drive, or for `timeout` to pass, then return the
    /// path progress.
    pub fn wait_progress(&self, timeout: Duration) -> PathProgress {
        let guard = self.lock();

        if guard.progress.finished || guard.cancelled {
            return guard.progress;
        }

        let (guard, _) = self
            .shared
            .1
            .wait_timeout(guard, timeout)
            .unwrap_or_else(|e| e.into_inner());

        guard.progress
    }

    /// Turn to `goal`, keeping any translation command.
    ///
    /// If `tolerance_rad` is `None` the default heading tolerance is used.
    pub fn turn_to_heading(
        &self,
        goal: HeadingGoal,
        tolerance_rad: Option<f64>,
    ) -> Result<(), DriveCtrlError> {
        self.start_turn(goal, tolerance_rad, false)
    }

    /// Turn to `goal` as part of an autonomous script. Once the turn is done the drive switches
    /// to `PathDone`.
    pub fn turn_to_heading_auto(&self, goal: HeadingGoal) -> Result<(), DriveCtrlError> {
        self.start_turn(goal, None, true)
    }

    fn start_turn(
        &self,
        goal: HeadingGoal,
        tolerance_rad: Option<f64>,
        from_auto: bool,
    ) -> Result<(), DriveCtrlError> {
        if !goal.is_finite() {
            return Err(DriveCtrlError::NonFiniteHeading(goal.heading_rad));
        }

        self.update(|s| {
            // A fresh turn from another mode shouldn't carry an old translation command
            if s.mode != DriveMode::Teleop && s.mode != DriveMode::TurnToHeading {
                s.teleop_cmd = ChassisVelocity::default();
            }

            s.turn_goal = goal;
            s.turn_tolerance_rad = tolerance_rad;
            s.turn_from_auto = from_auto;
            s.turn_done = false;
            s.aiming = true;
            s.set_mode(DriveMode::TurnToHeading);
        });

        Ok(())
    }

    /// True once the last requested turn has reached its goal.
    pub fn is_turn_done(&self) -> bool {
        self.lock().turn_done
    }

    /// Wait for the control loop to update the drive, or for `timeout` to pass, then return
    /// whether the last turn is done.
    pub fn wait_turn(&self, timeout: Duration) -> bool {
        let guard = self.lock();

        if guard.turn_done || guard.cancelled {
            return guard.turn_done;
        }

        let (guard, _) = self
            .shared
            .1
            .wait_timeout(guard, timeout)
            .unwrap_or_else(|e| e.into_inner());

        guard.turn_done
    }

    /// True while turning and outside the heading tolerance.
    pub fn is_aiming(&self) -> bool {
        self.lock().aiming
    }

    /// Enable or disable aiming at the target while following a path.
    pub fn set_auto_aiming(&self, enabled: bool) {
        info!("Auto aiming {}", if enabled { "enabled" } else { "disabled" });
        self.update(|s| s.auto_aiming = enabled);
    }

    pub fn is_auto_aiming(&self) -> bool {
        self.lock().auto_aiming
    }

    /// Request a new linear acceleration limit, applied on the next control cycle.
    pub fn set_accel_limit(&self, accel_ms2: f64) -> Result<(), DriveCtrlError> {
        if !accel_ms2.is_finite() || accel_ms2 <= 0.0 {
            return Err(DriveCtrlError::InvalidAccelLimit(accel_ms2));
        }

        self.update(|s| s.accel_limit_request = Some(accel_ms2));
        Ok(())
    }

    /// Record that a ball was just fired, shortening the aim lookahead.
    pub fn record_shot(&self) {
        self.update(|s| s.shot_fired = true);
    }

    /// Lock the wheels in place.
    pub fn hold(&self) {
        self.set_drive_mode(DriveMode::Hold);
    }

    /// Bring the drive to a stop.
    pub fn stop(&self) {
        self.set_drive_mode(DriveMode::Stopped);
    }

    /// Kill any autonomous activity. The control loop stops the drive with zero speed on its
    /// next cycle, and any running autonomous script exits.
    pub fn cancel(&self) {
        info!("Drive cancel requested");
        self.kill.store(true, Ordering::SeqCst);
        self.update(|s| {
            s.cancelled = true;
            s.progress.finished = true;
        });
    }

    /// Clear a previous cancellation so a new script can run.
    pub fn clear_cancel(&self) {
        self.update(|s| s.cancelled = false);
    }

    /// True if `cancel` has been called since the last `clear_cancel`.
    pub fn is_cancelled(&self) -> bool {
        self.lock().cancelled
    }

    /// Take a snapshot of the shared state for a control cycle, consuming pending requests.
    pub(crate) fn snapshot(&self) -> Snapshot {
        let killed = self.kill.swap(false, Ordering::SeqCst);
        let mut s = self.lock();

        Snapshot {
            mode: s.mode,
            mode_seq: s.mode_seq,
            teleop_cmd: s.teleop_cmd,
            turn_goal: s.turn_goal,
            turn_tolerance_rad: s.turn_tolerance_rad,
            turn_from_auto: s.turn_from_auto,
            auto_aiming: s.auto_aiming,
            target_heading_rad: s.target_heading_rad,
            path_request: s.path_request.take(),
            accel_limit_request: s.accel_limit_request.take(),
            shot_fired: std::mem::replace(&mut s.shot_fired, false),
            killed,
        }
    }

    /// Publish the results of a control cycle and wake any waiting tasks.
    pub(crate) fn publish(&self, publish: Publish) {
        self.update(|s| {
            // Mode and progress only apply if nobody has changed the mode since the snapshot
            let current = s.mode_seq == publish.mode_seq;

            if current {
                if let Some(mode) = publish.mode {
                    if s.mode != mode {
                        s.set_mode(mode);
                    }
                }

                if let Some(p) = publish.progress {
                    s.progress.elapsed_s = p.elapsed_s;
                    s.progress.duration_s = p.duration_s;
                    s.progress.finished |= p.finished;
                }
            }

            s.aiming = publish.aiming;
            if publish.turn_done {
                s.turn_done = true;
            }
        });
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_command_velocity() {
        let h = DriveHandle::new();
        assert_eq!(h.mode(), DriveMode::Stopped);

        h.command_velocity(ChassisVelocity::robot(1.0, 0.0, 0.0)).unwrap();
        assert_eq!(h.mode(), DriveMode::Teleop);

        assert!(h
            .command_velocity(ChassisVelocity::robot(f64::NAN, 0.0, 0.0))
            .is_err());
    }

    #[test]
    fn test_turn_keeps_translation() {
        let h = DriveHandle::new();
        h.command_velocity(ChassisVelocity::robot(1.0, 0.0, 0.0)).unwrap();
        h.turn_to_heading(HeadingGoal::fixed(1.0), None).unwrap();

        assert_eq!(h.mode(), DriveMode::TurnToHeading);
        assert!(h.is_aiming());
        assert!(!h.is_turn_done());

        // Operator keeps driving while the turn runs
        h.command_velocity(ChassisVelocity::robot(0.5, 0.5, 0.0)).unwrap();
        assert_eq!(h.mode(), DriveMode::TurnToHeading);
        assert_eq!(h.snapshot().teleop_cmd, ChassisVelocity::robot(0.5, 0.5, 0.0));
    }

    #[test]
    fn test_publish_respects_newer_mode() {
        let h = DriveHandle::new();
        h.set_drive_mode(DriveMode::FollowingPath);
        let snap = h.snapshot();

        // Someone stops the drive while the cycle is running
        h.stop();

        h.publish(Publish {
            mode: Some(DriveMode::PathDone),
            mode_seq: snap.mode_seq,
            aiming: false,
            turn_done: false,
            progress: None,
        });
        assert_eq!(h.mode(), DriveMode::Stopped);
    }

    #[test]
    fn test_cancel() {
        let h = DriveHandle::new();
        assert!(!h.is_cancelled());

        h.cancel();
        assert!(h.is_cancelled());
        assert!(h.is_path_finished());

        // The kill is consumed by one control cycle, the cancel flag persists
        assert!(h.snapshot().killed);
        assert!(!h.snapshot().killed);
        assert!(h.is_cancelled());

        h.clear_cancel();
        assert!(!h.is_cancelled());
    }

    #[test]
    fn test_wait_times_out() {
        let h = DriveHandle::new();
        h.set_drive_mode(DriveMode::FollowingPath);
        h.update(|s| s.progress.finished = false);

        let p = h.wait_progress(Duration::from_millis(2));
        assert!(!p.finished);
    }

    #[test]
    fn test_accel_limit_request() {
        let h = DriveHandle::new();
        assert!(h.set_accel_limit(-1.0).is_err());
        h.set_accel_limit(5.0).unwrap();

        assert_eq!(h.snapshot().accel_limit_request, Some(5.0));
        assert_eq!(h.snapshot().accel_limit_request, None);
    }
}
