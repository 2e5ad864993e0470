//! # Step executor
//!
//! Runs loaded steps against the drive. While a path is followed the executor waits on the drive
//! handle for the control loop's progress updates, bounded by the poll period so that
//! cancellation is noticed promptly, and on each update:
//!
//! 1. applies every rotation whose time has come,
//! 2. fires every due time-triggered action,
//! 3. fires every due fraction-triggered action.
//!
//! When the path finishes the drive is stopped, any actions not yet fired are fired in queue
//! order and the final heading of the schedule is commanded if it was never reached. A cancelled
//! run exits straight away and fires nothing more.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::time::{Duration, Instant};

use comms_if::auto::AutoAction;
use log::{debug, info, warn};

use super::{
    ActionQueue, ActionSink, AutoError, AutoParams, AutoStep, TrajectoryStep, MAX_WAIT_S,
};
use crate::{
    drive_ctrl::{DriveHandle, DriveMode},
    head_ctrl::HeadingGoal,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct StepExecutor {
    drive: DriveHandle,
    sink: Box<dyn ActionSink>,
    params: AutoParams,

    num_actions_executed: usize,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// How a step or script ended.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Completed,
    Cancelled,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl StepExecutor {
    pub fn new(drive: DriveHandle, sink: Box<dyn ActionSink>, params: AutoParams) -> Self {
        Self {
            drive,
            sink,
            params,
            num_actions_executed: 0,
        }
    }

    /// Number of actions executed so far, including those flushed at the end of a path.
    pub fn num_actions_executed(&self) -> usize {
        self.num_actions_executed
    }

    fn poll_period(&self) -> Duration {
        secs_to_duration(self.params.poll_period_s)
    }

    /// Run every step in order, stopping early if cancelled.
    pub fn run_steps(&mut self, steps: Vec<AutoStep>) -> Result<StepOutcome, AutoError> {
        let num_steps = steps.len();

        for (i, step) in steps.into_iter().enumerate() {
            info!("Starting autonomous step {} of {}", i + 1, num_steps);

            let outcome = match step {
                AutoStep::Trajectory(t) => self.run_trajectory(t)?,
                AutoStep::Script(actions) => self.run_actions(&actions)?,
            };

            if outcome == StepOutcome::Cancelled {
                info!("Autonomous script cancelled during step {}", i + 1);
                return Ok(StepOutcome::Cancelled);
            }
        }

        info!("Autonomous script complete");
        Ok(StepOutcome::Completed)
    }

    /// Run actions one after the other.
    pub fn run_actions(&mut self, actions: &[AutoAction]) -> Result<StepOutcome, AutoError> {
        for a in actions {
            if self.execute(a)? == StepOutcome::Cancelled {
                return Ok(StepOutcome::Cancelled);
            }
        }

        Ok(StepOutcome::Completed)
    }

    /// Follow one path, applying its heading schedule and firing its actions.
    pub fn run_trajectory(&mut self, step: TrajectoryStep) -> Result<StepOutcome, AutoError> {
        let TrajectoryStep {
            trajectory,
            mut rotations,
            mut time_actions,
            mut fraction_actions,
        } = step;

        let duration_s = trajectory.duration_s();
        self.drive
            .start_path(trajectory, rotations.initial_heading_rad());

        loop {
            if self.drive.is_cancelled() {
                return Ok(StepOutcome::Cancelled);
            }

            let progress = self.drive.wait_progress(self.poll_period());

            if self.drive.is_cancelled() {
                return Ok(StepOutcome::Cancelled);
            }

            let elapsed_s = progress.elapsed_s;

            if let Some(heading_rad) = rotations.advance(elapsed_s) {
                self.drive.set_auto_rotation(heading_rad);
            }

            if self.fire_due(&mut time_actions, elapsed_s)? == StepOutcome::Cancelled {
                return Ok(StepOutcome::Cancelled);
            }

            let fraction = if duration_s > 0.0 {
                elapsed_s / duration_s
            } else {
                1.0
            };

            if self.fire_due(&mut fraction_actions, fraction)? == StepOutcome::Cancelled {
                return Ok(StepOutcome::Cancelled);
            }

            if progress.finished {
                break;
            }
        }

        let mode = self.drive.mode();
        if mode != DriveMode::PathDone {
            warn!("Path ended early, drive is in {:?}", mode);
        }

        self.drive.stop();

        // Everything scheduled fires once, even if the path ended before its trigger
        let remaining: Vec<_> = time_actions
            .drain_all()
            .chain(fraction_actions.drain_all())
            .collect();

        if !remaining.is_empty() {
            debug!("Firing {} remaining actions", remaining.len());
        }

        for a in remaining {
            if self.execute(&a.action)? == StepOutcome::Cancelled {
                return Ok(StepOutcome::Cancelled);
            }
        }

        if let Some(heading_rad) = rotations.finish() {
            self.drive.set_auto_rotation(heading_rad);
        }

        Ok(StepOutcome::Completed)
    }

    /// Fire every action in `queue` due at `key`.
    fn fire_due(&mut self, queue: &mut ActionQueue, key: f64) -> Result<StepOutcome, AutoError> {
        while let Some(a) = queue.pop_due(key) {
            if self.execute(&a.action)? == StepOutcome::Cancelled {
                return Ok(StepOutcome::Cancelled);
            }
        }

        Ok(StepOutcome::Completed)
    }

    /// Execute a single action.
    ///
    /// Failures of the action itself are logged and the script carries on.
    fn execute(&mut self, action: &AutoAction) -> Result<StepOutcome, AutoError> {
        if self.drive.is_cancelled() {
            return Ok(StepOutcome::Cancelled);
        }

        debug!("Executing action {}", action.name());
        self.num_actions_executed += 1;

        match *action {
            AutoAction::Print { ref message } => info!("Auto: {}", message),
            AutoAction::Sleep { duration_s } => return Ok(self.sleep(duration_s)),
            AutoAction::SetAutoAiming { enabled } => self.drive.set_auto_aiming(enabled),
            AutoAction::SetAccelLimit { accel_ms2 } => {
                if let Err(e) = self.drive.set_accel_limit(accel_ms2) {
                    warn!("Could not set the acceleration limit: {}", e);
                }
            }
            AutoAction::TurnTo { heading_deg } => return self.turn_to(heading_deg.to_radians()),
            _ => {
                if let AutoAction::ShootBalls { .. } = action {
                    self.drive.record_shot();
                }

                if let Err(e) = self.sink.execute(action) {
                    warn!("Action {} failed: {}", action.name(), e);
                }
            }
        }

        Ok(StepOutcome::Completed)
    }

    /// Turn in place and wait for the turn to finish.
    fn turn_to(&mut self, heading_rad: f64) -> Result<StepOutcome, AutoError> {
        self.drive
            .turn_to_heading_auto(HeadingGoal::fixed(heading_rad))?;

        let start = Instant::now();
        let timeout = secs_to_duration(self.params.turn_timeout_s);

        loop {
            if self.drive.wait_turn(self.poll_period()) {
                return Ok(StepOutcome::Completed);
            }

            if self.drive.is_cancelled() {
                return Ok(StepOutcome::Cancelled);
            }

            if start.elapsed() >= timeout {
                warn!(
                    "Turn to {:.3} rad did not finish within {:.1} s, continuing",
                    heading_rad, self.params.turn_timeout_s
                );
                self.drive.stop();
                return Ok(StepOutcome::Completed);
            }
        }
    }

    /// Sleep for `duration_s`, waking every poll period to check for cancellation.
    fn sleep(&self, duration_s: f64) -> StepOutcome {
        let end = match Instant::now().checked_add(secs_to_duration(duration_s)) {
            Some(e) => e,
            None => {
                warn!("Cannot sleep for {} s, skipping", duration_s);
                return StepOutcome::Completed;
            }
        };

        loop {
            if self.drive.is_cancelled() {
                return StepOutcome::Cancelled;
            }

            let now = Instant::now();
            if now >= end {
                return StepOutcome::Completed;
            }

            std::thread::sleep((end - now).min(self.poll_period()));
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Convert a wait in seconds into a `Duration`, clamped to `[0, MAX_WAIT_S]`.
///
/// NaN is treated as no wait.
fn secs_to_duration(secs: f64) -> Duration {
    if secs.is_nan() {
        return Duration::from_secs(0);
    }

    Duration::from_secs_f64(secs.max(0.0).min(MAX_WAIT_S))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_secs_to_duration() {
        assert_eq!(secs_to_duration(0.25), Duration::from_millis(250));
        assert_eq!(secs_to_duration(-1.0), Duration::from_secs(0));
        assert_eq!(secs_to_duration(std::f64::NAN), Duration::from_secs(0));
        assert_eq!(
            secs_to_duration(1e19),
            Duration::from_secs_f64(MAX_WAIT_S)
        );
        assert_eq!(
            secs_to_duration(std::f64::INFINITY),
            Duration::from_secs_f64(MAX_WAIT_S)
        );
    }
}
