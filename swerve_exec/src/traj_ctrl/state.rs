//! Trajectory control module state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{info, warn};
use serde::Serialize;
use std::sync::Arc;

// Internal
use super::{HolonomicController, TrajCtrlError, TrajCtrlParams, Trajectory};
use crate::drive_ctrl::ChassisVelocity;
use crate::loc::Pose;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Trajectory follower
pub struct TrajCtrl {
    params: TrajCtrlParams,

    /// Executing state
    state: FollowerState,

    /// The trajectory being followed
    trajectory: Option<Arc<Trajectory>>,

    /// Time at which the trajectory was started
    start_time_s: f64,

    /// Time of the last processing cycle, used to find the controller time step
    last_proc_s: Option<f64>,

    /// Nominal control period, used when there is no previous cycle
    nominal_period_s: f64,

    /// Controller, built on the first cycle that needs it
    controller: Option<HolonomicController>,

    /// Faults are not reported again before this time
    next_fault_report_s: f64,
}

/// The status report for one cycle of the follower.
#[derive(Debug, Default, Copy, Clone, Serialize)]
pub struct StatusReport {
    /// Units: seconds
    pub elapsed_s: f64,

    /// Units: seconds
    pub duration_s: f64,

    /// Units: meters
    pub pos_error_m: f64,

    /// Units: radians
    pub head_error_rad: f64,

    /// The controller reports the robot is at the reference
    pub at_reference: bool,

    /// The path finished on time without reaching the reference
    pub forced_done: bool,

    /// The cycle was skipped because of a fault
    pub faulted: bool,

    /// A fault was reported (logged) on this cycle
    pub fault_reported: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The possible states of the follower.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum FollowerState {
    Idle,
    Following,
    Done,
    Faulted,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TrajCtrl {
    pub fn new(params: &TrajCtrlParams, nominal_period_s: f64) -> Self {
        Self {
            params: params.clone(),
            state: FollowerState::Idle,
            trajectory: None,
            start_time_s: 0.0,
            last_proc_s: None,
            nominal_period_s,
            controller: None,
            next_fault_report_s: f64::NEG_INFINITY,
        }
    }

    pub fn state(&self) -> FollowerState {
        self.state
    }

    pub fn trajectory(&self) -> Option<&Arc<Trajectory>> {
        self.trajectory.as_ref()
    }

    /// Begin following `trajectory` from `now_s`.
    pub fn start(&mut self, trajectory: Arc<Trajectory>, now_s: f64) {
        if let Some(c) = self.controller.as_mut() {
            c.reset();
        }

        info!(
            "Starting trajectory of {} samples lasting {:.2} s",
            trajectory.samples().len(),
            trajectory.duration_s()
        );

        self.trajectory = Some(trajectory);
        self.start_time_s = now_s;
        self.last_proc_s = None;
        self.state = FollowerState::Following;
    }

    /// Stop following, dropping the trajectory.
    pub fn stop(&mut self) {
        self.trajectory = None;
        self.state = FollowerState::Idle;
    }

    /// Time elapsed since the start of the trajectory.
    pub fn elapsed_s(&self, now_s: f64) -> f64 {
        now_s - self.start_time_s
    }

    /// Perform one cycle of following.
    ///
    /// # Inputs
    /// - `now_s`: current time
    /// - `pose`: pose snapshot for this cycle
    /// - `target_heading_rad`: currently scheduled heading
    /// - `omega_override_rads`: if set replaces the rotation rate, used when aiming
    ///
    /// # Outputs
    /// The field frame velocity to apply, `None` if there is nothing to apply this cycle (not
    /// following, finished or faulted), and the status report.
    pub fn proc(
        &mut self,
        now_s: f64,
        pose: &Pose,
        target_heading_rad: f64,
        omega_override_rads: Option<f64>,
    ) -> Result<(Option<ChassisVelocity>, StatusReport), TrajCtrlError> {
        let mut report = StatusReport::default();

        match self.state {
            FollowerState::Idle | FollowerState::Done => return Ok((None, report)),
            FollowerState::Following | FollowerState::Faulted => (),
        }

        if !pose.is_finite() {
            return Err(TrajCtrlError::NonFinitePose);
        }

        let traj = match self.trajectory {
            Some(ref t) => t.clone(),
            None => {
                self.fault(now_s, &TrajCtrlError::NoTrajectory, &mut report);
                return Ok((None, report));
            }
        };

        let elapsed_s = self.elapsed_s(now_s);
        report.elapsed_s = elapsed_s;
        report.duration_s = traj.duration_s();

        // Lazily build the controller, skipping this cycle if that's not possible
        if self.controller.is_none() {
            match HolonomicController::new(&self.params) {
                Ok(c) => self.controller = Some(c),
                Err(e) => {
                    self.fault(now_s, &e, &mut report);

                    // A faulted follower still ends with its path
                    if elapsed_s >= traj.duration_s() {
                        warn!("Trajectory duration elapsed while faulted, path done");
                        self.state = FollowerState::Done;
                        report.forced_done = true;
                    }

                    return Ok((None, report));
                }
            }
        }

        if self.state == FollowerState::Faulted {
            info!("Trajectory follower recovered from fault");
            self.state = FollowerState::Following;
        }

        let dt = self
            .last_proc_s
            .map(|t| now_s - t)
            .filter(|dt| *dt > 0.0)
            .unwrap_or(self.nominal_period_s);
        self.last_proc_s = Some(now_s);

        let sample = traj.sample(elapsed_s);

        let (mut vel, at_reference, errors) = match self.controller.as_mut() {
            Some(c) => {
                let v = c.calculate(pose, &sample, target_heading_rad, dt);
                (v, c.at_reference(), c.errors())
            }
            None => return Err(TrajCtrlError::NoTrajectory),
        };

        if let Some(w) = omega_override_rads {
            vel.omega_rads = w;
        }

        report.pos_error_m = errors.pos_error_m.norm();
        report.head_error_rad = errors.head_error_rad;
        report.at_reference = at_reference;

        // The path always ends once its duration has elapsed
        if elapsed_s >= traj.duration_s() {
            self.state = FollowerState::Done;

            if at_reference {
                info!("Trajectory complete");
            } else {
                report.forced_done = true;
                warn!(
                    "Trajectory duration elapsed without reaching the reference, position error \
                    {:.3} m, heading error {:.3} rad",
                    report.pos_error_m, report.head_error_rad
                );
            }

            return Ok((None, report));
        }

        Ok((Some(vel), report))
    }

    /// Enter the faulted state, reporting the fault if it hasn't been reported recently.
    fn fault(&mut self, now_s: f64, err: &TrajCtrlError, report: &mut StatusReport) {
        self.state = FollowerState::Faulted;
        report.faulted = true;

        if now_s >= self.next_fault_report_s {
            warn!("Trajectory follower fault, skipping cycle: {}", err);
            self.next_fault_report_s = now_s + self.params.fault_report_interval_s;
            report.fault_reported = true;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use nalgebra::Vector2;

    fn line() -> Arc<Trajectory> {
        Arc::new(
            Trajectory::straight_line(Vector2::zeros(), Vector2::new(2.0, 0.0), 2.0, 2.0)
                .unwrap(),
        )
    }

    #[test]
    fn test_idle() {
        let mut tc = TrajCtrl::new(&TrajCtrlParams::default(), 0.02);
        let (vel, _) = tc.proc(0.0, &Pose::default(), 0.0, None).unwrap();
        assert!(vel.is_none());
        assert_eq!(tc.state(), FollowerState::Idle);
    }

    #[test]
    fn test_forced_done() {
        let mut tc = TrajCtrl::new(&TrajCtrlParams::default(), 0.02);
        let traj = line();
        let duration = traj.duration_s();
        tc.start(traj, 10.0);

        // The robot never moves, so it falls behind the reference
        let pose = Pose::default();
        let mut i = 0;
        let mut done_at = None;
        while i < 1000 {
            let now = 10.0 + i as f64 / 50.0;
            let (vel, report) = tc.proc(now, &pose, 0.0, None).unwrap();

            if tc.state() == FollowerState::Done {
                assert!(vel.is_none());
                assert!(report.forced_done);
                done_at = Some(now - 10.0);
                break;
            }
            assert!(vel.is_some());
            i += 1;
        }

        let done_at = done_at.unwrap();
        assert!(done_at >= duration);
        assert!(done_at < duration + 0.02 + 1e-9);

        // Stays done
        let (vel, _) = tc.proc(100.0, &pose, 0.0, None).unwrap();
        assert!(vel.is_none());
        assert_eq!(tc.state(), FollowerState::Done);
    }

    #[test]
    fn test_tracking_completes() {
        let mut tc = TrajCtrl::new(&TrajCtrlParams::default(), 0.02);
        let traj = line();
        tc.start(traj.clone(), 0.0);

        // Perfect plant, the pose follows the commanded velocity
        let mut pose = traj.initial_pose();
        let dt = 0.02;
        for i in 0..500 {
            let now = i as f64 * dt;
            let (vel, report) = tc.proc(now, &pose, 0.0, None).unwrap();

            match vel {
                Some(v) => {
                    pose.position_m += v.linear() * dt;
                    pose.heading_rad += v.omega_rads * dt;
                }
                None => {
                    assert!(!report.forced_done);
                    break;
                }
            }
        }

        assert_eq!(tc.state(), FollowerState::Done);
        assert!((pose.position_m - Vector2::new(2.0, 0.0)).norm() < 0.1);
    }

    #[test]
    fn test_aim_override() {
        let mut tc = TrajCtrl::new(&TrajCtrlParams::default(), 0.02);
        tc.start(line(), 0.0);

        let (vel, _) = tc.proc(0.1, &Pose::default(), 1.0, Some(-0.7)).unwrap();
        assert_eq!(vel.unwrap().omega_rads, -0.7);
    }

    #[test]
    fn test_fault_rate_limited() {
        let params = TrajCtrlParams {
            theta_max_rate_rads: -1.0,
            ..Default::default()
        };
        let mut tc = TrajCtrl::new(&params, 0.02);
        let traj =
            Trajectory::straight_line(Vector2::zeros(), Vector2::new(20.0, 0.0), 2.0, 2.0).unwrap();
        tc.start(Arc::new(traj), 0.0);

        let mut reports = 0;
        for i in 0..250 {
            let (vel, report) = tc.proc(i as f64 / 50.0, &Pose::default(), 0.0, None).unwrap();
            assert!(vel.is_none());
            assert!(report.faulted);
            if report.fault_reported {
                reports += 1;
            }
        }

        // Reported at 0, 2 and 4 seconds
        assert_eq!(reports, 3);
        assert_eq!(tc.state(), FollowerState::Faulted);
    }

    #[test]
    fn test_faulted_done_at_duration() {
        let params = TrajCtrlParams {
            theta_max_rate_rads: -1.0,
            ..Default::default()
        };
        let mut tc = TrajCtrl::new(&params, 0.02);
        let traj = line();
        let duration = traj.duration_s();
        tc.start(traj, 0.0);

        let mut done_at = None;
        for i in 0..1000 {
            let now = i as f64 / 50.0;
            let (vel, report) = tc.proc(now, &Pose::default(), 0.0, None).unwrap();
            assert!(vel.is_none());
            assert!(report.faulted);

            if tc.state() == FollowerState::Done {
                assert!(report.forced_done);
                done_at = Some(now);
                break;
            }
            assert_eq!(tc.state(), FollowerState::Faulted);
        }

        let done_at = done_at.unwrap();
        assert!(done_at >= duration);
        assert!(done_at < duration + 0.02 + 1e-9);

        // Stays done
        let (vel, _) = tc.proc(20.0, &Pose::default(), 0.0, None).unwrap();
        assert!(vel.is_none());
        assert_eq!(tc.state(), FollowerState::Done);
    }
}
