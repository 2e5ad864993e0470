//! # AutoMgr
//!
//! Runs autonomous scripts on a dedicated thread so the fixed period control loop never waits on
//! them. Only one script runs at a time. Cancelling goes through the drive handle, which both
//! stops the drive on the next control cycle and makes the script thread exit.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    fs,
    path::Path,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
};

use comms_if::auto::AutoScript;
use log::{error, info};

use super::{load_script, ActionSink, AutoError, AutoParams, AutoStep, StepExecutor, StepOutcome};
use crate::drive_ctrl::DriveHandle;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Autonomy manager
pub struct AutoMgr {
    drive: DriveHandle,
    params: AutoParams,

    worker_jh: Option<JoinHandle<Result<StepOutcome, AutoError>>>,
    running: Arc<AtomicBool>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl AutoMgr {
    pub fn new(drive: DriveHandle, params: AutoParams) -> Self {
        Self {
            drive,
            params,
            worker_jh: None,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Load the script at `path` and start running it.
    pub fn start_file<P: AsRef<Path>>(
        &mut self,
        path: P,
        sink: Box<dyn ActionSink>,
    ) -> Result<(), AutoError> {
        let json = fs::read_to_string(path.as_ref()).map_err(AutoError::ScriptReadError)?;
        let script = AutoScript::from_json(&json).map_err(AutoError::ScriptParseError)?;

        info!("Loaded autonomous script {:?}", path.as_ref());

        self.start(&script, sink)
    }

    /// Validate `script` and start running it.
    ///
    /// Nothing runs if any step of the script is invalid.
    pub fn start(
        &mut self,
        script: &AutoScript,
        sink: Box<dyn ActionSink>,
    ) -> Result<(), AutoError> {
        let steps = load_script(script)?;
        self.start_steps(steps, sink)
    }

    /// Start running already loaded steps.
    pub fn start_steps(
        &mut self,
        steps: Vec<AutoStep>,
        sink: Box<dyn ActionSink>,
    ) -> Result<(), AutoError> {
        if self.is_running() {
            return Err(AutoError::AlreadyRunning);
        }

        // Collect the previous run, if any
        if let Some(jh) = self.worker_jh.take() {
            if let Err(e) = Self::join_worker(jh) {
                error!("Previous autonomous script failed: {}", e);
            }
        }

        self.drive.clear_cancel();
        self.running.store(true, Ordering::SeqCst);

        let drive = self.drive.clone();
        let params = self.params;
        let running = self.running.clone();

        let jh = thread::Builder::new()
            .name("auto_mgr".into())
            .spawn(move || {
                let mut exec = StepExecutor::new(drive, sink, params);
                let res = exec.run_steps(steps);

                info!(
                    "Autonomous script finished, {} actions executed",
                    exec.num_actions_executed()
                );
                if let Err(ref e) = res {
                    error!("Autonomous script error: {}", e);
                }

                running.store(false, Ordering::SeqCst);
                res
            });

        match jh {
            Ok(jh) => {
                self.worker_jh = Some(jh);
                Ok(())
            }
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                Err(AutoError::ThreadSpawnError(e))
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Cancel the running script, if any, and stop the drive.
    pub fn cancel(&self) {
        self.drive.cancel();
    }

    /// Wait for the current script to finish.
    ///
    /// Returns `None` if no script has been started since the last join.
    pub fn join(&mut self) -> Option<Result<StepOutcome, AutoError>> {
        self.worker_jh.take().map(Self::join_worker)
    }

    /// Collect the result of the script if it has finished, without blocking.
    pub fn poll(&mut self) -> Option<Result<StepOutcome, AutoError>> {
        if self.is_running() {
            None
        } else {
            self.join()
        }
    }

    fn join_worker(
        jh: JoinHandle<Result<StepOutcome, AutoError>>,
    ) -> Result<StepOutcome, AutoError> {
        jh.join().map_err(|_| AutoError::ThreadPanicked)?
    }
}

impl Drop for AutoMgr {
    fn drop(&mut self) {
        if self.is_running() {
            self.cancel();
        }
        let _ = self.join();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        auto::{ActionError, LoggingSink, RotationSchedule, ScheduledAction, TrajectoryStep},
        drive_ctrl::{DriveCtrl, DriveMode},
        loc::Pose,
        sim::{SimDrivetrain, SimParams},
        traj_ctrl::Trajectory,
    };
    use comms_if::auto::AutoAction;
    use nalgebra::Vector2;
    use std::sync::Mutex;
    use std::time::Duration;
    use util::module::State;

    const DT: f64 = 0.02;

    /// Records every subsystem action it is given.
    struct RecordingSink {
        log: Arc<Mutex<Vec<AutoAction>>>,
    }

    impl ActionSink for RecordingSink {
        fn execute(&mut self, action: &AutoAction) -> Result<(), ActionError> {
            self.log.lock().unwrap().push(action.clone());
            Ok(())
        }
    }

    fn recording_sink() -> (Box<dyn ActionSink>, Arc<Mutex<Vec<AutoAction>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        (Box::new(RecordingSink { log: log.clone() }), log)
    }

    /// Tick drive control in simulated time until the script finishes.
    fn run_closed_loop(dc: &mut DriveCtrl, mgr: &AutoMgr, max_cycles: usize) -> SimDrivetrain {
        let mut sim = SimDrivetrain::new(&dc.params().swerve, &SimParams::ideal(), Pose::default());

        for i in 0..max_cycles {
            if !mgr.is_running() {
                break;
            }

            let (out, _) = dc.proc(&sim.input_data(i as f64 * DT)).unwrap();
            sim.apply(&out.dems, DT);

            thread::sleep(Duration::from_micros(200));
        }

        sim
    }

    fn path_step(time: Vec<ScheduledAction>, fraction: Vec<ScheduledAction>) -> TrajectoryStep {
        let traj =
            Trajectory::straight_line(Vector2::zeros(), Vector2::new(1.0, 0.0), 2.0, 2.0).unwrap();

        TrajectoryStep::new(
            Arc::new(traj),
            RotationSchedule::new(vec![(0.0, 0.0), (0.5, 0.2), (100.0, 0.4)]).unwrap(),
            time,
            fraction,
        )
        .unwrap()
    }

    #[test]
    fn test_every_action_fires_once_in_order() {
        let mut dc = DriveCtrl::default();
        let mut mgr = AutoMgr::new(dc.handle(), AutoParams::default());
        let (sink, log) = recording_sink();

        let speed = |rpm| AutoAction::SetShooterSpeed { rpm };
        let hood = |angle_deg| AutoAction::SetHoodAngle { angle_deg };

        // Includes triggers beyond the end of the path, which fire on completion
        let step = path_step(
            vec![
                ScheduledAction::new(0.8, speed(0.8)),
                ScheduledAction::new(0.1, speed(0.1)),
                ScheduledAction::new(50.0, speed(50.0)),
                ScheduledAction::new(0.5, speed(0.5)),
            ],
            vec![
                ScheduledAction::new(0.75, hood(0.75)),
                ScheduledAction::new(0.25, hood(0.25)),
                ScheduledAction::new(2.0, hood(2.0)),
            ],
        );

        mgr.start_steps(vec![AutoStep::Trajectory(step)], sink).unwrap();
        let sim = run_closed_loop(&mut dc, &mgr, 5000);

        assert_eq!(mgr.join().unwrap().unwrap(), StepOutcome::Completed);

        let log = log.lock().unwrap();
        assert_eq!(log.len(), 7);

        let speeds: Vec<f64> = log
            .iter()
            .filter_map(|a| match *a {
                AutoAction::SetShooterSpeed { rpm } => Some(rpm),
                _ => None,
            })
            .collect();
        assert_eq!(speeds, vec![0.1, 0.5, 0.8, 50.0]);

        let hoods: Vec<f64> = log
            .iter()
            .filter_map(|a| match *a {
                AutoAction::SetHoodAngle { angle_deg } => Some(angle_deg),
                _ => None,
            })
            .collect();
        assert_eq!(hoods, vec![0.25, 0.75, 2.0]);

        // Final heading of the schedule is commanded and the drive is stopped
        let h = dc.handle();
        assert!((h.target_heading() - 0.4).abs() < 1e-12);
        assert_eq!(h.mode(), DriveMode::Stopped);
        assert!((sim.pose().position_m[0] - 1.0).abs() < 0.2);
    }

    #[test]
    fn test_cancel() {
        let mut dc = DriveCtrl::default();
        let mut mgr = AutoMgr::new(dc.handle(), AutoParams::default());
        let (sink, log) = recording_sink();

        let steps = vec![
            AutoStep::Script(vec![AutoAction::Sleep { duration_s: 30.0 }]),
            AutoStep::Script(vec![AutoAction::SetIntake { deployed: true }]),
        ];
        mgr.start_steps(steps, sink).unwrap();
        assert!(mgr.is_running());
        assert!(matches!(
            mgr.start_steps(vec![], Box::new(LoggingSink::default())),
            Err(AutoError::AlreadyRunning)
        ));

        thread::sleep(Duration::from_millis(20));
        mgr.cancel();

        assert_eq!(mgr.join().unwrap().unwrap(), StepOutcome::Cancelled);
        assert!(log.lock().unwrap().is_empty());

        // The next control cycle stops the drive
        let (out, report) = dc.proc(&Default::default()).unwrap();
        assert!(report.killed);
        assert_eq!(out.mode, DriveMode::Stopped);
    }

    #[test]
    fn test_turn_step() {
        let mut dc = DriveCtrl::default();
        let mut mgr = AutoMgr::new(dc.handle(), AutoParams::default());
        let (sink, log) = recording_sink();

        let steps = vec![AutoStep::Script(vec![
            AutoAction::TurnTo { heading_deg: 45.0 },
            AutoAction::ShootBalls { count: 3 },
        ])];
        mgr.start_steps(steps, sink).unwrap();

        let sim = run_closed_loop(&mut dc, &mgr, 5000);

        assert_eq!(mgr.join().unwrap().unwrap(), StepOutcome::Completed);
        assert_eq!(*log.lock().unwrap(), vec![AutoAction::ShootBalls { count: 3 }]);
        assert!((sim.pose().heading_rad - 45f64.to_radians()).abs() < 1f64.to_radians());
    }

    #[test]
    fn test_start_rejects_invalid_script() {
        let mut mgr = AutoMgr::new(DriveHandle::new(), AutoParams::default());
        let script = AutoScript::from_json(
            r#"{"steps": [{"step": "script", "actions": [
                {"action": "set_accel_limit", "accel_ms2": -2.0}
            ]}]}"#,
        )
        .unwrap();

        assert!(mgr
            .start(&script, Box::new(LoggingSink::default()))
            .is_err());
        assert!(!mgr.is_running());
        assert!(mgr.join().is_none());
    }
}
