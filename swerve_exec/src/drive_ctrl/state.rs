//! Implementations for the DriveCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{info, trace, warn};
use nalgebra::Vector2;
use serde::Serialize;
use std::convert::TryFrom;

// Internal
use super::{
    AccelLimiter, ChassisVelocity, DriveCtrlError, DriveHandle, DriveMode, Frame, ModuleId,
    ModuleState, Params, PathProgress, Publish, Snapshot, SwerveDems, SwerveSynth, NUM_MODULES,
};
use crate::{
    head_ctrl::{HeadCtrl, HeadingGoal},
    lead_pred::{AimSolution, LeadPredictor},
    loc::Pose,
    traj_ctrl::{self, FollowerState, TrajCtrl},
};
use comms_if::eqpt::drive::{DriveDems, DriveSensData};
use util::{
    archive::{ArchiveError, Archived, Archiver},
    module::State,
    params,
    session::Session,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Drive control module state
pub struct DriveCtrl {
    pub(crate) params: Params,

    handle: DriveHandle,

    limiter: AccelLimiter,
    synth: SwerveSynth,
    head_ctrl: HeadCtrl,
    traj_ctrl: TrajCtrl,
    lead_pred: LeadPredictor,

    /// Set once the gyro has been lost, after which all driving is robot relative.
    gyro_lost: bool,

    /// Time of the last shot, used for the aim lookahead.
    last_shot_s: Option<f64>,

    pub(crate) report: StatusReport,
    pub(crate) output: Option<OutputData>,
    time_s: f64,

    arch_output: Archiver,
    arch_traj: Archiver,
}

/// Input data to drive control, read once per cycle so every controller sees the same state.
#[derive(Debug, Clone, Copy)]
pub struct InputData {
    /// Units: seconds
    pub time_s: f64,

    /// Latency compensated pose from the pose estimator.
    pub pose: Pose,

    /// False if the gyro has lost connection.
    pub gyro_connected: bool,

    /// Measured chassis velocity.
    pub measured_vel: ChassisVelocity,

    /// Measured acceleration in the field frame.
    ///
    /// Units: meters/second^2
    pub measured_accel_ms2: Vector2<f64>,

    /// Module sensor data.
    pub sens: DriveSensData,
}

/// Output from DriveCtrl that the module equipment must execute.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct OutputData {
    /// Mode at the end of the cycle.
    pub mode: DriveMode,

    /// Demands for the modules.
    pub dems: DriveDems,

    /// Target state of each module.
    pub target: [ModuleState; NUM_MODULES],

    /// Velocity applied after limiting, in the robot frame.
    pub applied_vel: ChassisVelocity,

    /// Linear velocity change applied by the limiter, in the field frame.
    ///
    /// Units: meters/second
    pub delta_v_ms_field: Vector2<f64>,

    /// Aim solution, if auto aiming.
    pub aim: Option<AimSolution>,
}

/// Status report for DriveCtrl processing.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StatusReport {
    pub accel_limited: bool,
    pub limiter_reseeded: bool,
    pub desaturated: bool,
    pub field_relative: bool,
    pub aiming: bool,
    pub killed: bool,

    /// Report from the trajectory follower, if following a path this cycle.
    pub follower: Option<traj_ctrl::StatusReport>,
}

/// Flat record of the output, for the archive.
#[derive(Serialize)]
struct OutputRecord {
    time_s: f64,
    mode: DriveMode,
    vx_ms: f64,
    vy_ms: f64,
    omega_rads: f64,
    delta_vx_ms: f64,
    delta_vy_ms: f64,
    lf_speed_ms: f64,
    lf_angle_rad: f64,
    lb_speed_ms: f64,
    lb_angle_rad: f64,
    rf_speed_ms: f64,
    rf_angle_rad: f64,
    rb_speed_ms: f64,
    rb_angle_rad: f64,
    accel_limited: bool,
    desaturated: bool,
    aiming: bool,
}

/// What the selected mode wants the drivetrain to do this cycle.
enum Demand {
    Velocity(ChassisVelocity),
    Hold,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for InputData {
    fn default() -> Self {
        Self {
            time_s: 0.0,
            pose: Pose::default(),
            gyro_connected: true,
            measured_vel: ChassisVelocity::default(),
            measured_accel_ms2: Vector2::zeros(),
            sens: DriveSensData::default(),
        }
    }
}

impl Default for DriveCtrl {
    fn default() -> Self {
        Self::new(Params::default())
    }
}

impl State for DriveCtrl {
    type InitData = &'static str;
    type InitError = DriveCtrlError;

    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = DriveCtrlError;

    /// Initialise the DriveCtrl module.
    ///
    /// Expected init data is the path to the parameter file. Handles given out before `init`
    /// remain connected.
    fn init(&mut self, init_data: Self::InitData, session: &Session) -> Result<(), Self::InitError> {
        let params: Params = params::load(init_data)?;
        let handle = self.handle.clone();

        *self = Self::with_handle(params, handle);

        self.arch_output = Archiver::from_path(session, "drive_ctrl/output.csv")?;
        self.arch_traj = Archiver::from_path(session, "drive_ctrl/traj_ctrl.csv")?;

        Ok(())
    }

    /// Perform cyclic processing of drive control.
    fn proc(
        &mut self,
        input: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        self.report = StatusReport::default();
        let now_s = input.time_s;
        self.time_s = now_s;

        if !now_s.is_finite()
            || !input.pose.is_finite()
            || !input.measured_vel.is_finite()
            || !input.measured_accel_ms2.iter().all(|a| a.is_finite())
        {
            return Err(DriveCtrlError::NonFiniteInput);
        }

        self.check_gyro(input.gyro_connected);
        self.report.field_relative = self.is_field_relative();

        let snap = self.handle.snapshot();

        if snap.killed {
            return Ok(self.proc_kill(now_s, input));
        }

        // Pending requests
        if let Some(a) = snap.accel_limit_request {
            if let Err(e) = self.limiter.set_max_accel(a) {
                warn!("Ignoring acceleration limit request: {}", e);
            }
        }
        if snap.shot_fired {
            self.last_shot_s = Some(now_s);
        }
        if let Some(ref req) = snap.path_request {
            self.traj_ctrl.start(req.trajectory.clone(), now_s);
        }

        // Leaving path following drops the trajectory
        if snap.mode != DriveMode::FollowingPath && self.traj_ctrl.state() != FollowerState::Idle {
            self.traj_ctrl.stop();
        }

        let aim = if snap.auto_aiming {
            self.solve_aim(input)
        } else {
            None
        };

        let mut publish = Publish {
            mode: None,
            mode_seq: snap.mode_seq,
            aiming: false,
            turn_done: false,
            progress: None,
        };

        let demand = match snap.mode {
            DriveMode::Teleop => Demand::Velocity(self.operator_cmd(&snap.teleop_cmd)),
            DriveMode::TurnToHeading => self.proc_turn(input, &snap, aim.as_ref(), &mut publish),
            DriveMode::Hold => Demand::Hold,
            DriveMode::FollowingPath => {
                self.proc_path(input, &snap, aim.as_ref(), &mut publish)?
            }
            DriveMode::PathDone | DriveMode::Stopped => {
                Demand::Velocity(ChassisVelocity::zero(Frame::Robot))
            }
        };

        let heading = self.frame_heading(&input.pose);
        let measured = self.measured_vel(input);

        let (swerve, applied_vel, delta_v_ms_field) = match demand {
            Demand::Hold => {
                self.limiter.reset_to_rest(now_s);
                (
                    self.synth.hold(&input.sens.str_abs_pos_rad),
                    ChassisVelocity::zero(Frame::Robot),
                    Vector2::zeros(),
                )
            }
            Demand::Velocity(cmd) => {
                let limited = self.limiter.limit(now_s, &cmd, heading, &measured)?;
                self.report.accel_limited = limited.limited;
                self.report.limiter_reseeded = limited.reseeded;

                let swerve =
                    self.synth
                        .synthesize(&limited.velocity, heading, &input.sens.str_abs_pos_rad)?;

                (
                    swerve,
                    limited.velocity.to_robot(heading),
                    limited.delta_v_ms_field,
                )
            }
        };

        self.report.desaturated = swerve.desaturated;
        self.report.aiming = publish.aiming;

        self.handle.publish(publish);

        let output = self.make_output(&swerve, applied_vel, delta_v_ms_field, aim);

        trace!(
            "DriveCtrl {:?}: applied {:?}",
            output.mode,
            output.applied_vel
        );

        Ok((output, self.report))
    }
}

impl Archived for DriveCtrl {
    fn write(&mut self) -> Result<(), ArchiveError> {
        if let Some(o) = self.output {
            let t = &o.target;
            self.arch_output.serialise(OutputRecord {
                time_s: self.time_s,
                mode: o.mode,
                vx_ms: o.applied_vel.vx_ms,
                vy_ms: o.applied_vel.vy_ms,
                omega_rads: o.applied_vel.omega_rads,
                delta_vx_ms: o.delta_v_ms_field[0],
                delta_vy_ms: o.delta_v_ms_field[1],
                lf_speed_ms: t[0].speed_ms,
                lf_angle_rad: t[0].angle_rad,
                lb_speed_ms: t[1].speed_ms,
                lb_angle_rad: t[1].angle_rad,
                rf_speed_ms: t[2].speed_ms,
                rf_angle_rad: t[2].angle_rad,
                rb_speed_ms: t[3].speed_ms,
                rb_angle_rad: t[3].angle_rad,
                accel_limited: self.report.accel_limited,
                desaturated: self.report.desaturated,
                aiming: self.report.aiming,
            })?;
        }

        if let Some(r) = self.report.follower {
            self.arch_traj.serialise(r)?;
        }

        Ok(())
    }
}

impl DriveCtrl {
    /// Create a new drive control module with the given parameters.
    pub fn new(params: Params) -> Self {
        Self::with_handle(params, DriveHandle::new())
    }

    fn with_handle(params: Params, handle: DriveHandle) -> Self {
        let period_s = params.drive.period_s;

        Self {
            limiter: AccelLimiter::new(&params.accel, period_s),
            synth: SwerveSynth::new(&params.swerve),
            head_ctrl: HeadCtrl::new(&params.heading),
            traj_ctrl: TrajCtrl::new(&params.traj, period_s),
            lead_pred: LeadPredictor::new(&params.lead_pred),
            params,
            handle,
            gyro_lost: false,
            last_shot_s: None,
            report: StatusReport::default(),
            output: None,
            time_s: 0.0,
            arch_output: Archiver::default(),
            arch_traj: Archiver::default(),
        }
    }

    /// Get a handle to command this module from other tasks.
    pub fn handle(&self) -> DriveHandle {
        self.handle.clone()
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn synth(&self) -> &SwerveSynth {
        &self.synth
    }

    pub fn lead_predictor(&self) -> &LeadPredictor {
        &self.lead_pred
    }

    pub fn follower_state(&self) -> FollowerState {
        self.traj_ctrl.state()
    }

    /// True while field relative commands are honoured.
    pub fn is_field_relative(&self) -> bool {
        self.params.drive.field_relative && !self.gyro_lost
    }

    /// Target state of the module at `index` from the last cycle.
    pub fn module_state(&self, index: usize) -> Result<ModuleState, DriveCtrlError> {
        let id = ModuleId::try_from(index)?;

        Ok(self
            .output
            .map(|o| o.target[id.index()])
            .unwrap_or_default())
    }

    /// Degrade to robot relative driving the first time the gyro is lost.
    fn check_gyro(&mut self, gyro_connected: bool) {
        if !gyro_connected && !self.gyro_lost {
            self.gyro_lost = true;

            if self.params.drive.field_relative {
                warn!("Gyro connection lost, driving robot relative for the rest of the session");
            }

            // The limiter's frame changes, start it again from the measured velocity
            self.limiter.reset();
        }
    }

    /// Heading used for frame conversions, zero when driving robot relative so that the field
    /// and robot frames coincide.
    fn frame_heading(&self, pose: &Pose) -> f64 {
        if self.is_field_relative() {
            pose.heading_rad
        } else {
            0.0
        }
    }

    /// Operator commands are reinterpreted as robot relative when field relative driving is not
    /// possible.
    fn operator_cmd(&self, cmd: &ChassisVelocity) -> ChassisVelocity {
        if self.is_field_relative() {
            *cmd
        } else {
            ChassisVelocity {
                frame: Frame::Robot,
                ..*cmd
            }
        }
    }

    /// Measured velocity, expressed so that it can be converted with `frame_heading`.
    fn measured_vel(&self, input: &InputData) -> ChassisVelocity {
        if self.is_field_relative() {
            input.measured_vel
        } else {
            input.measured_vel.to_robot(input.pose.heading_rad)
        }
    }

    /// Stop immediately, without going through the acceleration limiter.
    fn proc_kill(&mut self, now_s: f64, input: &InputData) -> (OutputData, StatusReport) {
        warn!("Drive killed, stopping");

        self.traj_ctrl.stop();
        self.limiter.reset_to_rest(now_s);
        self.handle.stop();

        self.report.killed = true;

        // Zero speed, keep the wheels where they are
        let mut swerve = SwerveDems::default();
        for i in 0..NUM_MODULES {
            swerve.target[i] = ModuleState::new(0.0, input.sens.str_abs_pos_rad[i]);
        }

        let output =
            self.make_output(&swerve, ChassisVelocity::zero(Frame::Robot), Vector2::zeros(), None);

        (output, self.report)
    }

    /// Turn to a heading, keeping the operator's translation.
    fn proc_turn(
        &mut self,
        input: &InputData,
        snap: &Snapshot,
        aim: Option<&AimSolution>,
        publish: &mut Publish,
    ) -> Demand {
        let heading = input.pose.heading_rad;
        let goal = aim.map(aim_goal).unwrap_or(snap.turn_goal);

        let cmd = self.operator_cmd(&snap.teleop_cmd);
        let translating = !cmd.is_stationary();

        let omega = self
            .head_ctrl
            .turn_to(input.time_s, &goal, heading, translating);

        let rate = input.measured_vel.omega_rads;
        let done = match snap.turn_tolerance_rad {
            Some(tol) => self.head_ctrl.is_done_within(goal.heading_rad, heading, rate, tol),
            None => self.head_ctrl.is_done(goal.heading_rad, heading, rate),
        };

        publish.aiming = !done;
        if done {
            publish.turn_done = true;

            if snap.turn_from_auto {
                info!("Autonomous turn complete");
                publish.mode = Some(DriveMode::PathDone);
            }
        }

        Demand::Velocity(ChassisVelocity { omega_rads: omega, ..cmd })
    }

    /// Follow the current path.
    fn proc_path(
        &mut self,
        input: &InputData,
        snap: &Snapshot,
        aim: Option<&AimSolution>,
        publish: &mut Publish,
    ) -> Result<Demand, DriveCtrlError> {
        let now_s = input.time_s;
        let heading = input.pose.heading_rad;
        let stop = Demand::Velocity(ChassisVelocity::zero(Frame::Robot));

        if self.traj_ctrl.state() == FollowerState::Idle {
            warn!("Following path mode without a trajectory, path done");
            publish.mode = Some(DriveMode::PathDone);
            return Ok(stop);
        }

        // Aim override replaces the path heading
        let omega_override = match aim {
            Some(a) => {
                let goal = aim_goal(a);
                let omega = self.head_ctrl.turn_to(now_s, &goal, heading, true);
                publish.aiming =
                    !self
                        .head_ctrl
                        .is_done(goal.heading_rad, heading, input.measured_vel.omega_rads);
                Some(omega)
            }
            None => None,
        };

        let (vel, report) =
            self.traj_ctrl
                .proc(now_s, &input.pose, snap.target_heading_rad, omega_override)?;
        self.report.follower = Some(report);

        let state = self.traj_ctrl.state();
        publish.progress = Some(PathProgress {
            elapsed_s: report.elapsed_s,
            duration_s: report.duration_s,
            finished: state == FollowerState::Done,
        });

        match (state, vel) {
            (FollowerState::Done, _) => {
                publish.mode = Some(DriveMode::PathDone);
                Ok(stop)
            }
            (_, Some(v)) => {
                if self.is_field_relative() {
                    Ok(Demand::Velocity(v))
                } else {
                    Ok(Demand::Velocity(v.to_robot(heading)))
                }
            }
            // Faulted, retried next cycle
            (_, None) => Ok(stop),
        }
    }

    /// Solve the aim solution for this cycle, logging and ignoring failures.
    fn solve_aim(&self, input: &InputData) -> Option<AimSolution> {
        let vel_field = input.measured_vel.to_field(input.pose.heading_rad).linear();
        let lookahead = self
            .lead_pred
            .lookahead_s(self.last_shot_s.map(|t| input.time_s - t));

        match self.lead_pred.solve(
            &input.pose.position_m,
            &vel_field,
            &input.measured_accel_ms2,
            lookahead,
        ) {
            Ok(s) => Some(s),
            Err(e) => {
                warn!("Could not solve aim: {}", e);
                None
            }
        }
    }

    fn make_output(
        &mut self,
        swerve: &SwerveDems,
        applied_vel: ChassisVelocity,
        delta_v_ms_field: Vector2<f64>,
        aim: Option<AimSolution>,
    ) -> OutputData {
        let output = OutputData {
            mode: self.handle.mode(),
            dems: swerve.to_drive_dems(),
            target: swerve.target,
            applied_vel,
            delta_v_ms_field,
            aim,
        };

        self.output = Some(output);
        output
    }
}

/// Heading goal facing the aim point.
fn aim_goal(aim: &AimSolution) -> HeadingGoal {
    HeadingGoal {
        heading_rad: aim.heading_rad,
        rate_rads: aim.heading_rate_rads,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::traj_ctrl::Trajectory;
    use std::sync::Arc;

    const DT: f64 = 0.02;

    fn input(time_s: f64) -> InputData {
        InputData {
            time_s,
            ..Default::default()
        }
    }

    #[test]
    fn test_teleop_ramps() {
        let mut dc = DriveCtrl::default();
        let h = dc.handle();
        h.command_velocity(ChassisVelocity::robot(4.0, 0.0, 0.0)).unwrap();

        let (out, report) = dc.proc(&input(0.0)).unwrap();
        assert_eq!(out.mode, DriveMode::Teleop);
        assert!(report.accel_limited);
        assert!((out.applied_vel.vx_ms - 0.4).abs() < 1e-9);
        for i in 0..NUM_MODULES {
            assert!((out.dems.drv_speed_ms[i] - 0.4).abs() < 1e-9);
        }

        for i in 1..20 {
            dc.proc(&input(i as f64 * DT)).unwrap();
        }
        let m = dc.module_state(0).unwrap();
        assert!((m.speed_ms - 4.0).abs() < 1e-9);
        assert!(dc.module_state(4).is_err());
    }

    #[test]
    fn test_kill_zeroes_speeds() {
        let mut dc = DriveCtrl::default();
        let h = dc.handle();
        h.command_velocity(ChassisVelocity::robot(4.0, 0.0, 0.0)).unwrap();

        for i in 0..10 {
            dc.proc(&input(i as f64 * DT)).unwrap();
        }

        h.cancel();
        let (out, report) = dc.proc(&input(10.0 * DT)).unwrap();

        assert!(report.killed);
        assert_eq!(out.mode, DriveMode::Stopped);
        assert_eq!(out.dems.drv_speed_ms, [0.0; NUM_MODULES]);
        assert_eq!(h.mode(), DriveMode::Stopped);
    }

    #[test]
    fn test_stopped_decelerates() {
        let mut dc = DriveCtrl::default();
        let h = dc.handle();
        h.command_velocity(ChassisVelocity::robot(4.0, 0.0, 0.0)).unwrap();
        for i in 0..20 {
            dc.proc(&input(i as f64 * DT)).unwrap();
        }

        h.stop();
        let (out, _) = dc.proc(&input(20.0 * DT)).unwrap();
        assert!((out.applied_vel.vx_ms - 3.6).abs() < 1e-9);
    }

    #[test]
    fn test_hold() {
        let mut dc = DriveCtrl::default();
        let h = dc.handle();
        h.hold();

        let (out, _) = dc.proc(&input(0.0)).unwrap();
        assert_eq!(out.mode, DriveMode::Hold);
        assert!(out.dems.str_abs_pos_rad.iter().all(|s| s.is_some()));
        assert_eq!(out.dems.drv_speed_ms, [0.0; NUM_MODULES]);
    }

    #[test]
    fn test_gyro_loss() {
        let mut dc = DriveCtrl::default();
        let h = dc.handle();

        // Field +X while facing field +Y
        let mut inp = input(0.0);
        inp.pose = Pose::new(0.0, 0.0, std::f64::consts::FRAC_PI_2);
        h.command_velocity(ChassisVelocity::field(0.2, 0.0, 0.0)).unwrap();

        let (out, report) = dc.proc(&inp).unwrap();
        assert!(report.field_relative);
        assert!((out.applied_vel.vy_ms + 0.2).abs() < 1e-9);

        // After the gyro is lost the same command is robot relative, and stays so
        inp.time_s = DT;
        inp.gyro_connected = false;
        let (out, report) = dc.proc(&inp).unwrap();
        assert!(!report.field_relative);
        assert!(!dc.is_field_relative());
        assert!(out.applied_vel.vx_ms > 0.0);

        inp.time_s = 2.0 * DT;
        inp.gyro_connected = true;
        let (_, report) = dc.proc(&inp).unwrap();
        assert!(!report.field_relative);
    }

    #[test]
    fn test_non_finite_input() {
        let mut dc = DriveCtrl::default();
        let mut inp = input(0.0);
        inp.pose.heading_rad = f64::NAN;

        assert!(matches!(dc.proc(&inp), Err(DriveCtrlError::NonFiniteInput)));
    }

    #[test]
    fn test_turn_to_heading() {
        let mut dc = DriveCtrl::default();
        let h = dc.handle();
        h.turn_to_heading_auto(HeadingGoal::fixed(1.0)).unwrap();

        // Ideal plant: heading follows the applied rate
        let mut inp = input(0.0);
        for i in 0..300 {
            inp.time_s = i as f64 * DT;
            let (out, _) = dc.proc(&inp).unwrap();
            inp.pose.heading_rad += out.applied_vel.omega_rads * DT;
            inp.measured_vel = out.applied_vel;

            if h.is_turn_done() {
                break;
            }
        }

        assert!(h.is_turn_done());
        assert!(!h.is_aiming());
        assert_eq!(h.mode(), DriveMode::PathDone);
        assert!((inp.pose.heading_rad - 1.0).abs() < 0.85f64.to_radians());
    }

    #[test]
    fn test_follow_path() {
        let mut dc = DriveCtrl::default();
        let h = dc.handle();

        let traj = Arc::new(
            Trajectory::straight_line(Vector2::zeros(), Vector2::new(1.0, 0.0), 2.0, 2.0).unwrap(),
        );
        h.start_path(traj.clone(), 0.0);
        assert!(!h.is_path_finished());

        let mut inp = input(0.0);
        let mut i = 0;
        while !h.is_path_finished() && i < 500 {
            inp.time_s = i as f64 * DT;
            let (out, _) = dc.proc(&inp).unwrap();
            let v = out.applied_vel.to_field(inp.pose.heading_rad);
            inp.pose.position_m += v.linear() * DT;
            inp.pose.heading_rad += v.omega_rads * DT;
            inp.measured_vel = out.applied_vel;
            i += 1;
        }

        assert!(h.is_path_finished());
        assert_eq!(h.mode(), DriveMode::PathDone);
        assert!(h.path_progress().elapsed_s >= traj.duration_s());
        assert!((inp.pose.position_m[0] - 1.0).abs() < 0.15);
    }
}
