//! # Drivetrain simulation
//!
//! A kinematic model of the swerve drivetrain used in place of the module hardware when running
//! the executable on a development machine, and by tests which need a closed loop. Each module
//! steers towards its demanded angle at a bounded rate and its wheel speed follows the demand
//! with a first order lag. The chassis motion is recovered from the module states and
//! integrated into the pose.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector2;
use serde::Deserialize;

// Internal
use crate::{
    drive_ctrl::{ChassisVelocity, InputData, ModuleState, SwerveParams, SwerveSynth, NUM_MODULES},
    loc::Pose,
};
use comms_if::eqpt::drive::{DriveDems, DriveSensData};
use util::maths::{get_ang_dist_pi, wrap_pi};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters of the simulated modules.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct SimParams {
    /// Maximum steer rate of a module. Infinite for an ideal steer axis.
    ///
    /// Units: radians/second
    pub steer_rate_rads: f64,

    /// Time constant of the wheel speed response. Zero for an ideal drive axis.
    ///
    /// Units: seconds
    pub drive_time_const_s: f64,
}

/// Simulated drivetrain.
pub struct SimDrivetrain {
    synth: SwerveSynth,
    params: SimParams,

    modules: [ModuleState; NUM_MODULES],

    pose: Pose,
    vel_robot: ChassisVelocity,
    accel_ms2_field: Vector2<f64>,

    gyro_connected: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for SimParams {
    fn default() -> Self {
        Self {
            steer_rate_rads: 20.0,
            drive_time_const_s: 0.05,
        }
    }
}

impl SimParams {
    /// Modules which achieve their demands instantly.
    pub fn ideal() -> Self {
        Self {
            steer_rate_rads: f64::INFINITY,
            drive_time_const_s: 0.0,
        }
    }
}

impl SimDrivetrain {
    pub fn new(swerve: &SwerveParams, params: &SimParams, start_pose: Pose) -> Self {
        Self {
            synth: SwerveSynth::new(swerve),
            params: *params,
            modules: [ModuleState::default(); NUM_MODULES],
            pose: start_pose,
            vel_robot: ChassisVelocity::default(),
            accel_ms2_field: Vector2::zeros(),
            gyro_connected: true,
        }
    }

    /// Advance the simulation by `dt_s` with the given demands.
    pub fn apply(&mut self, dems: &DriveDems, dt_s: f64) {
        if dt_s <= 0.0 {
            return;
        }

        for (i, m) in self.modules.iter_mut().enumerate() {
            if let Some(target) = dems.str_abs_pos_rad[i] {
                let err = get_ang_dist_pi(target, m.angle_rad);
                let max_step = self.params.steer_rate_rads * dt_s;

                m.angle_rad = if err.abs() <= max_step {
                    wrap_pi(target)
                } else {
                    wrap_pi(m.angle_rad + max_step * err.signum())
                };
            }

            let tau = self.params.drive_time_const_s;
            m.speed_ms = if tau > 0.0 {
                let alpha = dt_s / (tau + dt_s);
                m.speed_ms + alpha * (dems.drv_speed_ms[i] - m.speed_ms)
            } else {
                dems.drv_speed_ms[i]
            };
        }

        let prev_field = self.vel_robot.to_field(self.pose.heading_rad).linear();

        self.vel_robot = self.synth.to_chassis(&self.modules);

        // Integrate with the midpoint heading
        let mid_heading = self.pose.heading_rad + 0.5 * self.vel_robot.omega_rads * dt_s;
        let vel_field = self.vel_robot.to_field(mid_heading);

        self.pose.position_m += vel_field.linear() * dt_s;
        self.pose.heading_rad = wrap_pi(self.pose.heading_rad + vel_field.omega_rads * dt_s);

        self.accel_ms2_field = (vel_field.linear() - prev_field) / dt_s;
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn set_pose(&mut self, pose: Pose) {
        self.pose = pose;
    }

    pub fn set_gyro_connected(&mut self, connected: bool) {
        self.gyro_connected = connected;
    }

    /// Measured robot frame chassis velocity.
    pub fn measured_velocity(&self) -> ChassisVelocity {
        self.vel_robot
    }

    pub fn sens_data(&self) -> DriveSensData {
        let mut sens = DriveSensData::default();

        for (i, m) in self.modules.iter().enumerate() {
            sens.str_abs_pos_rad[i] = m.angle_rad;
            sens.drv_speed_ms[i] = m.speed_ms;
        }

        sens
    }

    /// Build the drive control input for the current simulated state.
    pub fn input_data(&self, time_s: f64) -> InputData {
        InputData {
            time_s,
            pose: self.pose,
            gyro_connected: self.gyro_connected,
            measured_vel: self.vel_robot,
            measured_accel_ms2: self.accel_ms2_field,
            sens: self.sens_data(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn dems(angle: f64, speed: f64) -> DriveDems {
        DriveDems {
            str_abs_pos_rad: [Some(angle); NUM_MODULES],
            drv_speed_ms: [speed; NUM_MODULES],
        }
    }

    #[test]
    fn test_ideal_straight() {
        let mut sim = SimDrivetrain::new(
            &SwerveParams::default(),
            &SimParams::ideal(),
            Pose::new(0.0, 0.0, std::f64::consts::FRAC_PI_2),
        );

        // Driving along robot X while facing field Y moves along field Y
        for _ in 0..50 {
            sim.apply(&dems(0.0, 1.0), 0.02);
        }

        let pose = sim.pose();
        assert!(pose.position_m[0].abs() < 1e-9);
        assert!((pose.position_m[1] - 1.0).abs() < 1e-9);
        assert!((sim.measured_velocity().vx_ms - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_steer_rate() {
        let params = SimParams {
            steer_rate_rads: 1.0,
            drive_time_const_s: 0.0,
        };
        let mut sim = SimDrivetrain::new(&SwerveParams::default(), &params, Pose::default());

        sim.apply(&dems(1.0, 0.0), 0.1);
        assert!((sim.sens_data().str_abs_pos_rad[0] - 0.1).abs() < 1e-9);

        // No steer demand keeps the current angle
        let mut d = dems(0.0, 0.0);
        d.str_abs_pos_rad = [None; NUM_MODULES];
        sim.apply(&d, 0.1);
        assert!((sim.sens_data().str_abs_pos_rad[0] - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_drive_lag() {
        let params = SimParams {
            steer_rate_rads: f64::INFINITY,
            drive_time_const_s: 0.1,
        };
        let mut sim = SimDrivetrain::new(&SwerveParams::default(), &params, Pose::default());

        sim.apply(&dems(0.0, 1.0), 0.1);
        let v = sim.sens_data().drv_speed_ms[0];
        assert!((v - 0.5).abs() < 1e-9);

        let input = sim.input_data(1.0);
        assert!(input.gyro_connected);
        assert!((input.measured_accel_ms2[0] - 5.0).abs() < 1e-9);
    }
}
