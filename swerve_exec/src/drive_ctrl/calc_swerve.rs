//! # Swerve command synthesizer
//!
//! Converts a chassis velocity into a target state for each module: inverse kinematics, shortest
//! rotation optimisation against the measured module angles, then desaturation so no wheel is
//! asked to exceed the platform's maximum speed.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use nalgebra::Vector2;
use serde::Serialize;
use std::convert::TryFrom;

// Internal
use super::{ChassisVelocity, DriveCtrlError, ModuleId, ModuleState, SwerveParams, NUM_MODULES};
use comms_if::eqpt::drive::DriveDems;
use util::maths::get_ang_dist_pi;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Swerve synthesizer, holding the drivetrain geometry and capabilities.
#[derive(Debug, Clone)]
pub struct SwerveSynth {
    /// Units: meters,
    /// Frame: Robot body
    pub(crate) module_pos_m: [Vector2<f64>; NUM_MODULES],

    /// Units: meters/second
    pub(crate) max_speed_ms: f64,

    /// Units: radians
    pub(crate) steer_deadband_rad: f64,
}

/// Module targets produced for one control cycle.
#[derive(Debug, Copy, Clone, Default, Serialize)]
pub struct SwerveDems {
    /// Target state of each module.
    pub target: [ModuleState; NUM_MODULES],

    /// Steer setpoint to command, or `None` to keep the current setpoint.
    ///
    /// Units: radians
    pub steer_rad: [Option<f64>; NUM_MODULES],

    /// True if the module speeds were scaled down to respect the maximum speed.
    pub desaturated: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SwerveDems {
    /// Target state of the module at `index`.
    pub fn module(&self, index: usize) -> Result<ModuleState, DriveCtrlError> {
        let id = ModuleId::try_from(index)?;
        Ok(self.target[id.index()])
    }

    /// Demands for the module equipment.
    pub fn to_drive_dems(&self) -> DriveDems {
        let mut dems = DriveDems::default();

        for i in 0..NUM_MODULES {
            dems.drv_speed_ms[i] = self.target[i].speed_ms;
            dems.str_abs_pos_rad[i] = self.steer_rad[i];
        }

        dems
    }
}

impl SwerveSynth {
    pub fn new(params: &SwerveParams) -> Self {
        let mut module_pos_m = [Vector2::zeros(); NUM_MODULES];
        for (pos, p) in module_pos_m.iter_mut().zip(params.module_pos_m.iter()) {
            *pos = Vector2::new(p[0], p[1]);
        }

        Self {
            module_pos_m,
            max_speed_ms: params.max_speed_ms,
            steer_deadband_rad: params.steer_deadband_rad,
        }
    }

    /// Units: meters/second
    pub fn max_speed_ms(&self) -> f64 {
        self.max_speed_ms
    }

    /// Position of a module relative to the robot centre.
    pub fn module_pos_m(&self, id: ModuleId) -> Vector2<f64> {
        self.module_pos_m[id.index()]
    }

    /// Velocity of each wheel contact point in the robot frame.
    pub fn module_vectors(&self, vel_robot: &ChassisVelocity) -> [Vector2<f64>; NUM_MODULES] {
        let mut vecs = [Vector2::zeros(); NUM_MODULES];

        for (v, pos) in vecs.iter_mut().zip(self.module_pos_m.iter()) {
            *v = Vector2::new(
                vel_robot.vx_ms - vel_robot.omega_rads * pos[1],
                vel_robot.vy_ms + vel_robot.omega_rads * pos[0],
            );
        }

        vecs
    }

    /// Compute the module demands for `chassis`.
    ///
    /// # Inputs
    /// - `chassis`: the chassis velocity, in either frame.
    /// - `heading_rad`: robot heading, used if `chassis` is field relative.
    /// - `measured_angles_rad`: the measured angle of each module.
    pub fn synthesize(
        &self,
        chassis: &ChassisVelocity,
        heading_rad: f64,
        measured_angles_rad: &[f64; NUM_MODULES],
    ) -> Result<SwerveDems, DriveCtrlError> {
        if !chassis.is_finite() {
            return Err(DriveCtrlError::NonFiniteVelocity(*chassis));
        }
        if measured_angles_rad.iter().any(|a| !a.is_finite()) || !heading_rad.is_finite() {
            return Err(DriveCtrlError::NonFiniteInput);
        }

        let vel_robot = chassis.to_robot(heading_rad);
        let vecs = self.module_vectors(&vel_robot);

        let mut target = [ModuleState::default(); NUM_MODULES];
        for i in 0..NUM_MODULES {
            target[i] = ModuleState::from_vector(&vecs[i], measured_angles_rad[i])
                .optimize(measured_angles_rad[i]);
        }

        let desaturated = Self::desaturate(&mut target, self.max_speed_ms);

        // Only steer if the robot is expected to move, otherwise the wheels would chatter about
        // their current angle.
        let steer_rad = self.steer_demands(&target, measured_angles_rad, !vel_robot.is_zero());

        trace!("SwerveSynth targets: {:?}", target);

        Ok(SwerveDems {
            target,
            steer_rad,
            desaturated,
        })
    }

    /// Scale all speeds down proportionally if any exceeds `max_speed_ms`.
    ///
    /// Returns true if scaling was applied.
    pub fn desaturate(states: &mut [ModuleState; NUM_MODULES], max_speed_ms: f64) -> bool {
        let max = states
            .iter()
            .map(|s| s.speed_ms.abs())
            .fold(0.0, f64::max);

        if max > max_speed_ms {
            let scale = max_speed_ms / max;
            for s in states.iter_mut() {
                s.speed_ms *= scale;
            }
            true
        } else {
            false
        }
    }

    /// Estimate the chassis velocity (robot frame) from the module states.
    ///
    /// This is the least squares inverse of `module_vectors`.
    pub fn to_chassis(&self, states: &[ModuleState; NUM_MODULES]) -> ChassisVelocity {
        let mut sum_v = Vector2::zeros();
        let mut sum_moment = 0.0;
        let mut sum_r2 = 0.0;

        for (s, pos) in states.iter().zip(self.module_pos_m.iter()) {
            let v = Vector2::new(s.angle_rad.cos(), s.angle_rad.sin()) * s.speed_ms;
            sum_v += v;
            sum_moment += pos[0] * v[1] - pos[1] * v[0];
            sum_r2 += pos.norm_squared();
        }

        let linear = sum_v / NUM_MODULES as f64;
        let omega = if sum_r2 > 0.0 { sum_moment / sum_r2 } else { 0.0 };

        ChassisVelocity::robot(linear[0], linear[1], omega)
    }

    /// Steer setpoints for the targets, skipping modules already within the deadband.
    pub(crate) fn steer_demands(
        &self,
        target: &[ModuleState; NUM_MODULES],
        measured_angles_rad: &[f64; NUM_MODULES],
        moving: bool,
    ) -> [Option<f64>; NUM_MODULES] {
        let mut steer = [None; NUM_MODULES];

        if !moving {
            return steer;
        }

        for i in 0..NUM_MODULES {
            let change = get_ang_dist_pi(target[i].angle_rad, measured_angles_rad[i]);
            if change.abs() > self.steer_deadband_rad {
                steer[i] = Some(target[i].angle_rad);
            }
        }

        steer
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    fn synth() -> SwerveSynth {
        SwerveSynth::new(&SwerveParams::default())
    }

    #[test]
    fn test_straight_ahead() {
        let s = synth();
        let dems = s
            .synthesize(&ChassisVelocity::robot(2.0, 0.0, 0.0), 0.0, &[0.0; NUM_MODULES])
            .unwrap();

        for t in dems.target.iter() {
            assert!((t.speed_ms - 2.0).abs() < 1e-12);
            assert!(t.angle_rad.abs() < 1e-12);
        }

        // Already pointing the right way so no steer demand is needed
        assert_eq!(dems.steer_rad, [None; NUM_MODULES]);
        assert!(!dems.desaturated);
    }

    #[test]
    fn test_sideways_flips() {
        let s = synth();

        // Moving left with the wheels near -90 degrees is cheaper by driving them backwards
        let dems = s
            .synthesize(
                &ChassisVelocity::robot(0.0, 1.0, 0.0),
                0.0,
                &[-FRAC_PI_2 + 0.1; NUM_MODULES],
            )
            .unwrap();

        for t in dems.target.iter() {
            assert!((t.angle_rad + FRAC_PI_2).abs() < 1e-9);
            assert!((t.speed_ms + 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_rotation_only() {
        let s = synth();
        let dems = s
            .synthesize(&ChassisVelocity::robot(0.0, 0.0, 1.0), 0.0, &[0.0; NUM_MODULES])
            .unwrap();

        let r = (2.0f64).sqrt() * 0.307975;
        for t in dems.target.iter() {
            assert!((t.speed_ms.abs() - r).abs() < 1e-9);
        }
        assert!(dems.steer_rad.iter().all(|s| s.is_some()));
    }

    #[test]
    fn test_field_relative() {
        let s = synth();

        // Field +X with the robot facing +Y is robot -Y
        let dems = s
            .synthesize(
                &ChassisVelocity::field(1.0, 0.0, 0.0),
                FRAC_PI_2,
                &[-FRAC_PI_2; NUM_MODULES],
            )
            .unwrap();

        for t in dems.target.iter() {
            assert!((t.angle_rad + FRAC_PI_2).abs() < 1e-9);
            assert!((t.speed_ms - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_desaturate() {
        let s = synth();
        let cmds = [
            ChassisVelocity::robot(7.0, 0.0, 10.0),
            ChassisVelocity::robot(-5.0, 6.0, -3.0),
            ChassisVelocity::robot(100.0, 100.0, 100.0),
            ChassisVelocity::robot(0.0, 0.0, 40.0),
        ];

        for c in cmds.iter() {
            let dems = s.synthesize(c, 0.0, &[0.0; NUM_MODULES]).unwrap();
            assert!(dems.desaturated);
            for t in dems.target.iter() {
                assert!(t.speed_ms.abs() <= s.max_speed_ms() + 1e-9);
            }

            // The fastest module sits exactly at the limit
            let max = dems.target.iter().map(|t| t.speed_ms.abs()).fold(0.0, f64::max);
            assert!((max - s.max_speed_ms()).abs() < 1e-9);
        }
    }

    #[test]
    fn test_desaturate_keeps_ratios() {
        let mut states = [
            ModuleState::new(10.0, 0.0),
            ModuleState::new(-5.0, 0.0),
            ModuleState::new(2.5, 0.0),
            ModuleState::new(0.0, 0.0),
        ];

        assert!(SwerveSynth::desaturate(&mut states, 5.0));
        assert!((states[0].speed_ms - 5.0).abs() < 1e-12);
        assert!((states[1].speed_ms + 2.5).abs() < 1e-12);
        assert!((states[2].speed_ms - 1.25).abs() < 1e-12);
    }

    #[test]
    fn test_stationary_no_steer() {
        let s = synth();
        let measured = [0.3, -0.2, 1.0, 2.0];
        let dems = s
            .synthesize(&ChassisVelocity::robot(0.0, 0.0, 0.0), 0.0, &measured)
            .unwrap();

        assert_eq!(dems.steer_rad, [None; NUM_MODULES]);
        for (t, m) in dems.target.iter().zip(measured.iter()) {
            assert_eq!(t.speed_ms, 0.0);
            assert!((t.angle_rad - m).abs() < 1e-12);
        }
    }

    #[test]
    fn test_forward_kinematics() {
        let s = synth();
        let cmd = ChassisVelocity::robot(1.0, -0.5, 0.8);
        let dems = s.synthesize(&cmd, 0.0, &[0.0; NUM_MODULES]).unwrap();
        let est = s.to_chassis(&dems.target);

        assert!((est.vx_ms - 1.0).abs() < 1e-9);
        assert!((est.vy_ms + 0.5).abs() < 1e-9);
        assert!((est.omega_rads - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_module_index() {
        let dems = SwerveDems::default();
        assert!(dems.module(3).is_ok());
        assert!(matches!(
            dems.module(7),
            Err(DriveCtrlError::InvalidModuleIndex(7))
        ));
    }
}
