//! # Acceleration limiter
//!
//! Bounds the change in the applied chassis velocity between control cycles. Linear velocity is
//! limited as a 2D vector in the field frame so that the direction of the change is preserved,
//! angular rate is limited separately.
//!
//! The limiter works around the last velocity it applied. When it has not been called for longer
//! than the stale period (robot disabled or idle) it starts again from the measured velocity.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::debug;
use nalgebra::Vector2;
use serde::Serialize;

// Internal
use super::{AccelParams, ChassisVelocity, DriveCtrlError, Frame};
use util::maths::limit_magnitude;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Acceleration limiter state
#[derive(Debug, Clone)]
pub struct AccelLimiter {
    /// Units: meters/second^2
    max_accel_ms2: f64,

    /// Units: radians/second^2
    max_ang_accel_rads2: f64,

    /// Time step assumed when there is no valid previous call.
    ///
    /// Units: seconds
    nominal_period_s: f64,

    /// Units: seconds
    stale_period_s: f64,

    last: Option<Applied>,
}

/// The last applied velocity.
#[derive(Debug, Copy, Clone)]
struct Applied {
    time_s: f64,
    vel_ms_field: Vector2<f64>,
    omega_rads: f64,
}

/// Output of the limiter.
#[derive(Debug, Copy, Clone, Serialize)]
pub struct LimitOutput {
    /// Velocity to apply, in the frame of the command.
    pub velocity: ChassisVelocity,

    /// The linear velocity change that was applied, in the field frame.
    ///
    /// Units: meters/second
    pub delta_v_ms_field: Vector2<f64>,

    /// True if either the linear or angular change was clamped.
    pub limited: bool,

    /// True if the limiter state was reseeded from the measured velocity.
    pub reseeded: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl AccelLimiter {
    pub fn new(params: &AccelParams, nominal_period_s: f64) -> Self {
        Self {
            max_accel_ms2: params.max_accel_ms2,
            max_ang_accel_rads2: params.max_ang_accel_rads2,
            nominal_period_s,
            stale_period_s: params.stale_period_s,
            last: None,
        }
    }

    /// Current linear acceleration limit.
    ///
    /// Units: meters/second^2
    pub fn max_accel_ms2(&self) -> f64 {
        self.max_accel_ms2
    }

    /// Change the linear acceleration limit.
    pub fn set_max_accel(&mut self, max_accel_ms2: f64) -> Result<(), DriveCtrlError> {
        if !max_accel_ms2.is_finite() || max_accel_ms2 <= 0.0 {
            return Err(DriveCtrlError::InvalidAccelLimit(max_accel_ms2));
        }

        debug!("Acceleration limit set to {} m/s^2", max_accel_ms2);
        self.max_accel_ms2 = max_accel_ms2;
        Ok(())
    }

    /// Record that the robot has been brought to rest at `now_s` without going through the
    /// limiter.
    pub fn reset_to_rest(&mut self, now_s: f64) {
        self.last = Some(Applied {
            time_s: now_s,
            vel_ms_field: Vector2::zeros(),
            omega_rads: 0.0,
        });
    }

    /// Forget the last applied velocity, the next call reseeds from the measured velocity.
    pub fn reset(&mut self) {
        self.last = None;
    }

    /// Limit the commanded velocity `cmd`.
    ///
    /// # Inputs
    /// - `now_s`: current time.
    /// - `cmd`: the desired velocity, in either frame.
    /// - `heading_rad`: robot heading used for frame conversions.
    /// - `measured`: measured chassis velocity, used when the limiter state is stale.
    pub fn limit(
        &mut self,
        now_s: f64,
        cmd: &ChassisVelocity,
        heading_rad: f64,
        measured: &ChassisVelocity,
    ) -> Result<LimitOutput, DriveCtrlError> {
        if !cmd.is_finite() {
            return Err(DriveCtrlError::NonFiniteVelocity(*cmd));
        }
        if !measured.is_finite() || !now_s.is_finite() || !heading_rad.is_finite() {
            return Err(DriveCtrlError::NonFiniteInput);
        }

        let desired = cmd.to_field(heading_rad);

        // Find the velocity to limit around and the elapsed time
        let (base, dt, reseeded) = match self.last {
            Some(l) if now_s - l.time_s <= self.stale_period_s => (l, now_s - l.time_s, false),
            _ => {
                let m = measured.to_field(heading_rad);
                let seed = Applied {
                    time_s: now_s,
                    vel_ms_field: m.linear(),
                    omega_rads: m.omega_rads,
                };
                (seed, self.nominal_period_s, true)
            }
        };

        if reseeded {
            debug!("Acceleration limiter reseeded from measured velocity");
        }

        // No elapsed time means no change is allowed
        if dt <= 0.0 {
            let held = ChassisVelocity::from_linear(Frame::Field, base.vel_ms_field, base.omega_rads);
            self.last = Some(base);

            return Ok(LimitOutput {
                velocity: held.in_frame(cmd.frame, heading_rad),
                delta_v_ms_field: Vector2::zeros(),
                limited: desired.linear() != base.vel_ms_field
                    || desired.omega_rads != base.omega_rads,
                reseeded,
            });
        }

        let mut limited = false;

        // Linear change, clamped in magnitude with its direction kept
        let max_dv = self.max_accel_ms2 * dt;
        let mut delta_v = desired.linear() - base.vel_ms_field;
        let dv_norm = delta_v.norm();
        if dv_norm > max_dv {
            delta_v *= max_dv / dv_norm;
            limited = true;
        }

        // Angular change
        let max_dw = self.max_ang_accel_rads2 * dt;
        let desired_dw = desired.omega_rads - base.omega_rads;
        let delta_w = limit_magnitude(desired_dw, max_dw);
        if delta_w != desired_dw {
            limited = true;
        }

        let applied = Applied {
            time_s: now_s,
            vel_ms_field: base.vel_ms_field + delta_v,
            omega_rads: base.omega_rads + delta_w,
        };
        self.last = Some(applied);

        let velocity =
            ChassisVelocity::from_linear(Frame::Field, applied.vel_ms_field, applied.omega_rads)
                .in_frame(cmd.frame, heading_rad);

        Ok(LimitOutput {
            velocity,
            delta_v_ms_field: delta_v,
            limited,
            reseeded,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const DT: f64 = 0.02;

    fn limiter() -> AccelLimiter {
        AccelLimiter::new(&AccelParams::default(), DT)
    }

    #[test]
    fn test_from_rest() {
        let mut l = limiter();
        let rest = ChassisVelocity::default();
        let cmd = ChassisVelocity::robot(4.0, 0.0, 0.0);

        let out = l.limit(0.0, &cmd, 0.0, &rest).unwrap();
        assert!(out.limited);
        assert!(out.reseeded);
        assert!((out.velocity.vx_ms - 0.4).abs() < 1e-9);
        assert!(out.velocity.vy_ms.abs() < 1e-9);
        assert!(out.delta_v_ms_field.norm() <= 0.4 + 1e-9);

        // Next cycle continues from the applied velocity
        let out = l.limit(DT, &cmd, 0.0, &rest).unwrap();
        assert!(!out.reseeded);
        assert!((out.velocity.vx_ms - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_bound_holds() {
        let mut l = limiter();
        let rest = ChassisVelocity::default();
        let cmds = [
            ChassisVelocity::field(5.0, -3.0, 2.0),
            ChassisVelocity::robot(-7.0, 1.0, -10.0),
            ChassisVelocity::field(0.1, 0.1, 0.0),
            ChassisVelocity::robot(0.0, 6.0, 30.0),
        ];
        let max_w = AccelParams::default().max_ang_accel_rads2;

        let mut t = 0.0;
        let mut prev = ChassisVelocity::zero(Frame::Field);
        for i in 0..40 {
            let dt = 0.005 + 0.005 * (i % 4) as f64;
            t += dt;
            let heading = 0.1 * i as f64;

            let out = l.limit(t, &cmds[i % cmds.len()], heading, &rest).unwrap();
            let applied = out.velocity.to_field(heading);

            if i > 0 {
                assert!((applied.linear() - prev.linear()).norm() <= 20.0 * dt + 1e-9);
                assert!((applied.omega_rads - prev.omega_rads).abs() <= max_w * dt + 1e-9);
            }
            prev = applied;
        }
    }

    #[test]
    fn test_zero_dt() {
        let mut l = limiter();
        let rest = ChassisVelocity::default();
        let cmd = ChassisVelocity::field(4.0, 0.0, 0.0);

        let first = l.limit(1.0, &cmd, 0.0, &rest).unwrap();
        let again = l.limit(1.0, &cmd, 0.0, &rest).unwrap();

        assert_eq!(again.delta_v_ms_field.norm(), 0.0);
        assert_eq!(again.velocity, first.velocity);
    }

    #[test]
    fn test_stale_reseed() {
        let mut l = limiter();
        let rest = ChassisVelocity::default();
        let cmd = ChassisVelocity::field(4.0, 0.0, 0.0);

        l.limit(0.0, &cmd, 0.0, &rest).unwrap();

        // After a long gap the robot is measured moving at 3 m/s, start from there
        let moving = ChassisVelocity::field(3.0, 0.0, 0.0);
        let out = l.limit(5.0, &cmd, 0.0, &moving).unwrap();
        assert!(out.reseeded);
        assert!((out.velocity.vx_ms - 3.4).abs() < 1e-9);
    }

    #[test]
    fn test_output_frame() {
        let mut l = limiter();
        let rest = ChassisVelocity::default();
        let heading = std::f64::consts::FRAC_PI_2;

        // Small robot frame command passes straight through in the robot frame
        let cmd = ChassisVelocity::robot(0.1, 0.0, 0.0);
        let out = l.limit(0.0, &cmd, heading, &rest).unwrap();
        assert_eq!(out.velocity.frame, Frame::Robot);
        assert!((out.velocity.vx_ms - 0.1).abs() < 1e-9);
        assert!(out.velocity.vy_ms.abs() < 1e-9);

        // The field frame change is along +Y
        assert!((out.delta_v_ms_field[1] - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_angular_limit() {
        let mut l = limiter();
        let rest = ChassisVelocity::default();
        let cmd = ChassisVelocity::robot(0.0, 0.0, 100.0);

        let out = l.limit(0.0, &cmd, 0.0, &rest).unwrap();
        let max_dw = AccelParams::default().max_ang_accel_rads2 * DT;
        assert!((out.velocity.omega_rads - max_dw).abs() < 1e-9);
    }

    #[test]
    fn test_invalid() {
        let mut l = limiter();
        let rest = ChassisVelocity::default();

        assert!(matches!(
            l.limit(0.0, &ChassisVelocity::robot(f64::NAN, 0.0, 0.0), 0.0, &rest),
            Err(DriveCtrlError::NonFiniteVelocity(_))
        ));
        assert!(l.set_max_accel(0.0).is_err());
        assert!(l.set_max_accel(f64::INFINITY).is_err());
        assert!(l.set_max_accel(5.0).is_ok());
        assert_eq!(l.max_accel_ms2(), 5.0);
    }
}
